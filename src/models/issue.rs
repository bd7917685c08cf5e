use crate::models::severity::Severity;
use serde::{Deserialize, Serialize};

/// One finding emitted by an agent for one dimension.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub dimension: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
    pub fixable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub related_files: Vec<String>,
}

impl Issue {
    pub fn new(dimension: &str, file: &str, message: &str, severity: Severity) -> Self {
        Self {
            dimension: dimension.to_string(),
            file: file.to_string(),
            line: None,
            column: None,
            message: message.to_string(),
            severity,
            suggestion: None,
            effort: None,
            fixable: false,
            references: Vec::new(),
            related_files: Vec::new(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        debug_assert!(line >= 1, "issue lines are 1-based");
        self.line = Some(line);
        self
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        debug_assert!(line >= 1, "issue lines are 1-based");
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    pub fn with_effort(mut self, effort: &str) -> Self {
        self.effort = Some(effort.to_string());
        self
    }

    pub fn fixable(mut self) -> Self {
        self.fixable = true;
        self
    }

    pub fn with_reference(mut self, reference: &str) -> Self {
        self.references.push(reference.to_string());
        self
    }

    pub fn with_related_file(mut self, file: &str) -> Self {
        self.related_files.push(file.to_string());
        self
    }

    /// Stable identity used for de-duplication and deterministic ordering.
    pub fn sort_key(&self) -> (String, usize, String, String) {
        (
            self.file.clone(),
            self.line.unwrap_or(0),
            self.dimension.clone(),
            self.message.clone(),
        )
    }
}

/// An issue annotated by the validation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedFinding {
    pub issue: Issue,
    pub is_false_positive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}
