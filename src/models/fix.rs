use crate::models::issue::Issue;
use serde::{Deserialize, Serialize};

/// Human-readable description of one text change a fixer made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixChange {
    pub description: String,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixResult {
    pub success: bool,
    pub issue: Issue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub changes: Vec<FixChange>,
}

impl FixResult {
    pub fn fixed(issue: Issue, message: &str, changes: Vec<FixChange>) -> Self {
        Self {
            success: true,
            issue,
            message: Some(message.to_string()),
            reason: None,
            changes,
        }
    }

    /// Success with no file mutation: the issue was already fixed.
    pub fn noop(issue: Issue, message: &str) -> Self {
        Self {
            success: true,
            issue,
            message: Some(message.to_string()),
            reason: None,
            changes: Vec::new(),
        }
    }

    pub fn failed(issue: Issue, reason: &str) -> Self {
        Self {
            success: false,
            issue,
            message: None,
            reason: Some(reason.to_string()),
            changes: Vec::new(),
        }
    }

    pub fn skipped(issue: Issue, reason: &str) -> Self {
        Self {
            success: false,
            issue,
            message: Some("skipped".to_string()),
            reason: Some(reason.to_string()),
            changes: Vec::new(),
        }
    }

    pub fn is_skip(&self) -> bool {
        !self.success && self.message.as_deref() == Some("skipped")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixSummary {
    pub total: usize,
    pub fixed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<FixResult>,
    pub duration_ms: u64,
}

impl FixSummary {
    /// `fixed` counts only results that persisted a file mutation. An
    /// idempotent no-op is a success with no changes; it contributes to
    /// `total` but to none of the three outcome buckets.
    pub fn from_results(results: Vec<FixResult>, duration_ms: u64) -> Self {
        let total = results.len();
        let fixed = results
            .iter()
            .filter(|r| r.success && !r.changes.is_empty())
            .count();
        let skipped = results.iter().filter(|r| r.is_skip()).count();
        let failed = results.iter().filter(|r| !r.success && !r.is_skip()).count();
        Self {
            total,
            fixed,
            failed,
            skipped,
            results,
            duration_ms,
        }
    }
}
