use crate::agents::Agent;
use crate::core::context::ProjectContext;
use crate::core::source_model::{NodeKind, SourceModel};
use crate::models::{DimensionReport, Issue, Severity};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct DocumentationAgent;

impl Agent for DocumentationAgent {
    fn name(&self) -> &'static str {
        "documentation"
    }

    fn dimensions(&self) -> &'static [&'static str] {
        &["documentation"]
    }

    fn description(&self) -> &str {
        "Flags exported functions that carry no doc comment."
    }

    fn analyze(
        &self,
        file: &SourceModel,
        _context: &ProjectContext,
    ) -> Result<Vec<DimensionReport>, String> {
        let start = Instant::now();
        let mut issues = Vec::new();

        // Test functions document themselves through their names.
        if !file.is_test_file() {
            let path = file.path_str();
            for node in file.nodes_of_kind(NodeKind::Function) {
                let Some(name) = &node.name else { continue };
                if name.starts_with('_') || node.depth > 1 {
                    continue;
                }
                if !has_preceding_comment(file, node.line) {
                    issues.push(
                        Issue::new(
                            "documentation",
                            &path,
                            &format!("function '{}' has no doc comment", name),
                            Severity::Info,
                        )
                        .at_line(node.line)
                        .with_suggestion("Describe what the function does and when it errors")
                        .with_effort("minutes"),
                    );
                }
            }
        }

        let report = DimensionReport::from_issues("documentation", issues, Severity::High)
            .with_duration(start.elapsed().as_millis() as u64);
        Ok(vec![report])
    }
}

/// The nearest non-empty line above the declaration must be a comment.
fn has_preceding_comment(file: &SourceModel, line: usize) -> bool {
    let mut current = line.saturating_sub(1);
    while current >= 1 {
        match file.line(current) {
            Some(text) if text.trim().is_empty() => {
                current -= 1;
            }
            Some(_) => {
                return file
                    .nodes_of_kind(NodeKind::Comment)
                    .any(|n| n.line == current);
            }
            None => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::run_agent_on_code;

    #[test]
    fn test_undocumented_function_flagged() {
        let code = "fn parse(input: &str) {}\n";
        let issues = run_agent_on_code(&DocumentationAgent, code, "parse.rs");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Info);
        assert!(issues[0].message.contains("parse"));
    }

    #[test]
    fn test_documented_function_passes() {
        let code = "/// Parses one record.\nfn parse(input: &str) {}\n";
        let issues = run_agent_on_code(&DocumentationAgent, code, "parse.rs");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_test_files_are_skipped() {
        let code = "fn test_parse() {}\n";
        let issues = run_agent_on_code(&DocumentationAgent, code, "tests/parse.rs");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_private_prefix_skipped() {
        let code = "fn _helper() {}\n";
        let issues = run_agent_on_code(&DocumentationAgent, code, "lib.rs");
        assert!(issues.is_empty());
    }
}
