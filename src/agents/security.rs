use crate::agents::Agent;
use crate::core::context::ProjectContext;
use crate::core::source_model::{NodeKind, SourceModel};
use crate::models::{DimensionReport, Issue, Severity};
use std::time::Instant;

const SECRET_KEYWORDS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "api_key",
    "apikey",
    "token",
    "private_key",
];

const EVAL_CALLS: &[&str] = &["eval", "exec", "execfile", "system", "popen"];

/// Minimum literal length before an assignment counts as a candidate
/// secret; short strings are almost always placeholders.
const MIN_SECRET_LEN: usize = 6;

#[derive(Debug, Default)]
pub struct SecurityAgent;

impl Agent for SecurityAgent {
    fn name(&self) -> &'static str {
        "security"
    }

    fn dimensions(&self) -> &'static [&'static str] {
        &["security"]
    }

    fn description(&self) -> &str {
        "Flags hard-coded credential assignments and dynamic code evaluation calls."
    }

    fn analyze(
        &self,
        file: &SourceModel,
        _context: &ProjectContext,
    ) -> Result<Vec<DimensionReport>, String> {
        let start = Instant::now();
        let mut issues = Vec::new();
        let path = file.path_str();

        for node in file.nodes_of_kind(NodeKind::StringLiteral) {
            let Some(literal) = &node.name else { continue };
            if literal.len() < MIN_SECRET_LEN {
                continue;
            }
            let Some(line) = file.line(node.line) else { continue };
            let before_literal = line.split('"').next().unwrap_or("").to_lowercase();
            if let Some(keyword) = SECRET_KEYWORDS
                .iter()
                .find(|k| before_literal.contains(*k))
            {
                let (_, column) = file.offset_to_line_col(node.offset);
                issues.push(
                    Issue::new(
                        "security",
                        &path,
                        &format!("hard-coded secret assigned to '{}'", keyword),
                        Severity::Critical,
                    )
                    .at(node.line, column)
                    .with_suggestion("Load the value from the environment or a secret store")
                    .with_reference("CWE-798"),
                );
            }
        }

        for node in file.nodes_of_kind(NodeKind::Call) {
            let Some(callee) = &node.name else { continue };
            let tail = callee.rsplit('.').next().unwrap_or(callee);
            if EVAL_CALLS.contains(&tail) {
                let (_, column) = file.offset_to_line_col(node.offset);
                issues.push(
                    Issue::new(
                        "security",
                        &path,
                        &format!("dynamic code evaluation via '{}'", callee),
                        Severity::High,
                    )
                    .at(node.line, column)
                    .with_suggestion("Replace dynamic evaluation with an explicit dispatch")
                    .with_reference("CWE-95"),
                );
            }
        }

        let report = DimensionReport::from_issues("security", issues, Severity::High)
            .with_duration(start.elapsed().as_millis() as u64);
        Ok(vec![report])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::run_agent_on_code;

    #[test]
    fn test_detects_hardcoded_secret() {
        let code = r#"
fn connect() {
    let api_key = "sk-live-1234567890";
}
"#;
        let issues = run_agent_on_code(&SecurityAgent, code, "net.rs");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Critical);
        assert_eq!(issues[0].line, Some(3));
        assert!(issues[0].message.contains("api_key"));
    }

    #[test]
    fn test_short_literals_are_ignored() {
        let code = "fn setup() {\n    let password = \"x\";\n}\n";
        let issues = run_agent_on_code(&SecurityAgent, code, "setup.rs");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_detects_eval_call() {
        let code = "def handler(payload):\n    eval(payload)\n";
        let issues = run_agent_on_code(&SecurityAgent, code, "handler.py");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
    }

    #[test]
    fn test_clean_file_passes() {
        let code = "fn add(a: u32, b: u32) -> u32 {\n    a + b\n}\n";
        let issues = run_agent_on_code(&SecurityAgent, code, "math.rs");
        assert!(issues.is_empty());
    }
}
