use crate::agents::Agent;
use crate::core::context::ProjectContext;
use crate::core::source_model::{NodeKind, SourceModel};
use crate::models::{DimensionReport, Issue, Severity};
use std::time::Instant;

#[derive(Debug, Default)]
pub struct CoverageAgent;

impl Agent for CoverageAgent {
    fn name(&self) -> &'static str {
        "coverage"
    }

    fn dimensions(&self) -> &'static [&'static str] {
        &["test-coverage"]
    }

    fn description(&self) -> &str {
        "Flags source files with functions but no corresponding test file."
    }

    fn analyze(
        &self,
        _file: &SourceModel,
        _context: &ProjectContext,
    ) -> Result<Vec<DimensionReport>, String> {
        // Whole-project view; everything happens in `finish`.
        Ok(Vec::new())
    }

    fn finish(&self, context: &ProjectContext) -> Result<Vec<DimensionReport>, String> {
        let start = Instant::now();
        let mut issues = Vec::new();

        for file in &context.files {
            if file.is_test_file() {
                continue;
            }
            if file.nodes_of_kind(NodeKind::Function).next().is_none() {
                continue;
            }
            let Some(stem) = file.path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let covered = context.test_files.iter().any(|test| {
                test.file_name()
                    .and_then(|n| n.to_str())
                    .map(|name| name.contains(stem))
                    .unwrap_or(false)
            });
            if !covered {
                issues.push(
                    Issue::new(
                        "test-coverage",
                        &file.path_str(),
                        &format!("no test file covers '{}'", stem),
                        Severity::Medium,
                    )
                    .with_suggestion(&format!("Add a {}_test with the core scenarios", stem))
                    .with_effort("hours"),
                );
            }
        }

        let report = DimensionReport::from_issues("test-coverage", issues, Severity::High)
            .with_duration(start.elapsed().as_millis() as u64);
        Ok(vec![report])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::run_agent;

    #[test]
    fn test_uncovered_file_flagged() {
        let issues = run_agent(
            &CoverageAgent,
            &[("src/parser.rs", "fn parse() {}\n")],
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].dimension, "test-coverage");
        assert!(issues[0].message.contains("parser"));
    }

    #[test]
    fn test_covered_file_passes() {
        let issues = run_agent(
            &CoverageAgent,
            &[
                ("src/parser.rs", "fn parse() {}\n"),
                ("src/parser_test.rs", "fn test_parse() {}\n"),
            ],
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_function_free_file_ignored() {
        let issues = run_agent(&CoverageAgent, &[("src/constants.rs", "const X: u32 = 1;\n")]);
        assert!(issues.is_empty());
    }
}
