use crate::agents::Agent;
use crate::core::context::ProjectContext;
use crate::core::source_model::{NodeKind, SourceModel, SourceNode};
use crate::models::{DimensionReport, Issue, Severity};
use std::time::Instant;

const COMPLEXITY_WARNING: usize = 10;
const COMPLEXITY_CRITICAL: usize = 20;
const NESTING_WARNING: usize = 4;
const NESTING_CRITICAL: usize = 6;

#[derive(Debug, Default)]
pub struct StructureAgent;

impl Agent for StructureAgent {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn dimensions(&self) -> &'static [&'static str] {
        &["complexity", "nesting"]
    }

    fn description(&self) -> &str {
        "Measures decision-point complexity and nesting depth per function."
    }

    fn analyze(
        &self,
        file: &SourceModel,
        _context: &ProjectContext,
    ) -> Result<Vec<DimensionReport>, String> {
        let start = Instant::now();
        let path = file.path_str();

        let mut complexity_issues = Vec::new();
        let mut nesting_issues = Vec::new();
        let mut max_complexity = 0usize;

        for function in functions(file) {
            let body = function_body(file, &function);

            // Decision points: one per branch or loop, plus the entry path.
            let complexity = 1 + body
                .iter()
                .filter(|n| matches!(n.kind, NodeKind::Branch | NodeKind::Loop))
                .count();
            max_complexity = max_complexity.max(complexity);

            let name = function.name.as_deref().unwrap_or("<anonymous>");
            if complexity >= COMPLEXITY_CRITICAL {
                complexity_issues.push(
                    Issue::new(
                        "complexity",
                        &path,
                        &format!(
                            "function '{}' has complexity {} (critical threshold {})",
                            name, complexity, COMPLEXITY_CRITICAL
                        ),
                        Severity::High,
                    )
                    .at_line(function.line)
                    .with_suggestion("Split the function along its decision branches")
                    .with_effort("hours"),
                );
            } else if complexity >= COMPLEXITY_WARNING {
                complexity_issues.push(
                    Issue::new(
                        "complexity",
                        &path,
                        &format!(
                            "function '{}' has complexity {} (warning threshold {})",
                            name, complexity, COMPLEXITY_WARNING
                        ),
                        Severity::Medium,
                    )
                    .at_line(function.line)
                    .with_suggestion("Extract helper functions for the busiest branches")
                    .with_effort("minutes"),
                );
            }

            let max_depth = body
                .iter()
                .map(|n| n.depth.saturating_sub(function.depth))
                .max()
                .unwrap_or(0);
            if max_depth >= NESTING_CRITICAL {
                nesting_issues.push(
                    Issue::new(
                        "nesting",
                        &path,
                        &format!("function '{}' nests {} levels deep", name, max_depth),
                        Severity::High,
                    )
                    .at_line(function.line)
                    .with_suggestion("Flatten with early returns or extracted helpers"),
                );
            } else if max_depth >= NESTING_WARNING {
                nesting_issues.push(
                    Issue::new(
                        "nesting",
                        &path,
                        &format!("function '{}' nests {} levels deep", name, max_depth),
                        Severity::Medium,
                    )
                    .at_line(function.line)
                    .with_suggestion("Flatten with early returns or extracted helpers"),
                );
            }
        }

        let duration = start.elapsed().as_millis() as u64;
        let complexity_report =
            DimensionReport::from_issues("complexity", complexity_issues, Severity::High)
                .with_metric("max_complexity", max_complexity as f64)
                .with_duration(duration);
        let nesting_report = DimensionReport::from_issues("nesting", nesting_issues, Severity::High)
            .with_duration(duration);

        Ok(vec![complexity_report, nesting_report])
    }
}

fn functions(file: &SourceModel) -> Vec<SourceNode> {
    file.nodes_of_kind(NodeKind::Function).cloned().collect()
}

/// Nodes between a function's line and the next function declaration.
/// An approximation that holds for the flat top-to-bottom layout the
/// text provider produces.
fn function_body<'a>(file: &'a SourceModel, function: &SourceNode) -> Vec<&'a SourceNode> {
    let next_start = file
        .nodes_of_kind(NodeKind::Function)
        .map(|n| n.line)
        .filter(|line| *line > function.line)
        .min()
        .unwrap_or(usize::MAX);

    file.nodes()
        .iter()
        .filter(|n| n.line >= function.line && n.line < next_start)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::run_agent_on_code;

    fn function_with_branches(count: usize) -> String {
        let mut code = String::from("fn busy(x: u32) -> u32 {\n");
        for i in 0..count {
            code.push_str(&format!("    if x > {} {{ return {}; }}\n", i, i));
        }
        code.push_str("    0\n}\n");
        code
    }

    #[test]
    fn test_complexity_25_is_critical() {
        let code = function_with_branches(24);
        let issues = run_agent_on_code(&StructureAgent, &code, "busy.rs");
        let complexity: Vec<_> = issues.iter().filter(|i| i.dimension == "complexity").collect();
        assert_eq!(complexity.len(), 1);
        assert_eq!(complexity[0].severity, Severity::High);
        assert!(complexity[0].message.contains("complexity 25"));
        assert!(!complexity[0].fixable);
    }

    #[test]
    fn test_complexity_report_status_fails_at_critical() {
        let code = function_with_branches(24);
        let model = crate::utils::test_utils::parse_and_prepare(&code, "busy.rs");
        let context = crate::utils::test_utils::context_with(vec![model]);
        let reports = StructureAgent
            .analyze(&context.files[0], &context)
            .unwrap();
        let complexity = reports.iter().find(|r| r.dimension == "complexity").unwrap();
        assert_eq!(complexity.status, crate::models::DimensionStatus::Fail);
        assert_eq!(complexity.issue_count, 1);
    }

    #[test]
    fn test_complexity_12_is_warning() {
        let code = function_with_branches(11);
        let issues = run_agent_on_code(&StructureAgent, &code, "busy.rs");
        let complexity: Vec<_> = issues.iter().filter(|i| i.dimension == "complexity").collect();
        assert_eq!(complexity.len(), 1);
        assert_eq!(complexity[0].severity, Severity::Medium);
    }

    #[test]
    fn test_simple_function_is_clean() {
        let code = "fn add(a: u32, b: u32) -> u32 {\n    a + b\n}\n";
        let issues = run_agent_on_code(&StructureAgent, code, "math.rs");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_deep_nesting_flagged() {
        let code = "fn deep() {\n    if a {\n        if b {\n            if c {\n                if d {\n                    if e {\n                        work();\n                    }\n                }\n            }\n        }\n    }\n}\n";
        let issues = run_agent_on_code(&StructureAgent, code, "deep.rs");
        let nesting: Vec<_> = issues.iter().filter(|i| i.dimension == "nesting").collect();
        assert_eq!(nesting.len(), 1);
        assert_eq!(nesting[0].severity, Severity::High);
    }
}
