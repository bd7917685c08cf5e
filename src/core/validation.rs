use crate::core::context::ProjectContext;
use crate::core::source_model::is_test_path;
use crate::models::{Issue, ValidatedFinding};
use std::path::Path;

/// Version of the downgrade table below; bump on any factor change.
pub const CONFIDENCE_TABLE_VERSION: &str = "1";

struct Heuristic {
    name: &'static str,
    factor: f64,
    applies: fn(&Issue, &ProjectContext) -> bool,
}

fn in_test_file(issue: &Issue, _context: &ProjectContext) -> bool {
    is_test_path(Path::new(&issue.file))
}

fn in_generated_file(issue: &Issue, _context: &ProjectContext) -> bool {
    let lower = issue.file.to_lowercase();
    lower.contains("generated") || lower.contains(".min.") || lower.ends_with(".d.ts")
}

fn security_in_test(issue: &Issue, context: &ProjectContext) -> bool {
    issue.dimension == "security" && in_test_file(issue, context)
}

fn style_in_test(issue: &Issue, context: &ProjectContext) -> bool {
    matches!(issue.dimension.as_str(), "documentation" | "naming-consistency")
        && in_test_file(issue, context)
}

fn structural_in_generated(issue: &Issue, context: &ProjectContext) -> bool {
    matches!(issue.dimension.as_str(), "complexity" | "nesting" | "duplication")
        && in_generated_file(issue, context)
}

fn hygiene_in_generated(issue: &Issue, context: &ProjectContext) -> bool {
    issue.dimension == "import-hygiene" && in_generated_file(issue, context)
}

/// Fixed, documented downgrade factors. Every issue starts at 1.0 and
/// each matching heuristic multiplies the confidence down.
const HEURISTICS: &[Heuristic] = &[
    Heuristic {
        name: "security-pattern-in-test-file",
        factor: 0.3,
        applies: security_in_test,
    },
    Heuristic {
        name: "style-finding-in-test-file",
        factor: 0.5,
        applies: style_in_test,
    },
    Heuristic {
        name: "structural-finding-in-generated-file",
        factor: 0.4,
        applies: structural_in_generated,
    },
    Heuristic {
        name: "import-finding-in-generated-file",
        factor: 0.4,
        applies: hygiene_in_generated,
    },
];

/// Score every issue; below `min_confidence` it is marked false positive,
/// kept for audit, excluded from summary counts.
pub fn validate(
    issues: Vec<Issue>,
    context: &ProjectContext,
    min_confidence: f64,
) -> Vec<ValidatedFinding> {
    issues
        .into_iter()
        .map(|issue| {
            let mut confidence = 1.0f64;
            for heuristic in HEURISTICS {
                if (heuristic.applies)(&issue, context) {
                    confidence *= heuristic.factor;
                }
            }
            ValidatedFinding {
                is_false_positive: confidence < min_confidence,
                confidence: Some(confidence),
                issue,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source_model::TextSourceModelProvider;
    use crate::models::Severity;
    use std::path::PathBuf;

    fn empty_context() -> ProjectContext {
        ProjectContext::load(&[PathBuf::from("/nonexistent")], &[], &TextSourceModelProvider)
            .unwrap_or(ProjectContext {
                root: PathBuf::from("."),
                files: vec![],
                test_files: vec![],
                dependencies: vec![],
                skipped: vec![],
            })
    }

    #[test]
    fn test_default_confidence_is_full() {
        let context = empty_context();
        let issue = Issue::new("security", "src/auth.rs", "hard-coded secret", Severity::Critical);
        let findings = validate(vec![issue], &context, 0.5);
        assert_eq!(findings[0].confidence, Some(1.0));
        assert!(!findings[0].is_false_positive);
    }

    #[test]
    fn test_secret_in_test_file_downgraded() {
        let context = empty_context();
        let issue = Issue::new(
            "security",
            "src/tests/auth.rs",
            "hard-coded secret",
            Severity::Critical,
        );
        let findings = validate(vec![issue], &context, 0.5);
        assert!(findings[0].is_false_positive);
        assert!(findings[0].confidence.unwrap() < 0.5);
    }

    #[test]
    fn test_threshold_boundary_keeps_issue() {
        let context = empty_context();
        let issue = Issue::new(
            "documentation",
            "src/tests/auth.rs",
            "missing docs",
            Severity::Info,
        );
        // Factor is exactly 0.5; below-threshold means strictly less.
        let findings = validate(vec![issue], &context, 0.5);
        assert!(!findings[0].is_false_positive);
    }
}
