use crate::models::{ConflictResolution, Issue};

/// Version of the precedence tables below. Bump whenever a table entry
/// changes so resolved reports can be compared across tool versions.
pub const RESOLUTION_TABLE_VERSION: &str = "1";

/// Two issues collide only when their lines are within this window.
const LINE_WINDOW: usize = 2;

struct DimensionRule {
    dimension: &'static str,
    /// Semantic group; only issues in the same group can describe the
    /// same underlying defect.
    group: &'static str,
    /// Narrow dimensions outrank broad ones firing on the same line.
    specificity: u8,
    /// Fixed priority of the agent owning this dimension, the final
    /// tie-break before lexical ordering.
    priority: u8,
}

const RESOLUTION_RULES: &[DimensionRule] = &[
    DimensionRule { dimension: "security", group: "risk", specificity: 90, priority: 70 },
    DimensionRule { dimension: "type-safety", group: "risk", specificity: 70, priority: 60 },
    DimensionRule { dimension: "import-hygiene", group: "hygiene", specificity: 80, priority: 40 },
    DimensionRule { dimension: "duplication", group: "hygiene", specificity: 60, priority: 45 },
    DimensionRule { dimension: "nesting", group: "structure", specificity: 55, priority: 50 },
    DimensionRule { dimension: "complexity", group: "structure", specificity: 50, priority: 50 },
    DimensionRule { dimension: "whitespace", group: "format", specificity: 45, priority: 40 },
    DimensionRule { dimension: "naming-consistency", group: "style", specificity: 40, priority: 30 },
    DimensionRule { dimension: "documentation", group: "style", specificity: 30, priority: 20 },
    DimensionRule { dimension: "test-coverage", group: "coverage", specificity: 20, priority: 10 },
];

/// Unknown dimensions (external agents) conflict only with themselves.
fn rule_for(dimension: &str) -> DimensionRule {
    RESOLUTION_RULES
        .iter()
        .find(|r| r.dimension == dimension)
        .map(|r| DimensionRule { ..*r })
        .unwrap_or(DimensionRule {
            dimension: "",
            group: "",
            specificity: 10,
            priority: 10,
        })
}

fn group_of(issue: &Issue) -> String {
    let rule = rule_for(&issue.dimension);
    if rule.group.is_empty() {
        issue.dimension.clone()
    } else {
        rule.group.to_string()
    }
}

fn colliding(a: &Issue, b: &Issue) -> bool {
    if a.file != b.file || group_of(a) != group_of(b) {
        return false;
    }
    match (a.line, b.line) {
        (Some(la), Some(lb)) => la.abs_diff(lb) <= LINE_WINDOW,
        // File-level findings in the same group describe the same defect.
        (None, None) => true,
        _ => false,
    }
}

/// De-duplicate overlapping findings from agents that know nothing of
/// each other. Deterministic: any permutation of the same candidate set
/// yields the same winners, because candidates are canonically sorted
/// before grouping and ranking.
pub fn resolve(mut candidates: Vec<Issue>) -> (Vec<Issue>, Vec<ConflictResolution>) {
    candidates.sort_by_key(|i| i.sort_key());

    let mut survivors: Vec<Issue> = Vec::new();
    let mut conflicts: Vec<ConflictResolution> = Vec::new();
    let mut sets: Vec<Vec<Issue>> = Vec::new();

    'outer: for issue in candidates {
        for set in sets.iter_mut() {
            if set.iter().any(|member| colliding(member, &issue)) {
                set.push(issue);
                continue 'outer;
            }
        }
        sets.push(vec![issue]);
    }

    for mut set in sets {
        if set.len() == 1 {
            survivors.push(set.pop().unwrap());
            continue;
        }

        // Severity desc, then specificity desc, then agent priority desc,
        // then the stable lexical key.
        set.sort_by(|a, b| {
            let ra = rule_for(&a.dimension);
            let rb = rule_for(&b.dimension);
            b.severity
                .as_value()
                .cmp(&a.severity.as_value())
                .then(rb.specificity.cmp(&ra.specificity))
                .then(rb.priority.cmp(&ra.priority))
                .then(a.sort_key().cmp(&b.sort_key()))
        });

        let winner = set[0].clone();
        let same_dimension = set.iter().all(|i| i.dimension == winner.dimension);
        let conflict_type = if same_dimension {
            "duplicate-finding"
        } else {
            "overlapping-findings"
        };
        let reasoning = format!(
            "{} findings within {} lines in {}; kept '{}' ({}) by severity, then dimension \
             specificity, then agent priority (table v{})",
            set.len(),
            LINE_WINDOW,
            winner.file,
            winner.dimension,
            winner.severity,
            RESOLUTION_TABLE_VERSION,
        );

        conflicts.push(ConflictResolution {
            conflict_type: conflict_type.to_string(),
            issues: set,
            strategy: "severity-specificity-priority".to_string(),
            reasoning,
            winner: winner.clone(),
        });
        survivors.push(winner);
    }

    survivors.sort_by(|a, b| {
        b.severity
            .as_value()
            .cmp(&a.severity.as_value())
            .then(a.sort_key().cmp(&b.sort_key()))
    });
    (survivors, conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn issue(dimension: &str, file: &str, line: usize, severity: Severity) -> Issue {
        Issue::new(dimension, file, &format!("{} on {}", dimension, line), severity).at_line(line)
    }

    #[test]
    fn test_unrelated_issues_survive() {
        let (survivors, conflicts) = resolve(vec![
            issue("security", "a.rs", 10, Severity::High),
            issue("security", "a.rs", 50, Severity::High),
            issue("documentation", "b.rs", 10, Severity::Info),
        ]);
        assert_eq!(survivors.len(), 3);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_higher_severity_wins_in_window() {
        let (survivors, conflicts) = resolve(vec![
            issue("complexity", "a.rs", 10, Severity::Medium),
            issue("nesting", "a.rs", 11, Severity::High),
        ]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].dimension, "nesting");
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].issues.len(), 2);
        assert_eq!(conflicts[0].winner.dimension, "nesting");
    }

    #[test]
    fn test_specificity_breaks_severity_tie() {
        // Same severity, same line: security (90) outranks type-safety (70).
        let (survivors, _) = resolve(vec![
            issue("type-safety", "a.rs", 5, Severity::High),
            issue("security", "a.rs", 5, Severity::High),
        ]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].dimension, "security");
    }

    #[test]
    fn test_unrelated_groups_never_collide() {
        let (survivors, conflicts) = resolve(vec![
            issue("security", "a.rs", 5, Severity::High),
            issue("documentation", "a.rs", 5, Severity::Info),
        ]);
        assert_eq!(survivors.len(), 2);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_deterministic_under_permutation() {
        let base = vec![
            issue("complexity", "a.rs", 10, Severity::High),
            issue("nesting", "a.rs", 11, Severity::High),
            issue("security", "a.rs", 12, Severity::Medium),
            issue("type-safety", "b.rs", 3, Severity::Low),
        ];
        let (expected, _) = resolve(base.clone());

        let mut permuted = base;
        permuted.reverse();
        permuted.swap(0, 2);
        let (actual, _) = resolve(permuted);

        assert_eq!(expected, actual);
    }

    #[test]
    fn test_file_level_duplicates_merge() {
        let a = Issue::new("test-coverage", "a.rs", "no test file", Severity::Medium);
        let b = Issue::new("test-coverage", "a.rs", "untested module", Severity::Medium);
        let (survivors, conflicts) = resolve(vec![a, b]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, "duplicate-finding");
    }
}
