use crate::agents::Agent;
use crate::core::context::ProjectContext;
use crate::core::source_model::{NodeKind, SourceModel};
use crate::models::{DimensionReport, Issue, Severity};
use fnv::FnvHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Instant;

/// Lines hashed together when looking for cross-file duplication.
const DUPLICATION_WINDOW: usize = 6;
/// Cap on reported duplicate blocks per run.
const MAX_DUPLICATION_ISSUES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NamingStyle {
    Snake,
    Camel,
}

#[derive(Debug, Default)]
struct Accumulators {
    /// Function name style observations: (file, line, name, style).
    namings: Vec<(String, usize, String, NamingStyle)>,
    /// Normalized window hash -> (file, line) of each occurrence.
    windows: HashMap<u64, Vec<(String, usize)>>,
}

/// Cross-file agent: collects during `analyze`, emits deviations from
/// the majority in `finish`. All state is scoped to one run and cleared
/// by `reset`.
#[derive(Debug, Default)]
pub struct ConsistencyAgent {
    accumulators: Mutex<Accumulators>,
}

impl Agent for ConsistencyAgent {
    fn name(&self) -> &'static str {
        "consistency"
    }

    fn dimensions(&self) -> &'static [&'static str] {
        &["naming-consistency", "duplication"]
    }

    fn description(&self) -> &str {
        "Finds deviations from the project's dominant naming style and duplicated blocks across files."
    }

    fn reset(&self) {
        if let Ok(mut accumulators) = self.accumulators.lock() {
            *accumulators = Accumulators::default();
        }
    }

    fn analyze(
        &self,
        file: &SourceModel,
        _context: &ProjectContext,
    ) -> Result<Vec<DimensionReport>, String> {
        let path = file.path_str();
        let mut accumulators = self
            .accumulators
            .lock()
            .map_err(|_| "accumulator lock poisoned".to_string())?;

        for node in file.nodes_of_kind(NodeKind::Function) {
            let Some(name) = &node.name else { continue };
            if let Some(style) = classify(name) {
                accumulators
                    .namings
                    .push((path.clone(), node.line, name.clone(), style));
            }
        }

        let lines: Vec<(usize, String)> = (1..=file.line_count())
            .filter_map(|n| {
                file.line(n).and_then(|l| {
                    let normalized = l.split_whitespace().collect::<Vec<_>>().join(" ");
                    if normalized.len() < 8 {
                        None
                    } else {
                        Some((n, normalized))
                    }
                })
            })
            .collect();

        for window in lines.windows(DUPLICATION_WINDOW) {
            let mut hasher = FnvHasher::default();
            for (_, text) in window {
                text.hash(&mut hasher);
            }
            accumulators
                .windows
                .entry(hasher.finish())
                .or_default()
                .push((path.clone(), window[0].0));
        }

        // Per-file output comes from `finish`; nothing to report yet.
        Ok(Vec::new())
    }

    fn finish(&self, _context: &ProjectContext) -> Result<Vec<DimensionReport>, String> {
        let start = Instant::now();
        let accumulators = self
            .accumulators
            .lock()
            .map_err(|_| "accumulator lock poisoned".to_string())?;

        let mut naming_issues = Vec::new();
        let mut counts: HashMap<NamingStyle, usize> = HashMap::new();
        for (_, _, _, style) in &accumulators.namings {
            *counts.entry(*style).or_default() += 1;
        }
        let mut style_counts: Vec<(NamingStyle, usize)> = counts.into_iter().collect();
        // Highest count first; ties fall to snake_case.
        style_counts.sort_by_key(|(style, count)| {
            (std::cmp::Reverse(*count), *style != NamingStyle::Snake)
        });
        let majority = style_counts.first().map(|(style, _)| *style);

        if let Some(majority) = majority {
            for (file, line, name, style) in &accumulators.namings {
                if *style != majority {
                    naming_issues.push(
                        Issue::new(
                            "naming-consistency",
                            file,
                            &format!(
                                "function '{}' deviates from the dominant {} naming style",
                                name,
                                style_name(majority)
                            ),
                            Severity::Low,
                        )
                        .at_line(*line)
                        .with_suggestion(&format!(
                            "Rename to {}",
                            convert(name, majority)
                        )),
                    );
                }
            }
        }

        let mut duplication_issues = Vec::new();
        let mut hashes: Vec<_> = accumulators.windows.iter().collect();
        hashes.sort_by_key(|(hash, _)| **hash);
        for (_, occurrences) in hashes {
            let mut files: Vec<&String> = occurrences.iter().map(|(f, _)| f).collect();
            files.dedup();
            if files.len() < 2 {
                continue;
            }
            if duplication_issues.len() >= MAX_DUPLICATION_ISSUES {
                break;
            }
            let (first_file, first_line) = &occurrences[0];
            let mut issue = Issue::new(
                "duplication",
                first_file,
                &format!(
                    "block of {} lines duplicated across {} files",
                    DUPLICATION_WINDOW,
                    files.len()
                ),
                Severity::Medium,
            )
            .at_line(*first_line)
            .with_suggestion("Extract the shared block into one helper")
            .with_effort("hours");
            for (file, _) in occurrences.iter().skip(1) {
                if file != first_file && !issue.related_files.contains(file) {
                    issue = issue.with_related_file(file);
                }
            }
            duplication_issues.push(issue);
        }

        let duration = start.elapsed().as_millis() as u64;
        Ok(vec![
            DimensionReport::from_issues("naming-consistency", naming_issues, Severity::High)
                .with_duration(duration),
            DimensionReport::from_issues("duplication", duplication_issues, Severity::High)
                .with_duration(duration),
        ])
    }
}

fn classify(name: &str) -> Option<NamingStyle> {
    let has_underscore = name.contains('_');
    let has_upper = name.chars().any(|c| c.is_ascii_uppercase());
    match (has_underscore, has_upper) {
        (true, false) => Some(NamingStyle::Snake),
        (false, true) => Some(NamingStyle::Camel),
        // Single lowercase words fit either style.
        _ => None,
    }
}

fn style_name(style: NamingStyle) -> &'static str {
    match style {
        NamingStyle::Snake => "snake_case",
        NamingStyle::Camel => "camelCase",
    }
}

fn convert(name: &str, target: NamingStyle) -> String {
    match target {
        NamingStyle::Snake => {
            let mut out = String::new();
            for c in name.chars() {
                if c.is_ascii_uppercase() {
                    out.push('_');
                    out.push(c.to_ascii_lowercase());
                } else {
                    out.push(c);
                }
            }
            out
        }
        NamingStyle::Camel => {
            let mut out = String::new();
            let mut upper_next = false;
            for c in name.chars() {
                if c == '_' {
                    upper_next = true;
                } else if upper_next {
                    out.push(c.to_ascii_uppercase());
                    upper_next = false;
                } else {
                    out.push(c);
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::run_agent;

    #[test]
    fn test_majority_style_wins() {
        let issues = run_agent(
            &ConsistencyAgent::default(),
            &[
                ("a.rs", "fn read_file() {}\nfn write_file() {}\n"),
                ("b.rs", "fn parse_line() {}\nfn doThing() {}\n"),
            ],
        );
        let naming: Vec<_> = issues
            .iter()
            .filter(|i| i.dimension == "naming-consistency")
            .collect();
        assert_eq!(naming.len(), 1);
        assert!(naming[0].message.contains("doThing"));
        assert!(naming[0].suggestion.as_deref().unwrap().contains("do_thing"));
        assert!(!naming[0].fixable);
    }

    #[test]
    fn test_duplication_across_files() {
        let block = "let total = compute_total(items);\nlet mean = total / items.len();\nlet variance = spread(items, mean);\nlet sigma = variance.sqrt();\nlet report = format_report(sigma);\nemit(report);\n";
        let a = format!("fn stats_a() {{\n{}}}\n", block);
        let b = format!("fn stats_b() {{\n{}}}\n", block);
        let issues = run_agent(&ConsistencyAgent::default(), &[("a.rs", &a), ("b.rs", &b)]);
        let duplication: Vec<_> = issues
            .iter()
            .filter(|i| i.dimension == "duplication")
            .collect();
        assert!(!duplication.is_empty());
        assert!(duplication[0].related_files.contains(&"b.rs".to_string()));
    }

    #[test]
    fn test_reset_clears_state() {
        let agent = ConsistencyAgent::default();
        let first = run_agent(&agent, &[("a.rs", "fn doThing() {}\nfn read_it() {}\nfn see_it() {}\n")]);
        assert_eq!(
            first
                .iter()
                .filter(|i| i.dimension == "naming-consistency")
                .count(),
            1
        );

        // Second run over clean sources: the deviation from run one is gone.
        let second = run_agent(&agent, &[("c.rs", "fn read_file() {}\n")]);
        assert!(second.iter().all(|i| i.dimension != "naming-consistency"));
    }

    #[test]
    fn test_consistent_project_is_clean() {
        let issues = run_agent(
            &ConsistencyAgent::default(),
            &[("a.rs", "fn read_file() {}\nfn write_file() {}\n")],
        );
        assert!(issues.is_empty());
    }
}
