use crate::agents::imports::imported_symbol;
use crate::core::source_model::{import_target, is_import_line};
use crate::models::{FixChange, FixResult, FixSummary, Issue, Severity};
use std::collections::BTreeMap;
use std::fs;
use std::time::Instant;

/// The closed set of rewrites the fixer knows how to apply. Routing is
/// by finding shape, never by free-form text matching against code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixCategory {
    ImportOrder,
    UnusedImport,
    DuplicateImport,
    TrailingWhitespace,
    Rename,
    Unsupported,
}

impl FixCategory {
    pub fn from_issue(issue: &Issue) -> Self {
        if issue.dimension == "naming-consistency" {
            return FixCategory::Rename;
        }
        if issue.dimension == "whitespace" && issue.message == "trailing whitespace" {
            return FixCategory::TrailingWhitespace;
        }
        if issue.message.starts_with("unused import") {
            return FixCategory::UnusedImport;
        }
        if issue.message.starts_with("duplicate import") {
            return FixCategory::DuplicateImport;
        }
        if issue.message == "imports not sorted" {
            return FixCategory::ImportOrder;
        }
        FixCategory::Unsupported
    }
}

/// Applies safe textual rewrites for fixable findings. Every fix
/// re-reads the file from disk and searches the current content for its
/// anchor, so earlier fixes in the same run cannot corrupt later ones
/// through stale line numbers.
#[derive(Debug, Default)]
pub struct AutoFixer;

impl AutoFixer {
    pub fn new() -> Self {
        Self
    }

    /// Fixable findings plus the low-severity allow-list, grouped per
    /// file and applied in deterministic order. Each touched file is
    /// written back exactly once.
    pub fn apply(&self, issues: &[Issue]) -> FixSummary {
        let start = Instant::now();

        let mut by_file: BTreeMap<String, Vec<Issue>> = BTreeMap::new();
        for issue in issues.iter().filter(|i| eligible(i)) {
            by_file.entry(issue.file.clone()).or_default().push(issue.clone());
        }

        let mut results = Vec::new();
        for (file, mut file_issues) in by_file {
            file_issues.sort_by_key(|i| i.sort_key());
            results.extend(self.fix_file(&file, file_issues));
        }

        FixSummary::from_results(results, start.elapsed().as_millis() as u64)
    }

    fn fix_file(&self, file: &str, issues: Vec<Issue>) -> Vec<FixResult> {
        let original = match fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) => {
                return issues
                    .into_iter()
                    .map(|i| FixResult::failed(i, &format!("could not read {}: {}", file, e)))
                    .collect();
            }
        };

        let mut content = original.clone();
        let mut results = Vec::new();
        for issue in issues {
            match FixCategory::from_issue(&issue) {
                FixCategory::Rename => {
                    results.push(FixResult::skipped(issue, "manual review required"));
                }
                FixCategory::Unsupported => {
                    results.push(FixResult::skipped(issue, "no auto-fix available"));
                }
                category => match apply_one(category, &content, &issue) {
                    Ok(Some((next, change))) => {
                        content = next;
                        let message = change.description.clone();
                        results.push(FixResult::fixed(issue, &message, vec![change]));
                    }
                    Ok(None) => {
                        results.push(FixResult::noop(issue, "nothing left to change"));
                    }
                    Err(reason) => {
                        results.push(FixResult::failed(issue, &reason));
                    }
                },
            }
        }

        if content != original {
            if let Err(e) = fs::write(file, &content) {
                let reason = format!("could not write {}: {}", file, e);
                for result in results
                    .iter_mut()
                    .filter(|r| r.success && !r.changes.is_empty())
                {
                    *result = FixResult::failed(result.issue.clone(), &reason);
                }
            }
        }

        results
    }
}

/// Explicitly fixable findings always qualify; trailing whitespace
/// additionally qualifies as a best-effort cleanup at low severity.
fn eligible(issue: &Issue) -> bool {
    if issue.fixable {
        return true;
    }
    FixCategory::from_issue(issue) == FixCategory::TrailingWhitespace
        && issue.severity.as_value() <= Severity::Low.as_value()
}

fn apply_one(
    category: FixCategory,
    content: &str,
    issue: &Issue,
) -> Result<Option<(String, FixChange)>, String> {
    match category {
        FixCategory::UnusedImport => {
            let symbol = quoted(&issue.message)
                .ok_or_else(|| "finding names no import symbol".to_string())?;
            Ok(remove_unused_import(content, &symbol))
        }
        FixCategory::DuplicateImport => {
            let target = quoted(&issue.message)
                .ok_or_else(|| "finding names no import target".to_string())?;
            Ok(remove_duplicate_imports(content, &target))
        }
        FixCategory::ImportOrder => Ok(sort_import_blocks(content)),
        FixCategory::TrailingWhitespace => Ok(trim_trailing_whitespace(content)),
        FixCategory::Rename | FixCategory::Unsupported => Ok(None),
    }
}

/// The text between the first pair of single quotes in a message.
fn quoted(message: &str) -> Option<String> {
    let start = message.find('\'')? + 1;
    let len = message[start..].find('\'')?;
    Some(message[start..start + len].to_string())
}

fn remove_unused_import(content: &str, symbol: &str) -> Option<(String, FixChange)> {
    let lines = split_lines(content);
    let position = lines.iter().position(|(body, _)| {
        is_import_line(body)
            && import_target(body.trim_start())
                .as_deref()
                .and_then(imported_symbol)
                .as_deref()
                == Some(symbol)
    })?;

    let removed = lines[position].0.to_string();
    let next = join_without(&lines, &[position]);
    Some((
        next,
        FixChange {
            description: format!("removed unused import '{}'", symbol),
            before: removed,
            after: String::new(),
        },
    ))
}

fn remove_duplicate_imports(content: &str, target: &str) -> Option<(String, FixChange)> {
    let lines = split_lines(content);
    let occurrences: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, (body, _))| {
            is_import_line(body)
                && import_target(body.trim_start()).as_deref() == Some(target)
        })
        .map(|(i, _)| i)
        .collect();
    if occurrences.len() < 2 {
        return None;
    }

    let removed = occurrences[1..].to_vec();
    let before = lines[removed[0]].0.to_string();
    let next = join_without(&lines, &removed);
    Some((
        next,
        FixChange {
            description: format!(
                "removed {} duplicate import(s) of '{}'",
                removed.len(),
                target
            ),
            before,
            after: String::new(),
        },
    ))
}

/// Sorts every contiguous run of import lines; only runs that are out
/// of order are touched.
fn sort_import_blocks(content: &str) -> Option<(String, FixChange)> {
    let mut lines = split_lines(content);
    let mut changed = false;
    let mut first_before = String::new();
    let mut first_after = String::new();

    let mut i = 0;
    while i < lines.len() {
        if !is_import_line(&lines[i].0) {
            i += 1;
            continue;
        }
        let mut end = i + 1;
        while end < lines.len() && is_import_line(&lines[end].0) {
            end += 1;
        }
        let block: Vec<String> = lines[i..end].iter().map(|(b, _)| b.clone()).collect();
        let mut sorted = block.clone();
        sorted.sort_by(|a, b| {
            import_target(a.trim_start()).cmp(&import_target(b.trim_start()))
        });
        if sorted != block {
            if !changed {
                first_before = block.join("\n");
                first_after = sorted.join("\n");
            }
            for (slot, body) in lines[i..end].iter_mut().zip(sorted) {
                slot.0 = body;
            }
            changed = true;
        }
        i = end;
    }

    if !changed {
        return None;
    }
    Some((
        join(&lines),
        FixChange {
            description: "sorted import block".to_string(),
            before: first_before,
            after: first_after,
        },
    ))
}

fn trim_trailing_whitespace(content: &str) -> Option<(String, FixChange)> {
    let mut lines = split_lines(content);
    let mut trimmed = 0usize;
    let mut first_before = String::new();
    let mut first_after = String::new();

    for (body, _) in lines.iter_mut() {
        let next = body.trim_end_matches([' ', '\t']).to_string();
        if next != *body {
            if trimmed == 0 {
                first_before = body.clone();
                first_after = next.clone();
            }
            *body = next;
            trimmed += 1;
        }
    }

    if trimmed == 0 {
        return None;
    }
    Some((
        join(&lines),
        FixChange {
            description: format!("trimmed trailing whitespace on {} line(s)", trimmed),
            before: first_before,
            after: first_after,
        },
    ))
}

/// (body, line ending) pairs covering the whole file; endings may be
/// "\n", "\r\n", or empty for a final unterminated line.
fn split_lines(content: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        match rest.find('\n') {
            Some(pos) => {
                let (raw, tail) = rest.split_at(pos + 1);
                let body = raw.trim_end_matches('\n');
                let (body, ending) = match body.strip_suffix('\r') {
                    Some(stripped) => (stripped, "\r\n"),
                    None => (body, "\n"),
                };
                out.push((body.to_string(), ending.to_string()));
                rest = tail;
            }
            None => {
                out.push((rest.to_string(), String::new()));
                rest = "";
            }
        }
    }
    out
}

fn join(lines: &[(String, String)]) -> String {
    lines
        .iter()
        .map(|(body, ending)| format!("{}{}", body, ending))
        .collect()
}

fn join_without(lines: &[(String, String)], drop: &[usize]) -> String {
    lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !drop.contains(i))
        .map(|(_, (body, ending))| format!("{}{}", body, ending))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    fn unused_import_issue(file: &str, symbol: &str, line: usize) -> Issue {
        Issue::new(
            "import-hygiene",
            file,
            &format!("unused import '{}'", symbol),
            Severity::Low,
        )
        .at_line(line)
        .fixable()
    }

    #[test]
    fn test_unused_import_removed() {
        let dir = tempdir().unwrap();
        let file = write_file(
            &dir,
            "show.rs",
            "use std::fmt;\nuse std::mem;\n\nfn show() {\n    fmt::format(format_args!(\"x\"));\n}\n",
        );

        let summary = AutoFixer::new().apply(&[unused_import_issue(&file, "mem", 2)]);

        assert_eq!(summary.fixed, 1);
        assert_eq!(summary.failed, 0);
        let content = fs::read_to_string(&file).unwrap();
        assert!(!content.contains("std::mem"));
        assert!(content.contains("use std::fmt;"));

        // Re-analysis of the fixed content is clean for this category.
        let issues = crate::utils::test_utils::run_agent_on_code(
            &crate::agents::ImportHygieneAgent,
            &content,
            "show.rs",
        );
        assert!(issues.iter().all(|i| !i.message.starts_with("unused import")));
    }

    #[test]
    fn test_fix_is_idempotent() {
        let dir = tempdir().unwrap();
        let file = write_file(&dir, "show.rs", "use std::fmt;\nuse std::mem;\nfn show() {}\n");
        let issue = unused_import_issue(&file, "mem", 2);

        let first = AutoFixer::new().apply(std::slice::from_ref(&issue));
        assert_eq!(first.fixed, 1);
        let after_first = fs::read_to_string(&file).unwrap();

        // Second run is a no-op success: nothing mutated, nothing
        // counted as fixed, file byte-identical.
        let second = AutoFixer::new().apply(&[issue]);
        assert_eq!(second.fixed, 0);
        assert_eq!(second.failed, 0);
        assert!(second.results[0].success);
        assert!(second.results[0].changes.is_empty());
        assert_eq!(fs::read_to_string(&file).unwrap(), after_first);
    }

    #[test]
    fn test_duplicate_import_keeps_first() {
        let dir = tempdir().unwrap();
        let file = write_file(
            &dir,
            "show.rs",
            "use std::fmt;\nuse std::fmt;\nfn show() {\n    fmt::format(format_args!(\"x\"));\n}\n",
        );
        let issue = Issue::new(
            "import-hygiene",
            &file,
            "duplicate import 'std::fmt'",
            Severity::Low,
        )
        .at_line(2)
        .fixable();

        let summary = AutoFixer::new().apply(&[issue]);

        assert_eq!(summary.fixed, 1);
        let content = fs::read_to_string(&file).unwrap();
        assert_eq!(content.matches("use std::fmt;").count(), 1);
    }

    #[test]
    fn test_import_block_sorted() {
        let dir = tempdir().unwrap();
        let file = write_file(
            &dir,
            "show.rs",
            "use std::mem;\nuse std::fmt;\n\nfn show() {}\n",
        );
        let issue = Issue::new("import-hygiene", &file, "imports not sorted", Severity::Info)
            .at_line(1)
            .fixable();

        let summary = AutoFixer::new().apply(&[issue]);

        assert_eq!(summary.fixed, 1);
        let content = fs::read_to_string(&file).unwrap();
        assert!(content.starts_with("use std::fmt;\nuse std::mem;\n"));
    }

    #[test]
    fn test_trailing_whitespace_is_allow_listed() {
        let dir = tempdir().unwrap();
        let file = write_file(&dir, "show.rs", "fn show() {   \n}\n");
        // Not marked fixable; qualifies through the allow-list.
        let issue = Issue::new("whitespace", &file, "trailing whitespace", Severity::Info)
            .at_line(1);

        let summary = AutoFixer::new().apply(&[issue]);

        assert_eq!(summary.fixed, 1);
        assert_eq!(fs::read_to_string(&file).unwrap(), "fn show() {\n}\n");
    }

    #[test]
    fn test_rename_is_skipped() {
        let dir = tempdir().unwrap();
        let file = write_file(&dir, "show.rs", "fn doThing() {}\n");
        let issue = Issue::new(
            "naming-consistency",
            &file,
            "function 'doThing' deviates from the dominant snake_case naming style",
            Severity::Low,
        )
        .at_line(1)
        .fixable();

        let summary = AutoFixer::new().apply(&[issue]);

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.fixed, 0);
        // File untouched.
        assert_eq!(fs::read_to_string(&file).unwrap(), "fn doThing() {}\n");
    }

    #[test]
    fn test_unfixable_dimension_not_attempted() {
        let dir = tempdir().unwrap();
        let file = write_file(&dir, "busy.rs", "fn busy() {}\n");
        let issue = Issue::new(
            "complexity",
            &file,
            "function 'busy' has complexity 25 (critical threshold 20)",
            Severity::High,
        )
        .at_line(1);

        let summary = AutoFixer::new().apply(&[issue]);

        assert_eq!(summary.total, 0);
    }

    #[test]
    fn test_missing_file_reports_failure() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone.rs").display().to_string();

        let summary = AutoFixer::new().apply(&[unused_import_issue(&missing, "mem", 1)]);

        assert_eq!(summary.failed, 1);
        assert!(summary.results[0].reason.as_deref().unwrap().contains("could not read"));
    }

    #[test]
    fn test_category_routing() {
        let unused = Issue::new("import-hygiene", "a.rs", "unused import 'mem'", Severity::Low);
        let rename = Issue::new("naming-consistency", "a.rs", "deviates", Severity::Low);
        let other = Issue::new("security", "a.rs", "hard-coded secret", Severity::Critical);
        assert_eq!(FixCategory::from_issue(&unused), FixCategory::UnusedImport);
        assert_eq!(FixCategory::from_issue(&rename), FixCategory::Rename);
        assert_eq!(FixCategory::from_issue(&other), FixCategory::Unsupported);
    }
}
