use crate::agents::Agent;
use crate::core::context::ProjectContext;
use crate::core::source_model::{NodeKind, SourceModel};
use crate::models::{DimensionReport, Issue, Severity};
use std::collections::HashMap;
use std::time::Instant;

/// Import hygiene plus the low-severity whitespace rewrites the fixer
/// handles best-effort. Everything here is a pure text property, which
/// is what makes the matching fixes safe.
#[derive(Debug, Default)]
pub struct ImportHygieneAgent;

impl Agent for ImportHygieneAgent {
    fn name(&self) -> &'static str {
        "import-hygiene"
    }

    fn dimensions(&self) -> &'static [&'static str] {
        &["import-hygiene", "whitespace"]
    }

    fn description(&self) -> &str {
        "Flags unused, duplicate, and unsorted imports, and trailing whitespace."
    }

    fn analyze(
        &self,
        file: &SourceModel,
        _context: &ProjectContext,
    ) -> Result<Vec<DimensionReport>, String> {
        let start = Instant::now();
        let path = file.path_str();
        let mut import_issues = Vec::new();

        let imports: Vec<_> = file.nodes_of_kind(NodeKind::Import).collect();

        // Duplicates: same target imported more than once; every
        // occurrence after the first is removable.
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for node in &imports {
            let Some(target) = node.name.as_deref() else { continue };
            if let Some(_first_line) = seen.get(target) {
                import_issues.push(
                    Issue::new(
                        "import-hygiene",
                        &path,
                        &format!("duplicate import '{}'", target),
                        Severity::Low,
                    )
                    .at_line(node.line)
                    .with_suggestion("Keep the first import and drop the rest")
                    .fixable(),
                );
            } else {
                seen.insert(target, node.line);
            }
        }

        // Unused: the imported symbol never appears outside import lines.
        for node in &imports {
            let Some(target) = node.name.as_deref() else { continue };
            let Some(symbol) = imported_symbol(target) else { continue };
            let used = (1..=file.line_count())
                .filter(|n| !imports.iter().any(|i| i.line == *n))
                .filter_map(|n| file.line(n))
                .any(|line| contains_word(line, &symbol));
            if !used {
                import_issues.push(
                    Issue::new(
                        "import-hygiene",
                        &path,
                        &format!("unused import '{}'", symbol),
                        Severity::Low,
                    )
                    .at_line(node.line)
                    .with_suggestion("Remove the import")
                    .fixable(),
                );
            }
        }

        // Ordering: each contiguous import block should be sorted.
        for block in import_blocks(&imports) {
            let targets: Vec<&str> = block
                .iter()
                .filter_map(|n| n.name.as_deref())
                .collect();
            let mut sorted = targets.clone();
            sorted.sort_unstable();
            if targets != sorted {
                import_issues.push(
                    Issue::new(
                        "import-hygiene",
                        &path,
                        "imports not sorted",
                        Severity::Info,
                    )
                    .at_line(block[0].line)
                    .with_suggestion("Sort the import block lexicographically")
                    .fixable(),
                );
            }
        }

        // Not explicitly fixable: picked up by the fixer's best-effort
        // allow-list only.
        let mut whitespace_issues = Vec::new();
        for n in 1..=file.line_count() {
            let Some(line) = file.line(n) else { continue };
            if !line.is_empty() && line.ends_with(|c: char| c == ' ' || c == '\t') {
                whitespace_issues.push(
                    Issue::new("whitespace", &path, "trailing whitespace", Severity::Info)
                        .at_line(n),
                );
            }
        }

        let duration = start.elapsed().as_millis() as u64;
        Ok(vec![
            DimensionReport::from_issues("import-hygiene", import_issues, Severity::High)
                .with_duration(duration),
            DimensionReport::from_issues("whitespace", whitespace_issues, Severity::High)
                .with_duration(duration),
        ])
    }
}

/// The identifier an import binds: the last path segment, stripped of
/// grouping and aliasing syntax.
pub fn imported_symbol(target: &str) -> Option<String> {
    let target = target.split(" as ").last().unwrap_or(target);
    let tail = target
        .rsplit(&[':', '/', '.'][..])
        .next()
        .unwrap_or(target)
        .trim()
        .trim_matches(|c| c == '{' || c == '}' || c == '*' || c == '"' || c == '\'');
    let symbol: String = tail
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if symbol.is_empty() {
        None
    } else {
        Some(symbol)
    }
}

fn contains_word(line: &str, word: &str) -> bool {
    line.split(|c: char| !c.is_alphanumeric() && c != '_')
        .any(|w| w == word)
}

fn import_blocks<'a>(
    imports: &[&'a crate::core::source_model::SourceNode],
) -> Vec<Vec<&'a crate::core::source_model::SourceNode>> {
    let mut blocks: Vec<Vec<&crate::core::source_model::SourceNode>> = Vec::new();
    for node in imports {
        match blocks.last_mut() {
            Some(block) if node.line == block.last().unwrap().line + 1 => block.push(node),
            _ => blocks.push(vec![node]),
        }
    }
    blocks.into_iter().filter(|b| b.len() > 1).collect()
}
