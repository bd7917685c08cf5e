use crate::agents::Agent;
use crate::core::context::ProjectContext;
use crate::core::source_model::SourceModel;
use crate::models::{DimensionReport, Issue, Severity};
use std::time::Instant;

/// Escape hatches that silence the type system entirely.
const ESCAPE_HATCHES: &[&str] = &[": any", "as any", "@ts-ignore", "@ts-nocheck", "Object as"];

#[derive(Debug, Default)]
pub struct TypeSafetyAgent;

impl Agent for TypeSafetyAgent {
    fn name(&self) -> &'static str {
        "type-safety"
    }

    fn dimensions(&self) -> &'static [&'static str] {
        &["type-safety"]
    }

    fn description(&self) -> &str {
        "Flags type-system escape hatches and unchecked narrowing casts."
    }

    fn analyze(
        &self,
        file: &SourceModel,
        _context: &ProjectContext,
    ) -> Result<Vec<DimensionReport>, String> {
        let start = Instant::now();
        let mut issues = Vec::new();
        let path = file.path_str();

        for line_no in 1..=file.line_count() {
            let Some(line) = file.line(line_no) else { continue };
            let trimmed = line.trim_start();
            if trimmed.starts_with("//") || trimmed.starts_with('#') || trimmed.starts_with('*') {
                continue;
            }

            if let Some(hatch) = ESCAPE_HATCHES.iter().find(|h| line.contains(*h)) {
                issues.push(
                    Issue::new(
                        "type-safety",
                        &path,
                        &format!("type-system escape hatch '{}'", hatch.trim()),
                        Severity::Medium,
                    )
                    .at_line(line_no)
                    .with_suggestion("Give the value a precise type instead of opting out"),
                );
            }

            if has_narrowing_cast(line) {
                issues.push(
                    Issue::new(
                        "type-safety",
                        &path,
                        "unchecked narrowing numeric cast",
                        Severity::Low,
                    )
                    .at_line(line_no)
                    .with_suggestion("Use a checked conversion and handle the overflow case"),
                );
            }
        }

        let report = DimensionReport::from_issues("type-safety", issues, Severity::High)
            .with_duration(start.elapsed().as_millis() as u64);
        Ok(vec![report])
    }
}

/// `expr as u8` style casts into a smaller-width integer.
fn has_narrowing_cast(line: &str) -> bool {
    for target in ["u8", "u16", "i8", "i16"] {
        let needle = format!(" as {}", target);
        if let Some(pos) = line.find(&needle) {
            let after = &line[pos + needle.len()..];
            if after.is_empty() || after.starts_with(|c: char| !c.is_alphanumeric()) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::run_agent_on_code;

    #[test]
    fn test_detects_any_annotation() {
        let code = "function parse(input: any) {\n    return input;\n}\n";
        let issues = run_agent_on_code(&TypeSafetyAgent, code, "parse.ts");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].line, Some(1));
    }

    #[test]
    fn test_detects_narrowing_cast() {
        let code = "fn to_byte(x: u64) -> u8 {\n    x as u8\n}\n";
        let issues = run_agent_on_code(&TypeSafetyAgent, code, "conv.rs");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Low);
        assert_eq!(issues[0].line, Some(2));
    }

    #[test]
    fn test_widening_cast_is_fine() {
        let code = "fn widen(x: u8) -> u64 {\n    x as u64\n}\n";
        let issues = run_agent_on_code(&TypeSafetyAgent, code, "conv.rs");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_comment_lines_ignored() {
        let code = "// cast as any is bad\nfn id() {}\n";
        let issues = run_agent_on_code(&TypeSafetyAgent, code, "doc.rs");
        assert!(issues.is_empty());
    }
}
