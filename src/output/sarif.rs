use crate::models::{Report, Severity};
use fnv::FnvHasher;
use serde_sarif::sarif::{
    self, ArtifactLocation, Message, MultiformatMessageString, PhysicalLocation,
    ReportingDescriptor, Result as SarifResult, ResultLevel, Run, Sarif, ToolComponent, Version,
    SCHEMA_URL,
};
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

fn severity_to_level(severity: &Severity) -> ResultLevel {
    match severity {
        Severity::Critical | Severity::High => ResultLevel::Error,
        Severity::Medium => ResultLevel::Warning,
        Severity::Low | Severity::Info => ResultLevel::Note,
    }
}

/// Security-severity score for GitHub code scanning.
fn severity_to_score(severity: &Severity) -> &'static str {
    match severity {
        Severity::Critical => "9.5",
        Severity::High => "8.0",
        Severity::Medium => "5.0",
        Severity::Low => "2.0",
        Severity::Info => "0.0",
    }
}

/// Generate a fingerprint hash for tracking results across runs.
/// Note: Uses FnvHasher for stability across Rust versions
/// (DefaultHasher is not guaranteed stable).
fn generate_fingerprint(dimension: &str, file: &str, line: usize, message: &str) -> String {
    let mut hasher = FnvHasher::default();
    dimension.hash(&mut hasher);
    file.hash(&mut hasher);
    line.hash(&mut hasher);
    message.trim().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Render the report's active findings as a SARIF document; dimensions
/// become rules, false positives are left out just as they are left out
/// of the summary counts.
pub fn generate_sarif_report(report: &Report) -> Sarif {
    let mut rules: Vec<ReportingDescriptor> = Vec::new();
    let mut rule_indices: HashMap<String, i64> = HashMap::new();
    let mut results: Vec<SarifResult> = Vec::new();

    for finding in report.active_findings() {
        let issue = &finding.issue;

        if !rule_indices.contains_key(&issue.dimension) {
            let rule_index = rules.len() as i64;
            rule_indices.insert(issue.dimension.clone(), rule_index);

            let rule = ReportingDescriptor::builder()
                .id(&issue.dimension)
                .name(&issue.dimension)
                .short_description(&format!("{} finding", issue.dimension))
                .full_description(
                    MultiformatMessageString::builder()
                        .text(format!("Findings on the {} quality dimension", issue.dimension))
                        .build(),
                )
                .properties(
                    sarif::PropertyBag::builder()
                        .additional_properties({
                            let mut props = BTreeMap::new();
                            props.insert(
                                "security-severity".to_string(),
                                serde_json::json!(severity_to_score(&issue.severity)),
                            );
                            props.insert(
                                "tags".to_string(),
                                serde_json::json!(["quality", "audit"]),
                            );
                            props
                        })
                        .build(),
                )
                .build();

            rules.push(rule);
        }

        // Strip ./ prefix for GitHub compatibility.
        let file_path = issue.file.strip_prefix("./").unwrap_or(&issue.file);
        let artifact_location = ArtifactLocation::builder().uri(file_path).build();

        // SARIF requires lines and columns >= 1.
        let line = issue.line.unwrap_or(1).max(1) as i64;
        let column = issue.column.unwrap_or(1).max(1) as i64;

        let region = sarif::Region::builder()
            .start_line(line)
            .start_column(column)
            .build();

        let physical_location = PhysicalLocation::builder()
            .artifact_location(artifact_location)
            .region(region)
            .build();

        let sarif_location = sarif::Location::builder()
            .physical_location(physical_location)
            .build();

        let fingerprint = generate_fingerprint(
            &issue.dimension,
            &issue.file,
            issue.line.unwrap_or(0),
            &issue.message,
        );

        let mut partial_fingerprints = BTreeMap::new();
        partial_fingerprints.insert("primaryLocationLineHash".to_string(), fingerprint);

        let result = SarifResult::builder()
            .rule_id(&issue.dimension)
            .rule_index(*rule_indices.get(&issue.dimension).unwrap())
            .level(severity_to_level(&issue.severity))
            .message(Message::builder().text(&issue.message).build())
            .locations(vec![sarif_location])
            .partial_fingerprints(partial_fingerprints)
            .build();

        results.push(result);
    }

    let tool_component = ToolComponent::builder()
        .name("Vigil")
        .semantic_version(env!("CARGO_PKG_VERSION"))
        .rules(rules)
        .build();

    let run = Run::builder()
        .tool(tool_component)
        .results(results)
        .build();

    Sarif::builder()
        .version(Version::V2_1_0.to_string())
        .schema(SCHEMA_URL)
        .runs(vec![run])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Issue, ReportSummary, ValidatedFinding};

    fn report(findings: Vec<ValidatedFinding>) -> Report {
        Report {
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            analyzed_files: vec!["a.rs".to_string()],
            agent_reports: vec![],
            duration_ms: 0,
            summary: ReportSummary::from_findings(&findings),
            conflicts: vec![],
            recommendations: vec![],
            findings,
            metadata: None,
        }
    }

    #[test]
    fn test_sarif_generation_basic() {
        let report = report(vec![ValidatedFinding {
            issue: Issue::new("security", "a.rs", "hard-coded secret", Severity::Critical)
                .at(10, 5),
            is_false_positive: false,
            confidence: Some(1.0),
        }]);

        let sarif = generate_sarif_report(&report);
        assert_eq!(sarif.version, "2.1.0");
        assert_eq!(sarif.runs.len(), 1);

        let run = &sarif.runs[0];
        assert_eq!(run.tool.driver.name, "Vigil");
        let rules = run.tool.driver.rules.as_ref().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].short_description.as_ref().unwrap().text,
            "security finding"
        );
        assert_eq!(run.results.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_false_positives_excluded() {
        let report = report(vec![ValidatedFinding {
            issue: Issue::new("security", "tests/a.rs", "secret", Severity::Critical).at_line(3),
            is_false_positive: true,
            confidence: Some(0.3),
        }]);

        let sarif = generate_sarif_report(&report);
        assert!(sarif.runs[0].results.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_severity_mapping() {
        assert!(matches!(
            severity_to_level(&Severity::Critical),
            ResultLevel::Error
        ));
        assert!(matches!(
            severity_to_level(&Severity::Medium),
            ResultLevel::Warning
        ));
        assert!(matches!(severity_to_level(&Severity::Info), ResultLevel::Note));
    }
}
