mod sarif;

pub use sarif::generate_sarif_report;

use crate::models::Report;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

/// Issues shown by the summary view before it truncates.
const SUMMARY_ISSUE_CAP: usize = 20;

#[derive(Debug, Clone, Default)]
pub enum ReportFormat {
    Json,
    Markdown,
    #[default]
    Summary,
    Sarif,
}

/// Config-file values parse through `FromStr`, so `vigil.toml` accepts
/// exactly the spellings the CLI does ("json", "md", "markdown", ...).
impl<'de> Deserialize<'de> for ReportFormat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "md" | "markdown" => Ok(ReportFormat::Markdown),
            "summary" => Ok(ReportFormat::Summary),
            "sarif" => Ok(ReportFormat::Sarif),
            _ => Err(format!("Invalid report format: {}", s)),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Json => write!(f, "Json"),
            ReportFormat::Markdown => write!(f, "Markdown"),
            ReportFormat::Summary => write!(f, "Summary"),
            ReportFormat::Sarif => write!(f, "Sarif"),
        }
    }
}

fn extension(format: &ReportFormat) -> &'static str {
    match format {
        ReportFormat::Json => "json",
        ReportFormat::Markdown => "md",
        ReportFormat::Summary => "txt",
        ReportFormat::Sarif => "sarif",
    }
}

pub fn generate_report(
    report: &Report,
    format: &ReportFormat,
    output: Option<PathBuf>,
) -> io::Result<()> {
    let rendered = render(report, format)?;

    if let Some(path) = output {
        let path_with_extension = path.with_extension(extension(format));
        let mut file = File::create(path_with_extension)?;
        file.write_all(rendered.as_bytes())?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(rendered.as_bytes())?;
    }

    Ok(())
}

/// Render a report to text. The JSON view is canonical and lossless;
/// every other view derives from the same record.
pub fn render(report: &Report, format: &ReportFormat) -> io::Result<String> {
    match format {
        ReportFormat::Json => {
            let mut text = serde_json::to_string_pretty(report)?;
            text.push('\n');
            Ok(text)
        }
        ReportFormat::Sarif => {
            let sarif = generate_sarif_report(report);
            let mut text = serde_json::to_string_pretty(&sarif)?;
            text.push('\n');
            Ok(text)
        }
        ReportFormat::Markdown => Ok(generate_markdown_report(report)),
        ReportFormat::Summary => Ok(generate_summary_report(report)),
    }
}

fn generate_markdown_report(report: &Report) -> String {
    let mut markdown = String::new();

    markdown.push_str("# Source Quality Audit Report\n\n");
    markdown.push_str(&format!("- **Timestamp**: {}\n", report.timestamp));
    markdown.push_str(&format!(
        "- **Files analyzed**: {}\n",
        report.analyzed_files.len()
    ));
    markdown.push_str(&format!("- **Duration**: {} ms\n", report.duration_ms));
    if let Some(metadata) = &report.metadata {
        let mut keys: Vec<_> = metadata.keys().collect();
        keys.sort();
        for key in keys {
            markdown.push_str(&format!("- **{}**: {}\n", key, metadata[key]));
        }
    }
    markdown.push('\n');

    let summary = &report.summary;
    markdown.push_str("## Summary\n\n");
    markdown.push_str(&format!("- **Critical**: {}\n", summary.critical));
    markdown.push_str(&format!("- **High**: {}\n", summary.high));
    markdown.push_str(&format!("- **Medium**: {}\n", summary.medium));
    markdown.push_str(&format!("- **Low**: {}\n", summary.low));
    markdown.push_str(&format!("- **Info**: {}\n", summary.info));
    markdown.push_str(&format!("- **Total**: {}\n", summary.total_issues));
    markdown.push_str(&format!(
        "- **False positives (suppressed)**: {}\n",
        summary.false_positives
    ));
    markdown.push_str(&format!("- **Fixable**: {}\n", summary.fixable));
    if summary.fixed > 0 {
        markdown.push_str(&format!("- **Fixed**: {}\n", summary.fixed));
    }
    markdown.push('\n');

    if !report.recommendations.is_empty() {
        markdown.push_str("## Recommendations\n\n");
        for recommendation in &report.recommendations {
            markdown.push_str(&format!("1. {}\n", recommendation));
        }
        markdown.push('\n');
    }

    markdown.push_str("## Findings\n\n");
    let mut any = false;
    for finding in report.active_findings() {
        any = true;
        let issue = &finding.issue;
        let location = match (issue.line, issue.column) {
            (Some(line), Some(column)) => format!("{}:{}:{}", issue.file, line, column),
            (Some(line), None) => format!("{}:{}", issue.file, line),
            _ => issue.file.clone(),
        };
        markdown.push_str(&format!(
            "### [{}] {} ({})\n\n{}\n\n",
            issue.severity, issue.dimension, location, issue.message
        ));
        if let Some(suggestion) = &issue.suggestion {
            markdown.push_str(&format!("**Suggestion**: {}\n\n", suggestion));
        }
        if let Some(effort) = &issue.effort {
            markdown.push_str(&format!("**Effort**: {}\n\n", effort));
        }
        if !issue.related_files.is_empty() {
            markdown.push_str(&format!(
                "**Related files**: {}\n\n",
                issue.related_files.join(", ")
            ));
        }
        if !issue.references.is_empty() {
            markdown.push_str(&format!(
                "**References**: {}\n\n",
                issue.references.join(", ")
            ));
        }
    }
    if !any {
        markdown.push_str("No issues found.\n\n");
    }

    if !report.conflicts.is_empty() {
        markdown.push_str("## Resolved Conflicts\n\n");
        for conflict in &report.conflicts {
            markdown.push_str(&format!(
                "- {} ({} findings): {}\n",
                conflict.conflict_type,
                conflict.issues.len(),
                conflict.reasoning
            ));
        }
        markdown.push('\n');
    }

    markdown
}

fn generate_summary_report(report: &Report) -> String {
    let mut text = String::new();
    let summary = &report.summary;

    text.push_str(&format!(
        "Analyzed {} files in {} ms\n",
        report.analyzed_files.len(),
        report.duration_ms
    ));
    text.push_str(&format!(
        "Critical: {}  High: {}  Medium: {}  Low: {}  Info: {}  (total {})\n",
        summary.critical, summary.high, summary.medium, summary.low, summary.info,
        summary.total_issues
    ));
    if summary.false_positives > 0 {
        text.push_str(&format!(
            "Suppressed as false positives: {}\n",
            summary.false_positives
        ));
    }

    let active: Vec<_> = report.active_findings().collect();
    for finding in active.iter().take(SUMMARY_ISSUE_CAP) {
        let issue = &finding.issue;
        let location = match issue.line {
            Some(line) => format!("{}:{}", issue.file, line),
            None => issue.file.clone(),
        };
        text.push_str(&format!(
            "  [{}] {} {} - {}\n",
            issue.severity, issue.dimension, location, issue.message
        ));
    }
    if active.len() > SUMMARY_ISSUE_CAP {
        text.push_str(&format!(
            "  ... truncated: showing {} of {} issues (use --format json for all)\n",
            SUMMARY_ISSUE_CAP,
            active.len()
        ));
    }

    for recommendation in &report.recommendations {
        text.push_str(&format!("-> {}\n", recommendation));
    }

    text
}
