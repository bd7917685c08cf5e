use crate::models::issue::{Issue, ValidatedFinding};
use crate::models::severity::Severity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionStatus {
    Pass,
    Warning,
    Fail,
}

impl DimensionStatus {
    fn rank(&self) -> u8 {
        match self {
            DimensionStatus::Pass => 0,
            DimensionStatus::Warning => 1,
            DimensionStatus::Fail => 2,
        }
    }

    pub fn worst(self, other: DimensionStatus) -> DimensionStatus {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

/// One agent's result for one dimension on one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionReport {
    pub dimension: String,
    pub status: DimensionStatus,
    pub issue_count: usize,
    pub issues: Vec<Issue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<HashMap<String, f64>>,
    pub duration_ms: u64,
}

impl DimensionReport {
    pub fn new(dimension: &str, status: DimensionStatus, issues: Vec<Issue>) -> Self {
        Self {
            dimension: dimension.to_string(),
            status,
            issue_count: issues.len(),
            issues,
            metrics: None,
            duration_ms: 0,
        }
    }

    /// Status derived from contained issues: fail on any issue at or above
    /// the critical threshold, warning on anything else, pass when clean.
    pub fn from_issues(dimension: &str, issues: Vec<Issue>, critical_at: Severity) -> Self {
        let status = if issues
            .iter()
            .any(|i| i.severity.as_value() >= critical_at.as_value())
        {
            DimensionStatus::Fail
        } else if issues.is_empty() {
            DimensionStatus::Pass
        } else {
            DimensionStatus::Warning
        };
        Self::new(dimension, status, issues)
    }

    pub fn with_metric(mut self, key: &str, value: f64) -> Self {
        self.metrics
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value);
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// One agent's aggregate for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent: String,
    pub status: DimensionStatus,
    pub dimension_reports: Vec<DimensionReport>,
    pub duration_ms: u64,
}

impl AgentReport {
    pub fn new(agent: &str, dimension_reports: Vec<DimensionReport>, duration_ms: u64) -> Self {
        let status = dimension_reports
            .iter()
            .fold(DimensionStatus::Pass, |acc, r| acc.worst(r.status));
        Self {
            agent: agent.to_string(),
            status,
            dimension_reports,
            duration_ms,
        }
    }

    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.dimension_reports.iter().flat_map(|r| r.issues.iter())
    }
}

/// How two or more issues judged to describe the same defect were reconciled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub conflict_type: String,
    pub issues: Vec<Issue>,
    pub strategy: String,
    pub reasoning: String,
    pub winner: Issue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total_issues: usize,
    pub false_positives: usize,
    pub fixable: usize,
    pub fixed: usize,
}

impl ReportSummary {
    /// Counts are computed only from validated, non-false-positive findings.
    pub fn from_findings(findings: &[ValidatedFinding]) -> Self {
        let mut summary = ReportSummary::default();
        for finding in findings {
            if finding.is_false_positive {
                summary.false_positives += 1;
                continue;
            }
            summary.total_issues += 1;
            if finding.issue.fixable {
                summary.fixable += 1;
            }
            match finding.issue.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
        }
        summary
    }

    pub fn count_at_or_above(&self, severity: Severity) -> usize {
        let mut count = 0;
        if severity.as_value() <= Severity::Critical.as_value() {
            count += self.critical;
        }
        if severity.as_value() <= Severity::High.as_value() {
            count += self.high;
        }
        if severity.as_value() <= Severity::Medium.as_value() {
            count += self.medium;
        }
        if severity.as_value() <= Severity::Low.as_value() {
            count += self.low;
        }
        if severity.as_value() <= Severity::Info.as_value() {
            count += self.info;
        }
        count
    }
}

/// Terminal artifact of one orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub timestamp: String,
    pub analyzed_files: Vec<String>,
    pub agent_reports: Vec<AgentReport>,
    pub duration_ms: u64,
    pub summary: ReportSummary,
    pub conflicts: Vec<ConflictResolution>,
    pub recommendations: Vec<String>,
    pub findings: Vec<ValidatedFinding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl Report {
    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
    }

    /// Deterministic exit code: 0 nothing blocking, 1 high present,
    /// 2 critical present. Computed from the summary only.
    pub fn exit_code(&self) -> i32 {
        if self.summary.critical > 0 {
            2
        } else if self.summary.high > 0 {
            1
        } else {
            0
        }
    }

    /// Non-false-positive findings, the ones the summary counts.
    pub fn active_findings(&self) -> impl Iterator<Item = &ValidatedFinding> {
        self.findings.iter().filter(|f| !f.is_false_positive)
    }
}
