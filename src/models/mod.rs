pub mod fix;
pub mod issue;
pub mod report;
pub mod severity;

pub use fix::{FixChange, FixResult, FixSummary};
pub use issue::{Issue, ValidatedFinding};
pub use report::{
    AgentReport, ConflictResolution, DimensionReport, DimensionStatus, Report, ReportSummary,
};
pub use severity::Severity;
