use crate::core::context::ProjectContext;
use crate::core::source_model::SourceModel;
use crate::models::DimensionReport;
use std::fmt;

pub mod consistency;
pub mod coverage;
pub mod documentation;
pub mod imports;
pub mod security;
pub mod structure;
pub mod types;

pub use consistency::ConsistencyAgent;
pub use coverage::CoverageAgent;
pub use documentation::DocumentationAgent;
pub use imports::ImportHygieneAgent;
pub use security::SecurityAgent;
pub use structure::StructureAgent;
pub use types::TypeSafetyAgent;

/// A pluggable analysis unit covering one or more named dimensions.
///
/// `analyze` is read-only with respect to source files; a recoverable
/// parse anomaly is reported as an issue, never as `Err`. `Err` means
/// the agent itself failed and is recovered by the engine.
///
/// Cross-file agents accumulate during `analyze` and emit
/// majority-deviation findings from `finish`. Accumulator state is
/// scoped to one run: the engine calls `reset` before every run.
pub trait Agent: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    fn dimensions(&self) -> &'static [&'static str];
    fn description(&self) -> &str;

    fn analyze(
        &self,
        file: &SourceModel,
        context: &ProjectContext,
    ) -> Result<Vec<DimensionReport>, String>;

    fn finish(&self, _context: &ProjectContext) -> Result<Vec<DimensionReport>, String> {
        Ok(Vec::new())
    }

    fn reset(&self) {}
}

impl fmt::Display for dyn Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name: {}\nDimensions: {}\nDescription: {}",
            self.name(),
            self.dimensions().join(", "),
            self.description()
        )
    }
}
