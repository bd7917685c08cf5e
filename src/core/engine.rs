use crate::agents::Agent;
use crate::config::Config;
use crate::core::context::ProjectContext;
use crate::core::registry::AgentRegistry;
use crate::core::resolution;
use crate::core::source_model::{SourceModelProvider, TextSourceModelProvider};
use crate::core::validation;
use crate::models::{
    AgentReport, DimensionReport, DimensionStatus, Issue, Report, ReportSummary, Severity,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Runs every registered agent over the target file set and reconciles
/// their raw findings into one de-duplicated, prioritized report.
pub struct AnalysisEngine {
    registry: AgentRegistry,
    provider: Box<dyn SourceModelProvider>,
    config: Config,
}

impl AnalysisEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            registry: AgentRegistry::new(),
            provider: Box::new(TextSourceModelProvider),
            config: config.clone(),
        }
    }

    pub fn register_agent(&mut self, agent: Arc<dyn Agent>) {
        if !self
            .config
            .exclude_agents
            .iter()
            .any(|name| name == agent.name())
        {
            self.registry.register(agent);
        }
    }

    pub fn register_built_in_agents(&mut self) {
        self.register_agent(Arc::new(crate::agents::SecurityAgent::default()));
        self.register_agent(Arc::new(crate::agents::TypeSafetyAgent::default()));
        self.register_agent(Arc::new(crate::agents::StructureAgent::default()));
        self.register_agent(Arc::new(crate::agents::ConsistencyAgent::default()));
        self.register_agent(Arc::new(crate::agents::DocumentationAgent::default()));
        self.register_agent(Arc::new(crate::agents::CoverageAgent::default()));
        self.register_agent(Arc::new(crate::agents::ImportHygieneAgent::default()));
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn analyze(&self) -> Result<Report, String> {
        self.analyze_paths(&self.config.effective_paths())
    }

    pub fn analyze_paths(&self, paths: &[PathBuf]) -> Result<Report, String> {
        let start = Instant::now();

        // Parse each file once; one shared source model per file for
        // every agent in the run.
        let context = ProjectContext::load(paths, &self.config.exclude, self.provider.as_ref())?;

        for (path, reason) in &context.skipped {
            eprintln!("Warning: skipped {} ({})", path.display(), reason);
        }

        let mut agent_reports = Vec::new();
        for agent in self.registry.get_all() {
            match self.run_agent(agent.as_ref(), &context) {
                Ok(report) => agent_reports.push(report),
                Err(e) if self.config.fail_fast => {
                    return Err(format!("Agent '{}' failed: {}", agent.name(), e));
                }
                Err(e) => {
                    eprintln!("Warning: agent '{}' failed: {}", agent.name(), e);
                    agent_reports.push(failed_agent_report(agent.name(), &context, &e));
                }
            }
        }

        let candidates: Vec<Issue> = agent_reports
            .iter()
            .flat_map(|r| r.issues().cloned())
            .collect();

        let (survivors, conflicts) = resolution::resolve(candidates);
        let findings = validation::validate(survivors, &context, self.config.min_confidence);
        let summary = ReportSummary::from_findings(&findings);
        let recommendations = recommendations(&summary);

        let mut report = Report {
            timestamp: chrono::Utc::now().to_rfc3339(),
            analyzed_files: context
                .files
                .iter()
                .map(|f| f.path_str())
                .collect(),
            agent_reports,
            duration_ms: start.elapsed().as_millis() as u64,
            summary,
            conflicts,
            recommendations,
            findings,
            metadata: None,
        };
        report.add_metadata("version", env!("CARGO_PKG_VERSION"));
        report.add_metadata(
            "resolution_table_version",
            resolution::RESOLUTION_TABLE_VERSION,
        );
        report.add_metadata(
            "confidence_table_version",
            validation::CONFIDENCE_TABLE_VERSION,
        );

        Ok(report)
    }

    /// One agent over the whole file set: reset run-scoped accumulators,
    /// analyze file by file, then collect cross-file deviations.
    fn run_agent(&self, agent: &dyn Agent, context: &ProjectContext) -> Result<AgentReport, String> {
        let start = Instant::now();
        agent.reset();

        let mut dimension_reports = Vec::new();
        for file in &context.files {
            dimension_reports.extend(agent.analyze(file, context)?);
        }
        dimension_reports.extend(agent.finish(context)?);

        Ok(AgentReport::new(
            agent.name(),
            dimension_reports,
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// A throwing agent must not abort the run: its report fails with one
/// synthetic issue describing the failure and the other agents proceed.
fn failed_agent_report(agent_name: &str, context: &ProjectContext, error: &str) -> AgentReport {
    let issue = Issue::new(
        "agent-failure",
        &context.root.display().to_string(),
        &format!("Agent '{}' failed during analysis: {}", agent_name, error),
        Severity::Critical,
    );
    let dimension_report =
        DimensionReport::new("agent-failure", DimensionStatus::Fail, vec![issue]);
    AgentReport::new(agent_name, vec![dimension_report], 0)
}

/// Short, ordered guidance strings: a pure function of the summary
/// counts and fixed thresholds.
pub fn recommendations(summary: &ReportSummary) -> Vec<String> {
    let mut out = Vec::new();

    if summary.critical > 0 {
        out.push(format!(
            "Resolve {} critical issue(s) before merging; the build gate fails at this level",
            summary.critical
        ));
    }
    if summary.high > 0 {
        out.push(format!(
            "Address {} high-severity issue(s); these block a clean exit code",
            summary.high
        ));
    }
    if summary.fixable > summary.fixed {
        out.push(format!(
            "Run with --fix to auto-apply {} fixable issue(s)",
            summary.fixable - summary.fixed
        ));
    }
    if summary.total_issues > 50 {
        out.push(
            "Over 50 open issues; consider ratcheting the gate one severity at a time".to_string(),
        );
    }
    if summary.false_positives > 0 {
        out.push(format!(
            "{} finding(s) were suppressed as likely false positives; review them in the JSON view",
            summary.false_positives
        ));
    }
    if out.is_empty() {
        out.push("No blocking issues found".to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source_model::SourceModel;
    use std::fs;

    #[derive(Debug, Default)]
    struct AlwaysFailsAgent;

    impl Agent for AlwaysFailsAgent {
        fn name(&self) -> &'static str {
            "always-fails"
        }
        fn dimensions(&self) -> &'static [&'static str] {
            &["security"]
        }
        fn description(&self) -> &str {
            "test double that always fails"
        }
        fn analyze(
            &self,
            _file: &SourceModel,
            _context: &ProjectContext,
        ) -> Result<Vec<DimensionReport>, String> {
            Err("synthetic failure".to_string())
        }
    }

    fn project_with_secret() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("auth.rs"),
            "fn login() {\n    let password = \"hunter2secret\";\n}\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_failing_agent_does_not_suppress_healthy_agents() {
        let dir = project_with_secret();
        let config = Config::default();
        let mut engine = AnalysisEngine::new(&config);
        engine.register_agent(Arc::new(AlwaysFailsAgent));
        engine.register_built_in_agents();

        let report = engine.analyze_paths(&[dir.path().to_path_buf()]).unwrap();

        let failed = report
            .agent_reports
            .iter()
            .find(|r| r.agent == "always-fails")
            .unwrap();
        assert_eq!(failed.status, DimensionStatus::Fail);
        assert_eq!(failed.issues().count(), 1);

        // Healthy agents still contributed.
        assert!(report
            .findings
            .iter()
            .any(|f| f.issue.dimension == "security" && f.issue.message.contains("secret")));
    }

    #[test]
    fn test_fail_fast_aborts() {
        let dir = project_with_secret();
        let config = Config {
            fail_fast: true,
            ..Config::default()
        };
        let mut engine = AnalysisEngine::new(&config);
        engine.register_agent(Arc::new(AlwaysFailsAgent));

        let result = engine.analyze_paths(&[dir.path().to_path_buf()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_summary_invariant() {
        let dir = project_with_secret();
        let config = Config::default();
        let mut engine = AnalysisEngine::new(&config);
        engine.register_built_in_agents();

        let report = engine.analyze_paths(&[dir.path().to_path_buf()]).unwrap();
        let summary = &report.summary;

        assert_eq!(summary.total_issues, report.active_findings().count());
        assert_eq!(
            summary.critical + summary.high + summary.medium + summary.low + summary.info,
            summary.total_issues
        );
    }

    #[test]
    fn test_recommendations_are_deterministic() {
        let summary = ReportSummary {
            critical: 1,
            fixable: 2,
            ..ReportSummary::default()
        };
        assert_eq!(recommendations(&summary), recommendations(&summary));
        assert!(recommendations(&summary)[0].contains("critical"));

        let clean = ReportSummary::default();
        assert_eq!(recommendations(&clean), vec!["No blocking issues found"]);
    }
}
