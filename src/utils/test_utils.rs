use crate::agents::Agent;
use crate::core::context::ProjectContext;
use crate::core::source_model::{SourceModel, SourceModelProvider, TextSourceModelProvider};
use crate::models::Issue;
use std::path::{Path, PathBuf};

pub fn parse_and_prepare(code: &str, filename: &str) -> SourceModel {
    TextSourceModelProvider
        .parse(Path::new(filename), code)
        .expect("parsing failed")
}

pub fn context_with(files: Vec<SourceModel>) -> ProjectContext {
    let test_files = files
        .iter()
        .filter(|f| f.is_test_file())
        .map(|f| f.path.clone())
        .collect();
    ProjectContext {
        root: PathBuf::from("."),
        files,
        test_files,
        dependencies: Vec::new(),
        skipped: Vec::new(),
    }
}

/// Run one agent over in-memory sources and flatten its issues,
/// including the cross-file `finish` phase.
pub fn run_agent(agent: &dyn Agent, sources: &[(&str, &str)]) -> Vec<Issue> {
    let files: Vec<SourceModel> = sources
        .iter()
        .map(|(name, code)| parse_and_prepare(code, name))
        .collect();
    let context = context_with(files);

    agent.reset();
    let mut reports = Vec::new();
    for file in &context.files {
        reports.extend(agent.analyze(file, &context).expect("analyze failed"));
    }
    reports.extend(agent.finish(&context).expect("finish failed"));

    reports.into_iter().flat_map(|r| r.issues).collect()
}

pub fn run_agent_on_code(agent: &dyn Agent, code: &str, filename: &str) -> Vec<Issue> {
    run_agent(agent, &[(filename, code)])
}
