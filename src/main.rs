mod agents;
mod config;
mod core;
mod fixer;
mod models;
mod output;
mod utils;
mod watch;

use crate::config::{initialize_config_file, load_config, CliOverrides, Config};
use crate::core::engine::AnalysisEngine;
use crate::fixer::AutoFixer;
use crate::models::{Issue, Report, Severity};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Multi-Dimension Source Quality Audit Tool")]
#[command(version = core::version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default vigil.toml in the current directory
    Init,
    /// Run every registered agent once and print or save the report
    Analyze {
        /// Paths to analyze; defaults to the current directory
        paths: Vec<PathBuf>,

        #[arg(short, long, value_name = "json|md|summary|sarif")]
        format: Option<String>,

        #[arg(short, long, value_name = "REPORT_FILE_NAME")]
        output: Option<PathBuf>,

        /// Apply safe automatic fixes after analysis
        #[arg(long)]
        fix: bool,

        #[arg(long, value_name = "AGENT_NAME")]
        exclude_agent: Vec<String>,

        #[arg(long, value_name = "0.0..1.0")]
        min_confidence: Option<f64>,

        /// Abort on the first agent failure instead of recovering
        #[arg(long)]
        fail_fast: bool,

        #[arg(short, long, value_name = "PATH_TO_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Re-run the analysis whenever a watched file changes
    Watch {
        /// Paths to watch; defaults to the current directory
        paths: Vec<PathBuf>,

        /// Apply safe automatic fixes after every run
        #[arg(long)]
        fix: bool,

        #[arg(long, value_name = "AGENT_NAME")]
        exclude_agent: Vec<String>,

        #[arg(long, value_name = "0.0..1.0")]
        min_confidence: Option<f64>,

        /// Delay after the last change before re-analyzing
        #[arg(long, value_name = "MILLISECONDS")]
        debounce_ms: Option<u64>,

        #[arg(short, long, value_name = "PATH_TO_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Run an analysis, persist the full JSON report, and gate on severity
    Report {
        /// Paths to analyze; defaults to the current directory
        paths: Vec<PathBuf>,

        /// Report file name; the .json extension is added automatically
        #[arg(short, long, default_value = "vigil-report")]
        output: PathBuf,

        /// Exit non-zero when any issue at or above this severity remains
        #[arg(long, value_name = "SEVERITY")]
        fail_on: Option<String>,

        #[arg(long, value_name = "AGENT_NAME")]
        exclude_agent: Vec<String>,

        #[arg(long, value_name = "0.0..1.0")]
        min_confidence: Option<f64>,

        #[arg(short, long, value_name = "PATH_TO_CONFIG")]
        config: Option<PathBuf>,
    },
    /// List registered agents and the dimensions they cover
    Agents {
        /// Show the full entry for one agent
        #[arg(short, long, value_name = "AGENT_NAME")]
        details: Option<String>,

        /// Only agents covering this dimension
        #[arg(long, value_name = "DIMENSION")]
        dimension: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => match initialize_config_file(None) {
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error during initialization: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Analyze {
            paths,
            format,
            output,
            fix,
            exclude_agent,
            min_confidence,
            fail_fast,
            config,
        } => {
            let overrides = CliOverrides {
                paths: if paths.is_empty() { None } else { Some(paths) },
                exclude_agents: if exclude_agent.is_empty() {
                    None
                } else {
                    Some(exclude_agent)
                },
                min_confidence,
                fail_fast,
                fix,
                format,
                debounce_ms: None,
            };
            let config = load_config(overrides, config);

            let mut report = run_analysis(&config);
            if config.fix {
                apply_fixes(&mut report);
            }

            if let Err(e) = output::generate_report(&report, &config.format, output) {
                eprintln!("Error generating report: {}", e);
                std::process::exit(1);
            }
            std::process::exit(report.exit_code());
        }

        Commands::Watch {
            paths,
            fix,
            exclude_agent,
            min_confidence,
            debounce_ms,
            config,
        } => {
            let overrides = CliOverrides {
                paths: if paths.is_empty() { None } else { Some(paths) },
                exclude_agents: if exclude_agent.is_empty() {
                    None
                } else {
                    Some(exclude_agent)
                },
                min_confidence,
                fail_fast: false,
                fix,
                format: None,
                debounce_ms,
            };
            let config = load_config(overrides, config);

            if let Err(e) = watch::run_watch(&config) {
                eprintln!("Error during watch: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Report {
            paths,
            output,
            fail_on,
            exclude_agent,
            min_confidence,
            config,
        } => {
            let fail_on = fail_on.map(|s| match s.parse::<Severity>() {
                Ok(severity) => severity,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    eprintln!("Acceptable values: critical, high, medium, low, info");
                    std::process::exit(1);
                }
            });

            let overrides = CliOverrides {
                paths: if paths.is_empty() { None } else { Some(paths) },
                exclude_agents: if exclude_agent.is_empty() {
                    None
                } else {
                    Some(exclude_agent)
                },
                min_confidence,
                fail_fast: false,
                fix: false,
                format: Some("json".to_string()),
                debounce_ms: None,
            };
            let config = load_config(overrides, config);

            let report = run_analysis(&config);
            if let Err(e) = output::generate_report(&report, &config.format, Some(output)) {
                eprintln!("Error generating report: {}", e);
                std::process::exit(1);
            }

            if let Some(severity) = fail_on {
                let blocking = report.summary.count_at_or_above(severity);
                if blocking > 0 {
                    eprintln!(
                        "Gate failed: {} issue(s) at or above {} severity",
                        blocking, severity
                    );
                    std::process::exit(1);
                }
            }
        }

        Commands::Agents { details, dimension } => {
            let config = Config::default();
            let mut engine = AnalysisEngine::new(&config);
            engine.register_built_in_agents();
            let registry = engine.registry();

            if let Some(agent_name) = details {
                match registry.get(&agent_name) {
                    Some(agent) => println!("{}", agent),
                    None => {
                        eprintln!("Error: Agent '{}' not found.", agent_name);
                        std::process::exit(1);
                    }
                }
                return;
            }

            let agents = if let Some(dimension) = &dimension {
                println!("\nAgents covering dimension: {}", dimension);
                registry.get_by_dimension(dimension)
            } else {
                println!("\nRegistered agents ({}):", registry.count());
                registry.get_all()
            };

            for agent in agents {
                println!(
                    "  {:<16} {}",
                    agent.name(),
                    agent.dimensions().join(", ")
                );
            }
        }
    }
}

fn run_analysis(config: &Config) -> Report {
    let mut engine = AnalysisEngine::new(config);
    engine.register_built_in_agents();

    match engine.analyze() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error during analysis: {}", e);
            std::process::exit(1);
        }
    }
}

/// Runs the fixer over the report's active findings and folds the
/// result back into the summary the exit code is computed from.
fn apply_fixes(report: &mut Report) {
    let issues: Vec<Issue> = report
        .active_findings()
        .map(|f| f.issue.clone())
        .collect();
    let summary = AutoFixer::new().apply(&issues);
    if summary.total > 0 {
        println!(
            "Fixes: {} applied, {} failed, {} skipped ({}ms)",
            summary.fixed, summary.failed, summary.skipped, summary.duration_ms
        );
    }
    report.summary.fixed = summary.fixed;
}
