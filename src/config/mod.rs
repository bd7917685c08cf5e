use crate::output::ReportFormat;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_CONTENT: &str = r#"# vigil.toml

# Paths to include in the analysis.
# If omitted, it defaults to ["."]
# paths = ["src"]

# Paths to exclude from the analysis.
# These can be directories (including subdirectories) or specific files.
# exclude = ["target", "node_modules", "vendor", "dist", ".git"]

# Explicitly exclude agents by name.
# Run `vigil agents` to see all registered agent names.
# exclude_agents = ["coverage"]

# Findings whose confidence falls below this threshold are marked as
# false positives: kept in the report for audit, excluded from counts.
# min_confidence = 0.5

# Abort the whole run on the first agent failure instead of recovering
# with a synthetic finding. Intended for strict CI use.
# fail_fast = false

# Apply safe automatic fixes after analysis.
# fix = false

# Output format for the report.
# Options: "json", "md" (or "markdown"), "summary", "sarif"
# format = "summary"

# Watch mode: delay after the last change event before a file is analyzed.
# debounce_ms = 500
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<PathBuf>,
    #[serde(default)]
    pub exclude_agents: Vec<String>,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default)]
    pub fail_fast: bool,
    #[serde(default)]
    pub fix: bool,
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_exclude() -> Vec<PathBuf> {
    vec![
        PathBuf::from("target"),
        PathBuf::from("node_modules"),
        PathBuf::from("vendor"),
        PathBuf::from("dist"),
        PathBuf::from(".git"),
    ]
}

fn default_min_confidence() -> f64 {
    0.5
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Config {
            paths: Vec::new(),
            exclude: default_exclude(),
            exclude_agents: Vec::new(),
            min_confidence: default_min_confidence(),
            fail_fast: false,
            fix: false,
            format: ReportFormat::default(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Config {
    /// Paths to analyze, falling back to the current directory.
    pub fn effective_paths(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.paths.clone()
        }
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub paths: Option<Vec<PathBuf>>,
    pub exclude_agents: Option<Vec<String>>,
    pub min_confidence: Option<f64>,
    pub fail_fast: bool,
    pub fix: bool,
    pub format: Option<String>,
    pub debounce_ms: Option<u64>,
}

pub fn load_config(overrides: CliOverrides, config_path: Option<PathBuf>) -> Config {
    let default_path = PathBuf::from("vigil.toml");
    let config_path = config_path.unwrap_or(default_path);

    let config = if !config_path.exists() {
        Config::default()
    } else {
        let content = match fs::read_to_string(&config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!(
                    "Error reading config file '{}': {}",
                    config_path.display(),
                    e
                );
                std::process::exit(1);
            }
        };
        match toml::from_str::<Config>(&content) {
            Ok(config) => config,
            Err(e) => {
                eprintln!(
                    "Error parsing config file '{}': {}",
                    config_path.display(),
                    e
                );
                std::process::exit(1);
            }
        }
    };

    // CLI agent exclusions extend the config file list.
    let final_exclude_agents = {
        let mut from_config = config.exclude_agents.clone();
        if let Some(cli_exclusions) = overrides.exclude_agents {
            from_config.extend(cli_exclusions);
        }
        from_config
    };

    Config {
        paths: overrides.paths.unwrap_or(config.paths),
        exclude: config.exclude,
        exclude_agents: final_exclude_agents,
        min_confidence: overrides
            .min_confidence
            .unwrap_or(config.min_confidence)
            .clamp(0.0, 1.0),
        fail_fast: overrides.fail_fast || config.fail_fast,
        fix: overrides.fix || config.fix,
        format: overrides.format.map_or(config.format, |s| {
            s.parse().unwrap_or_else(|e| {
                eprintln!("Warning: {}. Using default format.", e);
                ReportFormat::default()
            })
        }),
        debounce_ms: overrides.debounce_ms.unwrap_or(config.debounce_ms),
    }
}

pub fn initialize_config_file(config_path_override: Option<&Path>) -> Result<(), String> {
    let default_path = Path::new("vigil.toml");
    let config_path = config_path_override.unwrap_or(default_path);

    if config_path.exists() {
        println!("INFO: '{}' already exists.", config_path.display());
        Ok(())
    } else {
        println!(
            "Creating default config file at '{}'",
            config_path.display()
        );
        match fs::File::create(config_path) {
            Ok(mut file) => match file.write_all(DEFAULT_CONFIG_CONTENT.as_bytes()) {
                Ok(_) => {
                    println!(
                        "SUCCESS: Created default '{}' configuration file.",
                        config_path.display()
                    );
                    Ok(())
                }
                Err(e) => Err(format!(
                    "Error writing to '{}': {}",
                    config_path.display(),
                    e
                )),
            },
            Err(e) => Err(format!("Error creating '{}': {}", config_path.display(), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG_CONTENT).unwrap();
        assert_eq!(config.min_confidence, 0.5);
        assert_eq!(config.debounce_ms, 500);
        assert!(!config.fail_fast);
    }

    #[test]
    fn test_documented_format_values_parse() {
        let config: Config = toml::from_str("format = \"json\"").unwrap();
        assert!(matches!(config.format, ReportFormat::Json));
        let config: Config = toml::from_str("format = \"md\"").unwrap();
        assert!(matches!(config.format, ReportFormat::Markdown));
        let config: Config = toml::from_str("format = \"summary\"").unwrap();
        assert!(matches!(config.format, ReportFormat::Summary));
        let config: Config = toml::from_str("format = \"sarif\"").unwrap();
        assert!(matches!(config.format, ReportFormat::Sarif));

        assert!(toml::from_str::<Config>("format = \"pdf\"").is_err());
    }

    #[test]
    fn test_effective_paths_fallback() {
        let config = Config::default();
        assert_eq!(config.effective_paths(), vec![PathBuf::from(".")]);
    }
}
