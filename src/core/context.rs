use crate::core::source_model::{is_test_path, SourceModel, SourceModelProvider};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "js", "jsx", "ts", "tsx", "py", "go", "java", "c", "cc", "cpp", "h", "hpp", "sol",
];

/// Everything agents may consult beyond the file under analysis:
/// project root, the full parsed file set, test files, and declared
/// dependencies. Built once per run and shared read-only.
#[derive(Debug)]
pub struct ProjectContext {
    pub root: PathBuf,
    pub files: Vec<SourceModel>,
    pub test_files: Vec<PathBuf>,
    pub dependencies: Vec<String>,
    /// Files the provider could not parse, skipped with a warning.
    pub skipped: Vec<(PathBuf, String)>,
}

impl ProjectContext {
    pub fn load(
        paths: &[PathBuf],
        exclude: &[PathBuf],
        provider: &dyn SourceModelProvider,
    ) -> Result<Self, String> {
        let root = detect_project_root(paths);

        let mut file_paths = Vec::new();
        for path in paths {
            collect_files(path, exclude, &mut file_paths)?;
        }
        file_paths.sort();
        file_paths.dedup();

        // Parse each file exactly once; the models are shared by every
        // agent. This phase is read-only, so it parallelizes safely.
        let parsed: Vec<(PathBuf, Result<SourceModel, String>)> = file_paths
            .par_iter()
            .map(|path| {
                let result = fs::read_to_string(path)
                    .map_err(|e| format!("read failed: {}", e))
                    .and_then(|content| provider.parse(path, &content));
                (path.clone(), result)
            })
            .collect();

        let mut files = Vec::new();
        let mut skipped = Vec::new();
        for (path, result) in parsed {
            match result {
                Ok(model) => files.push(model),
                Err(e) => skipped.push((path, e)),
            }
        }

        let test_files = files
            .iter()
            .filter(|f| f.is_test_file())
            .map(|f| f.path.clone())
            .collect();

        let dependencies = read_declared_dependencies(&root);

        Ok(Self {
            root,
            files,
            test_files,
            dependencies,
            skipped,
        })
    }

    pub fn file(&self, path: &Path) -> Option<&SourceModel> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn is_test_file(&self, path: &Path) -> bool {
        self.test_files.iter().any(|p| p == path)
    }
}

/// Walk up from the first scope path looking for project markers.
fn detect_project_root(paths: &[PathBuf]) -> PathBuf {
    let start = paths
        .first()
        .map(|p| {
            if p.is_dir() {
                p.clone()
            } else {
                p.parent().map(Path::to_path_buf).unwrap_or_else(|| p.clone())
            }
        })
        .unwrap_or_else(|| PathBuf::from("."));

    let mut current = start.clone();
    loop {
        if current.join("Cargo.toml").exists()
            || current.join("package.json").exists()
            || current.join(".git").exists()
        {
            return current;
        }
        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => break,
        }
    }
    start
}

fn collect_files(
    path: &Path,
    exclude: &[PathBuf],
    out: &mut Vec<PathBuf>,
) -> Result<(), String> {
    if is_excluded(path, exclude) {
        return Ok(());
    }
    if path.is_dir() {
        let entries =
            fs::read_dir(path).map_err(|e| format!("Failed to read directory: {}", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| format!("Failed to read directory entry: {}", e))?;
            collect_files(&entry.path(), exclude, out)?;
        }
    } else if path.is_file() && is_source_file(path) {
        out.push(path.to_path_buf());
    }
    Ok(())
}

fn is_excluded(path: &Path, exclude: &[PathBuf]) -> bool {
    exclude.iter().any(|ex| {
        path.ends_with(ex) || path.components().any(|c| c.as_os_str() == ex.as_os_str())
    })
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Declared dependency names from Cargo.toml or package.json, best effort.
fn read_declared_dependencies(root: &Path) -> Vec<String> {
    let mut deps = Vec::new();

    if let Ok(content) = fs::read_to_string(root.join("Cargo.toml")) {
        if let Ok(value) = content.parse::<toml::Table>() {
            for key in ["dependencies", "dev-dependencies"] {
                if let Some(table) = value.get(key).and_then(|v| v.as_table()) {
                    deps.extend(table.keys().cloned());
                }
            }
        }
    }

    if let Ok(content) = fs::read_to_string(root.join("package.json")) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&content) {
            for key in ["dependencies", "devDependencies"] {
                if let Some(map) = value.get(key).and_then(|v| v.as_object()) {
                    deps.extend(map.keys().cloned());
                }
            }
        }
    }

    deps.sort();
    deps.dedup();
    deps
}
