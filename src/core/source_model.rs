use std::path::{Path, PathBuf};

/// Abstract node categories every language adapter maps onto.
/// Dimension logic reasons over these, never over a concrete
/// parser's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Function,
    Branch,
    Loop,
    Call,
    Block,
    Import,
    Comment,
    StringLiteral,
}

#[derive(Debug, Clone)]
pub struct SourceNode {
    pub kind: NodeKind,
    pub name: Option<String>,
    /// Byte offset of the node's first character.
    pub offset: usize,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct SourceModel {
    pub path: PathBuf,
    pub content: String,
    nodes: Vec<SourceNode>,
    line_offsets: Vec<usize>,
}

impl SourceModel {
    pub fn path_str(&self) -> String {
        self.path.display().to_string()
    }

    /// 1-based line and column for a byte offset.
    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        let line_idx = match self.line_offsets.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        (line_idx + 1, offset - self.line_offsets[line_idx] + 1)
    }

    /// 1-based line content, without the trailing newline.
    pub fn line(&self, line: usize) -> Option<&str> {
        if line == 0 || line > self.line_offsets.len() {
            return None;
        }
        let start = self.line_offsets[line - 1];
        // The final line has no successor offset; its slice runs to the
        // end of the content and may still carry the terminator.
        let end = self
            .line_offsets
            .get(line)
            .map(|o| o - 1)
            .unwrap_or(self.content.len());
        let text = &self.content[start..end];
        let text = text.strip_suffix('\n').unwrap_or(text);
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }

    pub fn nodes(&self) -> &[SourceNode] {
        &self.nodes
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &SourceNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// Walk every node in source order.
    pub fn visit<F>(&self, mut callback: F)
    where
        F: FnMut(&SourceNode, usize),
    {
        for node in &self.nodes {
            callback(node, node.depth);
        }
    }

    pub fn is_test_file(&self) -> bool {
        is_test_path(&self.path)
    }
}

pub fn is_test_path(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let in_test_dir = path.components().any(|c| {
        matches!(
            c.as_os_str().to_str(),
            Some("test") | Some("tests") | Some("__tests__")
        )
    });
    in_test_dir
        || name.starts_with("test_")
        || name.contains("_test.")
        || name.contains(".test.")
        || name.contains(".spec.")
}

/// Supplies one shared syntax abstraction per file for all agents in a run.
pub trait SourceModelProvider: Send + Sync {
    fn parse(&self, path: &Path, content: &str) -> Result<SourceModel, String>;
}

/// Built-in brace/keyword scanner. Language-agnostic on purpose: it
/// recognizes the abstract categories well enough for structural and
/// textual dimensions without a real grammar.
#[derive(Debug, Default)]
pub struct TextSourceModelProvider;

const FUNCTION_KEYWORDS: &[&str] = &["fn", "function", "def"];
const BRANCH_KEYWORDS: &[&str] = &["if", "match", "switch", "case", "catch"];
const LOOP_KEYWORDS: &[&str] = &["for", "while", "loop"];
const IMPORT_KEYWORDS: &[&str] = &["use", "import", "from", "require", "include"];

impl SourceModelProvider for TextSourceModelProvider {
    fn parse(&self, path: &Path, content: &str) -> Result<SourceModel, String> {
        if content.contains('\0') {
            return Err(format!("{}: binary content", path.display()));
        }

        let mut line_offsets = vec![0usize];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                line_offsets.push(i + 1);
            }
        }
        // A trailing newline opens no new line.
        if content.ends_with('\n') && line_offsets.len() > 1 {
            line_offsets.pop();
        }

        let mut nodes = Vec::new();
        let mut depth = 0usize;
        let mut in_block_comment = false;

        for (line_idx, offset) in line_offsets.iter().copied().enumerate() {
            let end = line_offsets
                .get(line_idx + 1)
                .map(|o| o - 1)
                .unwrap_or(content.len());
            let raw = &content[offset..end];
            let trimmed = raw.trim_start();
            let line = line_idx + 1;
            let indent = raw.len() - trimmed.len();

            if in_block_comment {
                nodes.push(SourceNode {
                    kind: NodeKind::Comment,
                    name: None,
                    offset,
                    line,
                    depth,
                });
                if trimmed.contains("*/") {
                    in_block_comment = false;
                }
                continue;
            }

            if trimmed.starts_with("//") || trimmed.starts_with('#') || trimmed.starts_with('*') {
                nodes.push(SourceNode {
                    kind: NodeKind::Comment,
                    name: None,
                    offset,
                    line,
                    depth,
                });
                continue;
            }
            if trimmed.starts_with("/*") {
                nodes.push(SourceNode {
                    kind: NodeKind::Comment,
                    name: None,
                    offset,
                    line,
                    depth,
                });
                if !trimmed.contains("*/") {
                    in_block_comment = true;
                }
                continue;
            }

            let words: Vec<&str> = trimmed
                .split(|c: char| !c.is_alphanumeric() && c != '_')
                .filter(|w| !w.is_empty())
                .collect();

            if let Some(first) = words.first() {
                if IMPORT_KEYWORDS.contains(first) {
                    nodes.push(SourceNode {
                        kind: NodeKind::Import,
                        name: import_target(trimmed),
                        offset: offset + indent,
                        line,
                        depth,
                    });
                }
            }

            let mut declared_fn: Option<String> = None;
            for (i, word) in words.iter().enumerate() {
                if FUNCTION_KEYWORDS.contains(word) {
                    let name = words.get(i + 1).map(|s| s.to_string());
                    declared_fn = name.clone();
                    nodes.push(SourceNode {
                        kind: NodeKind::Function,
                        name,
                        offset: offset + indent,
                        line,
                        depth,
                    });
                } else if BRANCH_KEYWORDS.contains(word) {
                    nodes.push(SourceNode {
                        kind: NodeKind::Branch,
                        name: None,
                        offset: offset + indent,
                        line,
                        depth,
                    });
                } else if LOOP_KEYWORDS.contains(word) {
                    nodes.push(SourceNode {
                        kind: NodeKind::Loop,
                        name: None,
                        offset: offset + indent,
                        line,
                        depth,
                    });
                }
            }

            // Call sites: identifier immediately followed by '('.
            let bytes = trimmed.as_bytes();
            let mut word_start = None;
            for (i, &b) in bytes.iter().enumerate() {
                if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
                    if word_start.is_none() {
                        word_start = Some(i);
                    }
                } else {
                    if let Some(start) = word_start {
                        if b == b'(' {
                            let callee = &trimmed[start..i];
                            let tail = callee.rsplit('.').next().unwrap_or(callee);
                            if !FUNCTION_KEYWORDS.contains(&tail)
                                && !BRANCH_KEYWORDS.contains(&tail)
                                && !LOOP_KEYWORDS.contains(&tail)
                                && declared_fn.as_deref() != Some(tail)
                            {
                                nodes.push(SourceNode {
                                    kind: NodeKind::Call,
                                    name: Some(callee.to_string()),
                                    offset: offset + indent + start,
                                    line,
                                    depth,
                                });
                            }
                        }
                    }
                    word_start = None;
                }
            }

            // String literals, skipping escaped quotes.
            let mut in_string = false;
            let mut string_start = 0usize;
            let mut prev = b' ';
            for (i, &b) in bytes.iter().enumerate() {
                if b == b'"' && prev != b'\\' {
                    if in_string {
                        nodes.push(SourceNode {
                            kind: NodeKind::StringLiteral,
                            name: Some(trimmed[string_start + 1..i].to_string()),
                            offset: offset + indent + string_start,
                            line,
                            depth,
                        });
                        in_string = false;
                    } else {
                        in_string = true;
                        string_start = i;
                    }
                }
                prev = b;
            }

            for &b in bytes {
                match b {
                    b'{' => {
                        nodes.push(SourceNode {
                            kind: NodeKind::Block,
                            name: None,
                            offset: offset + indent,
                            line,
                            depth,
                        });
                        depth += 1;
                    }
                    b'}' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
        }

        Ok(SourceModel {
            path: path.to_path_buf(),
            content: content.to_string(),
            nodes,
            line_offsets,
        })
    }
}

/// Whether a line is an import statement in any supported syntax.
pub fn is_import_line(line: &str) -> bool {
    line.trim_start()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .find(|w| !w.is_empty())
        .map(|first| IMPORT_KEYWORDS.contains(&first))
        .unwrap_or(false)
}

/// The module or path an import statement names.
pub fn import_target(line: &str) -> Option<String> {
    let rest = line.split_whitespace().skip(1).collect::<Vec<_>>().join(" ");
    let target = rest
        .trim_end_matches(';')
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    if target.is_empty() {
        None
    } else {
        Some(target.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(code: &str) -> SourceModel {
        TextSourceModelProvider
            .parse(Path::new("sample.rs"), code)
            .unwrap()
    }

    #[test]
    fn test_offset_to_line_col() {
        let model = parse("fn main() {\n    let x = 1;\n}\n");
        assert_eq!(model.offset_to_line_col(0), (1, 1));
        assert_eq!(model.offset_to_line_col(12), (2, 1));
        assert_eq!(model.offset_to_line_col(16), (2, 5));
        assert_eq!(model.line_count(), 3);
        assert_eq!(model.line(2), Some("    let x = 1;"));
    }

    #[test]
    fn test_last_line_excludes_trailing_newline() {
        let model = parse("let a = 1;\nlet b = 2;   \n");
        assert_eq!(model.line(2), Some("let b = 2;   "));

        let unterminated = parse("fn f() {}");
        assert_eq!(unterminated.line(1), Some("fn f() {}"));
    }

    #[test]
    fn test_function_and_branch_nodes() {
        let model = parse("fn compute(x: u32) {\n    if x > 1 {\n        run();\n    }\n}\n");
        let functions: Vec<_> = model.nodes_of_kind(NodeKind::Function).collect();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name.as_deref(), Some("compute"));

        assert_eq!(model.nodes_of_kind(NodeKind::Branch).count(), 1);
        let calls: Vec<_> = model.nodes_of_kind(NodeKind::Call).collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name.as_deref(), Some("run"));
        assert_eq!(calls[0].depth, 2);
    }

    #[test]
    fn test_imports_and_comments() {
        let model = parse("// header\nuse std::fmt;\nimport \"./util\";\n");
        assert_eq!(model.nodes_of_kind(NodeKind::Comment).count(), 1);
        let imports: Vec<_> = model.nodes_of_kind(NodeKind::Import).collect();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].name.as_deref(), Some("std::fmt"));
        assert_eq!(imports[1].name.as_deref(), Some("./util"));
    }

    #[test]
    fn test_binary_content_is_parse_error() {
        let result = TextSourceModelProvider.parse(Path::new("blob.bin"), "a\0b");
        assert!(result.is_err());
    }

    #[test]
    fn test_test_path_detection() {
        assert!(is_test_path(Path::new("src/tests/api.rs")));
        assert!(is_test_path(Path::new("src/parser_test.rs")));
        assert!(is_test_path(Path::new("web/app.spec.ts")));
        assert!(!is_test_path(Path::new("src/parser.rs")));
    }
}
