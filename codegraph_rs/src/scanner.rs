//! Workspace scanning: walk files, skip unchanged ones, emit parsed blocks.
//!
//! Parsing itself stays behind the [`BlockParser`] seam; the tree-sitter
//! grammars are loaded by the host. [`LineBlockParser`] is the fallback used
//! by tests and offline runs: one block per file, no symbol extraction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cache::{IndexCache, content_hash};
use crate::errors::IndexError;
use crate::extract::imports::CANDIDATE_EXTENSIONS;
use crate::types::{CodeBlock, SyntaxNode};

/// Directories never worth scanning.
const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/target/**",
    "**/.git/**",
    "**/dist/**",
    "**/build/**",
    "**/vendor/**",
    "**/__pycache__/**",
    "**/.venv/**",
];

/// Parser seam: file content → indexable blocks (and optionally a syntax
/// tree for the quality analyzers).
pub trait BlockParser: Send + Sync {
    fn parse(&self, file_path: &str, content: &str) -> Result<Vec<CodeBlock>, IndexError>;

    fn syntax_tree(&self, _file_path: &str, _content: &str) -> Option<SyntaxNode> {
        None
    }
}

/// Whole-file fallback parser: one block per file with content hashes.
#[derive(Default)]
pub struct LineBlockParser;

impl BlockParser for LineBlockParser {
    fn parse(&self, file_path: &str, content: &str) -> Result<Vec<CodeBlock>, IndexError> {
        let line_count = content.lines().count().max(1);
        let hash = content_hash(content);
        Ok(vec![CodeBlock {
            file_path: file_path.to_string(),
            identifier: None,
            block_type: Some("source_file".to_string()),
            start_line: 1,
            end_line: line_count,
            content: content.to_string(),
            file_hash: hash.clone(),
            segment_hash: hash,
            ..Default::default()
        }])
    }

    /// Flat per-line tree for the reachability and complexity passes.
    ///
    /// Terminator keywords only count at column zero: an indented `return`
    /// sits inside some unseen nested scope, and flagging everything after
    /// it would drown the report in false positives.
    fn syntax_tree(&self, _file_path: &str, content: &str) -> Option<SyntaxNode> {
        let total = content.lines().count().max(1);
        let mut children = Vec::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let top_level = !raw.starts_with([' ', '\t']);
            let kind = if line.starts_with("//") || line.starts_with('#') || line.starts_with("--")
            {
                "comment"
            } else if top_level && line.starts_with("return") {
                "return_statement"
            } else if top_level && (line.starts_with("throw") || line.starts_with("raise")) {
                "throw_statement"
            } else if top_level && line.starts_with("break") {
                "break_statement"
            } else if top_level && line.starts_with("continue") {
                "continue_statement"
            } else if line.starts_with("if ") || line.starts_with("if(") {
                "if_statement"
            } else if line.starts_with("for ") || line.starts_with("for(") {
                "for_statement"
            } else if line.starts_with("while ") || line.starts_with("while(") {
                "while_statement"
            } else {
                "expression_statement"
            };
            children.push(SyntaxNode::new(kind, idx + 1, idx + 1).with_text(line));
        }
        Some(SyntaxNode::new("source_file", 1, total).with_children(children))
    }
}

/// Parsed blocks for one file, plus the hash used for cache bookkeeping.
#[derive(Debug, Clone)]
pub struct FileBlocks {
    pub file_path: String,
    pub file_hash: String,
    pub blocks: Vec<CodeBlock>,
}

/// Scan counters reported to the orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub blocks_found: usize,
}

/// Scan configuration.
#[derive(Clone)]
pub struct ScanConfig {
    pub extensions: HashSet<String>,
    pub exclude_patterns: Vec<String>,
    /// 0 = unlimited.
    pub max_files: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        let mut extensions: HashSet<String> =
            CANDIDATE_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        for extra in ["css", "scss", "html", "json", "yaml", "yml", "toml", "sol", "lua", "scala"] {
            extensions.insert(extra.to_string());
        }
        Self {
            extensions,
            exclude_patterns: Vec::new(),
            max_files: 0,
        }
    }
}

/// Workspace scanner bound to a root and a parser.
pub struct Scanner {
    root: PathBuf,
    config: ScanConfig,
    parser: Arc<dyn BlockParser>,
    excludes: GlobSet,
}

impl Scanner {
    pub fn new(
        root: impl Into<PathBuf>,
        config: ScanConfig,
        parser: Arc<dyn BlockParser>,
    ) -> Result<Self, IndexError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in DEFAULT_EXCLUDES
            .iter()
            .map(|p| p.to_string())
            .chain(config.exclude_patterns.iter().cloned())
        {
            let glob = Glob::new(&pattern).map_err(|e| {
                IndexError::Configuration(format!("bad exclude pattern '{pattern}': {e}"))
            })?;
            builder.add(glob);
        }
        let excludes = builder
            .build()
            .map_err(|e| IndexError::Configuration(format!("exclude set: {e}")))?;
        Ok(Self {
            root: root.into(),
            config,
            parser,
            excludes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the workspace and parse every candidate file.
    ///
    /// In incremental mode files whose content hash matches the cache are
    /// skipped. The cache is updated for every file that parses; the caller
    /// owns persisting it. The cancel flag stops the walk between files.
    pub fn scan(
        &self,
        cache: &mut IndexCache,
        incremental: bool,
        cancel: &AtomicBool,
    ) -> Result<(Vec<FileBlocks>, ScanStats), IndexError> {
        let mut stats = ScanStats::default();
        let mut results = Vec::new();

        for entry in WalkDir::new(&self.root).follow_links(false) {
            if cancel.load(Ordering::SeqCst) {
                debug!("scan cancelled after {} files", stats.files_scanned);
                break;
            }
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("[codegraph][warn] walk error: {e}");
                    stats.files_failed += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if self.excludes.is_match(path) {
                continue;
            }
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !self.config.extensions.contains(&ext.to_ascii_lowercase()) {
                continue;
            }
            if self.config.max_files > 0 && stats.files_scanned >= self.config.max_files {
                break;
            }

            let file_path = path.to_string_lossy().to_string();
            let content = match std::fs::read_to_string(path) {
                Ok(c) => c,
                Err(e) => {
                    warn!("[codegraph][warn] unreadable file {file_path}: {e}");
                    stats.files_failed += 1;
                    continue;
                }
            };

            let file_hash = content_hash(&content);
            if incremental && cache.is_unchanged(&file_path, &file_hash) {
                stats.files_skipped += 1;
                continue;
            }

            let blocks = match self.parser.parse(&file_path, &content) {
                Ok(blocks) => blocks,
                Err(e) => {
                    warn!("[codegraph][warn] parse failed for {file_path}: {e}");
                    stats.files_failed += 1;
                    continue;
                }
            };

            stats.files_scanned += 1;
            stats.blocks_found += blocks.len();
            cache.update_file(
                &file_path,
                &file_hash,
                blocks.iter().map(|b| b.segment_hash.clone()),
            );
            results.push(FileBlocks {
                file_path,
                file_hash,
                blocks,
            });
        }

        Ok((results, stats))
    }
}
