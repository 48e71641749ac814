//! Workspace-level quality report: one pass over the extracted graph and
//! the source files, feeding every analyzer and the composite score.

use std::collections::HashSet;

use serde::Serialize;

use crate::classify::language_key;
use crate::reachability::ReachabilityConfig;
use crate::types::{Node, RelKind, Relationship, SyntaxNode};

use super::complexity::{cyclomatic_complexity, function_length};
use super::deadcode::{
    FileUnreachable, UnusedFunction, analyze_unreachable, find_orphaned_nodes,
    find_unused_functions,
};
use super::score::{QualityScore, quality_score};
use super::unused_imports::{UnusedImport, find_unused_imports};

/// One source file handed to the analyzers.
pub struct FileInput {
    pub path: String,
    pub content: String,
    /// Syntax tree when the parser produced one; reachability and
    /// complexity are skipped for files without.
    pub tree: Option<SyntaxNode>,
}

/// Unused imports grouped per file.
#[derive(Debug, Clone, Serialize)]
pub struct FileUnusedImports {
    pub file: String,
    pub imports: Vec<UnusedImport>,
}

/// The assembled report.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub files: usize,
    pub code_lines: usize,
    pub avg_cyclomatic: f64,
    pub unused_functions: Vec<UnusedFunction>,
    pub orphaned_nodes: Vec<Node>,
    pub unreachable: Vec<FileUnreachable>,
    pub unused_imports: Vec<FileUnusedImports>,
    pub score: QualityScore,
}

impl QualityReport {
    /// Total findings across every category.
    pub fn finding_count(&self) -> usize {
        self.unused_functions.len()
            + self.orphaned_nodes.len()
            + self
                .unreachable
                .iter()
                .map(|f| f.findings.len())
                .sum::<usize>()
            + self
                .unused_imports
                .iter()
                .map(|f| f.imports.len())
                .sum::<usize>()
    }
}

/// Run every quality analyzer over one workspace's graph and sources.
pub fn analyze_workspace(
    nodes: &[Node],
    relationships: &[Relationship],
    files: &[FileInput],
    exported: &HashSet<String>,
    config: &ReachabilityConfig,
) -> QualityReport {
    let unused_functions = find_unused_functions(nodes, relationships, exported);
    let orphaned_nodes = find_orphaned_nodes(nodes, relationships);

    let trees: Vec<(String, SyntaxNode)> = files
        .iter()
        .filter_map(|f| f.tree.clone().map(|tree| (f.path.clone(), tree)))
        .collect();
    let unreachable = analyze_unreachable(&trees, config);

    let mut unused_imports = Vec::new();
    for file in files {
        let Some(lang) = language_key(&file.path) else {
            continue;
        };
        let imports = find_unused_imports(&file.content, lang);
        if !imports.is_empty() {
            unused_imports.push(FileUnusedImports {
                file: file.path.clone(),
                imports,
            });
        }
    }

    let code_lines: usize = files.iter().map(|f| function_length(&f.content)).sum();
    let avg_cyclomatic = if trees.is_empty() {
        1.0
    } else {
        trees
            .iter()
            .map(|(_, tree)| cyclomatic_complexity(tree))
            .sum::<usize>() as f64
            / trees.len() as f64
    };

    // Structural coverage: share of callables with a TESTED_BY edge.
    let tested: HashSet<&str> = relationships
        .iter()
        .filter(|r| r.kind == RelKind::TestedBy)
        .map(|r| r.from_id.as_str())
        .collect();
    let callables: Vec<&Node> = nodes.iter().filter(|n| n.kind.is_callable()).collect();
    let coverage = if callables.is_empty() {
        0.0
    } else {
        callables
            .iter()
            .filter(|n| tested.contains(n.id.as_str()))
            .count() as f64
            * 100.0
            / callables.len() as f64
    };

    let documented_files = files
        .iter()
        .filter(|f| is_well_documented(&f.content))
        .count();
    let well_documented = !files.is_empty() && documented_files * 2 >= files.len();

    let score = quality_score(avg_cyclomatic.round() as usize, coverage, well_documented);

    QualityReport {
        files: files.len(),
        code_lines,
        avg_cyclomatic,
        unused_functions,
        orphaned_nodes,
        unreachable,
        unused_imports,
        score,
    }
}

/// At least a tenth of non-blank lines are comments.
///
/// `function_length` already excludes comments, so the comment share falls
/// out of the difference.
pub fn is_well_documented(content: &str) -> bool {
    let non_blank = content.lines().filter(|l| !l.trim().is_empty()).count();
    if non_blank == 0 {
        return false;
    }
    let code = function_length(content);
    let comments = non_blank.saturating_sub(code);
    comments * 10 >= non_blank
}
