//! Dead-code detection over extracted graph entities and syntax trees.
//!
//! - unused functions: callable nodes with no CALLED_BY / TESTED_BY edges
//! - orphaned nodes: entities with no incident edges at all
//! - unreachable code: scope-stack walk per file, bounded per call

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::classify::is_test_function_name;
use crate::reachability::{ReachabilityConfig, ReachabilityContext, UnreachableNode};
use crate::types::{Node, NodeKind, RelKind, Relationship, SyntaxNode};

/// Files examined per unreachable-analysis call.
pub const UNREACHABLE_FILE_LIMIT: usize = 50;

/// A callable nobody calls or tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedFunction {
    pub node_id: String,
    pub name: String,
    pub file_path: String,
    pub line: usize,
}

/// Unreachable findings for one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUnreachable {
    pub file_path: String,
    pub findings: Vec<UnreachableNode>,
}

/// Callable nodes with zero CALLED_BY and zero TESTED_BY edges, excluding
/// exported symbols and test-harness names.
pub fn find_unused_functions(
    nodes: &[Node],
    relationships: &[Relationship],
    exported: &HashSet<String>,
) -> Vec<UnusedFunction> {
    let mut referenced: HashSet<&str> = HashSet::new();
    for rel in relationships {
        match rel.kind {
            // reverse edges originate at the callee/target
            RelKind::CalledBy | RelKind::TestedBy => {
                referenced.insert(rel.from_id.as_str());
            }
            // forward edges arrive at the target; either direction counts
            RelKind::Calls | RelKind::Tests => {
                referenced.insert(rel.to_id.as_str());
            }
            _ => {}
        }
    }

    nodes
        .iter()
        .filter(|n| n.kind.is_callable())
        .filter(|n| !referenced.contains(n.id.as_str()))
        .filter(|n| !exported.contains(&n.name))
        .filter(|n| !is_test_function_name(&n.name))
        .map(|n| UnusedFunction {
            node_id: n.id.clone(),
            name: n.name.clone(),
            file_path: n.file_path.clone(),
            line: n.start_line,
        })
        .collect()
}

/// Entities with no incident edges in either direction.
pub fn find_orphaned_nodes(nodes: &[Node], relationships: &[Relationship]) -> Vec<Node> {
    let mut degree: HashMap<&str, usize> = HashMap::new();
    for rel in relationships {
        *degree.entry(rel.from_id.as_str()).or_default() += 1;
        *degree.entry(rel.to_id.as_str()).or_default() += 1;
    }

    nodes
        .iter()
        .filter(|n| {
            matches!(
                n.kind,
                NodeKind::Function | NodeKind::Method | NodeKind::Class | NodeKind::Variable
            )
        })
        .filter(|n| degree.get(n.id.as_str()).copied().unwrap_or(0) == 0)
        .cloned()
        .collect()
}

/// Unreachable-code pass over up to [`UNREACHABLE_FILE_LIMIT`] files.
pub fn analyze_unreachable(
    files: &[(String, SyntaxNode)],
    config: &ReachabilityConfig,
) -> Vec<FileUnreachable> {
    files
        .iter()
        .take(UNREACHABLE_FILE_LIMIT)
        .filter_map(|(file_path, tree)| {
            let context = ReachabilityContext::new(config.clone());
            let (findings, _stats) = context.analyze(tree);
            if findings.is_empty() {
                None
            } else {
                Some(FileUnreachable {
                    file_path: file_path.clone(),
                    findings,
                })
            }
        })
        .collect()
}
