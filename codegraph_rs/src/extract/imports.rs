//! Import-path resolution for IMPORTS edges and call-target lookup.
//!
//! Only `./`, `../`, and `@/` prefixes resolve locally; bare specifiers are
//! external packages and resolve to nothing. Resolution is lexical (no
//! filesystem access): candidates are checked against the batch's known file
//! set, and when nothing matches the first extension-suffixed candidate is
//! returned as a best guess.

use std::collections::HashSet;

use crate::types::{ImportInfo, RelMetadata, Relationship, RelKind, Node};

/// Extension candidates tried in order when a specifier has no extension.
pub const CANDIDATE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "vue", "svelte", "py", "rs", "go", "java", "c", "cpp", "cs",
    "dart", "kt", "swift", "rb", "php",
];

/// Resolve an import specifier to a workspace file path.
///
/// `known_files` is the set of file paths present in the current batch.
/// Returns `None` for bare (external) specifiers.
pub fn resolve_import_path(
    importer_path: &str,
    source: &str,
    workspace_root: &str,
    known_files: &HashSet<&str>,
) -> Option<String> {
    let base = if let Some(rest) = source.strip_prefix("@/") {
        join_normalized(workspace_root, rest)
    } else if source.starts_with("./") || source.starts_with("../") {
        let dir = parent_dir(importer_path);
        join_normalized(&dir, source)
    } else {
        return None;
    };

    // Specifier already carries an extension.
    if has_candidate_extension(&base) {
        return Some(base);
    }

    let mut first_candidate = None;
    for ext in CANDIDATE_EXTENSIONS {
        let candidate = format!("{base}.{ext}");
        if known_files.contains(candidate.as_str()) {
            return Some(candidate);
        }
        if first_candidate.is_none() {
            first_candidate = Some(candidate);
        }
    }
    first_candidate
}

/// IMPORTS edges for one block: one edge per import entry, pointing at the
/// import placeholder id for that (file, source) pair.
pub fn import_relationships(from_id: &str, file_path: &str, imports: &[ImportInfo]) -> Vec<Relationship> {
    imports
        .iter()
        .map(|import| {
            Relationship::new(
                from_id,
                Node::import_id(file_path, &import.source),
                RelKind::Imports,
            )
            .with_metadata(RelMetadata::Imports {
                source: import.source.clone(),
                symbols: import.symbols.clone(),
                is_default: import.is_default,
            })
        })
        .collect()
}

fn has_candidate_extension(path: &str) -> bool {
    match path.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && CANDIDATE_EXTENSIONS.contains(&ext),
        None => false,
    }
}

fn parent_dir(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}

/// Lexical join with `.`/`..` segment handling; always forward slashes.
fn join_normalized(base: &str, rel: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    let absolute = base.starts_with('/');
    for segment in rel.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
