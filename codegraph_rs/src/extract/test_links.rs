//! TESTS edges: link test blocks to the source blocks they exercise.
//!
//! Detection is import-driven: a test block's imports are matched against the
//! batch, skipping imports that point at test frameworks. A symbol match is
//! high confidence (90); a whole-file overlap is the fallback (70).

use std::collections::HashSet;

use crate::types::{CodeBlock, ImportInfo, RelKind, RelMetadata, Relationship};

use super::block_node_id;
use super::imports::resolve_import_path;

/// Import sources that are test harnesses, not code under test.
/// Matched case-insensitively by prefix against each path segment.
const TEST_FRAMEWORK_PATTERNS: &[&str] = &[
    "vitest",
    "jest",
    "mocha",
    "jasmine",
    "ava",
    "tape",
    "testing-library",
    "pytest",
    "unittest",
    "nose",
    "testify",
    "ginkgo",
    "junit",
    "testng",
    "nunit",
    "xunit",
    "mstest",
    "rspec",
    "minitest",
    "phpunit",
    "pest",
    "xctest",
    "testing",
];

const CONFIDENCE_SYMBOL: u8 = 90;
const CONFIDENCE_FILE: u8 = 70;

/// True when the import source names a test framework rather than a target.
pub fn is_test_framework_source(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    let trimmed = lower.trim_start_matches('@');
    TEST_FRAMEWORK_PATTERNS.iter().any(|pattern| {
        trimmed.starts_with(pattern)
            || trimmed
                .split(['/', '.'])
                .any(|segment| segment.starts_with(pattern))
    })
}

/// TESTS edges for one test block.
pub fn test_relationships(
    block: &CodeBlock,
    from_id: &str,
    batch: &[CodeBlock],
    workspace_root: &str,
) -> Vec<Relationship> {
    let Some(test_meta) = &block.test_metadata else {
        return Vec::new();
    };
    if !test_meta.is_test {
        return Vec::new();
    }

    let known_files: HashSet<&str> = batch.iter().map(|b| b.file_path.as_str()).collect();
    let mut rels = Vec::new();

    for import in &block.imports {
        if is_test_framework_source(&import.source) {
            continue;
        }
        let resolved = resolve_import_path(
            &block.file_path,
            &import.source,
            workspace_root,
            &known_files,
        );

        for target in batch {
            if target.file_path == block.file_path {
                continue;
            }
            let symbol_match = target
                .identifier
                .as_deref()
                .map(|id| import.symbols.iter().any(|s| s == id))
                .unwrap_or(false);
            let file_match = file_overlaps(&target.file_path, import, resolved.as_deref());

            let confidence = if symbol_match {
                CONFIDENCE_SYMBOL
            } else if file_match {
                CONFIDENCE_FILE
            } else {
                continue;
            };

            let target_identifier = target
                .identifier
                .clone()
                .unwrap_or_else(|| target.file_path.clone());
            rels.push(
                Relationship::new(from_id, block_node_id(target), RelKind::Tests).with_metadata(
                    RelMetadata::Tests {
                        confidence,
                        detection_method: "import".to_string(),
                        test_framework: test_meta.test_framework.clone(),
                        test_type: test_meta.test_type.clone(),
                        target_identifier,
                    },
                ),
            );
        }
    }

    rels
}

/// Whole-file overlap between a target path and an import source.
fn file_overlaps(target_path: &str, import: &ImportInfo, resolved: Option<&str>) -> bool {
    if let Some(resolved) = resolved {
        if target_path == resolved {
            return true;
        }
    }
    let cleaned = import
        .source
        .trim_start_matches("./")
        .trim_start_matches("../");
    if cleaned.is_empty() {
        return false;
    }
    let stem = match target_path.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => target_path,
    };
    stem.ends_with(cleaned) || stem.contains(&format!("/{cleaned}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestMetadata;

    fn source_block(path: &str, ident: &str, btype: &str, start: usize) -> CodeBlock {
        CodeBlock {
            file_path: path.to_string(),
            identifier: Some(ident.to_string()),
            block_type: Some(btype.to_string()),
            start_line: start,
            end_line: start + 5,
            ..Default::default()
        }
    }

    fn test_block(path: &str, imports: Vec<ImportInfo>) -> CodeBlock {
        CodeBlock {
            file_path: path.to_string(),
            identifier: Some("suite".into()),
            block_type: Some("function_declaration".into()),
            start_line: 1,
            end_line: 40,
            imports,
            test_metadata: Some(TestMetadata {
                is_test: true,
                test_framework: Some("vitest".into()),
                test_type: Some("unit".into()),
            }),
            ..Default::default()
        }
    }

    fn import(source: &str, symbols: &[&str]) -> ImportInfo {
        ImportInfo {
            source: source.to_string(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            is_default: false,
            is_dynamic: false,
            alias: None,
        }
    }

    #[test]
    fn framework_sources_are_skipped() {
        assert!(is_test_framework_source("vitest"));
        assert!(is_test_framework_source("@testing-library/react"));
        assert!(is_test_framework_source("node:test/testing"));
        assert!(is_test_framework_source("JUnit5"));
        assert!(is_test_framework_source("org.junit.jupiter"));
        assert!(!is_test_framework_source("./calculator"));
        assert!(!is_test_framework_source("@/src/api"));
        // prefix, not substring: "protest" is not the pest framework
        assert!(!is_test_framework_source("protest"));
    }

    #[test]
    fn symbol_match_gets_high_confidence() {
        let target = source_block("/src/calc.ts", "add", "function_declaration", 3);
        let tester = test_block(
            "/src/calc.test.ts",
            vec![import("vitest", &["describe"]), import("./calc", &["add"])],
        );
        let batch = vec![tester.clone(), target];

        let rels = test_relationships(&batch[0], "function:/src/calc.test.ts:1", &batch, "/");
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].kind, RelKind::Tests);
        let meta = rels[0].metadata.as_ref().unwrap().to_value();
        assert_eq!(meta["confidence"], 90);
        assert_eq!(meta["detectionMethod"], "import");
        assert_eq!(meta["testFramework"], "vitest");
        assert_eq!(meta["targetIdentifier"], "add");
    }

    #[test]
    fn file_overlap_gets_fallback_confidence() {
        let target = source_block("/src/calc.ts", "subtract", "function_declaration", 9);
        let tester = test_block("/src/calc.test.ts", vec![import("./calc", &["missing"])]);
        let batch = vec![tester.clone(), target];

        let rels = test_relationships(&batch[0], "function:/src/calc.test.ts:1", &batch, "/");
        assert_eq!(rels.len(), 1);
        let meta = rels[0].metadata.as_ref().unwrap().to_value();
        assert_eq!(meta["confidence"], 70);
    }

    #[test]
    fn non_test_blocks_emit_nothing() {
        let target = source_block("/src/calc.ts", "add", "function_declaration", 3);
        let mut not_test = test_block("/src/calc.test.ts", vec![import("./calc", &["add"])]);
        not_test.test_metadata = Some(TestMetadata {
            is_test: false,
            ..Default::default()
        });
        let batch = vec![not_test.clone(), target];
        assert!(test_relationships(&batch[0], "x", &batch, "/").is_empty());
    }

    #[test]
    fn framework_only_imports_emit_nothing() {
        let target = source_block("/src/calc.ts", "add", "function_declaration", 3);
        let tester = test_block("/src/calc.test.ts", vec![import("vitest", &["describe"])]);
        let batch = vec![tester.clone(), target];
        assert!(test_relationships(&batch[0], "x", &batch, "/").is_empty());
    }

    #[test]
    fn same_file_blocks_are_not_targets() {
        let helper = CodeBlock {
            file_path: "/src/calc.test.ts".into(),
            identifier: Some("add".into()),
            block_type: Some("function_declaration".into()),
            start_line: 50,
            end_line: 55,
            ..Default::default()
        };
        let tester = test_block("/src/calc.test.ts", vec![import("./calc", &["add"])]);
        let batch = vec![tester.clone(), helper];
        assert!(test_relationships(&batch[0], "x", &batch, "/").is_empty());
    }
}
