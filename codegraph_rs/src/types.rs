//! Core types for the code knowledge graph.
//!
//! This module defines the fundamental data structures used throughout the
//! indexer:
//! - [`CodeBlock`] - Parser output consumed by the extractor (not owned here)
//! - [`Node`] / [`Relationship`] - Property-graph entities persisted downstream
//! - [`NodeKind`] / [`RelKind`] - The closed semantic taxonomy
//! - [`RelMetadata`] - Per-relationship-type payload as a tagged union
//! - [`SyntaxNode`] - Lightweight syntax tree for reachability and metrics

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Semantic classification of an indexable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Function,
    Class,
    Method,
    Interface,
    Variable,
    Import,
    File,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Function => "function",
            NodeKind::Class => "class",
            NodeKind::Method => "method",
            NodeKind::Interface => "interface",
            NodeKind::Variable => "variable",
            NodeKind::Import => "import",
            NodeKind::File => "file",
        }
    }

    /// True for kinds that can carry callable semantics.
    pub fn is_callable(&self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Method)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship types persisted to the graph store. Reverse directions are
/// synthesized from their forward counterparts, never extracted directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelKind {
    Calls,
    CalledBy,
    Imports,
    Defines,
    Contains,
    Extends,
    ExtendedBy,
    Implements,
    ImplementedBy,
    Tests,
    TestedBy,
    HasType,
    AcceptsType,
    ReturnsType,
}

impl RelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelKind::Calls => "CALLS",
            RelKind::CalledBy => "CALLED_BY",
            RelKind::Imports => "IMPORTS",
            RelKind::Defines => "DEFINES",
            RelKind::Contains => "CONTAINS",
            RelKind::Extends => "EXTENDS",
            RelKind::ExtendedBy => "EXTENDED_BY",
            RelKind::Implements => "IMPLEMENTS",
            RelKind::ImplementedBy => "IMPLEMENTED_BY",
            RelKind::Tests => "TESTS",
            RelKind::TestedBy => "TESTED_BY",
            RelKind::HasType => "HAS_TYPE",
            RelKind::AcceptsType => "ACCEPTS_TYPE",
            RelKind::ReturnsType => "RETURNS_TYPE",
        }
    }

    /// The synthesized reverse direction, where one exists.
    pub fn reverse(&self) -> Option<RelKind> {
        match self {
            RelKind::Calls => Some(RelKind::CalledBy),
            RelKind::Tests => Some(RelKind::TestedBy),
            RelKind::Extends => Some(RelKind::ExtendedBy),
            RelKind::Implements => Some(RelKind::ImplementedBy),
            _ => None,
        }
    }
}

impl std::fmt::Display for RelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An import statement attached to a block by the parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportInfo {
    /// Module specifier as written (`./utils`, `@/lib/api`, `lodash`).
    pub source: String,
    /// Imported symbol names (empty for side-effect imports).
    #[serde(default)]
    pub symbols: Vec<String>,
    /// True for default imports.
    #[serde(default)]
    pub is_default: bool,
    /// True for `import(...)` style dynamic imports.
    #[serde(default)]
    pub is_dynamic: bool,
    /// Local alias, if renamed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// A call site attached to a block by the parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallInfo {
    /// Called function or method name.
    pub callee_name: String,
    /// Call flavor: "function", "method", "static_method", "constructor".
    pub call_type: String,
    /// 1-based line of the call site.
    pub line: usize,
    /// 0-based column of the call site.
    pub column: usize,
    /// Receiver expression for method calls (`user.save()` → `user`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Qualifier for static calls (`Math.max()` → `Math`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

/// Inheritance facts recorded by the parser for class-like blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolMetadata {
    /// Parent class name, possibly qualified or generic (`a.b.Base<T>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Implemented interface names.
    #[serde(default)]
    pub implements: Vec<String>,
    /// True for abstract classes.
    #[serde(default)]
    pub is_abstract: bool,
}

/// Test detection facts recorded by the parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestMetadata {
    /// True if the block is test code.
    #[serde(default)]
    pub is_test: bool,
    /// Detected framework ("vitest", "pytest", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_framework: Option<String>,
    /// "unit", "integration", "e2e".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_type: Option<String>,
}

/// One parameter in an LSP-provided signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    pub type_string: String,
    #[serde(default)]
    pub is_optional: bool,
}

/// Signature shape reported by the language server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignatureInfo {
    #[serde(default)]
    pub parameters: Vec<ParameterInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

/// Type/signature payload consumed from the language server when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LspTypeInfo {
    /// False when no server answered; type edges are skipped.
    #[serde(default)]
    pub lsp_available: bool,
    /// Declared type of the block itself (variables, fields).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_info: Option<String>,
    /// Signature of function-like blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_info: Option<SignatureInfo>,
}

/// A parsed, indexable unit produced by the tree-sitter parser layer.
///
/// The extractor consumes these read-only; it never constructs them outside
/// of tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Workspace-relative or absolute path; must be non-empty.
    pub file_path: String,
    /// Declared name, if the grammar exposed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Raw tree-sitter node type string ("function_declaration", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
    /// 1-based inclusive line bounds, `start_line <= end_line`.
    pub start_line: usize,
    pub end_line: usize,
    /// Source text of the block.
    #[serde(default)]
    pub content: String,
    /// Content hash of the whole file (incremental-scan key).
    #[serde(default)]
    pub file_hash: String,
    /// Content hash of this segment.
    #[serde(default)]
    pub segment_hash: String,
    #[serde(default)]
    pub imports: Vec<ImportInfo>,
    #[serde(default)]
    pub calls: Vec<CallInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_metadata: Option<SymbolMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_metadata: Option<TestMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lsp_type_info: Option<LspTypeInfo>,
}

impl CodeBlock {
    /// Line-bound sanity check; blocks failing it are dropped with a log.
    pub fn has_valid_range(&self) -> bool {
        self.start_line >= 1 && self.start_line <= self.end_line
    }

    /// True when another block of the same file is strictly nested in this
    /// one's line range.
    pub fn strictly_contains(&self, other: &CodeBlock) -> bool {
        self.file_path == other.file_path
            && other.start_line >= self.start_line
            && other.end_line <= self.end_line
            && !(other.start_line == self.start_line && other.end_line == self.end_line)
    }
}

/// A property-graph node. The `id` is a deterministic string so re-indexing
/// the same content upserts rather than duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub name: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Node {
    /// Id for a code block: `{kind}:{filePath}:{startLine}`.
    pub fn block_id(kind: NodeKind, file_path: &str, start_line: usize) -> String {
        format!("{}:{}:{}", kind.as_str(), file_path, start_line)
    }

    /// Id for a file node: `file:{filePath}`.
    pub fn file_id(file_path: &str) -> String {
        format!("file:{}", file_path)
    }

    /// Id for an import placeholder: `import:{filePath}:{importSource}`.
    pub fn import_id(file_path: &str, source: &str) -> String {
        format!("import:{}:{}", file_path, source)
    }

    /// Synthetic name for blocks without an identifier:
    /// `{blockType}_{fileBasename}_L{start}-{end}`.
    pub fn synthetic_name(
        block_type: Option<&str>,
        kind: NodeKind,
        file_path: &str,
        start_line: usize,
        end_line: usize,
    ) -> String {
        let basename = Path::new(file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_path);
        let type_label = block_type.filter(|t| !t.is_empty()).unwrap_or(kind.as_str());
        format!("{}_{}_L{}-{}", type_label, basename, start_line, end_line)
    }
}

/// Per-relationship-type metadata payload.
///
/// Serializes untagged: each variant flattens to the plain JSON map the graph
/// store expects. `Opaque` keeps the door open for payloads this crate does
/// not model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelMetadata {
    Imports {
        source: String,
        symbols: Vec<String>,
        #[serde(rename = "isDefault")]
        is_default: bool,
    },
    Calls {
        #[serde(rename = "callType")]
        call_type: String,
        line: usize,
        column: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        receiver: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        qualifier: Option<String>,
    },
    Tests {
        confidence: u8,
        #[serde(rename = "detectionMethod")]
        detection_method: String,
        #[serde(rename = "testFramework", skip_serializing_if = "Option::is_none")]
        test_framework: Option<String>,
        #[serde(rename = "testType", skip_serializing_if = "Option::is_none")]
        test_type: Option<String>,
        #[serde(rename = "targetIdentifier")]
        target_identifier: String,
    },
    TypeRef {
        #[serde(rename = "typeString")]
        type_string: String,
        source: String,
        #[serde(rename = "isOptional", skip_serializing_if = "Option::is_none")]
        is_optional: Option<bool>,
        #[serde(rename = "parameterName", skip_serializing_if = "Option::is_none")]
        parameter_name: Option<String>,
    },
    Extends {
        #[serde(rename = "parentClass")]
        parent_class: String,
        #[serde(rename = "isAbstract")]
        is_abstract: bool,
    },
    Implements {
        interface: String,
    },
    Opaque(serde_json::Map<String, serde_json::Value>),
}

impl RelMetadata {
    /// The serialized map shape handed to the metadata validator.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// A directed, typed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_id: String,
    pub to_id: String,
    pub kind: RelKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RelMetadata>,
}

impl Relationship {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, kind: RelKind) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            kind,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: RelMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Synthesized reverse edge: endpoints swapped, metadata shared.
    pub fn reversed(&self) -> Option<Relationship> {
        self.kind.reverse().map(|kind| Relationship {
            from_id: self.to_id.clone(),
            to_id: self.from_id.clone(),
            kind,
            metadata: self.metadata.clone(),
        })
    }
}

/// Counters returned by batch index operations; also embedded in batch
/// failure errors so partial progress is never silently lost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCounts {
    pub nodes_created: usize,
    pub relationships_created: usize,
}

/// Lightweight owned syntax tree standing in for a tree-sitter node.
///
/// The grammar binaries stay external; the parser seam hands these to the
/// reachability analyzer and the quality metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxNode {
    /// Node type string ("if_statement", "return_statement", ...).
    pub kind: String,
    /// Source text of the node (may be truncated by the parser).
    #[serde(default)]
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
    /// True for named grammar nodes, false for punctuation/anonymous.
    #[serde(default = "default_named")]
    pub named: bool,
    #[serde(default)]
    pub children: Vec<SyntaxNode>,
}

fn default_named() -> bool {
    true
}

impl SyntaxNode {
    pub fn new(kind: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            kind: kind.into(),
            text: String::new(),
            start_line,
            end_line,
            named: true,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        self.children = children;
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.named = false;
        self
    }

    /// Depth-first scan for a node type anywhere in the subtree.
    pub fn contains_kind(&self, kind: &str) -> bool {
        if self.kind == kind {
            return true;
        }
        self.children.iter().any(|c| c.contains_kind(kind))
    }
}
