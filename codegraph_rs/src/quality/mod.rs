//! Quality analysis: complexity metrics, dead code, unused imports, scores.
//!
//! # Submodules
//!
//! - [`complexity`] - cyclomatic/cognitive complexity, nesting, length
//! - [`deadcode`] - unused functions, orphaned nodes, unreachable code
//! - [`unused_imports`] - per-language unused-import detection
//! - [`score`] - composite quality score
//! - [`report`] - whole-workspace report feeding every analyzer

pub mod complexity;
pub mod deadcode;
pub mod report;
pub mod score;
pub mod unused_imports;

pub use complexity::{
    cognitive_complexity, cyclomatic_complexity, function_length, nesting_depth, parameter_count,
};
pub use deadcode::{
    FileUnreachable, UnusedFunction, analyze_unreachable, find_orphaned_nodes,
    find_unused_functions,
};
pub use report::{FileInput, QualityReport, analyze_workspace};
pub use score::{QualityScore, complexity_score, quality_score};
pub use unused_imports::{ParsedImport, UnusedImport, find_unused_imports, parse_imports};
