//! Configuration file support.
//!
//! Loads optional `.codegraph/config.toml` from the workspace root.

use serde::Deserialize;
use std::path::Path;

use crate::validator::ValidatorConfig;

/// Analysis bounds for the reachability walk and dead-code passes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub max_analysis_depth: usize,
    pub max_analysis_time_ms: u64,
    pub unreachable_file_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_analysis_depth: crate::reachability::DEFAULT_MAX_ANALYSIS_DEPTH,
            max_analysis_time_ms: crate::reachability::DEFAULT_MAX_ANALYSIS_TIME_MS,
            unreachable_file_limit: crate::quality::deadcode::UNREACHABLE_FILE_LIMIT,
        }
    }
}

/// Scan filtering overrides.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    /// Extra glob patterns excluded from scanning.
    pub exclude: Vec<String>,
    /// Extra file extensions to include.
    pub extensions: Vec<String>,
}

/// Root configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CodegraphConfig {
    pub validator: ValidatorConfig,
    pub analysis: AnalysisConfig,
    pub scan: ScanSection,
    /// Extra framework sources never reported as unused imports.
    pub framework_allow_list: Vec<String>,
}

impl CodegraphConfig {
    /// Load from `.codegraph/config.toml` in the given root.
    /// Returns defaults when the file is missing or invalid.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(".codegraph").join("config.toml");
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("[codegraph][warn] failed to parse {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[codegraph][warn] failed to read {}: {e}", path.display());
                Self::default()
            }
        }
    }
}
