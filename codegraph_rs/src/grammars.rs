//! Tree-sitter grammar asset management.
//!
//! The grammar blobs are runtime-loaded binaries, not compile-time deps.
//! This module knows the expected filesystem layout, verifies the core
//! runtime blob's size window (and optionally its SHA-256), and fetches
//! missing blobs over HTTPS with bounded retries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::errors::IndexError;

/// Asset directory relative to the working tree.
pub const GRAMMAR_DIR: &str = "dist/services/tree-sitter";

/// Core runtime blob.
pub const CORE_WASM: &str = "tree-sitter.wasm";

/// Accepted size window for the core blob.
pub const CORE_WASM_MIN_BYTES: u64 = 170 * 1024;
pub const CORE_WASM_MAX_BYTES: u64 = 210 * 1024;

/// Minimum language grammars for a usable install.
pub const MIN_LANGUAGE_GRAMMARS: usize = 2;

/// Download timeout per request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Redirect ceiling per request.
pub const MAX_REDIRECTS: usize = 5;

/// Backoff schedule in milliseconds; one request per entry.
pub const RETRY_SCHEDULE_MS: &[u64] = &[0, 1000, 2000];

/// Supported grammar languages. `xml` ships from a separate upstream
/// package; it is listed here because the asset layout is the same.
pub const LANGUAGES: &[&str] = &[
    "bash",
    "c",
    "c_sharp",
    "cpp",
    "css",
    "dart",
    "elixir",
    "go",
    "html",
    "java",
    "javascript",
    "json",
    "kotlin",
    "lua",
    "markdown",
    "ocaml",
    "php",
    "python",
    "ruby",
    "rust",
    "scala",
    "solidity",
    "swift",
    "toml",
    "tsx",
    "typescript",
    "vue",
    "xml",
    "yaml",
    "zig",
];

/// `tree-sitter-<lang>.wasm`
pub fn grammar_file_name(language: &str) -> String {
    format!("tree-sitter-{language}.wasm")
}

/// What is present in a grammar directory.
#[derive(Debug, Clone)]
pub struct AssetStatus {
    pub core_present: bool,
    pub core_size_ok: bool,
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl AssetStatus {
    /// Usable install: core blob in its size window plus at least two
    /// language grammars.
    pub fn is_satisfied(&self) -> bool {
        self.core_present && self.core_size_ok && self.present.len() >= MIN_LANGUAGE_GRAMMARS
    }
}

/// Inspect the asset directory.
pub fn check_assets(dir: &Path) -> AssetStatus {
    let core_path = dir.join(CORE_WASM);
    let core_present = core_path.is_file();
    let core_size_ok = core_present
        && std::fs::metadata(&core_path)
            .map(|m| (CORE_WASM_MIN_BYTES..=CORE_WASM_MAX_BYTES).contains(&m.len()))
            .unwrap_or(false);

    let mut present = Vec::new();
    let mut missing = Vec::new();
    for language in LANGUAGES {
        if dir.join(grammar_file_name(language)).is_file() {
            present.push(language.to_string());
        } else {
            missing.push(language.to_string());
        }
    }

    AssetStatus {
        core_present,
        core_size_ok,
        present,
        missing,
    }
}

/// Verify a blob against an expected SHA-256 hex digest.
pub fn verify_sha256(path: &Path, expected_hex: &str) -> Result<bool, IndexError> {
    let bytes = std::fs::read(path)
        .map_err(|e| IndexError::Configuration(format!("cannot read {}: {e}", path.display())))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = format!("{:x}", hasher.finalize());
    Ok(digest.eq_ignore_ascii_case(expected_hex))
}

/// Retry decision: network errors and 5xx retry, 4xx never does.
pub fn is_retryable_status(status: u16) -> bool {
    (500..600).contains(&status)
}

/// HTTPS client with the fetch policy applied.
pub fn build_client() -> Result<reqwest::blocking::Client, IndexError> {
    reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .https_only(true)
        .build()
        .map_err(|e| IndexError::Network(format!("http client: {e}")))
}

/// Fetch one blob with the retry schedule; writes to `dest` on success.
pub fn fetch_blob(
    client: &reqwest::blocking::Client,
    url: &str,
    dest: &Path,
) -> Result<(), IndexError> {
    let mut last_error = String::new();
    for (attempt, delay_ms) in RETRY_SCHEDULE_MS.iter().enumerate() {
        if *delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(*delay_ms));
        }
        match client.get(url).send() {
            Ok(response) => {
                let status = response.status().as_u16();
                if (200..300).contains(&status) {
                    let bytes = response
                        .bytes()
                        .map_err(|e| IndexError::Network(format!("read body: {e}")))?;
                    if let Some(parent) = dest.parent() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            IndexError::Configuration(format!("mkdir {}: {e}", parent.display()))
                        })?;
                    }
                    std::fs::write(dest, &bytes).map_err(|e| {
                        IndexError::Configuration(format!("write {}: {e}", dest.display()))
                    })?;
                    info!(url, bytes = bytes.len(), "grammar fetched");
                    return Ok(());
                }
                last_error = format!("HTTP {status} from {url}");
                if !is_retryable_status(status) {
                    return Err(IndexError::Network(last_error));
                }
                warn!(
                    "[codegraph][warn] fetch attempt {} failed: {last_error}",
                    attempt + 1
                );
            }
            Err(e) => {
                last_error = format!("request to {url} failed: {e}");
                warn!(
                    "[codegraph][warn] fetch attempt {} failed: {last_error}",
                    attempt + 1
                );
            }
        }
    }
    Err(IndexError::Network(last_error))
}

/// Fetch every missing asset from a base URL into the grammar directory.
///
/// Returns the number of blobs fetched. Failures on individual languages
/// are collected; the first error is returned only when the directory is
/// still unusable afterwards (strict mode callers check `AssetStatus`).
pub fn fetch_missing(
    client: &reqwest::blocking::Client,
    base_url: &str,
    dir: &Path,
) -> (usize, Vec<String>) {
    let status = check_assets(dir);
    let mut fetched = 0usize;
    let mut errors = Vec::new();

    if !status.core_present || !status.core_size_ok {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), CORE_WASM);
        match fetch_blob(client, &url, &dir.join(CORE_WASM)) {
            Ok(()) => fetched += 1,
            Err(e) => errors.push(e.to_string()),
        }
    }
    for language in &status.missing {
        let file = grammar_file_name(language);
        let url = format!("{}/{}", base_url.trim_end_matches('/'), file);
        match fetch_blob(client, &url, &dir.join(&file)) {
            Ok(()) => fetched += 1,
            Err(e) => errors.push(e.to_string()),
        }
    }
    (fetched, errors)
}

/// Default asset directory under a working tree.
pub fn grammar_dir(work_dir: &Path) -> PathBuf {
    work_dir.join(GRAMMAR_DIR)
}
