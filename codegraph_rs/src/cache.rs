//! Incremental-scan cache: file hash → segment-hash set.
//!
//! The cache file is process-local and written atomically. Its lifecycle is
//! owned by the orchestrator: cleared after a failure once the store was
//! reachable (cache and store must not diverge), preserved when the store was
//! never reached so the next run can still scan incrementally.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Environment variable to override the cache base directory.
const CACHE_DIR_ENV: &str = "CODEGRAPH_CACHE_DIR";

/// Cache file name inside the per-project cache directory.
pub const CACHE_FILE: &str = "index-cache.json";

/// Global cache base directory.
///
/// Priority: `CODEGRAPH_CACHE_DIR`, then the platform cache dir, then the OS
/// temp dir for minimal/container environments.
pub fn cache_base_dir() -> PathBuf {
    if let Ok(custom) = std::env::var(CACHE_DIR_ENV) {
        let custom = custom.trim();
        if !custom.is_empty() {
            return PathBuf::from(custom);
        }
    }
    if let Some(cache_dir) = dirs::cache_dir() {
        return cache_dir.join("codegraph");
    }
    std::env::temp_dir().join("codegraph")
}

/// Per-project cache directory: `<base>/projects/<sha256-prefix>/`.
pub fn project_cache_dir(root: &Path) -> PathBuf {
    let canonical = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    let project_id: String = format!("{digest:x}").chars().take(16).collect();
    cache_base_dir().join("projects").join(project_id)
}

/// SHA-256 hex of arbitrary content, used for file and segment hashes.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheEntry {
    file_hash: String,
    #[serde(default)]
    segment_hashes: HashSet<String>,
}

/// On-disk shape of the cache file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    entries: HashMap<String, CacheEntry>,
    /// Last successful save, for cache-age diagnostics.
    #[serde(default = "chrono::Utc::now")]
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl Default for CacheDocument {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            updated_at: chrono::Utc::now(),
        }
    }
}

/// In-memory cache handle bound to its file path.
#[derive(Debug)]
pub struct IndexCache {
    path: PathBuf,
    document: CacheDocument,
}

impl IndexCache {
    /// Load the cache for a project root; missing or corrupt files yield an
    /// empty cache rather than an error.
    pub fn load(project_root: &Path) -> Self {
        let path = project_cache_dir(project_root).join(CACHE_FILE);
        let document = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();
        Self { path, document }
    }

    /// An empty cache at an explicit path (tests, temp dirs).
    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            document: CacheDocument::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.document.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.document.entries.len()
    }

    /// True when the file's content hash matches the cached one.
    pub fn is_unchanged(&self, file_path: &str, file_hash: &str) -> bool {
        self.document
            .entries
            .get(file_path)
            .map(|e| e.file_hash == file_hash)
            .unwrap_or(false)
    }

    pub fn segment_hashes(&self, file_path: &str) -> Option<&HashSet<String>> {
        self.document
            .entries
            .get(file_path)
            .map(|e| &e.segment_hashes)
    }

    pub fn update_file(
        &mut self,
        file_path: &str,
        file_hash: &str,
        segment_hashes: impl IntoIterator<Item = String>,
    ) {
        self.document.entries.insert(
            file_path.to_string(),
            CacheEntry {
                file_hash: file_hash.to_string(),
                segment_hashes: segment_hashes.into_iter().collect(),
            },
        );
    }

    pub fn remove_file(&mut self, file_path: &str) {
        self.document.entries.remove(file_path);
    }

    /// Persist the cache. A half-written cache file is worse than none (it
    /// would silently skip changed files), so the document goes to a sibling
    /// temp file, is synced, and only then renamed over the real path.
    pub fn save(&mut self) -> io::Result<()> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| io::Error::other("cache path has no parent directory"))?;
        std::fs::create_dir_all(dir)?;

        self.document.updated_at = chrono::Utc::now();
        let json = serde_json::to_vec_pretty(&self.document)
            .map_err(|e| io::Error::other(format!("cache serialization failed: {e}")))?;

        let mut tmp = tempfile::Builder::new()
            .suffix(".cache.tmp")
            .tempfile_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Drop the in-memory entries and delete the cache file.
    pub fn clear(&mut self) -> io::Result<()> {
        self.document.entries.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_cache(dir: &TempDir) -> IndexCache {
        IndexCache::at_path(dir.path().join(CACHE_FILE))
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
        assert_eq!(content_hash("abc").len(), 64);
    }

    #[test]
    fn unchanged_detection() {
        let dir = TempDir::new().unwrap();
        let mut cache = temp_cache(&dir);
        cache.update_file("/src/a.ts", "hash1", vec!["seg1".to_string()]);

        assert!(cache.is_unchanged("/src/a.ts", "hash1"));
        assert!(!cache.is_unchanged("/src/a.ts", "hash2"));
        assert!(!cache.is_unchanged("/src/other.ts", "hash1"));
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CACHE_FILE);
        let mut cache = IndexCache::at_path(path.clone());
        cache.update_file("/src/a.ts", "h1", vec!["s1".to_string(), "s2".to_string()]);
        cache.save().unwrap();

        let reloaded = {
            let content = std::fs::read_to_string(&path).unwrap();
            let document: CacheDocument = serde_json::from_str(&content).unwrap();
            IndexCache {
                path,
                document,
            }
        };
        assert!(reloaded.is_unchanged("/src/a.ts", "h1"));
        assert_eq!(reloaded.segment_hashes("/src/a.ts").unwrap().len(), 2);
    }

    #[test]
    fn corrupt_cache_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CACHE_FILE);
        std::fs::write(&path, "{not json").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let document: CacheDocument =
            serde_json::from_str(&content).unwrap_or_default();
        assert!(document.entries.is_empty());
    }

    #[test]
    fn clear_removes_file_and_entries() {
        let dir = TempDir::new().unwrap();
        let mut cache = temp_cache(&dir);
        cache.update_file("/src/a.ts", "h1", vec![]);
        cache.save().unwrap();
        assert!(cache.path().exists());

        cache.clear().unwrap();
        assert!(cache.is_empty());
        assert!(!cache.path().exists());
        // clearing twice is fine
        cache.clear().unwrap();
    }

    #[test]
    fn remove_file_drops_entry() {
        let dir = TempDir::new().unwrap();
        let mut cache = temp_cache(&dir);
        cache.update_file("/src/a.ts", "h1", vec![]);
        cache.remove_file("/src/a.ts");
        assert!(cache.is_empty());
    }
}
