//! On-disk catalog snapshot
//!
//! A snapshot records every descriptor file seen by a scan, its content
//! hash, and the parse outcome. It is keyed by scan root, glob pattern and
//! [`SNAPSHOT_VERSION`], so a snapshot written by a different build or for a
//! different tree is never picked up.
//!
//! The registry only trusts a snapshot after re-hashing every listed file
//! and checking that no file was added or removed.

use super::descriptor::{DescriptorError, content_hash};
use sciquorum_domain::ToolDescriptor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Bumped whenever the snapshot layout or descriptor schema changes
pub const SNAPSHOT_VERSION: &str = concat!("1:", env!("CARGO_PKG_VERSION"));

/// One descriptor file as seen by a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub path: PathBuf,
    pub hash: String,
    #[serde(flatten)]
    pub outcome: SnapshotOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOutcome {
    Parsed(ToolDescriptor),
    Rejected(DescriptorError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub version: String,
    pub root: PathBuf,
    pub pattern: String,
    /// Sorted by path
    pub entries: Vec<SnapshotEntry>,
}

impl CatalogSnapshot {
    pub fn new(root: &Path, pattern: &str, entries: Vec<SnapshotEntry>) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            root: root.to_path_buf(),
            pattern: pattern.to_string(),
            entries,
        }
    }
}

/// Directory of catalog snapshots
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    dir: PathBuf,
}

impl SnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default location: `$XDG_CACHE_HOME/sciquorum/catalog`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|d| d.join("sciquorum").join("catalog"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot file for a scan root and pattern
    pub fn path_for(&self, root: &Path, pattern: &str) -> PathBuf {
        let key = format!("{}\n{}\n{}", root.display(), pattern, SNAPSHOT_VERSION);
        let digest = content_hash(key.as_bytes());
        self.dir.join(format!("catalog-{}.json", &digest[..16]))
    }

    /// Load the snapshot for `root`/`pattern`, if one exists and matches.
    ///
    /// An unreadable or mismatched snapshot is treated as absent.
    pub fn load(&self, root: &Path, pattern: &str) -> Option<CatalogSnapshot> {
        let path = self.path_for(root, pattern);
        let content = std::fs::read_to_string(&path).ok()?;
        let snapshot: CatalogSnapshot = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable catalog snapshot");
                return None;
            }
        };
        if snapshot.version != SNAPSHOT_VERSION
            || snapshot.root != root
            || snapshot.pattern != pattern
        {
            debug!(path = %path.display(), "Catalog snapshot key mismatch");
            return None;
        }
        Some(snapshot)
    }

    /// Write a snapshot atomically (temp file + rename).
    pub fn save(&self, snapshot: &CatalogSnapshot) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&snapshot.root, &snapshot.pattern);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(snapshot).map_err(std::io::Error::other)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), entries = snapshot.entries.len(), "Catalog snapshot saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sciquorum_domain::InvocationMode;

    fn sample(root: &Path) -> CatalogSnapshot {
        let descriptor = ToolDescriptor::new("t", InvocationMode::Library, "t::run");
        CatalogSnapshot::new(
            root,
            "**/SKILL.md",
            vec![
                SnapshotEntry {
                    path: root.join("a/SKILL.md"),
                    hash: "aa".to_string(),
                    outcome: SnapshotOutcome::Parsed(descriptor),
                },
                SnapshotEntry {
                    path: root.join("b/SKILL.md"),
                    hash: "bb".to_string(),
                    outcome: SnapshotOutcome::Rejected(DescriptorError::MissingFrontMatter),
                },
            ],
        )
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("cache"));
        let root = dir.path().join("tools");
        let snapshot = sample(&root);

        let written = cache.save(&snapshot).unwrap();
        assert!(written.exists());
        assert_eq!(cache.load(&root, "**/SKILL.md"), Some(snapshot));
    }

    #[test]
    fn test_key_includes_root_and_pattern() {
        let cache = SnapshotCache::new("/cache");
        let a = cache.path_for(Path::new("/a"), "**/SKILL.md");
        assert_ne!(a, cache.path_for(Path::new("/b"), "**/SKILL.md"));
        assert_ne!(a, cache.path_for(Path::new("/a"), "**/*.md"));
        assert_eq!(a, cache.path_for(Path::new("/a"), "**/SKILL.md"));
    }

    #[test]
    fn test_corrupt_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path());
        let root = Path::new("/tools");
        std::fs::write(cache.path_for(root, "*.md"), "{not json").unwrap();
        assert!(cache.load(root, "*.md").is_none());
    }

    #[test]
    fn test_missing_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path());
        assert!(cache.load(Path::new("/nowhere"), "*.md").is_none());
    }
}
