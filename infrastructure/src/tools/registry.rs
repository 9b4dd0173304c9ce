//! Tool Registry
//!
//! The [`ToolRegistry`] scans a directory tree for descriptor files, parses
//! them into [`ToolDescriptor`]s and serves the resulting [`Catalog`].
//!
//! # Usage
//!
//! ```ignore
//! use sciquorum_infrastructure::tools::{SnapshotCache, ToolRegistry};
//!
//! let registry = ToolRegistry::new().with_cache(SnapshotCache::new(cache_dir));
//!
//! // Trust the snapshot if every file still hashes the same, else scan
//! registry.load("skills/")?;
//!
//! let hits = registry.search("pubmed", &SearchFilter::default());
//! for error in registry.discovery_errors() {
//!     eprintln!("skipped {}", error);
//! }
//! ```
//!
//! # Catalog swaps
//!
//! The current catalog sits behind `RwLock<Arc<Catalog>>`. A scan builds a
//! complete new catalog and replaces the `Arc` in one write, so readers
//! either see the old catalog or the new one. [`refresh`](ToolRegistry::refresh)
//! only re-parses files whose mtime and content hash both changed, and keeps
//! the old `Arc` when nothing changed at all.
//!
//! # Duplicate names
//!
//! Files are processed in sorted path order. The first descriptor claiming a
//! name wins; later ones are recorded as [`DiscoveryError::DuplicateName`].

use super::descriptor::{DescriptorError, content_hash, parse_descriptor};
use super::snapshot::{CatalogSnapshot, SnapshotCache, SnapshotEntry, SnapshotOutcome};
use sciquorum_application::ports::tool_catalog::ToolCatalogPort;
use sciquorum_domain::{Catalog, CatalogStats, SearchFilter, ToolDescriptor};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default descriptor file pattern, relative to the scan root
pub const DEFAULT_DESCRIPTOR_GLOB: &str = "**/SKILL.md";

/// A descriptor file skipped during a scan. Never fatal to the scan.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscoveryError {
    #[error("{}: {source}", path.display())]
    Descriptor {
        path: PathBuf,
        source: DescriptorError,
    },

    #[error("{}: duplicate tool name '{name}' (already defined in {})", path.display(), first.display())]
    DuplicateName {
        path: PathBuf,
        name: String,
        first: PathBuf,
    },

    #[error("{}: {message}", path.display())]
    Unlistable { path: PathBuf, message: String },
}

impl DiscoveryError {
    pub fn path(&self) -> &Path {
        match self {
            DiscoveryError::Descriptor { path, .. }
            | DiscoveryError::DuplicateName { path, .. }
            | DiscoveryError::Unlistable { path, .. } => path,
        }
    }
}

/// Errors that prevent a scan from running at all
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Tool directory not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Invalid descriptor pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Registry has not been scanned yet")]
    NotDiscovered,
}

/// Outcome of a [`ToolRegistry::refresh`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub added: usize,
    pub removed: usize,
    /// Files re-parsed because their content hash changed
    pub reparsed: usize,
    /// Files whose mtime changed but content did not
    pub touched: usize,
}

impl RefreshReport {
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.reparsed == 0
    }
}

#[derive(Debug, Clone)]
struct ScanEntry {
    modified: Option<SystemTime>,
    hash: String,
    outcome: Result<Arc<ToolDescriptor>, DescriptorError>,
}

#[derive(Debug, Default)]
struct ScanState {
    root: Option<PathBuf>,
    entries: BTreeMap<PathBuf, ScanEntry>,
    errors: Vec<DiscoveryError>,
}

/// Filesystem-backed tool registry.
///
/// Construct explicitly and pass it (usually as `Arc<ToolRegistry>`) to the
/// components that need the catalog.
pub struct ToolRegistry {
    pattern: String,
    cache: Option<SnapshotCache>,
    catalog: RwLock<Arc<Catalog>>,
    state: Mutex<ScanState>,
}

impl ToolRegistry {
    /// Create an empty registry. The catalog stays empty until a scan.
    pub fn new() -> Self {
        Self {
            pattern: DEFAULT_DESCRIPTOR_GLOB.to_string(),
            cache: None,
            catalog: RwLock::new(Arc::new(Catalog::new())),
            state: Mutex::new(ScanState::default()),
        }
    }

    /// Set the descriptor glob (relative to the scan root)
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Persist and reuse catalog snapshots in `cache`
    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Root of the last scan
    pub fn root(&self) -> Option<PathBuf> {
        self.lock_state().root.clone()
    }

    // ==================== Scanning ====================

    /// Full scan of `root`: parse every descriptor file and swap in the new
    /// catalog. Zero tools is a valid outcome.
    pub fn discover(&self, root: impl AsRef<Path>) -> Result<Arc<Catalog>, RegistryError> {
        let root = root.as_ref().to_path_buf();
        let files = self.list_files(&root)?;

        let mut entries = BTreeMap::new();
        for path in files.paths {
            let entry = scan_file(&path);
            entries.insert(path, entry);
        }

        let catalog = self.install(root, entries, files.errors);
        self.save_snapshot();
        Ok(catalog)
    }

    /// Start from the cached snapshot when it still matches the tree,
    /// otherwise fall back to [`discover`](Self::discover).
    pub fn load(&self, root: impl AsRef<Path>) -> Result<Arc<Catalog>, RegistryError> {
        let root = root.as_ref().to_path_buf();
        if let Some(entries) = self.validated_snapshot(&root)? {
            info!(root = %root.display(), files = entries.len(), "Loaded tool catalog from snapshot");
            return Ok(self.install(root, entries, Vec::new()));
        }
        self.discover(root)
    }

    /// Re-scan the last root, re-parsing only files whose mtime and content
    /// hash changed. Unchanged descriptors keep their existing `Arc`s, and the
    /// catalog itself is kept when nothing was added, removed or re-parsed.
    pub fn refresh(&self) -> Result<RefreshReport, RegistryError> {
        let (root, previous) = {
            let state = self.lock_state();
            let root = state.root.clone().ok_or(RegistryError::NotDiscovered)?;
            (root, state.entries.clone())
        };
        let files = self.list_files(&root)?;

        let mut report = RefreshReport::default();
        let mut entries = BTreeMap::new();
        for path in files.paths {
            let entry = match previous.get(&path) {
                None => {
                    report.added += 1;
                    scan_file(&path)
                }
                Some(old) => {
                    let modified = modified_time(&path);
                    if modified.is_some() && modified == old.modified {
                        old.clone()
                    } else {
                        match std::fs::read(&path) {
                            Ok(bytes) if content_hash(&bytes) == old.hash => {
                                report.touched += 1;
                                ScanEntry {
                                    modified,
                                    ..old.clone()
                                }
                            }
                            Ok(bytes) => {
                                report.reparsed += 1;
                                entry_from_bytes(&path, modified, &bytes)
                            }
                            Err(e) => {
                                report.reparsed += 1;
                                ScanEntry {
                                    modified,
                                    hash: String::new(),
                                    outcome: Err(DescriptorError::Unreadable(e.to_string())),
                                }
                            }
                        }
                    }
                }
            };
            entries.insert(path, entry);
        }
        report.removed = previous.keys().filter(|p| !entries.contains_key(*p)).count();

        if report.is_noop() && files.errors.is_empty() {
            // Keep the catalog Arc; only record refreshed mtimes
            self.lock_state().entries = entries;
            debug!(root = %root.display(), touched = report.touched, "Refresh found no changes");
            return Ok(report);
        }

        info!(
            root = %root.display(),
            added = report.added,
            removed = report.removed,
            reparsed = report.reparsed,
            "Tool catalog refreshed"
        );
        self.install(root, entries, files.errors);
        self.save_snapshot();
        Ok(report)
    }

    // ==================== Queries ====================

    /// Current catalog
    pub fn catalog(&self) -> Arc<Catalog> {
        match self.catalog.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ToolDescriptor>> {
        self.catalog().get(name).cloned()
    }

    pub fn search(&self, query: &str, filter: &SearchFilter) -> Vec<Arc<ToolDescriptor>> {
        self.catalog().search(query, filter)
    }

    pub fn suggest(&self, topic: &str, limit: usize) -> Vec<Arc<ToolDescriptor>> {
        self.catalog().suggest(topic, limit)
    }

    pub fn stats(&self) -> CatalogStats {
        self.catalog().stats()
    }

    /// Files skipped by the last scan, with reasons
    pub fn discovery_errors(&self) -> Vec<DiscoveryError> {
        self.lock_state().errors.clone()
    }

    // ==================== Internals ====================

    fn lock_state(&self) -> MutexGuard<'_, ScanState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn list_files(&self, root: &Path) -> Result<ListedFiles, RegistryError> {
        if !root.is_dir() {
            return Err(RegistryError::RootNotFound(root.to_path_buf()));
        }
        let full = root.join(&self.pattern);
        let pattern = full.to_string_lossy();
        let paths = glob::glob(&pattern).map_err(|e| RegistryError::InvalidPattern {
            pattern: self.pattern.clone(),
            message: e.to_string(),
        })?;

        let mut listed = ListedFiles::default();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => listed.paths.push(path),
                Ok(_) => {}
                Err(e) => listed.errors.push(DiscoveryError::Unlistable {
                    path: e.path().to_path_buf(),
                    message: e.error().to_string(),
                }),
            }
        }
        listed.paths.sort();
        Ok(listed)
    }

    /// Build a catalog from scan entries, record errors, swap it in.
    fn install(
        &self,
        root: PathBuf,
        entries: BTreeMap<PathBuf, ScanEntry>,
        mut errors: Vec<DiscoveryError>,
    ) -> Arc<Catalog> {
        let mut catalog = Catalog::new();
        for (path, entry) in &entries {
            match &entry.outcome {
                Ok(descriptor) => {
                    if let Err(duplicate) = catalog.insert(Arc::clone(descriptor)) {
                        let first = catalog
                            .get(&duplicate.name)
                            .map(|d| d.source_path.clone())
                            .unwrap_or_default();
                        errors.push(DiscoveryError::DuplicateName {
                            path: path.clone(),
                            name: duplicate.name.clone(),
                            first,
                        });
                    }
                }
                Err(e) => errors.push(DiscoveryError::Descriptor {
                    path: path.clone(),
                    source: e.clone(),
                }),
            }
        }

        for error in &errors {
            warn!(error = %error, "Skipped descriptor");
        }
        info!(
            root = %root.display(),
            tools = catalog.len(),
            skipped = errors.len(),
            "Tool catalog built"
        );

        let catalog = Arc::new(catalog);
        {
            let mut state = self.lock_state();
            state.root = Some(root);
            state.entries = entries;
            state.errors = errors;
        }
        match self.catalog.write() {
            Ok(mut guard) => *guard = Arc::clone(&catalog),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&catalog),
        }
        catalog
    }

    /// Snapshot entries for `root`, but only if every listed file still
    /// exists with the same hash and no file was added.
    fn validated_snapshot(
        &self,
        root: &Path,
    ) -> Result<Option<BTreeMap<PathBuf, ScanEntry>>, RegistryError> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let Some(snapshot) = cache.load(root, &self.pattern) else {
            return Ok(None);
        };
        let files = self.list_files(root)?;
        if !files.errors.is_empty()
            || files.paths.len() != snapshot.entries.len()
            || files
                .paths
                .iter()
                .zip(&snapshot.entries)
                .any(|(path, entry)| *path != entry.path)
        {
            debug!(root = %root.display(), "Catalog snapshot does not match file list");
            return Ok(None);
        }

        let mut entries = BTreeMap::new();
        for entry in snapshot.entries {
            let Ok(bytes) = std::fs::read(&entry.path) else {
                return Ok(None);
            };
            if content_hash(&bytes) != entry.hash {
                debug!(path = %entry.path.display(), "Catalog snapshot is stale");
                return Ok(None);
            }
            let outcome = match entry.outcome {
                SnapshotOutcome::Parsed(descriptor) => Ok(Arc::new(descriptor)),
                SnapshotOutcome::Rejected(e) => Err(e),
            };
            entries.insert(
                entry.path.clone(),
                ScanEntry {
                    modified: modified_time(&entry.path),
                    hash: entry.hash,
                    outcome,
                },
            );
        }
        Ok(Some(entries))
    }

    fn save_snapshot(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        let snapshot = {
            let state = self.lock_state();
            let Some(root) = &state.root else {
                return;
            };
            let entries = state
                .entries
                .iter()
                .map(|(path, entry)| SnapshotEntry {
                    path: path.clone(),
                    hash: entry.hash.clone(),
                    outcome: match &entry.outcome {
                        Ok(d) => SnapshotOutcome::Parsed(ToolDescriptor::clone(d)),
                        Err(e) => SnapshotOutcome::Rejected(e.clone()),
                    },
                })
                .collect();
            CatalogSnapshot::new(root, &self.pattern, entries)
        };
        if let Err(e) = cache.save(&snapshot) {
            warn!(dir = %cache.dir().display(), error = %e, "Failed to save catalog snapshot");
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCatalogPort for ToolRegistry {
    fn snapshot(&self) -> Arc<Catalog> {
        self.catalog()
    }
}

#[derive(Default)]
struct ListedFiles {
    paths: Vec<PathBuf>,
    errors: Vec<DiscoveryError>,
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn scan_file(path: &Path) -> ScanEntry {
    let modified = modified_time(path);
    match std::fs::read(path) {
        Ok(bytes) => entry_from_bytes(path, modified, &bytes),
        Err(e) => ScanEntry {
            modified,
            hash: String::new(),
            outcome: Err(DescriptorError::Unreadable(e.to_string())),
        },
    }
}

fn entry_from_bytes(path: &Path, modified: Option<SystemTime>, bytes: &[u8]) -> ScanEntry {
    let hash = content_hash(bytes);
    let outcome = match std::str::from_utf8(bytes) {
        Ok(text) => parse_descriptor(text, path).map(Arc::new),
        Err(e) => Err(DescriptorError::Unreadable(e.to_string())),
    };
    ScanEntry {
        modified,
        hash,
        outcome,
    }
}
