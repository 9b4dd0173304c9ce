//! Tool catalog port
//!
//! Read access to the current catalog. The registry swaps whole catalogs, so
//! a snapshot stays consistent for as long as the caller holds it.

use sciquorum_domain::{Catalog, ToolDescriptor};
use std::sync::Arc;

pub trait ToolCatalogPort: Send + Sync {
    /// The catalog as of now
    fn snapshot(&self) -> Arc<Catalog>;

    /// Look up one descriptor by name
    fn lookup(&self, name: &str) -> Option<Arc<ToolDescriptor>> {
        self.snapshot().get(name).cloned()
    }
}

/// A catalog that never changes
pub struct FixedCatalog(Arc<Catalog>);

impl FixedCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self(Arc::new(catalog))
    }
}

impl ToolCatalogPort for FixedCatalog {
    fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.0)
    }
}
