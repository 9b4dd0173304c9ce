//! Tool discovery and invocation
//!
//! - `registry`: scans a directory tree for descriptor files and serves the catalog
//! - `descriptor`: parses one descriptor file (YAML front matter + body)
//! - `snapshot`: on-disk catalog cache validated by content hash
//! - `executor`: [`LocalToolExecutor`], dispatching to the three invocation modes
//!   (`process`, `library`, `remote`)

pub mod descriptor;
pub mod library;
pub mod process;
pub mod remote;
pub mod snapshot;

mod executor;
mod registry;

pub use descriptor::{DescriptorError, content_hash, parse_descriptor, parse_descriptor_file};
pub use executor::LocalToolExecutor;
pub use library::LibraryRegistry;
pub use process::{DEFAULT_MAX_OUTPUT_BYTES, ProcessRunner};
pub use registry::{
    DEFAULT_DESCRIPTOR_GLOB, DiscoveryError, RefreshReport, RegistryError, ToolRegistry,
};
pub use remote::RemoteInvoker;
pub use snapshot::{CatalogSnapshot, SnapshotCache};
