//! Infrastructure layer for sciquorum
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod completion;
pub mod config;
pub mod logging;
pub mod publication;
pub mod session;
pub mod tools;

// Re-export commonly used types
pub use completion::{HttpCompletionClient, UnavailableCompletion};
pub use config::{
    ConfigLoader, ConfigValidationError, FileCompletionConfig, FileConfig, FileOutputConfig,
    FileOutputFormat, FilePublicationConfig, FileRegistryConfig, FileWorkflowConfig,
    PublicationKind,
};
pub use logging::JsonlWorkflowLogger;
pub use publication::{DirectoryPublisher, HttpPublisher};
pub use session::FileSessionStore;
pub use tools::{
    DiscoveryError, LibraryRegistry, LocalToolExecutor, RefreshReport, RegistryError,
    SnapshotCache, ToolRegistry,
};
