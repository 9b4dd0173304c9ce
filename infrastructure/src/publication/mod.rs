//! Publication adapters for finalized session reports
//!
//! - [`DirectoryPublisher`]: writes the report as a JSON file
//! - [`HttpPublisher`]: POSTs the report to an endpoint that answers with an id

mod directory;
mod http;

pub use directory::DirectoryPublisher;
pub use http::HttpPublisher;
