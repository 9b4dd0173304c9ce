//! Tool domain: descriptors, catalogs, templates and the result envelope.
//!
//! # Overview
//!
//! ```text
//! descriptor file ──parse──► ToolDescriptor ──► Catalog (search / suggest)
//!                                   │
//!                                   ▼
//!                 Executor::invoke(descriptor, params, timeout)
//!                                   │
//!                                   ▼
//!                            ExecutionResult
//! ```
//!
//! # Invocation modes
//!
//! | Mode | Entry point | Contract |
//! |------|-------------|----------|
//! | `process` | executable path or command name | `--name value` args, one JSON object on stdout, exit 0 |
//! | `library` | registered symbol | [`LibraryTool::call`](library::LibraryTool::call) |
//! | `remote` | URL | JSON POST body, 2xx JSON object response |

pub mod catalog;
pub mod entities;
pub mod library;
pub mod template;
pub mod value_objects;
