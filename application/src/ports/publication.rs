//! Publication port
//!
//! The external target that accepts a finalized session report.

use async_trait::async_trait;
use sciquorum_domain::SessionId;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Publication rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// `Publish(sessionId, structuredPayload) -> publishedId`
#[async_trait]
pub trait PublicationAdapter: Send + Sync {
    async fn publish(&self, session_id: &SessionId, payload: &Value) -> Result<String, PublishError>;
}
