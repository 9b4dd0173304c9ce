//! Session persistence port
//!
//! One document per session, rewritten after every transition by the
//! orchestrator that owns the session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sciquorum_domain::{Session, SessionId, SessionStatus};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Listing entry for a persisted session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub topic: String,
    pub status: SessionStatus,
    pub findings: usize,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id().clone(),
            topic: session.topic().to_string(),
            status: session.status(),
            findings: session.findings().len(),
            updated_at: session.updated_at(),
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    async fn load(&self, id: &SessionId) -> Result<Session, StoreError>;

    /// Summaries of every stored session, most recently updated first
    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError>;
}

/// Store that keeps nothing
pub struct NoSessionStore;

#[async_trait]
impl SessionStore for NoSessionStore {
    async fn save(&self, _session: &Session) -> Result<(), StoreError> {
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<Session, StoreError> {
        Err(StoreError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        Ok(Vec::new())
    }
}
