//! One JSON document per session under a directory.
//!
//! Saves go through a temp file and a rename so a reader never sees a
//! half-written document.

use async_trait::async_trait;
use sciquorum_application::ports::session_store::{SessionStore, SessionSummary, StoreError};
use sciquorum_domain::{Session, SessionId};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default location: `$XDG_DATA_HOME/sciquorum/sessions`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("sciquorum").join("sessions"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &SessionId) -> Result<PathBuf, StoreError> {
        let id = id.as_str();
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let path = self.path_for(session.id())?;
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(session)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(session = %session.id(), status = %session.status(), "Session saved");
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<Session, StoreError> {
        let path = self.path_for(id)?;
        let content = match tokio::fs::read(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&content)?)
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = tokio::fs::read(&path)
                .await
                .map_err(StoreError::from)
                .and_then(|c| serde_json::from_slice::<Session>(&c).map_err(StoreError::from));
            match parsed {
                Ok(session) => summaries.push(SessionSummary::from(&session)),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable session"),
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}
