use async_trait::async_trait;
use sciquorum_application::ports::publication::{PublicationAdapter, PublishError};
use sciquorum_domain::SessionId;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

/// Writes each report to `<dir>/<session-id>.report.json`.
///
/// The published id is the file name. Publishing the same session twice
/// overwrites the earlier report.
#[derive(Debug, Clone)]
pub struct DirectoryPublisher {
    dir: PathBuf,
}

impl DirectoryPublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl PublicationAdapter for DirectoryPublisher {
    async fn publish(&self, session_id: &SessionId, payload: &Value) -> Result<String, PublishError> {
        if !payload.is_object() {
            return Err(PublishError::Rejected("report must be a JSON object".into()));
        }
        let name = format!("{}.report.json", session_id);
        if name.contains(['/', '\\']) {
            return Err(PublishError::Rejected(format!("invalid session id: {}", session_id)));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&name);
        let tmp = self.dir.join(format!("{}.tmp", name));
        let json = serde_json::to_vec_pretty(payload)
            .map_err(|e| PublishError::Rejected(e.to_string()))?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        info!(session = %session_id, path = %path.display(), "Report published");
        Ok(name)
    }
}
