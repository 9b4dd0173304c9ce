use async_trait::async_trait;
use sciquorum_application::ports::publication::{PublicationAdapter, PublishError};
use sciquorum_domain::SessionId;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::info;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// POSTs `{"session_id": ..., "report": ...}` to an endpoint.
///
/// The endpoint answers 2xx with a JSON object carrying the published id
/// under `id`. Any other answer is a rejection.
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpPublisher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PublicationAdapter for HttpPublisher {
    async fn publish(&self, session_id: &SessionId, payload: &Value) -> Result<String, PublishError> {
        let body = json!({ "session_id": session_id.as_str(), "report": payload });
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(PublishError::Rejected(format!("HTTP {}: {}", status, text.trim())));
        }

        let answer: Value = serde_json::from_str(&text)
            .map_err(|e| PublishError::Rejected(format!("response is not JSON: {}", e)))?;
        let id = match answer.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(PublishError::Rejected("response carries no id".into())),
        };

        info!(session = %session_id, published = %id, "Report published");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}/reports", addr)
    }

    #[tokio::test]
    async fn test_returns_published_id() {
        let url = serve(
            "HTTP/1.1 201 Created\r\nContent-Length: 14\r\nConnection: close\r\n\r\n{\"id\":\"r-42\"}\n",
        )
        .await;
        let id = HttpPublisher::new(url)
            .publish(&SessionId::from("s"), &json!({"findings": []}))
            .await
            .unwrap();
        assert_eq!(id, "r-42");
    }

    #[tokio::test]
    async fn test_error_status_is_rejection() {
        let url = serve(
            "HTTP/1.1 422 Unprocessable Entity\r\nContent-Length: 3\r\nConnection: close\r\n\r\nbad",
        )
        .await;
        let err = HttpPublisher::new(url)
            .publish(&SessionId::from("s"), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Rejected(m) if m.contains("422")));
    }

    #[tokio::test]
    async fn test_unreachable_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = HttpPublisher::new(format!("http://{}/", addr))
            .with_timeout(Duration::from_secs(2))
            .publish(&SessionId::from("s"), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Transport(_)));
    }
}
