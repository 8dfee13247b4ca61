//! Chat-oracle contract and the blocking HTTP client.

use std::io::Read;

use carta_core::GraphError;

/// External chat oracle consulted by the resolver passes. Implementors
/// must be `Send + Sync`; the library ships [`HttpChatClient`], tests
/// substitute canned clients.
pub trait ChatClient: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("chat request failed: {0}")]
    Http(String),

    #[error("unusable chat response: {0}")]
    BadResponse(String),

    #[error(transparent)]
    Store(#[from] GraphError),

    #[error("operation cancelled")]
    Cancelled,
}

/// OpenAI-style chat-completions client over blocking HTTP.
pub struct HttpChatClient {
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpChatClient {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        HttpChatClient {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

impl ChatClient for HttpChatClient {
    fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.0,
        })
        .to_string();

        let mut body = String::new();
        ureq::post(&self.endpoint)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(payload.as_bytes())
            .map_err(|e| OracleError::Http(e.to_string()))?
            .into_body()
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|e| OracleError::Http(e.to_string()))?;

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| OracleError::BadResponse(e.to_string()))?;
        value
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(|c| c.to_string())
            .ok_or_else(|| OracleError::BadResponse("no completion content".to_string()))
    }
}
