use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::PipelineError;

/// Send-text operation of the external messaging provider.
#[async_trait]
pub trait MessagingChannel: Send + Sync {
    /// Returns the provider's message id.
    async fn send_text(&self, address: &str, body: &str) -> Result<String, PipelineError>;
}

#[derive(Clone)]
pub struct WhatsAppClient {
    http: Client,
    api_url: String,
    token: String,
}

impl WhatsAppClient {
    pub fn new(api_url: String, token: String) -> Result<Self, PipelineError> {
        if token.trim().is_empty() {
            return Err(PipelineError::MissingCredentials("MESSAGING_TOKEN is not set"));
        }
        if api_url.trim().is_empty() {
            return Err(PipelineError::MissingCredentials("MESSAGING_API_URL is not set"));
        }

        Ok(Self {
            http: Client::new(),
            api_url,
            token,
        })
    }
}

#[async_trait]
impl MessagingChannel for WhatsAppClient {
    async fn send_text(&self, address: &str, body: &str) -> Result<String, PipelineError> {
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": address,
            "type": "text",
            "text": { "body": body },
        });

        let res = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::Dispatch(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(PipelineError::Dispatch(format!("channel rejected send: {status} {body}")));
        }

        let parsed = res.json::<SendResponse>().await?;
        parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| PipelineError::Parse("send response has no message id".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}
