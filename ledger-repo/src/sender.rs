use async_trait::async_trait;
use serde_json::Value;

use ledger_types::{ChannelError, EventSender};

/// Delivers outbox events to an HTTP endpoint as JSON POSTs.
pub struct WebhookSender {
    client: reqwest::Client,
    target_url: String,
}

impl WebhookSender {
    pub fn new(target_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            target_url,
        }
    }
}

#[async_trait]
impl EventSender for WebhookSender {
    async fn send(&self, event_type: &str, payload: &Value) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(&self.target_url)
            .header("X-Event-Type", event_type)
            .json(payload)
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::Rejected {
                status: response.status().as_u16(),
            })
        }
    }
}
