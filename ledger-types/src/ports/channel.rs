//! Event channel port.
//!
//! The relay dispatches outbox rows through this trait. Delivery is
//! at-least-once: consumers must deduplicate on the envelope's `event_id`.

/// Error type for channel dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel transport error: {0}")]
    Transport(String),

    #[error("Channel rejected event: HTTP {status}")]
    Rejected { status: u16 },
}

/// Port trait for the external event/notification channel.
#[async_trait::async_trait]
pub trait EventSender: Send + Sync + 'static {
    /// Sends one serialized event envelope to the channel.
    async fn send(
        &self,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<(), ChannelError>;
}
