//! Outbox relay: polls unprocessed outbox rows and pushes them out through
//! an [`EventSender`], marking each row processed or failed afterwards.
//!
//! Delivery is at-least-once. A crash between a successful send and the
//! processed-mark means the event goes out again on the next tick, so
//! consumers deduplicate on `event_id`.

use chrono::Duration as ChronoDuration;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use ledger_types::{EventSender, LedgerRepository, OutboxMessage};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Delay between polling rounds.
    pub poll_interval: Duration,
    /// Rows fetched per round.
    pub batch_size: i64,
    /// Rows with this many failed attempts are parked for operator review.
    pub max_attempts: i32,
    /// How long a lease acquisition stays valid.
    pub lease_ttl: ChronoDuration,
    /// Lease holder name, unique per process.
    pub holder: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 20,
            max_attempts: 3,
            lease_ttl: ChronoDuration::seconds(30),
            holder: format!("relay-{}", uuid::Uuid::new_v4()),
        }
    }
}

pub struct OutboxRelay<R, S> {
    repo: R,
    sender: S,
    config: RelayConfig,
}

impl<R, S> OutboxRelay<R, S>
where
    R: LedgerRepository,
    S: EventSender,
{
    pub fn new(repo: R, sender: S, config: RelayConfig) -> Self {
        Self {
            repo,
            sender,
            config,
        }
    }

    #[instrument(skip(self), fields(holder = %self.config.holder))]
    pub async fn run(self) {
        info!("Starting outbox relay");
        loop {
            if let Err(e) = self.tick().await {
                error!("Relay round failed: {}", e);
            }
            sleep(self.config.poll_interval).await;
        }
    }

    /// One polling round: renew the lease, fetch a batch, dispatch each row.
    pub async fn tick(&self) -> Result<(), ledger_types::RepoError> {
        let leased = self
            .repo
            .acquire_relay_lease(&self.config.holder, self.config.lease_ttl)
            .await?;
        if !leased {
            debug!("Lease held elsewhere, skipping round");
            return Ok(());
        }

        let messages = self
            .repo
            .unprocessed_outbox(self.config.max_attempts, self.config.batch_size)
            .await?;
        if messages.is_empty() {
            return Ok(());
        }

        info!("Dispatching {} outbox messages", messages.len());
        for message in messages {
            self.dispatch(message).await;
        }
        Ok(())
    }

    #[instrument(skip(self, message), fields(event_id = %message.id, event_type = %message.event_type))]
    async fn dispatch(&self, message: OutboxMessage) {
        let envelope = json!({
            "event_id": message.id,
            "event_type": message.event_type,
            "occurred_at": message.occurred_at,
            "payload": message.payload,
        });

        match self.sender.send(&message.event_type, &envelope).await {
            Ok(()) => {
                if let Err(e) = self.repo.mark_outbox_processed(message.id).await {
                    error!("Failed to mark message processed: {}", e);
                }
            }
            Err(send_err) => {
                warn!(
                    "Delivery failed (attempt {}): {}",
                    message.attempts + 1,
                    send_err
                );
                if let Err(e) = self
                    .repo
                    .mark_outbox_failed(message.id, &send_err.to_string())
                    .await
                {
                    error!("Failed to record delivery failure: {}", e);
                }
            }
        }
    }
}
