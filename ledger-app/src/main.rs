//! # Ledger Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter (connect + migrate)
//! - Spawn the outbox relay
//! - Spawn the interest batch scheduler

mod config;

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger_hex::{InterestEngine, InterestPeriod};
use ledger_repo::{OutboxRelay, RelayConfig, SqliteLedger, WebhookSender, build_repo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,ledger_app=debug,ledger_hex=debug,ledger_repo=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Using database: {}", config.database_url);

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;

    // Outbox relay: polls unprocessed events and pushes them to the webhook.
    let relay = OutboxRelay::new(
        repo.clone(),
        WebhookSender::new(config.event_webhook_url.clone()),
        RelayConfig {
            poll_interval: Duration::from_secs(config.relay_poll_interval_secs),
            batch_size: config.relay_batch_size,
            max_attempts: config.relay_max_attempts,
            lease_ttl: ChronoDuration::seconds(config.relay_lease_ttl_secs),
            ..RelayConfig::default()
        },
    );
    let relay_task = tokio::spawn(relay.run());

    // Interest scheduler: checks daily; the engine's per-account idempotency
    // guard makes re-runs over an already-credited period harmless.
    let interest_task = tokio::spawn(interest_scheduler(
        repo.clone(),
        config.interest_period_days,
        Duration::from_secs(config.interest_check_interval_secs),
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    relay_task.abort();
    interest_task.abort();
    Ok(())
}

async fn interest_scheduler(repo: SqliteLedger, period_days: i64, check_interval: Duration) {
    let engine = InterestEngine::new(repo.clone(), repo);
    loop {
        let to = Utc::now();
        let period = InterestPeriod {
            from: to - ChronoDuration::days(period_days),
            to,
        };

        for attempt in 1..=3 {
            match engine.run(period).await {
                Ok(summary) => {
                    tracing::info!(
                        batch_id = %summary.batch_id,
                        succeeded = summary.succeeded,
                        skipped = summary.skipped,
                        failed = summary.failed.len(),
                        "Interest batch run complete"
                    );
                    break;
                }
                Err(e) => {
                    tracing::warn!("Interest batch attempt {} failed: {}", attempt, e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }

        tokio::time::sleep(check_interval).await;
    }
}
