//! Domain events and the transactional outbox message they are stored as.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::account::{AccountId, AccountNumber, AccountType, CustomerId};
use super::money::Currency;
use super::transaction::TransactionId;

/// Events buffered by the Account aggregate (and the interest batch engine)
/// and persisted as outbox rows in the same storage transaction as the
/// mutation that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    AccountOpened {
        account_id: AccountId,
        account_number: AccountNumber,
        customer_id: CustomerId,
        account_type: AccountType,
        balance: i64,
        currency: Currency,
        occurred_at: DateTime<Utc>,
    },
    MoneyTransferred {
        transaction_id: TransactionId,
        source_account_number: AccountNumber,
        destination_account_number: AccountNumber,
        amount: i64,
        currency: Currency,
        reference: Option<String>,
        occurred_at: DateTime<Utc>,
    },
    InsufficientFundsDetected {
        account_id: AccountId,
        account_number: AccountNumber,
        requested: i64,
        available: i64,
        currency: Currency,
        occurred_at: DateTime<Utc>,
    },
    InterestBatchCompleted {
        batch_id: Uuid,
        succeeded: u32,
        skipped: u32,
        failed: u32,
        /// Total interest credited, in minor units, keyed by currency code.
        total_interest: BTreeMap<String, i64>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// The type tag stored on the outbox row and sent to the channel.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::AccountOpened { .. } => "ACCOUNT_OPENED",
            DomainEvent::MoneyTransferred { .. } => "MONEY_TRANSFERRED",
            DomainEvent::InsufficientFundsDetected { .. } => "INSUFFICIENT_FUNDS_DETECTED",
            DomainEvent::InterestBatchCompleted { .. } => "INTEREST_BATCH_COMPLETED",
        }
    }

    /// When the event happened in the domain.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::AccountOpened { occurred_at, .. }
            | DomainEvent::MoneyTransferred { occurred_at, .. }
            | DomainEvent::InsufficientFundsDetected { occurred_at, .. } => *occurred_at,
            DomainEvent::InterestBatchCompleted { finished_at, .. } => *finished_at,
        }
    }

    /// Serialized payload stored on the outbox row.
    pub fn payload(&self) -> serde_json::Value {
        match self {
            DomainEvent::AccountOpened {
                account_id,
                account_number,
                customer_id,
                account_type,
                balance,
                currency,
                occurred_at,
            } => json!({
                "account_id": account_id,
                "account_number": account_number,
                "customer_id": customer_id,
                "account_type": account_type.to_string(),
                "balance": balance,
                "currency": currency.code(),
                "occurred_at": occurred_at,
            }),
            DomainEvent::MoneyTransferred {
                transaction_id,
                source_account_number,
                destination_account_number,
                amount,
                currency,
                reference,
                occurred_at,
            } => json!({
                "transaction_id": transaction_id,
                "source_account_number": source_account_number,
                "destination_account_number": destination_account_number,
                "amount": amount,
                "currency": currency.code(),
                "reference": reference,
                "occurred_at": occurred_at,
            }),
            DomainEvent::InsufficientFundsDetected {
                account_id,
                account_number,
                requested,
                available,
                currency,
                occurred_at,
            } => json!({
                "account_id": account_id,
                "account_number": account_number,
                "requested": requested,
                "available": available,
                "currency": currency.code(),
                "occurred_at": occurred_at,
            }),
            DomainEvent::InterestBatchCompleted {
                batch_id,
                succeeded,
                skipped,
                failed,
                total_interest,
                started_at,
                finished_at,
            } => json!({
                "batch_id": batch_id,
                "succeeded": succeeded,
                "skipped": skipped,
                "failed": failed,
                "total_interest": total_interest,
                "started_at": started_at,
                "finished_at": finished_at,
            }),
        }
    }
}

/// A persisted outbox row.
///
/// Created in the same storage transaction as the aggregate mutation that
/// produced the event; mutated only by the relay (`processed_at`, `attempts`,
/// `last_error`). Never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub last_error: Option<String>,
}

impl OutboxMessage {
    /// Builds the row for a freshly buffered event.
    pub fn from_event(event: &DomainEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event.event_type().to_string(),
            payload: event.payload(),
            occurred_at: event.occurred_at(),
            processed_at: None,
            attempts: 0,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbox_message_from_event() {
        let event = DomainEvent::InsufficientFundsDetected {
            account_id: AccountId::new(),
            account_number: AccountNumber::generate(),
            requested: 200,
            available: 100,
            currency: Currency::NGN,
            occurred_at: Utc::now(),
        };

        let message = OutboxMessage::from_event(&event);

        assert_eq!(message.event_type, "INSUFFICIENT_FUNDS_DETECTED");
        assert_eq!(message.attempts, 0);
        assert!(message.processed_at.is_none());
        assert_eq!(message.payload["requested"], 200);
        assert_eq!(message.payload["currency"], "NGN");
    }
}
