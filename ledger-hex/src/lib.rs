//! # Ledger Hex
//!
//! Application service layer and interest batch engine for the ledger.
//!
//! ## Architecture
//!
//! - `service` - Application service (orchestrates domain operations)
//! - `interest` - Interest batch engine (average-daily-balance accrual)
//!
//! Both are generic over the port traits from `ledger-types`, so different
//! adapter implementations can be injected.

pub mod interest;
pub mod service;


pub use interest::{
    InterestEngine, InterestPeriod, InterestRateTable, InterestRunSummary, RateTier,
};
pub use service::LedgerService;
