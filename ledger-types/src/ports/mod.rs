//! Port traits implemented by adapters.

pub mod channel;
pub mod clock;
pub mod history;
pub mod repository;

pub use channel::{ChannelError, EventSender};
pub use clock::{Clock, SystemClock};
pub use history::BalanceHistory;
pub use repository::LedgerRepository;
