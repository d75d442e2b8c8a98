//! Accounts and the credit ledger.

pub mod ledger;
pub mod model;

pub use ledger::CreditLedger;
pub use model::{BalanceChanged, CreditEvent, Profile};
