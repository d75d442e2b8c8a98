//! Credit ledger — the only place balances change.
//!
//! Every mutation is one conditional statement in the store, so two sessions
//! racing for the last credit cannot both win. Committed changes are fanned
//! out to subscribers over a broadcast channel.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::LedgerError;
use crate::store::ProfileStore;

use super::model::{BalanceChanged, CreditEvent, Profile};

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 256;

pub struct CreditLedger {
    store: Arc<dyn ProfileStore>,
    tx: broadcast::Sender<BalanceChanged>,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self { store, tx }
    }

    /// Subscribe to committed balance changes.
    pub fn subscribe(&self) -> broadcast::Receiver<BalanceChanged> {
        self.tx.subscribe()
    }

    /// Create an account with a starting balance.
    pub async fn open_account(
        &self,
        user_id: &str,
        name: &str,
        initial_credits: u32,
    ) -> Result<Profile, LedgerError> {
        let profile = Profile::new(user_id, name, initial_credits);
        self.store.create_profile(&profile).await?;
        info!(user_id, initial_credits, "Account opened");
        Ok(profile)
    }

    pub async fn profile(&self, user_id: &str) -> Result<Profile, LedgerError> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| LedgerError::UnknownAccount(user_id.to_string()))
    }

    /// Current balance of an account.
    pub async fn balance(&self, user_id: &str) -> Result<u32, LedgerError> {
        self.store
            .get_balance(user_id)
            .await?
            .ok_or_else(|| LedgerError::UnknownAccount(user_id.to_string()))
    }

    /// Atomically take one credit. Returns the balance after the debit.
    ///
    /// Fails with `InsufficientCredit` when the balance is zero; the balance
    /// is left untouched in that case.
    pub async fn debit(&self, user_id: &str) -> Result<u32, LedgerError> {
        match self.store.debit_credit(user_id).await? {
            Some(balance) => {
                info!(user_id, balance, "Credit debited");
                self.notify(user_id, balance);
                Ok(balance)
            }
            None => {
                // Nothing changed; work out why for the caller.
                match self.store.get_balance(user_id).await? {
                    Some(balance) => {
                        debug!(user_id, balance, "Debit refused");
                        Err(LedgerError::InsufficientCredit {
                            user_id: user_id.to_string(),
                            balance,
                        })
                    }
                    None => Err(LedgerError::UnknownAccount(user_id.to_string())),
                }
            }
        }
    }

    /// Add `amount` credits (purchase or refund). Returns the new balance.
    pub async fn credit(&self, user_id: &str, amount: u32) -> Result<u32, LedgerError> {
        if amount == 0 {
            warn!(user_id, "Rejected zero credit amount");
            return Err(LedgerError::InvalidAmount(amount));
        }
        let Some(balance) = self.store.add_credits(user_id, amount).await? else {
            // The update matched nothing: either no such profile or an overflow.
            return match self.store.get_balance(user_id).await? {
                Some(current) => {
                    warn!(user_id, amount, current, "Rejected credit past the balance limit");
                    Err(LedgerError::InvalidAmount(amount))
                }
                None => Err(LedgerError::UnknownAccount(user_id.to_string())),
            };
        };

        info!(user_id, amount, balance, "Credits added");
        self.notify(user_id, balance);
        Ok(balance)
    }

    /// Journal of balance changes, oldest first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<CreditEvent>, LedgerError> {
        Ok(self.store.list_credit_events(user_id).await?)
    }

    fn notify(&self, user_id: &str, balance: u32) {
        // Ok if nobody is listening
        let _ = self.tx.send(BalanceChanged {
            user_id: user_id.to_string(),
            balance,
        });
    }
}
