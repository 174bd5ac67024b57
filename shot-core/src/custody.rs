//! Outbound fund movement. The engine only decides who is owed what; a
//! [`FundsTransfer`] implementation performs the actual transfer.

use crate::error::TransferError;
use crate::types::AccountId;
use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub trait FundsTransfer {
    fn transfer(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError>;
}

/// How a winner's payout was settled.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutResult {
    /// Sent directly to the winner.
    Transferred { amount: Amount },
    /// Direct transfer failed; credited as a withdrawable pending payout.
    Deferred {
        amount: Amount,
        reason: TransferError,
    },
}

impl PayoutResult {
    pub fn amount(&self) -> Amount {
        match self {
            PayoutResult::Transferred { amount } | PayoutResult::Deferred { amount, .. } => *amount,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, PayoutResult::Deferred { .. })
    }
}

/// In-process account book used by the CLI and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryBank {
    balances: HashMap<AccountId, Amount>,
    #[serde(default)]
    rejecting: HashSet<AccountId>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(Amount::ZERO)
    }

    /// Makes every transfer to `account` fail until [`InMemoryBank::accept`].
    pub fn reject(&mut self, account: AccountId) {
        self.rejecting.insert(account);
    }

    pub fn accept(&mut self, account: &AccountId) {
        self.rejecting.remove(account);
    }

    pub fn is_rejecting(&self, account: &AccountId) -> bool {
        self.rejecting.contains(account)
    }
}

impl FundsTransfer for InMemoryBank {
    fn transfer(&mut self, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        if self.rejecting.contains(to) {
            return Err(TransferError::Rejected(*to));
        }

        let balance = self.balances.entry(*to).or_insert(Amount::ZERO);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Backend("recipient balance overflow".to_string()))?;
        Ok(())
    }
}
