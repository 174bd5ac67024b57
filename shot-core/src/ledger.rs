//! Fund accounting: the pot, accrued house commission and pull-payment
//! balances owed to winners whose direct transfer failed.

use crate::error::{Result, ShotError};
use crate::outcome::PayoutSplit;
use crate::types::AccountId;
use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    pot: Amount,
    house_funds: Amount,
    pending_payouts: HashMap<AccountId, Amount>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pot(&self) -> Amount {
        self.pot
    }

    pub fn house_funds(&self) -> Amount {
        self.house_funds
    }

    pub fn pending_payout(&self, player: &AccountId) -> Amount {
        self.pending_payouts
            .get(player)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn pending_payouts(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.pending_payouts.iter()
    }

    /// Sum of every balance held in custody.
    pub fn total_custody(&self) -> Option<Amount> {
        self.pending_payouts
            .values()
            .try_fold(self.pot.checked_add(self.house_funds)?, |acc, owed| {
                acc.checked_add(*owed)
            })
    }

    pub fn credit_pot(&mut self, amount: Amount) -> Result<Amount> {
        self.pot = self
            .pot
            .checked_add(amount)
            .ok_or(ShotError::Overflow("pot credit"))?;
        Ok(self.pot)
    }

    /// Checks that settling `split` cannot overflow any balance.
    pub fn can_settle(&self, split: &PayoutSplit, winner: &AccountId) -> Result<()> {
        self.house_funds
            .checked_add(split.house_cut)
            .ok_or(ShotError::Overflow("house accrual"))?;
        self.pending_payout(winner)
            .checked_add(split.payout)
            .ok_or(ShotError::Overflow("pending payout"))?;
        Ok(())
    }

    /// Empties the pot for a win, leaving only the undistributed remainder,
    /// and accrues the house cut. Call [`Ledger::can_settle`] first.
    pub fn settle_win(&mut self, split: &PayoutSplit) {
        self.pot = split.remainder;
        self.house_funds = self.house_funds + split.house_cut;
    }

    pub fn credit_pending(&mut self, player: AccountId, amount: Amount) {
        let owed = self.pending_payouts.entry(player).or_insert(Amount::ZERO);
        *owed = *owed + amount;
    }

    /// Removes and returns everything owed to `player`.
    pub fn take_pending(&mut self, player: &AccountId) -> Amount {
        self.pending_payouts
            .remove(player)
            .unwrap_or(Amount::ZERO)
    }

    pub fn take_house_funds(&mut self) -> Amount {
        std::mem::replace(&mut self.house_funds, Amount::ZERO)
    }

    pub fn restore_house_funds(&mut self, amount: Amount) {
        self.house_funds = self.house_funds + amount;
    }
}
