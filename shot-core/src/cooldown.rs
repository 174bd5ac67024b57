use crate::types::{AccountId, Height};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the inter-shot spacing is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CooldownPolicy {
    /// `RoundConfig::cooldown_period`.
    Standard,
    /// Short period installed by test mode.
    Accelerated { period: u64 },
}

impl CooldownPolicy {
    pub fn effective_period(&self, configured: u64) -> u64 {
        match self {
            CooldownPolicy::Standard => configured,
            CooldownPolicy::Accelerated { period } => *period,
        }
    }
}

/// Last-shot height per player. Policies are applied at read time, so a
/// policy change affects every record immediately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CooldownTracker {
    last_shot: HashMap<AccountId, Height>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, player: AccountId, height: Height) {
        self.last_shot.insert(player, height);
    }

    pub fn last_shot(&self, player: &AccountId) -> Option<Height> {
        self.last_shot.get(player).copied()
    }

    pub fn remaining(&self, player: &AccountId, current: Height, period: u64) -> u64 {
        match self.last_shot(player) {
            Some(last) => last.saturating_add(period).saturating_sub(current),
            None => 0,
        }
    }

    pub fn is_satisfied(&self, player: &AccountId, current: Height, period: u64) -> bool {
        self.remaining(player, current, period) == 0
    }
}
