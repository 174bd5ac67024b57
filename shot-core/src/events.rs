//! Event feed mirrored by read-optimized stores outside the engine.

use crate::types::{hex_bytes, AccountId, Hash32, Height};
use bitcoin::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShotEvent {
    Committed {
        player: AccountId,
        #[serde(with = "hex_bytes")]
        commitment_hash: Hash32,
        amount: Amount,
    },
    Revealed {
        player: AccountId,
        amount: Amount,
        won: bool,
    },
    Won {
        player: AccountId,
        payout: Amount,
    },
    Expired {
        player: AccountId,
        height_at_commit: Height,
        amount: Amount,
    },
    HouseFundsWithdrawn {
        house_address: AccountId,
        amount: Amount,
    },
    Sponsored {
        sponsor: AccountId,
        amount: Amount,
    },
    PayoutDeferred {
        player: AccountId,
        amount: Amount,
    },
    PayoutWithdrawn {
        player: AccountId,
        amount: Amount,
    },
    TestModeChanged {
        enabled: bool,
    },
    PauseChanged {
        paused: bool,
    },
}

impl ShotEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ShotEvent::Committed { .. } => "committed",
            ShotEvent::Revealed { .. } => "revealed",
            ShotEvent::Won { .. } => "won",
            ShotEvent::Expired { .. } => "expired",
            ShotEvent::HouseFundsWithdrawn { .. } => "house_funds_withdrawn",
            ShotEvent::Sponsored { .. } => "sponsored",
            ShotEvent::PayoutDeferred { .. } => "payout_deferred",
            ShotEvent::PayoutWithdrawn { .. } => "payout_withdrawn",
            ShotEvent::TestModeChanged { .. } => "test_mode_changed",
            ShotEvent::PauseChanged { .. } => "pause_changed",
        }
    }

    /// Account the event is about, if any.
    pub fn account(&self) -> Option<AccountId> {
        match self {
            ShotEvent::Committed { player, .. }
            | ShotEvent::Revealed { player, .. }
            | ShotEvent::Won { player, .. }
            | ShotEvent::Expired { player, .. }
            | ShotEvent::PayoutDeferred { player, .. }
            | ShotEvent::PayoutWithdrawn { player, .. } => Some(*player),
            ShotEvent::HouseFundsWithdrawn { house_address, .. } => Some(*house_address),
            ShotEvent::Sponsored { sponsor, .. } => Some(*sponsor),
            ShotEvent::TestModeChanged { .. } | ShotEvent::PauseChanged { .. } => None,
        }
    }
}

/// An event stamped with the oracle height and wall-clock time it was emitted at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub height: Height,
    pub emitted_at: DateTime<Utc>,
    pub event: ShotEvent,
}

impl EventRecord {
    pub fn new(height: Height, event: ShotEvent) -> Self {
        Self {
            height,
            emitted_at: Utc::now(),
            event,
        }
    }
}
