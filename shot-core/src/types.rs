use crate::error::{Result, ShotError};
use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Ordering-oracle sequence number.
pub type Height = u64;

/// 32-byte digest (commitment hashes, entropy).
pub type Hash32 = [u8; 32];

/// Identity of a player, the house or the administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    pub const NIL: AccountId = AccountId(Uuid::nil());

    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = ShotError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ShotError::invalid_input(format!("Invalid account id '{}': {}", s, e)))
    }
}

/// Outstanding commitment of a single player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingShot {
    #[serde(with = "hex_bytes")]
    pub commitment_hash: Hash32,
    pub height_at_commit: Height,
    pub amount_paid: Amount,
}

/// Read-only view of a player's pending shot for UI/profile layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingShotInfo {
    pub exists: bool,
    pub height_at_commit: Height,
    pub amount: Amount,
}

impl PendingShotInfo {
    pub fn none() -> Self {
        Self {
            exists: false,
            height_at_commit: 0,
            amount: Amount::ZERO,
        }
    }
}

impl From<&PendingShot> for PendingShotInfo {
    fn from(shot: &PendingShot) -> Self {
        Self {
            exists: true,
            height_at_commit: shot.height_at_commit,
            amount: shot.amount_paid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentWinner {
    pub player: AccountId,
    pub payout: Amount,
    pub height: Height,
}

/// Parse a 32-byte value from hex, accepting an optional `0x` prefix.
pub fn parse_hash32(input: &str) -> Result<Hash32> {
    let trimmed = input.trim().trim_start_matches("0x");
    let bytes = hex::decode(trimmed)
        .map_err(|e| ShotError::invalid_input(format!("Invalid hex: {}", e)))?;

    bytes
        .try_into()
        .map_err(|b: Vec<u8>| ShotError::invalid_input(format!("Expected 32 bytes, got {}", b.len())))
}

pub(crate) mod hex_bytes {
    use super::Hash32;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Hash32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash32, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_hash32(&s).map_err(serde::de::Error::custom)
    }
}
