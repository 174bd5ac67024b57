use crate::types::{AccountId, Height};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShotError>;

#[derive(Error, Debug)]
pub enum ShotError {
    #[error("Shot already pending for player {0}")]
    AlreadyPending(AccountId),

    #[error("Cooldown active: {remaining} more heights")]
    CooldownActive { remaining: u64 },

    #[error("Secret does not match the stored commitment")]
    BadSecret,

    #[error("Not yet revealable: {elapsed} heights elapsed, need {start}")]
    NotYetRevealable { elapsed: u64, start: u64 },

    #[error("Reveal window expired: {elapsed} heights elapsed, window ends at {end}")]
    WindowExpired { elapsed: u64, end: u64 },

    #[error("Pending shot not expired yet: {elapsed} heights elapsed, window ends at {end}")]
    NotExpired { elapsed: u64, end: u64 },

    #[error("No pending shot for player {0}")]
    NoPendingShot(AccountId),

    #[error("Nothing pending to withdraw")]
    NothingPending,

    #[error("Incorrect fee: expected {expected} sats, got {provided} sats")]
    IncorrectFee { expected: u64, provided: u64 },

    #[error("Engine is paused")]
    Paused,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Entropy unavailable for height {0}")]
    EntropyUnavailable(Height),

    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShotError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Errors a caller can resolve by waiting or by retrying with other input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AlreadyPending(_)
                | Self::CooldownActive { .. }
                | Self::BadSecret
                | Self::NotYetRevealable { .. }
                | Self::NotExpired { .. }
                | Self::Paused
        )
    }
}

/// Failure reported by a [`crate::custody::FundsTransfer`] implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Recipient {0} rejected the transfer")]
    Rejected(AccountId),

    #[error("Insufficient custody balance: need {need} sats, have {available} sats")]
    InsufficientFunds { need: u64, available: u64 },

    #[error("Transfer backend error: {0}")]
    Backend(String),
}
