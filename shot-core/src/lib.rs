//! Shot lottery core engine
//!
//! Players pay a fee for a chance to win an accumulating pot. Each shot is a
//! commit-reveal: the player commits to `hash(secret, player)`, then reveals
//! the secret inside a window of oracle heights. The roll mixes the secret
//! with entropy that did not exist at commit time.
//!
//! The engine is a sequential state machine. Time and randomness come from
//! an injected [`OrderingOracle`], fund movement goes through an injected
//! [`FundsTransfer`], and every state change is published as a [`ShotEvent`].

pub mod commitment;
pub mod config;
pub mod cooldown;
pub mod custody;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod oracle;
pub mod outcome;
pub mod registry;
pub mod storage;
pub mod types;
pub mod winners;

pub use commitment::{generate_secret, CommitmentScheme, Sha256Binding, ShotCommitment};
pub use config::{RoundConfig, TestModeConfig, BASIS_POINTS};
pub use custody::{FundsTransfer, InMemoryBank, PayoutResult};
pub use engine::{EngineSnapshot, RevealOutcome, SharedEngine, ShotEngine};
pub use error::{Result, ShotError, TransferError};
pub use events::{EventRecord, ShotEvent};
pub use oracle::{ManualOracle, OrderingOracle};
pub use outcome::{LossReason, PayoutSplit};
pub use types::{AccountId, Hash32, Height, PendingShotInfo, RecentWinner};

pub use ::bitcoin::Amount;

/// Engine wired to the in-process oracle and bank used by the CLI and tests.
pub type LocalEngine = ShotEngine<ManualOracle, InMemoryBank>;
