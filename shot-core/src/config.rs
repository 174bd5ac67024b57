use crate::error::{Result, ShotError};
use crate::types::{AccountId, Height};
use bitcoin::Amount;
use serde::{Deserialize, Serialize};

/// Denominator for all basis-point values.
pub const BASIS_POINTS: u64 = 10_000;

pub const DEFAULT_REVEAL_WINDOW_START: Height = 1;
pub const DEFAULT_REVEAL_WINDOW_END: Height = 256;

/// Round parameters, fixed once the engine is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfig {
    pub shot_cost: Amount,
    /// Fee for the first shot into an empty pot. Falls back to `shot_cost`.
    #[serde(default)]
    pub first_shot_cost: Option<Amount>,
    /// Smallest accepted sponsorship.
    pub sponsor_cost: Amount,
    /// Heights a player must wait between shots.
    pub cooldown_period: u64,
    pub win_percentage_bp: u64,
    pub house_percentage_bp: u64,
    pub win_chance_bp: u64,
    pub max_recent_winners: usize,
    /// A shot can only win once the pot holds at least this much.
    pub min_pot_size: Amount,
    pub reveal_window_start: Height,
    pub reveal_window_end: Height,
    pub house_address: AccountId,
}

impl RoundConfig {
    pub fn new(house_address: AccountId) -> Self {
        Self {
            shot_cost: Amount::from_sat(1_000_000), // 0.01 BTC
            first_shot_cost: None,
            sponsor_cost: Amount::from_sat(100_000),
            cooldown_period: 60,
            win_percentage_bp: 9_000,
            house_percentage_bp: 1_000,
            win_chance_bp: 1_000,
            max_recent_winners: 10,
            min_pot_size: Amount::from_sat(1_000_000),
            reveal_window_start: DEFAULT_REVEAL_WINDOW_START,
            reveal_window_end: DEFAULT_REVEAL_WINDOW_END,
            house_address,
        }
    }

    /// First and last height at which a shot committed at `commit_height`
    /// can be revealed.
    pub fn reveal_heights(&self, commit_height: Height) -> (Height, Height) {
        (
            commit_height.saturating_add(self.reveal_window_start),
            commit_height.saturating_add(self.reveal_window_end),
        )
    }

    /// Fee required for a commit given the current pot.
    pub fn required_fee(&self, pot: Amount) -> Amount {
        if pot == Amount::ZERO {
            self.first_shot_cost.unwrap_or(self.shot_cost)
        } else {
            self.shot_cost
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.house_address.is_nil() {
            return Err(ShotError::config("House address must be set"));
        }

        if self.shot_cost == Amount::ZERO {
            return Err(ShotError::config("Shot cost must be greater than 0"));
        }

        if self.first_shot_cost == Some(Amount::ZERO) {
            return Err(ShotError::config("First shot cost must be greater than 0"));
        }

        let split = self
            .win_percentage_bp
            .checked_add(self.house_percentage_bp)
            .ok_or_else(|| ShotError::config("Payout split overflows"))?;
        if split > BASIS_POINTS {
            return Err(ShotError::config(format!(
                "Win ({}) + house ({}) basis points exceed {}",
                self.win_percentage_bp, self.house_percentage_bp, BASIS_POINTS
            )));
        }

        if self.win_chance_bp > BASIS_POINTS {
            return Err(ShotError::config(format!(
                "Win chance {} exceeds {} basis points",
                self.win_chance_bp, BASIS_POINTS
            )));
        }

        if self.max_recent_winners == 0 {
            return Err(ShotError::config("Recent winners buffer must hold at least one entry"));
        }

        if self.reveal_window_start == 0 {
            return Err(ShotError::config(
                "Reveal window must start at least one height after commit",
            ));
        }

        if self.reveal_window_start > self.reveal_window_end {
            return Err(ShotError::config(format!(
                "Reveal window start {} is after end {}",
                self.reveal_window_start, self.reveal_window_end
            )));
        }

        Ok(())
    }
}

/// Verification-only overrides. Installed through an administrator toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestModeConfig {
    pub enabled: bool,
    /// Replaces the derived random value when set.
    pub forced_winning_number: Option<u64>,
    /// Cooldown used instead of `RoundConfig::cooldown_period`.
    pub cooldown_period: u64,
}

impl Default for TestModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            forced_winning_number: None,
            cooldown_period: 1,
        }
    }
}

impl TestModeConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Test mode that always wins (subject to pot eligibility).
    pub fn forced_win() -> Self {
        Self {
            enabled: true,
            forced_winning_number: Some(0),
            ..Self::default()
        }
    }

    /// Test mode that always loses.
    pub fn forced_loss() -> Self {
        Self {
            enabled: true,
            forced_winning_number: Some(BASIS_POINTS - 1),
            ..Self::default()
        }
    }
}
