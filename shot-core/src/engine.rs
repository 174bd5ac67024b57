//! Round lifecycle controller.
//!
//! Orchestrates commit → reveal/expire → payout over the registry, cooldown
//! tracker, outcome rules and ledger. Every public operation validates first
//! and mutates afterwards, so a failed call leaves no trace. Payout transfers
//! happen only after the pot and house balances are updated.

use crate::commitment::{CommitmentScheme, Sha256Binding};
use crate::config::{RoundConfig, TestModeConfig};
use crate::cooldown::{CooldownPolicy, CooldownTracker};
use crate::custody::{FundsTransfer, PayoutResult};
use crate::error::{Result, ShotError};
use crate::events::{EventRecord, ShotEvent};
use crate::ledger::Ledger;
use crate::oracle::OrderingOracle;
use crate::outcome::{self, Decision, LossReason, OutcomePolicy, PayoutSplit};
use crate::registry::CommitmentRegistry;
use crate::types::{AccountId, Hash32, Height, PendingShot, PendingShotInfo, RecentWinner};
use crate::winners::RecentWinners;
use bitcoin::Amount;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Engine behind a lock so independent callers run operations one at a time.
pub type SharedEngine<O, T> = Arc<Mutex<ShotEngine<O, T>>>;

/// Result of a successful reveal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealOutcome {
    Lost {
        amount_paid: Amount,
        roll: Option<u64>,
        reason: LossReason,
    },
    Won {
        amount_paid: Amount,
        roll: u64,
        split: PayoutSplit,
        settlement: PayoutResult,
    },
}

impl RevealOutcome {
    pub fn is_win(&self) -> bool {
        matches!(self, RevealOutcome::Won { .. })
    }
}

/// Serializable engine state, without the oracle and custody backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub config: RoundConfig,
    pub admin: AccountId,
    pub ledger: Ledger,
    pub registry: CommitmentRegistry,
    pub cooldowns: CooldownTracker,
    pub winners: RecentWinners,
    pub test_mode: TestModeConfig,
    pub paused: bool,
}

pub struct ShotEngine<O, T> {
    config: RoundConfig,
    admin: AccountId,
    oracle: O,
    custody: T,
    ledger: Ledger,
    registry: CommitmentRegistry,
    cooldowns: CooldownTracker,
    winners: RecentWinners,
    test_mode: TestModeConfig,
    cooldown_policy: CooldownPolicy,
    outcome_policy: OutcomePolicy,
    paused: bool,
    outbox: Vec<EventRecord>,
}

impl<O: OrderingOracle, T: FundsTransfer> ShotEngine<O, T> {
    pub fn new(config: RoundConfig, admin: AccountId, oracle: O, custody: T) -> Result<Self> {
        Self::check_roles(&config, &admin)?;

        let winners = RecentWinners::new(config.max_recent_winners);
        tracing::info!(
            "Shot engine created: shot cost {} sats, win chance {} bp, house {}",
            config.shot_cost.to_sat(),
            config.win_chance_bp,
            config.house_address
        );

        Ok(Self {
            config,
            admin,
            oracle,
            custody,
            ledger: Ledger::new(),
            registry: CommitmentRegistry::new(),
            cooldowns: CooldownTracker::new(),
            winners,
            test_mode: TestModeConfig::default(),
            cooldown_policy: CooldownPolicy::Standard,
            outcome_policy: OutcomePolicy::Random,
            paused: false,
            outbox: Vec::new(),
        })
    }

    /// Rebuilds an engine from a snapshot. The configuration is re-validated.
    pub fn restore(snapshot: EngineSnapshot, oracle: O, custody: T) -> Result<Self> {
        Self::check_roles(&snapshot.config, &snapshot.admin)?;

        let mut winners = snapshot.winners;
        winners.resize(snapshot.config.max_recent_winners);

        let mut engine = Self {
            config: snapshot.config,
            admin: snapshot.admin,
            oracle,
            custody,
            ledger: snapshot.ledger,
            registry: snapshot.registry,
            cooldowns: snapshot.cooldowns,
            winners,
            test_mode: TestModeConfig::default(),
            cooldown_policy: CooldownPolicy::Standard,
            outcome_policy: OutcomePolicy::Random,
            paused: snapshot.paused,
            outbox: Vec::new(),
        };
        engine.install_test_mode(snapshot.test_mode);

        tracing::debug!(
            "Restored shot engine: pot {} sats, {} pending shots",
            engine.ledger.pot().to_sat(),
            engine.registry.len()
        );
        Ok(engine)
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            config: self.config.clone(),
            admin: self.admin,
            ledger: self.ledger.clone(),
            registry: self.registry.clone(),
            cooldowns: self.cooldowns.clone(),
            winners: self.winners.clone(),
            test_mode: self.test_mode.clone(),
            paused: self.paused,
        }
    }

    pub fn into_shared(self) -> SharedEngine<O, T> {
        Arc::new(Mutex::new(self))
    }

    fn check_roles(config: &RoundConfig, admin: &AccountId) -> Result<()> {
        config.validate()?;

        if admin.is_nil() {
            return Err(ShotError::config("Administrator must be set"));
        }

        if *admin == config.house_address {
            return Err(ShotError::config(
                "House address must be distinct from the administrator",
            ));
        }

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Player operations
    // ---------------------------------------------------------------------

    /// Records a commitment and adds the fee to the pot. An expired
    /// commitment left by the same player is cleaned up first.
    pub fn commit(
        &mut self,
        player: AccountId,
        commitment_hash: Hash32,
        amount_paid: Amount,
    ) -> Result<()> {
        if self.paused {
            return Err(ShotError::Paused);
        }

        if player.is_nil() {
            return Err(ShotError::invalid_input("Player id must not be nil"));
        }

        let height = self.oracle.current_height();

        let stale = match self.registry.get(&player) {
            Some(shot) if shot.is_expired(height, self.config.reveal_window_end) => {
                Some(shot.clone())
            }
            Some(_) => return Err(ShotError::AlreadyPending(player)),
            None => None,
        };

        let remaining = self.cooldowns.remaining(&player, height, self.cooldown_period());
        if remaining > 0 {
            return Err(ShotError::CooldownActive { remaining });
        }

        let required = self.config.required_fee(self.ledger.pot());
        if amount_paid != required {
            return Err(ShotError::IncorrectFee {
                expected: required.to_sat(),
                provided: amount_paid.to_sat(),
            });
        }

        let pot = self.ledger.credit_pot(amount_paid)?;

        if let Some(stale) = stale {
            self.registry.remove(&player);
            self.emit_expired(player, &stale, height);
        }

        self.registry
            .insert(player, commitment_hash, height, amount_paid);
        self.cooldowns.record(player, height);

        tracing::info!(
            "Player {} committed {} sats at height {} (pot now {} sats)",
            player,
            amount_paid.to_sat(),
            height,
            pot.to_sat()
        );

        self.emit(
            height,
            ShotEvent::Committed {
                player,
                commitment_hash,
                amount: amount_paid,
            },
        );
        Ok(())
    }

    /// Verifies the secret against the stored commitment and resolves the shot.
    pub fn reveal(&mut self, player: AccountId, secret: &[u8]) -> Result<RevealOutcome> {
        let shot = self
            .registry
            .get(&player)
            .cloned()
            .ok_or(ShotError::NoPendingShot(player))?;

        if !Sha256Binding::verify(&shot.commitment_hash, secret, &player) {
            tracing::debug!("Player {} revealed a secret that does not match", player);
            return Err(ShotError::BadSecret);
        }

        let height = self.oracle.current_height();
        let elapsed = shot.elapsed(height);

        if elapsed < self.config.reveal_window_start {
            return Err(ShotError::NotYetRevealable {
                elapsed,
                start: self.config.reveal_window_start,
            });
        }

        if elapsed > self.config.reveal_window_end {
            return Err(ShotError::WindowExpired {
                elapsed,
                end: self.config.reveal_window_end,
            });
        }

        let draw_height = shot
            .height_at_commit
            .checked_add(self.config.reveal_window_start)
            .ok_or(ShotError::Overflow("draw height"))?;
        let entropy = self
            .oracle
            .entropy_for(draw_height)
            .ok_or(ShotError::EntropyUnavailable(draw_height))?;

        let pot = self.ledger.pot();
        let decision = outcome::decide(
            &self.config,
            self.outcome_policy,
            pot,
            shot.amount_paid,
            &entropy,
            secret,
        );

        match decision {
            Decision::Lose { roll, reason } => {
                self.registry.remove(&player);

                tracing::info!(
                    "Player {} lost at height {} ({:?}), pot stays {} sats",
                    player,
                    height,
                    reason,
                    pot.to_sat()
                );

                self.emit(
                    height,
                    ShotEvent::Revealed {
                        player,
                        amount: shot.amount_paid,
                        won: false,
                    },
                );

                Ok(RevealOutcome::Lost {
                    amount_paid: shot.amount_paid,
                    roll,
                    reason,
                })
            }
            Decision::Win { roll } => {
                let split = outcome::split(pot, &self.config)?;
                self.ledger.can_settle(&split, &player)?;

                // Effects first: the pot is settled before any funds leave.
                self.registry.remove(&player);
                self.ledger.settle_win(&split);
                self.winners.push(RecentWinner {
                    player,
                    payout: split.payout,
                    height,
                });

                tracing::info!(
                    "Player {} won {} sats at height {} (house cut {} sats, {} sats left in pot)",
                    player,
                    split.payout.to_sat(),
                    height,
                    split.house_cut.to_sat(),
                    split.remainder.to_sat()
                );

                self.emit(
                    height,
                    ShotEvent::Revealed {
                        player,
                        amount: shot.amount_paid,
                        won: true,
                    },
                );

                let settlement = self.pay_winner(player, split.payout);

                self.emit(
                    height,
                    ShotEvent::Won {
                        player,
                        payout: split.payout,
                    },
                );
                if settlement.is_deferred() {
                    self.emit(
                        height,
                        ShotEvent::PayoutDeferred {
                            player,
                            amount: split.payout,
                        },
                    );
                }

                Ok(RevealOutcome::Won {
                    amount_paid: shot.amount_paid,
                    roll,
                    split,
                    settlement,
                })
            }
        }
    }

    fn pay_winner(&mut self, player: AccountId, payout: Amount) -> PayoutResult {
        if payout == Amount::ZERO {
            return PayoutResult::Transferred { amount: payout };
        }

        match self.custody.transfer(&player, payout) {
            Ok(()) => PayoutResult::Transferred { amount: payout },
            Err(reason) => {
                tracing::warn!(
                    "Payout of {} sats to {} failed ({}), credited as pending",
                    payout.to_sat(),
                    player,
                    reason
                );
                self.ledger.credit_pending(player, payout);
                PayoutResult::Deferred {
                    amount: payout,
                    reason,
                }
            }
        }
    }

    /// Clears a commitment whose reveal window has lapsed. Anyone may call
    /// this. The fee stays in the pot.
    pub fn cleanup_expired(&mut self, player: AccountId) -> Result<PendingShot> {
        let height = self.oracle.current_height();
        let shot = self
            .registry
            .get(&player)
            .ok_or(ShotError::NoPendingShot(player))?;

        if !shot.is_expired(height, self.config.reveal_window_end) {
            return Err(ShotError::NotExpired {
                elapsed: shot.elapsed(height),
                end: self.config.reveal_window_end,
            });
        }

        let shot = self
            .registry
            .remove(&player)
            .ok_or_else(|| ShotError::internal("pending shot vanished during cleanup"))?;
        self.emit_expired(player, &shot, height);
        Ok(shot)
    }

    fn emit_expired(&mut self, player: AccountId, shot: &PendingShot, height: Height) {
        tracing::info!(
            "Expired shot of {} from height {} cleaned up ({} sats stay in pot)",
            player,
            shot.height_at_commit,
            shot.amount_paid.to_sat()
        );
        self.emit(
            height,
            ShotEvent::Expired {
                player,
                height_at_commit: shot.height_at_commit,
                amount: shot.amount_paid,
            },
        );
    }

    // ---------------------------------------------------------------------
    // Fund custody
    // ---------------------------------------------------------------------

    /// Adds funds to the pot without taking a shot.
    pub fn sponsor(&mut self, sponsor: AccountId, amount: Amount) -> Result<Amount> {
        if self.paused {
            return Err(ShotError::Paused);
        }

        if amount == Amount::ZERO || amount < self.config.sponsor_cost {
            return Err(ShotError::IncorrectFee {
                expected: self.config.sponsor_cost.to_sat(),
                provided: amount.to_sat(),
            });
        }

        let pot = self.ledger.credit_pot(amount)?;
        let height = self.oracle.current_height();

        tracing::info!(
            "{} sponsored {} sats (pot now {} sats)",
            sponsor,
            amount.to_sat(),
            pot.to_sat()
        );
        self.emit(height, ShotEvent::Sponsored { sponsor, amount });
        Ok(pot)
    }

    /// Sends the accrued house commission to the configured house address.
    pub fn withdraw_house_funds(&mut self, caller: AccountId) -> Result<Amount> {
        if caller != self.admin && caller != self.config.house_address {
            return Err(ShotError::unauthorized(
                "Only the administrator or the house can withdraw house funds",
            ));
        }

        let house_address = self.config.house_address;
        if house_address.is_nil() {
            return Err(ShotError::config("House address was never configured"));
        }

        let amount = self.ledger.take_house_funds();
        if amount == Amount::ZERO {
            return Err(ShotError::NothingPending);
        }

        if let Err(e) = self.custody.transfer(&house_address, amount) {
            self.ledger.restore_house_funds(amount);
            tracing::warn!("House withdrawal of {} sats failed: {}", amount.to_sat(), e);
            return Err(e.into());
        }

        let height = self.oracle.current_height();
        tracing::info!(
            "Withdrew {} sats of house funds to {}",
            amount.to_sat(),
            house_address
        );
        self.emit(
            height,
            ShotEvent::HouseFundsWithdrawn {
                house_address,
                amount,
            },
        );
        Ok(amount)
    }

    /// Pays out everything owed to `player` from failed direct transfers.
    pub fn withdraw_pending_payout(&mut self, player: AccountId) -> Result<Amount> {
        let amount = self.ledger.take_pending(&player);
        if amount == Amount::ZERO {
            return Err(ShotError::NothingPending);
        }

        if let Err(e) = self.custody.transfer(&player, amount) {
            self.ledger.credit_pending(player, amount);
            tracing::warn!(
                "Pending payout withdrawal of {} sats for {} failed: {}",
                amount.to_sat(),
                player,
                e
            );
            return Err(e.into());
        }

        let height = self.oracle.current_height();
        tracing::info!("Player {} withdrew pending payout of {} sats", player, amount.to_sat());
        self.emit(height, ShotEvent::PayoutWithdrawn { player, amount });
        Ok(amount)
    }

    // ---------------------------------------------------------------------
    // Administration
    // ---------------------------------------------------------------------

    fn require_admin(&self, caller: &AccountId) -> Result<()> {
        if *caller != self.admin {
            return Err(ShotError::unauthorized(format!(
                "{} is not the administrator",
                caller
            )));
        }
        Ok(())
    }

    /// Installs or removes the verification overrides.
    pub fn set_test_mode(&mut self, caller: AccountId, test_mode: TestModeConfig) -> Result<()> {
        self.require_admin(&caller)?;

        let enabled = test_mode.enabled;
        self.install_test_mode(test_mode);

        if enabled {
            tracing::warn!(
                "Test mode ENABLED: cooldown {:?}, outcome {:?}",
                self.cooldown_policy,
                self.outcome_policy
            );
        } else {
            tracing::info!("Test mode disabled");
        }

        let height = self.oracle.current_height();
        self.emit(height, ShotEvent::TestModeChanged { enabled });
        Ok(())
    }

    fn install_test_mode(&mut self, test_mode: TestModeConfig) {
        (self.cooldown_policy, self.outcome_policy) = if test_mode.enabled {
            let outcome_policy = match test_mode.forced_winning_number {
                Some(winning_number) => OutcomePolicy::Forced { winning_number },
                None => OutcomePolicy::Random,
            };
            (
                CooldownPolicy::Accelerated {
                    period: test_mode.cooldown_period,
                },
                outcome_policy,
            )
        } else {
            (CooldownPolicy::Standard, OutcomePolicy::Random)
        };
        self.test_mode = test_mode;
    }

    pub fn pause(&mut self, caller: AccountId) -> Result<()> {
        self.set_paused(caller, true)
    }

    pub fn unpause(&mut self, caller: AccountId) -> Result<()> {
        self.set_paused(caller, false)
    }

    fn set_paused(&mut self, caller: AccountId, paused: bool) -> Result<()> {
        self.require_admin(&caller)?;
        if self.paused == paused {
            return Ok(());
        }

        self.paused = paused;
        tracing::info!("Engine {}", if paused { "paused" } else { "unpaused" });

        let height = self.oracle.current_height();
        self.emit(height, ShotEvent::PauseChanged { paused });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn current_pot(&self) -> Amount {
        self.ledger.pot()
    }

    pub fn house_funds(&self) -> Amount {
        self.ledger.house_funds()
    }

    pub fn cooldown_remaining(&self, player: &AccountId) -> u64 {
        self.cooldowns.remaining(
            player,
            self.oracle.current_height(),
            self.cooldown_period(),
        )
    }

    pub fn pending_shot(&self, player: &AccountId) -> PendingShotInfo {
        self.registry
            .get(player)
            .map(PendingShotInfo::from)
            .unwrap_or_else(PendingShotInfo::none)
    }

    pub fn pending_payout(&self, player: &AccountId) -> Amount {
        self.ledger.pending_payout(player)
    }

    /// Advisory check; performs no cleanup.
    pub fn can_commit(&self, player: &AccountId) -> bool {
        let height = self.oracle.current_height();
        let unblocked = self
            .registry
            .get(player)
            .map_or(true, |shot| {
                shot.is_expired(height, self.config.reveal_window_end)
            });

        !self.paused && unblocked && self.cooldown_remaining(player) == 0
    }

    pub fn required_fee(&self) -> Amount {
        self.config.required_fee(self.ledger.pot())
    }

    pub fn recent_winners(&self) -> Vec<RecentWinner> {
        self.winners.to_vec()
    }

    /// Players whose commitment can be cleaned up right now.
    pub fn expired_players(&self) -> Vec<AccountId> {
        self.registry
            .expired(self.oracle.current_height(), self.config.reveal_window_end)
    }

    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    pub fn cooldown_period(&self) -> u64 {
        self.cooldown_policy
            .effective_period(self.config.cooldown_period)
    }

    pub fn current_height(&self) -> Height {
        self.oracle.current_height()
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn admin(&self) -> AccountId {
        self.admin
    }

    pub fn test_mode(&self) -> &TestModeConfig {
        &self.test_mode
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn custody(&self) -> &T {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut T {
        &mut self.custody
    }

    // ---------------------------------------------------------------------
    // Event feed
    // ---------------------------------------------------------------------

    fn emit(&mut self, height: Height, event: ShotEvent) {
        tracing::debug!("Event at height {}: {}", height, event.kind());
        self.outbox.push(EventRecord::new(height, event));
    }

    /// Events emitted since the last drain, oldest first.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending_events(&self) -> &[EventRecord] {
        &self.outbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::ShotCommitment;
    use crate::custody::InMemoryBank;
    use crate::error::TransferError;
    use crate::oracle::ManualOracle;

    const SHOT: Amount = Amount::from_sat(1_000_000);

    struct Harness {
        engine: ShotEngine<ManualOracle, InMemoryBank>,
        oracle: ManualOracle,
        admin: AccountId,
        house: AccountId,
    }

    fn harness() -> Harness {
        let admin = AccountId::new();
        let house = AccountId::new();
        let oracle = ManualOracle::new(1_000, [42u8; 32]);
        let engine = ShotEngine::new(
            RoundConfig::new(house),
            admin,
            oracle.clone(),
            InMemoryBank::new(),
        )
        .unwrap();

        Harness {
            engine,
            oracle,
            admin,
            house,
        }
    }

    fn commit(h: &mut Harness, player: AccountId, secret: &[u8]) {
        let commitment = ShotCommitment::new(secret.to_vec(), &player);
        let fee = h.engine.required_fee();
        h.engine.commit(player, *commitment.hash(), fee).unwrap();
    }

    fn kinds(events: &[EventRecord]) -> Vec<&'static str> {
        events.iter().map(|r| r.event.kind()).collect()
    }

    #[test]
    fn test_rejects_invalid_roles() {
        let house = AccountId::new();
        let oracle = ManualOracle::new(0, [0u8; 32]);

        let same = ShotEngine::new(RoundConfig::new(house), house, oracle.clone(), InMemoryBank::new());
        assert!(matches!(same, Err(ShotError::InvalidConfiguration(_))));

        let nil_house = ShotEngine::new(
            RoundConfig::new(AccountId::NIL),
            AccountId::new(),
            oracle,
            InMemoryBank::new(),
        );
        assert!(matches!(nil_house, Err(ShotError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_first_shot_cannot_win() {
        let mut h = harness();
        h.engine
            .set_test_mode(h.admin, TestModeConfig::forced_win())
            .unwrap();
        let player = AccountId::new();

        commit(&mut h, player, b"alice-secret");
        assert_eq!(h.engine.current_pot(), SHOT);

        h.oracle.advance(1);
        let outcome = h.engine.reveal(player, b"alice-secret").unwrap();

        assert!(matches!(
            outcome,
            RevealOutcome::Lost {
                reason: LossReason::SoleContributor,
                ..
            }
        ));
        assert_eq!(h.engine.current_pot(), SHOT);
        assert!(!h.engine.pending_shot(&player).exists);

        let events = h.engine.drain_events();
        assert_eq!(kinds(&events), vec!["test_mode_changed", "committed", "revealed"]);
        assert_eq!(
            events[2].event,
            ShotEvent::Revealed {
                player,
                amount: SHOT,
                won: false
            }
        );
    }

    #[test]
    fn test_second_contributor_can_win_whole_pot() {
        let mut h = harness();
        let alice = AccountId::new();
        let bob = AccountId::new();

        commit(&mut h, alice, b"alice");
        commit(&mut h, bob, b"bob");
        assert_eq!(h.engine.current_pot(), Amount::from_sat(2_000_000));

        h.engine
            .set_test_mode(h.admin, TestModeConfig::forced_win())
            .unwrap();
        h.engine.drain_events();

        h.oracle.advance(1);
        let outcome = h.engine.reveal(bob, b"bob").unwrap();

        match outcome {
            RevealOutcome::Won {
                split, settlement, ..
            } => {
                assert_eq!(split.payout, Amount::from_sat(1_800_000));
                assert_eq!(split.house_cut, Amount::from_sat(200_000));
                assert_eq!(
                    settlement,
                    PayoutResult::Transferred {
                        amount: Amount::from_sat(1_800_000)
                    }
                );
            }
            other => panic!("expected win, got {:?}", other),
        }

        assert_eq!(h.engine.current_pot(), Amount::ZERO);
        assert_eq!(h.engine.house_funds(), Amount::from_sat(200_000));
        assert_eq!(h.engine.custody().balance(&bob), Amount::from_sat(1_800_000));
        assert_eq!(h.engine.pending_payout(&bob), Amount::ZERO);
        assert_eq!(h.engine.recent_winners().len(), 1);

        let events = h.engine.drain_events();
        assert_eq!(kinds(&events), vec!["revealed", "won"]);
        assert_eq!(
            events[1].event,
            ShotEvent::Won {
                player: bob,
                payout: Amount::from_sat(1_800_000)
            }
        );
    }

    #[test]
    fn test_failed_transfer_becomes_pending_payout() {
        let mut h = harness();
        let alice = AccountId::new();
        let bob = AccountId::new();

        commit(&mut h, alice, b"a");
        commit(&mut h, bob, b"b");
        h.engine
            .set_test_mode(h.admin, TestModeConfig::forced_win())
            .unwrap();
        h.engine.custody_mut().reject(bob);

        h.oracle.advance(2);
        let outcome = h.engine.reveal(bob, b"b").unwrap();
        match outcome {
            RevealOutcome::Won { settlement, .. } => {
                assert_eq!(
                    settlement,
                    PayoutResult::Deferred {
                        amount: Amount::from_sat(1_800_000),
                        reason: TransferError::Rejected(bob),
                    }
                );
            }
            other => panic!("expected win, got {:?}", other),
        }

        assert_eq!(h.engine.current_pot(), Amount::ZERO);
        assert_eq!(h.engine.pending_payout(&bob), Amount::from_sat(1_800_000));
        assert_eq!(h.engine.house_funds(), Amount::from_sat(200_000));
        assert!(kinds(h.engine.pending_events()).ends_with(&["revealed", "won", "payout_deferred"]));

        // still rejecting: withdrawal fails and the credit survives
        assert!(matches!(
            h.engine.withdraw_pending_payout(bob),
            Err(ShotError::TransferFailed(_))
        ));
        assert_eq!(h.engine.pending_payout(&bob), Amount::from_sat(1_800_000));

        h.engine.custody_mut().accept(&bob);
        assert_eq!(
            h.engine.withdraw_pending_payout(bob).unwrap(),
            Amount::from_sat(1_800_000)
        );
        assert_eq!(h.engine.pending_payout(&bob), Amount::ZERO);
        assert_eq!(h.engine.custody().balance(&bob), Amount::from_sat(1_800_000));
        assert!(matches!(
            h.engine.withdraw_pending_payout(bob),
            Err(ShotError::NothingPending)
        ));
    }

    #[test]
    fn test_bad_secret_keeps_pending_shot() {
        let mut h = harness();
        let player = AccountId::new();
        commit(&mut h, player, b"right");
        h.oracle.advance(1);

        assert!(matches!(
            h.engine.reveal(player, b"wrong"),
            Err(ShotError::BadSecret)
        ));
        assert!(h.engine.pending_shot(&player).exists);

        assert!(h.engine.reveal(player, b"right").is_ok());
        assert!(!h.engine.pending_shot(&player).exists);
    }

    #[test]
    fn test_secret_is_bound_to_player() {
        let mut h = harness();
        let alice = AccountId::new();
        let mallory = AccountId::new();

        let commitment = ShotCommitment::new(b"shared".to_vec(), &alice);
        h.engine.commit(alice, *commitment.hash(), SHOT).unwrap();
        h.engine.commit(mallory, *commitment.hash(), SHOT).unwrap();
        h.oracle.advance(1);

        assert!(matches!(
            h.engine.reveal(mallory, b"shared"),
            Err(ShotError::BadSecret)
        ));
        assert!(h.engine.reveal(alice, b"shared").is_ok());
    }

    #[test]
    fn test_reveal_window_bounds() {
        let mut h = harness();
        let player = AccountId::new();
        commit(&mut h, player, b"s");

        assert!(matches!(
            h.engine.reveal(player, b"s"),
            Err(ShotError::NotYetRevealable { elapsed: 0, start: 1 })
        ));

        h.oracle.advance(257);
        assert!(matches!(
            h.engine.reveal(player, b"s"),
            Err(ShotError::WindowExpired { elapsed: 257, end: 256 })
        ));
        assert!(h.engine.pending_shot(&player).exists);
    }

    #[test]
    fn test_reveal_at_last_window_height() {
        let mut h = harness();
        let player = AccountId::new();
        commit(&mut h, player, b"s");

        h.oracle.advance(256);
        assert!(h.engine.reveal(player, b"s").is_ok());
    }

    #[test]
    fn test_reveal_without_commitment() {
        let mut h = harness();
        let player = AccountId::new();
        assert!(matches!(
            h.engine.reveal(player, b"s"),
            Err(ShotError::NoPendingShot(p)) if p == player
        ));
    }

    #[test]
    fn test_single_pending_invariant() {
        let mut h = harness();
        h.engine
            .set_test_mode(h.admin, TestModeConfig::enabled())
            .unwrap();
        let player = AccountId::new();
        commit(&mut h, player, b"one");

        h.oracle.advance(5);
        let second = ShotCommitment::new(b"two".to_vec(), &player);
        let err = h.engine.commit(player, *second.hash(), SHOT).unwrap_err();
        assert!(matches!(err, ShotError::AlreadyPending(p) if p == player));
        assert_eq!(h.engine.current_pot(), SHOT);
        assert_eq!(h.engine.pending_count(), 1);
    }

    #[test]
    fn test_cleanup_expiry_gating_keeps_fee_in_pot() {
        let mut h = harness();
        let player = AccountId::new();
        commit(&mut h, player, b"s");

        h.oracle.advance(256);
        assert!(matches!(
            h.engine.cleanup_expired(player),
            Err(ShotError::NotExpired { elapsed: 256, end: 256 })
        ));

        h.oracle.advance(1);
        assert_eq!(h.engine.expired_players(), vec![player]);
        let cleared = h.engine.cleanup_expired(player).unwrap();
        assert_eq!(cleared.amount_paid, SHOT);

        assert_eq!(h.engine.current_pot(), SHOT);
        assert_eq!(h.engine.pending_payout(&player), Amount::ZERO);
        assert!(!h.engine.pending_shot(&player).exists);

        let events = h.engine.drain_events();
        assert_eq!(
            events.last().unwrap().event,
            ShotEvent::Expired {
                player,
                height_at_commit: 1_000,
                amount: SHOT
            }
        );

        assert!(matches!(
            h.engine.cleanup_expired(player),
            Err(ShotError::NoPendingShot(_))
        ));
    }

    #[test]
    fn test_commit_cleans_up_expired_shot_first() {
        let mut h = harness();
        let player = AccountId::new();
        commit(&mut h, player, b"old");
        h.engine.drain_events();

        h.oracle.advance(300);
        let fresh = ShotCommitment::new(b"new".to_vec(), &player);
        h.engine.commit(player, *fresh.hash(), SHOT).unwrap();

        assert_eq!(h.engine.current_pot(), Amount::from_sat(2_000_000));
        assert_eq!(h.engine.pending_shot(&player).height_at_commit, 1_300);
        assert_eq!(kinds(&h.engine.drain_events()), vec!["expired", "committed"]);
    }

    #[test]
    fn test_failed_commit_does_not_clean_up() {
        let mut h = harness();
        let mut config = RoundConfig::new(h.house);
        config.cooldown_period = 1_000;
        h.engine = ShotEngine::new(config, h.admin, h.oracle.clone(), InMemoryBank::new()).unwrap();

        let player = AccountId::new();
        commit(&mut h, player, b"old");
        h.oracle.advance(300);

        let fresh = ShotCommitment::new(b"new".to_vec(), &player);
        let err = h.engine.commit(player, *fresh.hash(), SHOT).unwrap_err();
        assert!(matches!(err, ShotError::CooldownActive { remaining: 700 }));

        // stale shot still present, no Expired event emitted
        assert!(h.engine.pending_shot(&player).exists);
        assert_eq!(kinds(&h.engine.drain_events()), vec!["committed"]);
    }

    #[test]
    fn test_cooldown_blocks_and_releases() {
        let mut h = harness();
        let player = AccountId::new();
        commit(&mut h, player, b"s");
        h.oracle.advance(1);
        h.engine.reveal(player, b"s").unwrap();

        assert_eq!(h.engine.cooldown_remaining(&player), 59);
        assert!(!h.engine.can_commit(&player));

        let next = ShotCommitment::new(b"t".to_vec(), &player);
        assert!(matches!(
            h.engine.commit(player, *next.hash(), SHOT),
            Err(ShotError::CooldownActive { remaining: 59 })
        ));

        h.oracle.advance(59);
        assert_eq!(h.engine.cooldown_remaining(&player), 0);
        assert!(h.engine.can_commit(&player));
        h.engine.commit(player, *next.hash(), SHOT).unwrap();
    }

    #[test]
    fn test_test_mode_shortens_outstanding_cooldowns() {
        let mut h = harness();
        let player = AccountId::new();
        commit(&mut h, player, b"s");
        h.oracle.advance(1);
        h.engine.reveal(player, b"s").unwrap();
        assert_eq!(h.engine.cooldown_remaining(&player), 59);

        h.engine
            .set_test_mode(h.admin, TestModeConfig::enabled())
            .unwrap();
        assert_eq!(h.engine.cooldown_remaining(&player), 0);

        h.engine
            .set_test_mode(h.admin, TestModeConfig::default())
            .unwrap();
        assert_eq!(h.engine.cooldown_remaining(&player), 59);
    }

    #[test]
    fn test_can_commit_does_not_clean_up() {
        let mut h = harness();
        let player = AccountId::new();
        commit(&mut h, player, b"s");
        h.oracle.advance(300);

        assert!(h.engine.can_commit(&player));
        assert!(h.engine.pending_shot(&player).exists);
    }

    #[test]
    fn test_test_mode_is_admin_only() {
        let mut h = harness();
        let stranger = AccountId::new();

        assert!(matches!(
            h.engine.set_test_mode(stranger, TestModeConfig::forced_win()),
            Err(ShotError::Unauthorized(_))
        ));
        assert!(matches!(
            h.engine.set_test_mode(h.house, TestModeConfig::forced_win()),
            Err(ShotError::Unauthorized(_))
        ));
        assert!(!h.engine.test_mode().enabled);
    }

    #[test]
    fn test_incorrect_fee_rejected() {
        let mut h = harness();
        let player = AccountId::new();
        let commitment = ShotCommitment::new(b"s".to_vec(), &player);

        let err = h
            .engine
            .commit(player, *commitment.hash(), Amount::from_sat(999_999))
            .unwrap_err();
        assert!(matches!(
            err,
            ShotError::IncorrectFee {
                expected: 1_000_000,
                provided: 999_999
            }
        ));
        assert_eq!(h.engine.current_pot(), Amount::ZERO);
        assert!(h.engine.drain_events().is_empty());
    }

    #[test]
    fn test_first_shot_fee_applies_to_empty_pot_only() {
        let mut h = harness();
        let mut config = RoundConfig::new(h.house);
        config.first_shot_cost = Some(Amount::from_sat(3_000_000));
        h.engine = ShotEngine::new(config, h.admin, h.oracle.clone(), InMemoryBank::new()).unwrap();

        assert_eq!(h.engine.required_fee(), Amount::from_sat(3_000_000));
        commit(&mut h, AccountId::new(), b"a");
        assert_eq!(h.engine.required_fee(), SHOT);
        commit(&mut h, AccountId::new(), b"b");
        assert_eq!(h.engine.current_pot(), Amount::from_sat(4_000_000));
    }

    #[test]
    fn test_sponsor_adds_to_pot_without_commitment() {
        let mut h = harness();
        let sponsor = AccountId::new();

        assert!(matches!(
            h.engine.sponsor(sponsor, Amount::from_sat(1)),
            Err(ShotError::IncorrectFee { .. })
        ));

        let pot = h.engine.sponsor(sponsor, Amount::from_sat(5_000_000)).unwrap();
        assert_eq!(pot, Amount::from_sat(5_000_000));
        assert!(!h.engine.pending_shot(&sponsor).exists);
        assert_eq!(h.engine.cooldown_remaining(&sponsor), 0);
    }

    #[test]
    fn test_sponsored_pot_is_winnable_by_first_player() {
        let mut h = harness();
        h.engine
            .sponsor(AccountId::new(), Amount::from_sat(5_000_000))
            .unwrap();
        h.engine
            .set_test_mode(h.admin, TestModeConfig::forced_win())
            .unwrap();

        let player = AccountId::new();
        commit(&mut h, player, b"s");
        h.oracle.advance(1);
        assert!(h.engine.reveal(player, b"s").unwrap().is_win());
        assert_eq!(h.engine.current_pot(), Amount::ZERO);
    }

    #[test]
    fn test_house_funds_go_to_house_not_admin() {
        let mut h = harness();
        let alice = AccountId::new();
        let bob = AccountId::new();
        commit(&mut h, alice, b"a");
        commit(&mut h, bob, b"b");
        h.engine
            .set_test_mode(h.admin, TestModeConfig::forced_win())
            .unwrap();
        h.oracle.advance(1);
        let _ = h.engine.reveal(bob, b"b").unwrap();

        assert!(matches!(
            h.engine.withdraw_house_funds(alice),
            Err(ShotError::Unauthorized(_))
        ));

        let amount = h.engine.withdraw_house_funds(h.admin).unwrap();
        assert_eq!(amount, Amount::from_sat(200_000));
        assert_eq!(h.engine.custody().balance(&h.house), Amount::from_sat(200_000));
        assert_eq!(h.engine.custody().balance(&h.admin), Amount::ZERO);
        assert_eq!(h.engine.house_funds(), Amount::ZERO);

        let events = h.engine.drain_events();
        assert_eq!(
            events.last().unwrap().event,
            ShotEvent::HouseFundsWithdrawn {
                house_address: h.house,
                amount: Amount::from_sat(200_000)
            }
        );

        assert!(matches!(
            h.engine.withdraw_house_funds(h.house),
            Err(ShotError::NothingPending)
        ));
    }

    #[test]
    fn test_failed_house_withdrawal_restores_balance() {
        let mut h = harness();
        commit(&mut h, AccountId::new(), b"a");
        let bob = AccountId::new();
        commit(&mut h, bob, b"b");
        h.engine
            .set_test_mode(h.admin, TestModeConfig::forced_win())
            .unwrap();
        h.oracle.advance(1);
        let _ = h.engine.reveal(bob, b"b").unwrap();

        let house = h.house;
        h.engine.custody_mut().reject(house);
        assert!(h.engine.withdraw_house_funds(h.admin).is_err());
        assert_eq!(h.engine.house_funds(), Amount::from_sat(200_000));
    }

    #[test]
    fn test_pause_blocks_new_money_only() {
        let mut h = harness();
        let player = AccountId::new();
        commit(&mut h, player, b"s");

        assert!(h.engine.pause(player).is_err());
        h.engine.pause(h.admin).unwrap();
        assert!(!h.engine.can_commit(&AccountId::new()));

        let other = AccountId::new();
        let commitment = ShotCommitment::new(b"x".to_vec(), &other);
        assert!(matches!(
            h.engine.commit(other, *commitment.hash(), SHOT),
            Err(ShotError::Paused)
        ));
        assert!(matches!(
            h.engine.sponsor(other, SHOT),
            Err(ShotError::Paused)
        ));

        h.oracle.advance(1);
        assert!(h.engine.reveal(player, b"s").is_ok());

        h.engine.unpause(h.admin).unwrap();
        h.engine.commit(other, *commitment.hash(), SHOT).unwrap();
    }

    #[test]
    fn test_random_outcome_is_reproducible() {
        let run = || {
            let mut h = harness();
            commit(&mut h, AccountId::from_uuid(uuid::Uuid::from_u128(1)), b"a");
            let bob = AccountId::from_uuid(uuid::Uuid::from_u128(2));
            commit(&mut h, bob, b"b");
            h.oracle.advance(10);
            h.engine.reveal(bob, b"b").unwrap()
        };

        assert_eq!(run().is_win(), run().is_win());
    }

    #[test]
    fn test_remainder_stays_in_pot() {
        let mut h = harness();
        let mut config = RoundConfig::new(h.house);
        config.win_percentage_bp = 8_000;
        config.house_percentage_bp = 1_000;
        h.engine = ShotEngine::new(config, h.admin, h.oracle.clone(), InMemoryBank::new()).unwrap();
        h.engine
            .set_test_mode(h.admin, TestModeConfig::forced_win())
            .unwrap();

        commit(&mut h, AccountId::new(), b"a");
        let bob = AccountId::new();
        commit(&mut h, bob, b"b");
        h.oracle.advance(1);
        let _ = h.engine.reveal(bob, b"b").unwrap();

        assert_eq!(h.engine.current_pot(), Amount::from_sat(200_000));
        assert_eq!(h.engine.house_funds(), Amount::from_sat(200_000));
        assert_eq!(h.engine.custody().balance(&bob), Amount::from_sat(1_600_000));
    }

    #[test]
    fn test_recent_winners_bounded() {
        let mut h = harness();
        let mut config = RoundConfig::new(h.house);
        config.max_recent_winners = 2;
        h.engine = ShotEngine::new(config, h.admin, h.oracle.clone(), InMemoryBank::new()).unwrap();
        h.engine
            .set_test_mode(h.admin, TestModeConfig::forced_win())
            .unwrap();

        let mut winners = Vec::new();
        for round in 0..3u8 {
            h.engine
                .sponsor(AccountId::new(), Amount::from_sat(5_000_000))
                .unwrap();
            let player = AccountId::new();
            commit(&mut h, player, &[round]);
            h.oracle.advance(1);
            assert!(h.engine.reveal(player, &[round]).unwrap().is_win());
            winners.push(player);
        }

        let recent: Vec<AccountId> = h.engine.recent_winners().iter().map(|w| w.player).collect();
        assert_eq!(recent, winners[1..].to_vec());
    }

    #[test]
    fn test_snapshot_restore_preserves_state() {
        let mut h = harness();
        let player = AccountId::new();
        commit(&mut h, player, b"s");
        h.engine
            .set_test_mode(h.admin, TestModeConfig::forced_loss())
            .unwrap();

        let json = serde_json::to_string(&h.engine.snapshot()).unwrap();
        let snapshot: EngineSnapshot = serde_json::from_str(&json).unwrap();
        let mut restored =
            ShotEngine::restore(snapshot, h.oracle.clone(), InMemoryBank::new()).unwrap();

        assert_eq!(restored.current_pot(), SHOT);
        assert!(restored.pending_shot(&player).exists);
        assert!(restored.test_mode().enabled);
        assert_eq!(restored.cooldown_period(), 1);

        h.oracle.advance(1);
        assert!(restored.reveal(player, b"s").is_ok());
    }

    #[test]
    fn test_shared_engine_serializes_callers() {
        let h = harness();
        let oracle = h.oracle.clone();
        let shared = h.engine.into_shared();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&shared);
                std::thread::spawn(move || {
                    let player = AccountId::new();
                    let secret = vec![i as u8; 32];
                    let commitment = ShotCommitment::new(secret, &player);
                    let mut engine = engine.lock();
                    let fee = engine.required_fee();
                    engine.commit(player, *commitment.hash(), fee).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let engine = shared.lock();
        assert_eq!(engine.current_pot(), Amount::from_sat(8_000_000));
        assert_eq!(engine.pending_count(), 8);
        assert_eq!(engine.current_height(), oracle.current_height());
    }
}
