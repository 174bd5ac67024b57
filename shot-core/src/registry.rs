use crate::types::{AccountId, Hash32, Height, PendingShot};
use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outstanding commitments, at most one per player.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitmentRegistry {
    shots: HashMap<AccountId, PendingShot>,
}

impl CommitmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, player: &AccountId) -> Option<&PendingShot> {
        self.shots.get(player)
    }

    pub fn contains(&self, player: &AccountId) -> bool {
        self.shots.contains_key(player)
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &PendingShot)> {
        self.shots.iter()
    }

    /// Stores a new commitment. Returns `false` if one is already pending.
    pub fn insert(
        &mut self,
        player: AccountId,
        commitment_hash: Hash32,
        height_at_commit: Height,
        amount_paid: Amount,
    ) -> bool {
        if self.shots.contains_key(&player) {
            return false;
        }

        self.shots.insert(
            player,
            PendingShot {
                commitment_hash,
                height_at_commit,
                amount_paid,
            },
        );
        true
    }

    pub fn remove(&mut self, player: &AccountId) -> Option<PendingShot> {
        self.shots.remove(player)
    }

    /// Players whose commitment can no longer be revealed.
    pub fn expired(&self, current: Height, window_end: Height) -> Vec<AccountId> {
        self.shots
            .iter()
            .filter(|(_, shot)| shot.is_expired(current, window_end))
            .map(|(player, _)| *player)
            .collect()
    }
}

impl PendingShot {
    pub fn elapsed(&self, current: Height) -> u64 {
        current.saturating_sub(self.height_at_commit)
    }

    pub fn is_expired(&self, current: Height, window_end: Height) -> bool {
        self.elapsed(current) > window_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pending_per_player() {
        let mut registry = CommitmentRegistry::new();
        let player = AccountId::new();

        assert!(registry.insert(player, [1u8; 32], 10, Amount::from_sat(100)));
        assert!(!registry.insert(player, [2u8; 32], 11, Amount::from_sat(100)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&player).unwrap().commitment_hash, [1u8; 32]);

        let removed = registry.remove(&player).unwrap();
        assert_eq!(removed.height_at_commit, 10);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_expiry_is_strictly_after_window_end() {
        let shot = PendingShot {
            commitment_hash: [0u8; 32],
            height_at_commit: 100,
            amount_paid: Amount::from_sat(1),
        };

        assert!(!shot.is_expired(356, 256));
        assert!(shot.is_expired(357, 256));
        assert_eq!(shot.elapsed(50), 0);
    }

    #[test]
    fn test_expired_listing() {
        let mut registry = CommitmentRegistry::new();
        let old = AccountId::new();
        let fresh = AccountId::new();
        registry.insert(old, [0u8; 32], 0, Amount::from_sat(1));
        registry.insert(fresh, [0u8; 32], 200, Amount::from_sat(1));

        assert_eq!(registry.expired(300, 256), vec![old]);
    }
}
