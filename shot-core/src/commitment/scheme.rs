use crate::types::{AccountId, Hash32};
use sha2::{Digest, Sha256};

/// Trait for commitment schemes
pub trait CommitmentScheme {
    type Secret: ?Sized;
    type Commitment;

    fn commit(secret: &Self::Secret, player: &AccountId) -> Self::Commitment;
    fn verify(commitment: &Self::Commitment, secret: &Self::Secret, player: &AccountId) -> bool;
}

/// SHA-256 over `secret || player id`. Binding the player prevents one
/// player from replaying another player's revealed secret.
pub struct Sha256Binding;

impl CommitmentScheme for Sha256Binding {
    type Secret = [u8];
    type Commitment = Hash32;

    fn commit(secret: &[u8], player: &AccountId) -> Hash32 {
        let mut hasher = Sha256::new();
        hasher.update(secret);
        hasher.update(player.as_bytes());
        hasher.finalize().into()
    }

    fn verify(commitment: &Hash32, secret: &[u8], player: &AccountId) -> bool {
        Self::commit(secret, player) == *commitment
    }
}
