pub mod scheme;

pub use scheme::{CommitmentScheme, Sha256Binding};

use crate::types::{AccountId, Hash32};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Commitment a player submits before revealing the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotCommitment {
    #[serde(with = "crate::types::hex_bytes")]
    hash: Hash32,
    #[serde(skip)]
    secret: Option<Vec<u8>>,
}

impl ShotCommitment {
    pub fn new(secret: Vec<u8>, player: &AccountId) -> Self {
        Self {
            hash: Sha256Binding::commit(&secret, player),
            secret: Some(secret),
        }
    }

    pub fn from_hash(hash: Hash32) -> Self {
        Self { hash, secret: None }
    }

    pub fn hash(&self) -> &Hash32 {
        &self.hash
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn verify(&self, secret: &[u8], player: &AccountId) -> bool {
        Sha256Binding::verify(&self.hash, secret, player)
    }

    pub fn reveal(self) -> Option<Vec<u8>> {
        self.secret
    }
}

/// Fresh 32-byte secret from the thread-local CSPRNG.
pub fn generate_secret() -> Vec<u8> {
    let mut secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret.to_vec()
}
