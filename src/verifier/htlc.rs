// Time locks, hash locks et HTLC
use super::simple_signature::ed25519_verify;
use super::{Verifier, VerifierError};
use crate::types::{codec, BlockNumber, Hash, Signature64};
use serde::{Deserialize, Serialize};

/// Spendable from `unlock_block_height` onwards. The redeemer is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLock {
    pub unlock_block_height: BlockNumber,
}

impl Verifier for TimeLock {
    fn verify(&self, _: &[u8], block_height: BlockNumber, _: &[u8]) -> Result<(), VerifierError> {
        if block_height >= self.unlock_block_height {
            Ok(())
        } else {
            Err(VerifierError::NotYetEligible {
                unlock_height: self.unlock_block_height,
                current_height: block_height,
            })
        }
    }
}

/// Spendable by whoever reveals the preimage of `hash_lock` (Blake3)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlakeHashLock {
    pub hash_lock: Hash,
}

impl BlakeHashLock {
    pub fn new_from_secret(secret: &[u8]) -> Self {
        Self {
            hash_lock: Hash::hash(secret),
        }
    }
}

impl Verifier for BlakeHashLock {
    fn verify(&self, _: &[u8], _: BlockNumber, redeemer: &[u8]) -> Result<(), VerifierError> {
        if Hash::hash(redeemer) == self.hash_lock {
            Ok(())
        } else {
            Err(VerifierError::BadProof)
        }
    }
}

/// Hash time lock contract.
///
/// The recipient can claim at any time by revealing the secret and signing.
/// Once `claim_period_end` is reached the refunder can reclaim with a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashTimeLockContract {
    pub hash_lock: Hash,
    pub recipient_pubkey: [u8; 32],
    pub claim_period_end: BlockNumber,
    pub refunder_pubkey: [u8; 32],
}

/// Redeemer d'un HTLC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HtlcSpend {
    Claim { secret: Vec<u8>, signature: Signature64 },
    Refund { signature: Signature64 },
}

impl HtlcSpend {
    pub fn encode(&self) -> Vec<u8> {
        codec::encode(self)
    }
}

impl Verifier for HashTimeLockContract {
    fn verify(&self, simplified_tx: &[u8], block_height: BlockNumber, redeemer: &[u8]) -> Result<(), VerifierError> {
        let spend: HtlcSpend = codec::decode(redeemer).map_err(|_| VerifierError::BadProof)?;

        match spend {
            HtlcSpend::Claim { secret, signature } => {
                if Hash::hash(&secret) != self.hash_lock {
                    return Err(VerifierError::BadProof);
                }
                if !ed25519_verify(&self.recipient_pubkey, simplified_tx, signature.as_bytes()) {
                    return Err(VerifierError::BadProof);
                }
                Ok(())
            }
            HtlcSpend::Refund { signature } => {
                if block_height < self.claim_period_end {
                    return Err(VerifierError::NotYetEligible {
                        unlock_height: self.claim_period_end,
                        current_height: block_height,
                    });
                }
                if !ed25519_verify(&self.refunder_pubkey, simplified_tx, signature.as_bytes()) {
                    return Err(VerifierError::BadProof);
                }
                Ok(())
            }
        }
    }
}
