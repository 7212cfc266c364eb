// Verifier - Règles d'autorisation des dépenses
//
// A verifier is attached to every output and decides whether a given redeemer
// authorizes consuming that output. It sees the simplified transaction (the
// transaction with every redeemer stripped), the current block height and the
// redeemer bytes. Verifiers never touch storage.

pub mod htlc;
pub mod multi_signature;
pub mod simple_signature;

pub use htlc::{BlakeHashLock, HashTimeLockContract, HtlcSpend, TimeLock};
pub use multi_signature::{SignatureAndIndex, ThresholdMultiSignature};
pub use simple_signature::{Ed25519Signature, Sr25519Signature, P2PKH};

use crate::types::BlockNumber;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Debug;

/// Erreurs de vérification
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifierError {
    #[error("Preuve invalide (signature, préimage ou redeemer mal formé)")]
    BadProof,

    #[error("Not yet eligible: unlocks at block {unlock_height}, current block is {current_height}")]
    NotYetEligible {
        unlock_height: BlockNumber,
        current_height: BlockNumber,
    },

    #[error("Output is unspendable")]
    Unspendable,
}

/// Authorization rule attached to every output.
pub trait Verifier: Debug + Clone + PartialEq + Serialize + DeserializeOwned {
    /// Checks that `redeemer` authorizes spending, given the simplified
    /// transaction bytes and the block height.
    fn verify(
        &self,
        simplified_tx: &[u8],
        block_height: BlockNumber,
        redeemer: &[u8],
    ) -> Result<(), VerifierError>;
}

/// Anyone can spend (tests, faucets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpForGrabs;

impl Verifier for UpForGrabs {
    fn verify(&self, _: &[u8], _: BlockNumber, _: &[u8]) -> Result<(), VerifierError> {
        Ok(())
    }
}

/// Nobody can ever spend this output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Unspendable;

impl Verifier for Unspendable {
    fn verify(&self, _: &[u8], _: BlockNumber, _: &[u8]) -> Result<(), VerifierError> {
        Err(VerifierError::Unspendable)
    }
}
