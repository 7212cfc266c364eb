// Multi-signature - Seuil de signatures Sr25519
use super::simple_signature::sr25519_verify;
use super::{Verifier, VerifierError};
use crate::types::{codec, BlockNumber, Signature64};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// `threshold`-of-`signatories.len()` multisig over Sr25519 keys.
///
/// The redeemer is an encoded `Vec<SignatureAndIndex>`. Spending succeeds when
/// at least `threshold` distinct, in-range signatory indices carry a valid
/// signature over the simplified transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdMultiSignature {
    pub threshold: u8,
    pub signatories: Vec<[u8; 32]>,
}

/// One signature in a multisig redeemer, with the index of its signatory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureAndIndex {
    pub signature: Signature64,
    pub index: u8,
}

impl ThresholdMultiSignature {
    pub fn new(threshold: u8, signatories: Vec<[u8; 32]>) -> Self {
        Self {
            threshold,
            signatories,
        }
    }

    pub fn has_duplicate_signatories(&self) -> bool {
        let set: BTreeSet<_> = self.signatories.iter().collect();
        set.len() < self.signatories.len()
    }

    /// Encode le redeemer
    pub fn redeemer(signatures: &[SignatureAndIndex]) -> Vec<u8> {
        codec::encode(signatures)
    }
}

impl Verifier for ThresholdMultiSignature {
    fn verify(&self, simplified_tx: &[u8], _: BlockNumber, redeemer: &[u8]) -> Result<(), VerifierError> {
        if self.has_duplicate_signatories() {
            return Err(VerifierError::BadProof);
        }

        let sigs: Vec<SignatureAndIndex> =
            codec::decode(redeemer).map_err(|_| VerifierError::BadProof)?;

        if sigs.len() < usize::from(self.threshold) {
            return Err(VerifierError::BadProof);
        }

        // Bounds are checked against the signatories, not the redeemer
        if sigs
            .iter()
            .any(|sig| usize::from(sig.index) >= self.signatories.len())
        {
            return Err(VerifierError::BadProof);
        }

        // Chaque signataire ne compte qu'une fois
        let indices: BTreeSet<u8> = sigs.iter().map(|sig| sig.index).collect();
        if indices.len() < sigs.len() {
            return Err(VerifierError::BadProof);
        }

        let valid = sigs
            .iter()
            .filter(|sig| {
                sr25519_verify(
                    &self.signatories[usize::from(sig.index)],
                    simplified_tx,
                    sig.signature.as_bytes(),
                )
            })
            .count();

        if valid >= usize::from(self.threshold) {
            Ok(())
        } else {
            Err(VerifierError::BadProof)
        }
    }
}
