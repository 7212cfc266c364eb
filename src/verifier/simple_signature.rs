// Simple signatures - Ed25519, Sr25519 et P2PKH
use super::{Verifier, VerifierError};
use crate::types::{codec, transaction_signing_message, BlockNumber, Hash, Signature64};
use ed25519_dalek::{Signature, Verifier as _, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Contexte de signature schnorrkel
pub const SR25519_SIGNING_CONTEXT: &[u8] = b"kratos-utxo";

/// Vérifie une signature Ed25519 sur le message de transaction
pub(crate) fn ed25519_verify(pubkey: &[u8; 32], simplified_tx: &[u8], signature: &[u8]) -> bool {
    let public_key = match VerifyingKey::from_bytes(pubkey) {
        Ok(pk) => pk,
        Err(_) => return false,
    };
    let sig = match Signature64::from_slice(signature) {
        Some(s) => Signature::from_bytes(s.as_bytes()),
        None => return false,
    };

    let message = transaction_signing_message(simplified_tx);
    public_key.verify(&message, &sig).is_ok()
}

/// Vérifie une signature Sr25519 (schnorrkel) sur le message de transaction
pub(crate) fn sr25519_verify(pubkey: &[u8; 32], simplified_tx: &[u8], signature: &[u8]) -> bool {
    let public_key = match schnorrkel::PublicKey::from_bytes(pubkey) {
        Ok(pk) => pk,
        Err(_) => return false,
    };
    let sig = match schnorrkel::Signature::from_bytes(signature) {
        Ok(s) => s,
        Err(_) => return false,
    };

    let message = transaction_signing_message(simplified_tx);
    public_key
        .verify_simple(SR25519_SIGNING_CONTEXT, &message, &sig)
        .is_ok()
}

/// Output owned by a single Ed25519 key. The redeemer is the raw 64-byte signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ed25519Signature {
    pub owner_pubkey: [u8; 32],
}

impl Ed25519Signature {
    pub fn new(owner_pubkey: [u8; 32]) -> Self {
        Self { owner_pubkey }
    }
}

impl Verifier for Ed25519Signature {
    fn verify(&self, simplified_tx: &[u8], _: BlockNumber, redeemer: &[u8]) -> Result<(), VerifierError> {
        if ed25519_verify(&self.owner_pubkey, simplified_tx, redeemer) {
            Ok(())
        } else {
            Err(VerifierError::BadProof)
        }
    }
}

/// Output owned by a single Sr25519 key. The redeemer is the raw 64-byte signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sr25519Signature {
    pub owner_pubkey: [u8; 32],
}

impl Sr25519Signature {
    pub fn new(owner_pubkey: [u8; 32]) -> Self {
        Self { owner_pubkey }
    }
}

impl Verifier for Sr25519Signature {
    fn verify(&self, simplified_tx: &[u8], _: BlockNumber, redeemer: &[u8]) -> Result<(), VerifierError> {
        if sr25519_verify(&self.owner_pubkey, simplified_tx, redeemer) {
            Ok(())
        } else {
            Err(VerifierError::BadProof)
        }
    }
}

/// Pay to public key hash: only the hash of the owner's Ed25519 key is stored.
///
/// Redeemer: encoded `(pubkey, Signature64)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct P2PKH {
    pub owner_pubkey_hash: Hash,
}

impl P2PKH {
    pub fn from_pubkey(pubkey: &[u8; 32]) -> Self {
        Self {
            owner_pubkey_hash: Hash::hash(pubkey),
        }
    }

    /// Encode le redeemer attendu
    pub fn redeemer(pubkey: [u8; 32], signature: Signature64) -> Vec<u8> {
        codec::encode(&(pubkey, signature))
    }
}

impl Verifier for P2PKH {
    fn verify(&self, simplified_tx: &[u8], _: BlockNumber, redeemer: &[u8]) -> Result<(), VerifierError> {
        let (pubkey, signature): ([u8; 32], Signature64) =
            codec::decode(redeemer).map_err(|_| VerifierError::BadProof)?;

        if Hash::hash(&pubkey) != self.owner_pubkey_hash {
            return Err(VerifierError::BadProof);
        }

        if ed25519_verify(&pubkey, simplified_tx, signature.as_bytes()) {
            Ok(())
        } else {
            Err(VerifierError::BadProof)
        }
    }
}
