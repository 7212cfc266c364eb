// Signature wrapper pour sérialisation + séparation de domaine
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Domain separation for signatures
// =============================================================================
//
// Every signature checked by a verifier covers a domain-prefixed message, so a
// signature produced for a transaction can never be replayed in another
// context (and vice versa).
// =============================================================================

/// Domain separator for transaction signatures (simplified transaction bytes)
pub const DOMAIN_TRANSACTION: &[u8] = b"KRATOS_UTXO_TX_V1:";

/// Create a domain-separated message for signing
#[inline]
pub fn domain_separate(domain: &[u8], message: &[u8]) -> Vec<u8> {
    let mut separated = Vec::with_capacity(domain.len() + message.len());
    separated.extend_from_slice(domain);
    separated.extend_from_slice(message);
    separated
}

/// Message qu'un propriétaire signe pour dépenser une sortie
pub fn transaction_signing_message(simplified_tx: &[u8]) -> Vec<u8> {
    domain_separate(DOMAIN_TRANSACTION, simplified_tx)
}

/// Wrapper pour signatures 64 bytes (Ed25519 / Sr25519) avec sérialisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature64(pub [u8; 64]);

impl Signature64 {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn zero() -> Self {
        Self([0; 64])
    }

    /// Interprète un redeemer brut comme une signature
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 64] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl From<[u8; 64]> for Signature64 {
    fn from(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Signature64 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// Sérialisation manuelle
impl Serialize for Signature64 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Signature64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = <Vec<u8>>::deserialize(deserializer)?;
        Signature64::from_slice(&bytes)
            .ok_or_else(|| serde::de::Error::custom("Signature must be 64 bytes"))
    }
}
