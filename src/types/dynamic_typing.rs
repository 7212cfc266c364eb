// Dynamic typing - Conteneur à effacement de type pour les payloads UTXO
//
// Pieces are developed independently, so the executive and the UTXO set only
// ever see opaque bytes. Each payload type carries a 4-byte tag; extraction
// checks the tag before attempting to decode, so a payload can never be
// reinterpreted as a different type.

use super::codec;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// A payload type that can be stored in a UTXO.
///
/// `TYPE_ID` must be unique across every piece of a runtime.
pub trait UtxoData: Serialize + DeserializeOwned {
    const TYPE_ID: [u8; 4];
}

/// Données typées dynamiquement (tag + octets encodés)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DynamicallyTypedData {
    pub data: Vec<u8>,
    pub type_id: [u8; 4],
}

impl DynamicallyTypedData {
    /// Downcast vers un type concret
    pub fn extract<T: UtxoData>(&self) -> Result<T, DynamicTypingError> {
        if self.type_id != T::TYPE_ID {
            return Err(DynamicTypingError::WrongType {
                expected: T::TYPE_ID,
                found: self.type_id,
            });
        }
        codec::decode(&self.data).map_err(|_| DynamicTypingError::DecodingFailed)
    }

    /// Vérifie le tag sans décoder
    pub fn is<T: UtxoData>(&self) -> bool {
        self.type_id == T::TYPE_ID
    }
}

impl<T: UtxoData> From<T> for DynamicallyTypedData {
    fn from(value: T) -> Self {
        Self {
            data: codec::encode(&value),
            type_id: T::TYPE_ID,
        }
    }
}

impl fmt::Display for DynamicallyTypedData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}({} bytes)",
            String::from_utf8_lossy(&self.type_id),
            self.data.len()
        )
    }
}

/// Erreurs de downcast
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DynamicTypingError {
    #[error("Wrong payload type: expected {}, found {}", String::from_utf8_lossy(.expected), String::from_utf8_lossy(.found))]
    WrongType { expected: [u8; 4], found: [u8; 4] },

    #[error("Payload bytes do not decode as the tagged type")]
    DecodingFailed,
}
