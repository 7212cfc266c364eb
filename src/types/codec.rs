// Codec - Encodage binaire canonique (bincode, varint, little endian)
//
// Every hash, signature payload and storage value goes through this module so
// that a given value has exactly one byte representation.

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

/// Taille maximale acceptée au décodage (4 MiB)
pub const MAX_DECODE_SIZE: u64 = 4 * 1024 * 1024;

/// Erreurs de codec
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Décodage échoué: {0}")]
    DecodeFailed(String),

    #[error("Encodage échoué: {0}")]
    EncodeFailed(String),
}

fn encode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_varint_encoding()
        .with_little_endian()
}

fn decode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_varint_encoding()
        .with_little_endian()
        .with_limit(MAX_DECODE_SIZE)
        .reject_trailing_bytes()
}

/// Encode une valeur
///
/// Serializing a derived `Serialize` type into a `Vec` has no size limit and
/// every sequence carries its length, so the encoder cannot fail.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    encode_options()
        .serialize(value)
        .expect("encoding into an unbounded Vec never fails")
}

/// Encodage faillible, pour les types dont le `Serialize` est écrit à la main
pub fn try_encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    encode_options()
        .serialize(value)
        .map_err(|e| CodecError::EncodeFailed(e.to_string()))
}

/// Décode une valeur. Trailing bytes and oversized inputs are rejected.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    decode_options()
        .deserialize(bytes)
        .map_err(|e| CodecError::DecodeFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_is_compact() {
        assert_eq!(encode(&5u32), vec![5]);
        assert_eq!(encode(&5u128), vec![5]);
        assert_eq!(decode::<u32>(&[5]).unwrap(), 5);
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        assert!(matches!(
            decode::<u32>(&[5, 0]),
            Err(CodecError::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_rejects_truncated_input() {
        let bytes = encode(&(1u8, vec![1u8, 2, 3]));
        assert!(decode::<(u8, Vec<u8>)>(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_rejects_absurd_length_prefix() {
        // Length prefix claims u64::MAX elements
        let mut bytes = vec![0xff];
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        assert!(decode::<Vec<u8>>(&bytes).is_err());
    }
}
