// Transaction - Références, sorties, entrées et transactions UTXO
use super::codec;
use super::dynamic_typing::DynamicallyTypedData;
use super::primitives::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifiant unique d'une sortie: (hash de la transaction, index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct OutputRef {
    pub tx_hash: Hash,
    pub index: u32,
}

impl OutputRef {
    pub fn new(tx_hash: Hash, index: u32) -> Self {
        Self { tx_hash, index }
    }

    /// Tag utilisé par le pool pour ordonner les transactions dépendantes
    pub fn to_tag(&self) -> Vec<u8> {
        codec::encode(self)
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.tx_hash, self.index)
    }
}

/// Sortie: payload typé dynamiquement + règle de dépense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output<V> {
    pub payload: DynamicallyTypedData,
    pub verifier: V,
}

impl<V> Output<V> {
    pub fn new(payload: impl Into<DynamicallyTypedData>, verifier: impl Into<V>) -> Self {
        Self {
            payload: payload.into(),
            verifier: verifier.into(),
        }
    }
}

/// Entrée: la sortie consommée + la preuve d'autorisation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub output_ref: OutputRef,
    pub redeemer: Vec<u8>,
}

impl Input {
    /// Entrée sans redeemer (à signer plus tard)
    pub fn unsigned(output_ref: OutputRef) -> Self {
        Self {
            output_ref,
            redeemer: Vec::new(),
        }
    }
}

/// A view of one already-fetched input, handed to constraint checkers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub output_ref: OutputRef,
    pub payload: DynamicallyTypedData,
}

/// Transaction UTXO
///
/// Outputs of an applied transaction are addressed by
/// `(hash(transaction), index)`. Peeked outputs are read but never consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction<V, C> {
    pub inputs: Vec<Input>,
    pub peeks: Vec<OutputRef>,
    pub outputs: Vec<Output<V>>,
    pub checker: C,
}

impl<V, C> Transaction<V, C>
where
    V: Serialize + Clone,
    C: Serialize + Clone,
{
    /// Hash de la transaction complète (redeemers inclus)
    pub fn hash(&self) -> Hash {
        Hash::hash(&codec::encode(self))
    }

    /// Copy with every redeemer stripped
    pub fn simplified(&self) -> Self {
        let mut stripped = self.clone();
        for input in stripped.inputs.iter_mut() {
            input.redeemer.clear();
        }
        stripped
    }

    /// Encoded simplified transaction: the bytes every redeemer is checked against
    pub fn simplified_bytes(&self) -> Vec<u8> {
        codec::encode(&self.simplified())
    }

    /// Référence de la n-ième sortie
    pub fn output_ref(&self, index: u32) -> OutputRef {
        OutputRef::new(self.hash(), index)
    }

    /// Références de toutes les sorties, dans l'ordre
    pub fn output_refs(&self) -> Vec<OutputRef> {
        let tx_hash = self.hash();
        (0..self.outputs.len() as u32)
            .map(|index| OutputRef::new(tx_hash, index))
            .collect()
    }
}

impl<V, C> Transaction<V, C> {
    /// Converts the checker (and verifiers) into outer aggregate types
    pub fn transform<V2, C2>(self) -> Transaction<V2, C2>
    where
        V2: From<V>,
        C2: From<C>,
    {
        Transaction {
            inputs: self.inputs,
            peeks: self.peeks,
            outputs: self
                .outputs
                .into_iter()
                .map(|o| Output {
                    payload: o.payload,
                    verifier: o.verifier.into(),
                })
                .collect(),
            checker: self.checker.into(),
        }
    }

    /// Maps the checker while keeping every other field
    pub fn map_checker<C2>(self, f: impl FnOnce(C) -> C2) -> Transaction<V, C2> {
        Transaction {
            inputs: self.inputs,
            peeks: self.peeks,
            outputs: self.outputs,
            checker: f(self.checker),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestTx = Transaction<u8, u16>;

    fn sample_tx() -> TestTx {
        Transaction {
            inputs: vec![Input {
                output_ref: OutputRef::new(Hash::hash(b"parent"), 0),
                redeemer: vec![1, 2, 3],
            }],
            peeks: vec![OutputRef::new(Hash::hash(b"peek"), 3)],
            outputs: vec![Output {
                payload: DynamicallyTypedData {
                    data: vec![9],
                    type_id: *b"test",
                },
                verifier: 1,
            }],
            checker: 7,
        }
    }

    #[test]
    fn test_simplified_strips_redeemers_only() {
        let tx = sample_tx();
        let simple = tx.simplified();
        assert!(simple.inputs[0].redeemer.is_empty());
        assert_eq!(simple.inputs[0].output_ref, tx.inputs[0].output_ref);
        assert_eq!(simple.outputs, tx.outputs);
        assert_eq!(simple.peeks, tx.peeks);
    }

    #[test]
    fn test_simplified_bytes_independent_of_redeemer() {
        let tx1 = sample_tx();
        let mut tx2 = sample_tx();
        tx2.inputs[0].redeemer = vec![42; 64];
        assert_eq!(tx1.simplified_bytes(), tx2.simplified_bytes());
        assert_ne!(tx1.hash(), tx2.hash());
    }

    #[test]
    fn test_output_refs_sequential() {
        let tx = sample_tx();
        let refs = tx.output_refs();
        assert_eq!(refs, vec![OutputRef::new(tx.hash(), 0)]);
        assert_eq!(tx.output_ref(0), refs[0]);
    }

    #[test]
    fn test_transaction_codec_roundtrip() {
        let tx = sample_tx();
        let bytes = codec::encode(&tx);
        let decoded: TestTx = codec::decode(&bytes).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.hash(), tx.hash());
    }

    #[test]
    fn test_transform_into_wider_types() {
        let tx = sample_tx();
        let wide: Transaction<u32, u64> = tx.transform();
        assert_eq!(wide.checker, 7u64);
        assert_eq!(wide.outputs[0].verifier, 1u32);
    }
}
