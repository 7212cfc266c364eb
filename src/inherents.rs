// Inherents - Transactions insérées par l'auteur du bloc
//
// Two levels:
// - `Inherent`: what a piece implements, exactly one transaction per block.
// - `InherentHooks`: what the executive calls on a whole runtime, possibly
//   many transactions. `InherentAdapter` lifts the former into the latter, and
//   the aggregator combines the hooks of every piece.

use crate::constraint_checker::{ConstraintChecker, SimpleConstraintChecker};
use crate::types::{codec, BlockNumber, DynamicallyTypedData, Hash, ResolvedInput, Transaction, Weight};
use crate::verifier::{UpForGrabs, Verifier};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Identifiant 8 octets d'une donnée d'inherent
pub type InherentIdentifier = [u8; 8];

/// Erreurs d'inherents
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InherentError {
    #[error("Donnée d'inherent manquante: {}", String::from_utf8_lossy(.0))]
    MissingData(InherentIdentifier),

    #[error("Donnée d'inherent non décodable ({}): {reason}", String::from_utf8_lossy(.identifier))]
    DecodeFailed {
        identifier: InherentIdentifier,
        reason: String,
    },

    #[error("Donnée d'inherent déjà présente: {}", String::from_utf8_lossy(.0))]
    DuplicateData(InherentIdentifier),

    #[error("Expected at most one previous inherent, found {0}")]
    TooManyPrevious(usize),

    #[error("No previous inherent at block {0} (only the first block may omit it)")]
    MissingPrevious(BlockNumber),

    #[error("Previous inherent is malformed: {0}")]
    MalformedPrevious(String),
}

/// Off-chain data handed to inherent creation and checking (time, relay info, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InherentData {
    data: BTreeMap<InherentIdentifier, Vec<u8>>,
}

impl InherentData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute une donnée. Each identifier may be set only once.
    pub fn put_data<T: Serialize>(
        &mut self,
        identifier: InherentIdentifier,
        value: &T,
    ) -> Result<(), InherentError> {
        if self.data.contains_key(&identifier) {
            return Err(InherentError::DuplicateData(identifier));
        }
        self.data.insert(identifier, codec::encode(value));
        Ok(())
    }

    /// Lit une donnée; `Ok(None)` when the identifier is absent
    pub fn get_data<T: DeserializeOwned>(
        &self,
        identifier: &InherentIdentifier,
    ) -> Result<Option<T>, InherentError> {
        match self.data.get(identifier) {
            None => Ok(None),
            Some(bytes) => codec::decode(bytes)
                .map(Some)
                .map_err(|e| InherentError::DecodeFailed {
                    identifier: *identifier,
                    reason: e.to_string(),
                }),
        }
    }

    /// Like `get_data`, but absence is an error
    pub fn require<T: DeserializeOwned>(&self, identifier: &InherentIdentifier) -> Result<T, InherentError> {
        self.get_data(identifier)?
            .ok_or(InherentError::MissingData(*identifier))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Résultat de la vérification des inherents d'un bloc importé
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckInherentsResult {
    errors: BTreeMap<InherentIdentifier, String>,
    fatal_error: bool,
}

impl CheckInherentsResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre une erreur. A fatal error makes the whole block invalid.
    pub fn put_error(&mut self, identifier: InherentIdentifier, error: &dyn fmt::Display, fatal: bool) {
        self.errors.insert(identifier, error.to_string());
        self.fatal_error |= fatal;
    }

    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn fatal_error(&self) -> bool {
        self.fatal_error
    }

    pub fn get_error(&self, identifier: &InherentIdentifier) -> Option<&str> {
        self.errors.get(identifier).map(String::as_str)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&InherentIdentifier, &String)> {
        self.errors.iter()
    }
}

/// Piece-level inherent: exactly one transaction of this kind per block.
///
/// Outputs created by inherents are guarded by `UpForGrabs` so that the next
/// block's inherent can consume them without a redeemer.
pub trait Inherent: SimpleConstraintChecker + Sized {
    const INHERENT_IDENTIFIER: InherentIdentifier;

    /// Builds this block's inherent from the author's data and the previous
    /// block's inherent (with its transaction hash).
    fn create_inherent<V: Verifier + From<UpForGrabs>>(
        authoring_data: &InherentData,
        previous_inherent: Option<(Transaction<V, Self>, Hash)>,
        block_height: BlockNumber,
    ) -> Result<Transaction<V, Self>, InherentError>;

    /// Off-chain checks on an imported block's inherent. Errors are pushed
    /// into `results` rather than returned.
    fn check_inherent<V: Verifier>(
        importing_data: &InherentData,
        inherent: Transaction<V, Self>,
        results: &mut CheckInherentsResult,
    );

    /// Transactions to include in the genesis block
    fn genesis_transactions<V: Verifier + From<UpForGrabs>>() -> Vec<Transaction<V, Self>> {
        Vec::new()
    }
}

/// Runtime-level hooks the executive calls for inherents.
pub trait InherentHooks<V: Verifier, C: ConstraintChecker<V>> {
    fn create_inherents(
        authoring_data: &InherentData,
        previous_inherents: Vec<(Transaction<V, C>, Hash)>,
        block_height: BlockNumber,
    ) -> Result<Vec<Transaction<V, C>>, InherentError>;

    fn check_inherents(
        importing_data: &InherentData,
        inherents: Vec<Transaction<V, C>>,
        results: &mut CheckInherentsResult,
    );

    fn genesis_transactions() -> Vec<Transaction<V, C>>;
}

// Pas d'inherents pour les checkers simples
impl<V: Verifier, C: ConstraintChecker<V>> InherentHooks<V, C> for () {
    fn create_inherents(
        _: &InherentData,
        _: Vec<(Transaction<V, C>, Hash)>,
        _: BlockNumber,
    ) -> Result<Vec<Transaction<V, C>>, InherentError> {
        Ok(Vec::new())
    }

    fn check_inherents(_: &InherentData, _: Vec<Transaction<V, C>>, _: &mut CheckInherentsResult) {}

    fn genesis_transactions() -> Vec<Transaction<V, C>> {
        Vec::new()
    }
}

/// Lifts a piece-level [`Inherent`] into a full, inherent-aware constraint checker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InherentAdapter<T>(pub T);

impl<T: Inherent, V: Verifier + From<UpForGrabs>> ConstraintChecker<V> for InherentAdapter<T> {
    type Error = <T as SimpleConstraintChecker>::Error;
    type Hooks = Self;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        block_height: BlockNumber,
    ) -> Result<Weight, Self::Error> {
        SimpleConstraintChecker::check(&self.0, inputs, peeks, outputs, block_height)
    }

    fn is_inherent(&self) -> bool {
        true
    }
}

impl<T: Inherent, V: Verifier + From<UpForGrabs>> InherentHooks<V, InherentAdapter<T>> for InherentAdapter<T> {
    fn create_inherents(
        authoring_data: &InherentData,
        previous_inherents: Vec<(Transaction<V, InherentAdapter<T>>, Hash)>,
        block_height: BlockNumber,
    ) -> Result<Vec<Transaction<V, InherentAdapter<T>>>, InherentError> {
        if previous_inherents.len() > 1 {
            return Err(InherentError::TooManyPrevious(previous_inherents.len()));
        }

        let previous = previous_inherents
            .into_iter()
            .next()
            .map(|(tx, hash)| (tx.map_checker(|c| c.0), hash));

        let inherent = T::create_inherent(authoring_data, previous, block_height)?;
        debug!(
            "🧩 Created inherent {}",
            String::from_utf8_lossy(&T::INHERENT_IDENTIFIER)
        );
        Ok(vec![inherent.map_checker(InherentAdapter)])
    }

    fn check_inherents(
        importing_data: &InherentData,
        inherents: Vec<Transaction<V, InherentAdapter<T>>>,
        results: &mut CheckInherentsResult,
    ) {
        if inherents.len() != 1 {
            let message = format!("expected exactly one inherent, found {}", inherents.len());
            results.put_error(T::INHERENT_IDENTIFIER, &message, true);
            return;
        }

        for inherent in inherents {
            T::check_inherent(importing_data, inherent.map_checker(|c| c.0), results);
        }
    }

    fn genesis_transactions() -> Vec<Transaction<V, InherentAdapter<T>>> {
        T::genesis_transactions::<V>()
            .into_iter()
            .map(|tx| tx.map_checker(InherentAdapter))
            .collect()
    }
}
