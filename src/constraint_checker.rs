// Constraint checker - Règles métier des pieces
//
// A constraint checker sees the already-fetched payloads of a transaction's
// inputs, peeks and outputs and decides whether the state transition is
// allowed. It never touches storage and never sees verifiers or redeemers.

use crate::inherents::InherentHooks;
use crate::types::{BlockNumber, DynamicallyTypedData, ResolvedInput, Weight};
use crate::verifier::Verifier;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::{Debug, Display};

/// Bounds shared by every checker error type
pub trait CheckerError: Debug + Display + Clone + PartialEq {}

impl<T: Debug + Display + Clone + PartialEq> CheckerError for T {}

/// Business rule of an ordinary (non-inherent) piece.
///
/// Every simple checker is lifted into a full [`ConstraintChecker`] by a
/// blanket implementation.
pub trait SimpleConstraintChecker: Debug + Clone + PartialEq + Serialize + DeserializeOwned {
    type Error: CheckerError;

    /// Returns the weight consumed by the transaction when the rule holds.
    fn check(
        &self,
        inputs: &[ResolvedInput],
        peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        block_height: BlockNumber,
    ) -> Result<Weight, Self::Error>;
}

/// Full constraint checker, aware of inherents.
pub trait ConstraintChecker<V: Verifier>:
    Debug + Clone + PartialEq + Serialize + DeserializeOwned
{
    type Error: CheckerError;

    /// Hooks used by the block author and importer to create and check inherents
    type Hooks: InherentHooks<V, Self>;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        block_height: BlockNumber,
    ) -> Result<Weight, Self::Error>;

    /// Inherent transactions are inserted by the block author, never gossiped
    fn is_inherent(&self) -> bool;
}

impl<T: SimpleConstraintChecker, V: Verifier> ConstraintChecker<V> for T {
    type Error = <T as SimpleConstraintChecker>::Error;
    type Hooks = ();

    fn check(
        &self,
        inputs: &[ResolvedInput],
        peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        block_height: BlockNumber,
    ) -> Result<Weight, Self::Error> {
        SimpleConstraintChecker::check(self, inputs, peeks, outputs, block_height)
    }

    fn is_inherent(&self) -> bool {
        false
    }
}

/// Helpers shared by the pieces' test suites
#[cfg(test)]
pub(crate) mod test_utils {
    use crate::types::{Hash, OutputRef, ResolvedInput};

    /// Wraps payloads as resolved inputs with distinct dummy refs
    pub fn resolved<I, P>(payloads: I) -> Vec<ResolvedInput>
    where
        I: IntoIterator<Item = P>,
        P: Into<crate::types::DynamicallyTypedData>,
    {
        payloads
            .into_iter()
            .enumerate()
            .map(|(i, p)| ResolvedInput {
                output_ref: OutputRef::new(Hash::hash(b"test input"), i as u32),
                payload: p.into(),
            })
            .collect()
    }
}
