// PoE - Preuve d'existence
//
// A claim is the hash of some off-chain document together with the height
// from which it takes effect. Claims can be created, revoked by their owner,
// or disputed: when two outputs claim the same hash, the oldest one wins and
// the newer ones may be consumed by anyone who peeks at the winner.

use crate::constraint_checker::SimpleConstraintChecker;
use crate::types::{BlockNumber, DynamicallyTypedData, Hash, ResolvedInput, UtxoData, Weight};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimData {
    pub claim: Hash,
    pub effective_height: BlockNumber,
}

impl UtxoData for ClaimData {
    const TYPE_ID: [u8; 4] = *b"poe_";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoeError {
    #[error("Nombre d'entrées invalide")]
    WrongNumberInputs,
    #[error("Nombre de sorties invalide")]
    WrongNumberOutputs,
    #[error("Un litige doit consulter exactement un gagnant")]
    WrongNumberPeeks,
    #[error("Input is not a claim")]
    BadlyTypedInput,
    #[error("Output is not a claim")]
    BadlyTypedOutput,
    #[error("Peek is not a claim")]
    BadlyTypedPeek,
    #[error("Claim takes effect before the current block")]
    EffectiveHeightInPast,
    #[error("Disputed claims are about different documents")]
    DisputingMismatchedClaims,
    #[error("Winner is not older than every loser")]
    IncorrectDisputeWinner,
}

fn claim(data: &DynamicallyTypedData, error: PoeError) -> Result<ClaimData, PoeError> {
    data.extract().map_err(|_| error)
}

/// Crée une ou plusieurs revendications, effectives au plus tôt maintenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoeClaim;

impl SimpleConstraintChecker for PoeClaim {
    type Error = PoeError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        _peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        block_height: BlockNumber,
    ) -> Result<Weight, PoeError> {
        if !inputs.is_empty() {
            return Err(PoeError::WrongNumberInputs);
        }
        if outputs.is_empty() {
            return Err(PoeError::WrongNumberOutputs);
        }
        for output in outputs {
            let output = claim(output, PoeError::BadlyTypedOutput)?;
            if output.effective_height < block_height {
                return Err(PoeError::EffectiveHeightInPast);
            }
        }
        Ok(0)
    }
}

/// Révocation par le propriétaire: consume claims, create nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoeRevoke;

impl SimpleConstraintChecker for PoeRevoke {
    type Error = PoeError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        _peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        _block_height: BlockNumber,
    ) -> Result<Weight, PoeError> {
        if inputs.is_empty() {
            return Err(PoeError::WrongNumberInputs);
        }
        if !outputs.is_empty() {
            return Err(PoeError::WrongNumberOutputs);
        }
        for input in inputs {
            claim(&input.payload, PoeError::BadlyTypedInput)?;
        }
        Ok(0)
    }
}

/// Litige: the peeked winner must be strictly older than every consumed loser
/// and claim the same document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoeDispute;

impl SimpleConstraintChecker for PoeDispute {
    type Error = PoeError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        _block_height: BlockNumber,
    ) -> Result<Weight, PoeError> {
        let [winner] = peeks else {
            return Err(PoeError::WrongNumberPeeks);
        };
        let winner = claim(winner, PoeError::BadlyTypedPeek)?;

        if inputs.is_empty() {
            return Err(PoeError::WrongNumberInputs);
        }
        if !outputs.is_empty() {
            return Err(PoeError::WrongNumberOutputs);
        }

        for input in inputs {
            let loser = claim(&input.payload, PoeError::BadlyTypedInput)?;
            if loser.claim != winner.claim {
                return Err(PoeError::DisputingMismatchedClaims);
            }
            if winner.effective_height >= loser.effective_height {
                return Err(PoeError::IncorrectDisputeWinner);
            }
        }

        debug!("⚖️ Dispute on {} settled, {} losers removed", winner.claim, inputs.len());
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint_checker::test_utils::resolved;

    fn at(height: BlockNumber) -> ClaimData {
        ClaimData {
            claim: Hash::hash(b"manuscript"),
            effective_height: height,
        }
    }

    fn bogus() -> DynamicallyTypedData {
        DynamicallyTypedData {
            data: vec![],
            type_id: *b"nope",
        }
    }

    #[test]
    fn test_claim() {
        assert_eq!(PoeClaim.check(&[], &[], &[at(5).into(), at(9).into()], 5), Ok(0));
        assert_eq!(
            PoeClaim.check(&[], &[], &[at(4).into()], 5),
            Err(PoeError::EffectiveHeightInPast)
        );
        assert_eq!(PoeClaim.check(&[], &[], &[bogus()], 5), Err(PoeError::BadlyTypedOutput));
        assert_eq!(
            PoeClaim.check(&resolved(vec![at(1)]), &[], &[at(5).into()], 5),
            Err(PoeError::WrongNumberInputs)
        );
    }

    #[test]
    fn test_revoke() {
        assert_eq!(PoeRevoke.check(&resolved(vec![at(1)]), &[], &[], 5), Ok(0));
        assert_eq!(
            PoeRevoke.check(&resolved(vec![at(1)]), &[], &[at(1).into()], 5),
            Err(PoeError::WrongNumberOutputs)
        );
        assert_eq!(
            PoeRevoke.check(&resolved(vec![bogus()]), &[], &[], 5),
            Err(PoeError::BadlyTypedInput)
        );
    }

    #[test]
    fn test_dispute_oldest_wins() {
        let losers = resolved(vec![at(7), at(9)]);
        assert_eq!(PoeDispute.check(&losers, &[at(3).into()], &[], 10), Ok(0));
    }

    #[test]
    fn test_dispute_winner_must_be_older() {
        let losers = resolved(vec![at(7), at(3)]);
        assert_eq!(
            PoeDispute.check(&losers, &[at(3).into()], &[], 10),
            Err(PoeError::IncorrectDisputeWinner)
        );
    }

    #[test]
    fn test_dispute_other_document() {
        let other = ClaimData {
            claim: Hash::hash(b"other"),
            effective_height: 8,
        };
        assert_eq!(
            PoeDispute.check(&resolved(vec![other]), &[at(3).into()], &[], 10),
            Err(PoeError::DisputingMismatchedClaims)
        );
    }

    #[test]
    fn test_dispute_shape() {
        let losers = resolved(vec![at(7)]);
        assert_eq!(PoeDispute.check(&losers, &[], &[], 10), Err(PoeError::WrongNumberPeeks));
        assert_eq!(
            PoeDispute.check(&[], &[at(3).into()], &[], 10),
            Err(PoeError::WrongNumberInputs)
        );
        assert_eq!(
            PoeDispute.check(&losers, &[at(3).into()], &[at(3).into()], 10),
            Err(PoeError::WrongNumberOutputs)
        );
    }
}
