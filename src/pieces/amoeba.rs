// Amoeba - Exemple minimal de piece
//
// Amibes créées à la génération 0, qui se divisent en deux filles de la
// génération suivante, ou meurent.

use crate::constraint_checker::SimpleConstraintChecker;
use crate::types::{BlockNumber, DynamicallyTypedData, ResolvedInput, UtxoData, Weight};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmoebaDetails {
    pub generation: u32,
    pub four_bytes: [u8; 4],
}

impl UtxoData for AmoebaDetails {
    const TYPE_ID: [u8; 4] = *b"amoe";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmoebaError {
    #[error("Input is not an amoeba")]
    BadlyTypedInput,
    #[error("Output is not an amoeba")]
    BadlyTypedOutput,
    #[error("Creation outputs nothing")]
    CreatedNothing,
    #[error("Creation outputs more than one amoeba")]
    CreatedTooMany,
    #[error("Creation consumes inputs")]
    CreationMayNotConsume,
    #[error("Death consumes no amoeba")]
    NoVictim,
    #[error("Death consumes more than one amoeba")]
    TooManyVictims,
    #[error("Death creates outputs")]
    DeathMayNotCreate,
    #[error("Mitosis must create exactly two daughters")]
    WrongNumberOfDaughters,
    #[error("Mitosis must consume exactly one mother")]
    WrongNumberOfMothers,
    #[error("Génération incorrecte")]
    WrongGeneration,
}

fn amoeba(data: &DynamicallyTypedData, error: AmoebaError) -> Result<AmoebaDetails, AmoebaError> {
    data.extract().map_err(|_| error)
}

/// Crée une amibe de génération 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmoebaCreation;

impl SimpleConstraintChecker for AmoebaCreation {
    type Error = AmoebaError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        _peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        _block_height: BlockNumber,
    ) -> Result<Weight, AmoebaError> {
        let eve = match outputs {
            [] => return Err(AmoebaError::CreatedNothing),
            [eve] => amoeba(eve, AmoebaError::BadlyTypedOutput)?,
            _ => return Err(AmoebaError::CreatedTooMany),
        };
        if eve.generation != 0 {
            return Err(AmoebaError::WrongGeneration);
        }
        if !inputs.is_empty() {
            return Err(AmoebaError::CreationMayNotConsume);
        }
        Ok(0)
    }
}

/// Une mère, deux filles de la génération suivante
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmoebaMitosis;

impl SimpleConstraintChecker for AmoebaMitosis {
    type Error = AmoebaError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        _peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        _block_height: BlockNumber,
    ) -> Result<Weight, AmoebaError> {
        let [mother] = inputs else {
            return Err(AmoebaError::WrongNumberOfMothers);
        };
        let mother = amoeba(&mother.payload, AmoebaError::BadlyTypedInput)?;

        let [first, second] = outputs else {
            return Err(AmoebaError::WrongNumberOfDaughters);
        };
        let next_generation = mother.generation.checked_add(1).ok_or(AmoebaError::WrongGeneration)?;
        for daughter in [first, second] {
            if amoeba(daughter, AmoebaError::BadlyTypedOutput)?.generation != next_generation {
                return Err(AmoebaError::WrongGeneration);
            }
        }
        Ok(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmoebaDeath;

impl SimpleConstraintChecker for AmoebaDeath {
    type Error = AmoebaError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        _peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        _block_height: BlockNumber,
    ) -> Result<Weight, AmoebaError> {
        match inputs {
            [] => return Err(AmoebaError::NoVictim),
            [victim] => {
                amoeba(&victim.payload, AmoebaError::BadlyTypedInput)?;
            }
            _ => return Err(AmoebaError::TooManyVictims),
        }
        if !outputs.is_empty() {
            return Err(AmoebaError::DeathMayNotCreate);
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint_checker::test_utils::resolved;

    fn gen(generation: u32) -> AmoebaDetails {
        AmoebaDetails {
            generation,
            four_bytes: *b"test",
        }
    }

    #[test]
    fn test_creation() {
        assert_eq!(AmoebaCreation.check(&[], &[], &[gen(0).into()], 1), Ok(0));
        assert_eq!(
            AmoebaCreation.check(&[], &[], &[gen(1).into()], 1),
            Err(AmoebaError::WrongGeneration)
        );
        assert_eq!(AmoebaCreation.check(&[], &[], &[], 1), Err(AmoebaError::CreatedNothing));
        assert_eq!(
            AmoebaCreation.check(&[], &[], &[gen(0).into(), gen(0).into()], 1),
            Err(AmoebaError::CreatedTooMany)
        );
        assert_eq!(
            AmoebaCreation.check(&resolved(vec![gen(0)]), &[], &[gen(0).into()], 1),
            Err(AmoebaError::CreationMayNotConsume)
        );
    }

    #[test]
    fn test_mitosis() {
        let mother = resolved(vec![gen(3)]);
        assert_eq!(AmoebaMitosis.check(&mother, &[], &[gen(4).into(), gen(4).into()], 1), Ok(0));
        assert_eq!(
            AmoebaMitosis.check(&mother, &[], &[gen(4).into(), gen(5).into()], 1),
            Err(AmoebaError::WrongGeneration)
        );
        assert_eq!(
            AmoebaMitosis.check(&mother, &[], &[gen(4).into()], 1),
            Err(AmoebaError::WrongNumberOfDaughters)
        );
        assert_eq!(
            AmoebaMitosis.check(&[], &[], &[gen(1).into(), gen(1).into()], 1),
            Err(AmoebaError::WrongNumberOfMothers)
        );
    }

    #[test]
    fn test_death() {
        assert_eq!(AmoebaDeath.check(&resolved(vec![gen(2)]), &[], &[], 1), Ok(0));
        assert_eq!(AmoebaDeath.check(&[], &[], &[], 1), Err(AmoebaError::NoVictim));
        assert_eq!(
            AmoebaDeath.check(&resolved(vec![gen(2), gen(2)]), &[], &[], 1),
            Err(AmoebaError::TooManyVictims)
        );
        assert_eq!(
            AmoebaDeath.check(&resolved(vec![gen(2)]), &[], &[gen(3).into()], 1),
            Err(AmoebaError::DeathMayNotCreate)
        );
    }
}
