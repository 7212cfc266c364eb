// Runtime upgrade - Référence vers le code courant du runtime
//
// The chain keeps exactly one `RuntimeRef` output: the hash of the current
// runtime code. An upgrade consumes it and creates a new one matching the
// code carried in the checker itself, so the full code is part of the block.

use crate::constraint_checker::SimpleConstraintChecker;
use crate::types::{BlockNumber, DynamicallyTypedData, Hash, ResolvedInput, UtxoData, Weight};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRef {
    pub hash: Hash,
}

impl RuntimeRef {
    pub fn of(code: &[u8]) -> Self {
        Self { hash: Hash::hash(code) }
    }
}

impl UtxoData for RuntimeRef {
    const TYPE_ID: [u8; 4] = *b"upgd";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeUpgradeError {
    #[error("Une mise à jour consomme exactement une référence")]
    WrongNumberInputs,
    #[error("Une mise à jour crée exactement une référence")]
    WrongNumberOutputs,
    #[error("Input is not a runtime reference")]
    BadlyTypedInput,
    #[error("Output is not a runtime reference")]
    BadlyTypedOutput,
    #[error("Created reference does not match the provided code")]
    OutputMismatch,
    #[error("New code is identical to the current one")]
    UpgradeToSameCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeUpgrade {
    pub full_code: Vec<u8>,
}

impl SimpleConstraintChecker for RuntimeUpgrade {
    type Error = RuntimeUpgradeError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        _peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        block_height: BlockNumber,
    ) -> Result<Weight, RuntimeUpgradeError> {
        let [consumed] = inputs else {
            return Err(RuntimeUpgradeError::WrongNumberInputs);
        };
        let outgoing = consumed
            .payload
            .extract::<RuntimeRef>()
            .map_err(|_| RuntimeUpgradeError::BadlyTypedInput)?;

        let [created] = outputs else {
            return Err(RuntimeUpgradeError::WrongNumberOutputs);
        };
        let incoming = created
            .extract::<RuntimeRef>()
            .map_err(|_| RuntimeUpgradeError::BadlyTypedOutput)?;

        if incoming != RuntimeRef::of(&self.full_code) {
            return Err(RuntimeUpgradeError::OutputMismatch);
        }
        if incoming == outgoing {
            return Err(RuntimeUpgradeError::UpgradeToSameCode);
        }

        info!("⬆️ Runtime upgrade {} -> {} at block #{}", outgoing.hash, incoming.hash, block_height);
        Ok(0)
    }
}
