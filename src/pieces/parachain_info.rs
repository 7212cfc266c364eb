// Parachain info - Informations sur la relay chain, par inherent
//
// Each block's author includes one `SetParachainInfo` inherent that consumes
// the info created by the previous block and creates the new one. The relay
// parent number must strictly increase.

use crate::constraint_checker::SimpleConstraintChecker;
use crate::inherents::{CheckInherentsResult, Inherent, InherentData, InherentError, InherentIdentifier};
use crate::types::{
    BlockNumber, DynamicallyTypedData, Hash, Input, Output, OutputRef, ResolvedInput, Transaction, UtxoData,
    Weight,
};
use crate::verifier::{UpForGrabs, Verifier};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const PARACHAIN_INHERENT_IDENTIFIER: InherentIdentifier = *b"sysi1337";

/// Identifiant de parachain par défaut
pub const DEFAULT_PARA_ID: u32 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParachainInfo {
    pub relay_parent_number: u32,
    pub para_id: u32,
}

impl UtxoData for ParachainInfo {
    const TYPE_ID: [u8; 4] = *b"para";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParachainInfoError {
    #[error("Donnée mal typée")]
    BadlyTyped,
    #[error("No new parachain info output")]
    MissingNewInfo,
    #[error("Exactly one parachain info output is allowed")]
    ExtraOutputs,
    #[error("Previous parachain info is not consumed")]
    MissingPreviousInfo,
    #[error("Exactly one previous parachain info may be consumed")]
    ExtraInputs,
    #[error("Relay parent number is not increasing")]
    RelayBlockNotIncreasing,
    #[error("Para id changed")]
    ParaIdChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetParachainInfo;

impl SimpleConstraintChecker for SetParachainInfo {
    type Error = ParachainInfoError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        _peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        block_height: BlockNumber,
    ) -> Result<Weight, ParachainInfoError> {
        let current = match outputs {
            [] => return Err(ParachainInfoError::MissingNewInfo),
            [current] => current
                .extract::<ParachainInfo>()
                .map_err(|_| ParachainInfoError::BadlyTyped)?,
            _ => return Err(ParachainInfoError::ExtraOutputs),
        };

        // Premier bloc: pas d'info précédente
        if block_height == 1 && inputs.is_empty() {
            return Ok(0);
        }

        let previous = match inputs {
            [] => return Err(ParachainInfoError::MissingPreviousInfo),
            [previous] => previous
                .payload
                .extract::<ParachainInfo>()
                .map_err(|_| ParachainInfoError::BadlyTyped)?,
            _ => return Err(ParachainInfoError::ExtraInputs),
        };

        if current.relay_parent_number <= previous.relay_parent_number {
            return Err(ParachainInfoError::RelayBlockNotIncreasing);
        }
        if current.para_id != previous.para_id {
            return Err(ParachainInfoError::ParaIdChanged);
        }
        Ok(0)
    }
}

impl Inherent for SetParachainInfo {
    const INHERENT_IDENTIFIER: InherentIdentifier = PARACHAIN_INHERENT_IDENTIFIER;

    fn create_inherent<V: Verifier + From<UpForGrabs>>(
        authoring_data: &InherentData,
        previous_inherent: Option<(Transaction<V, Self>, Hash)>,
        block_height: BlockNumber,
    ) -> Result<Transaction<V, Self>, InherentError> {
        let current: ParachainInfo = authoring_data.require(&PARACHAIN_INHERENT_IDENTIFIER)?;
        debug!(
            "🔗 Parachain {} at relay parent #{}",
            current.para_id, current.relay_parent_number
        );

        let inputs = match (previous_inherent, block_height) {
            (None, 1) => Vec::new(),
            (None, height) => return Err(InherentError::MissingPrevious(height)),
            // Toujours une seule sortie, à l'index 0
            (Some((_, previous_hash)), _) => vec![Input::unsigned(OutputRef::new(previous_hash, 0))],
        };

        Ok(Transaction {
            inputs,
            peeks: Vec::new(),
            outputs: vec![Output::new(current, UpForGrabs)],
            checker: SetParachainInfo,
        })
    }

    fn check_inherent<V: Verifier>(
        importing_data: &InherentData,
        inherent: Transaction<V, Self>,
        results: &mut CheckInherentsResult,
    ) {
        let Ok(Some(local)) = importing_data.get_data::<ParachainInfo>(&PARACHAIN_INHERENT_IDENTIFIER) else {
            debug!("🔗 No local parachain data, skipping off-chain checks");
            return;
        };
        let on_chain = inherent
            .outputs
            .first()
            .and_then(|output| output.payload.extract::<ParachainInfo>().ok());
        match on_chain {
            Some(info) if info.para_id == local.para_id => {}
            Some(_) => results.put_error(PARACHAIN_INHERENT_IDENTIFIER, &"para id mismatch", true),
            None => results.put_error(PARACHAIN_INHERENT_IDENTIFIER, &"no parachain info output", true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint_checker::test_utils::resolved;

    fn info(relay_parent_number: u32) -> ParachainInfo {
        ParachainInfo {
            relay_parent_number,
            para_id: DEFAULT_PARA_ID,
        }
    }

    #[test]
    fn test_update_info() {
        let inputs = resolved(vec![info(10)]);
        assert_eq!(SetParachainInfo.check(&inputs, &[], &[info(11).into()], 5), Ok(0));
        assert_eq!(
            SetParachainInfo.check(&inputs, &[], &[info(10).into()], 5),
            Err(ParachainInfoError::RelayBlockNotIncreasing)
        );
    }

    #[test]
    fn test_previous_is_read_from_input() {
        // L'ancienne valeur vient de l'entrée, pas de la sortie
        let inputs = resolved(vec![info(20)]);
        assert_eq!(
            SetParachainInfo.check(&inputs, &[], &[info(15).into()], 5),
            Err(ParachainInfoError::RelayBlockNotIncreasing)
        );
    }

    #[test]
    fn test_shape_errors() {
        assert_eq!(
            SetParachainInfo.check(&[], &[], &[info(3).into()], 5),
            Err(ParachainInfoError::MissingPreviousInfo)
        );
        assert_eq!(
            SetParachainInfo.check(&resolved(vec![info(1), info(2)]), &[], &[info(3).into()], 5),
            Err(ParachainInfoError::ExtraInputs)
        );
        assert_eq!(
            SetParachainInfo.check(&resolved(vec![info(1)]), &[], &[], 5),
            Err(ParachainInfoError::MissingNewInfo)
        );
        assert_eq!(
            SetParachainInfo.check(&resolved(vec![info(1)]), &[], &[info(2).into(), info(3).into()], 5),
            Err(ParachainInfoError::ExtraOutputs)
        );
        let moved = ParachainInfo {
            relay_parent_number: 2,
            para_id: 7,
        };
        assert_eq!(
            SetParachainInfo.check(&resolved(vec![info(1)]), &[], &[moved.into()], 5),
            Err(ParachainInfoError::ParaIdChanged)
        );
    }

    #[test]
    fn test_first_block() {
        assert_eq!(SetParachainInfo.check(&[], &[], &[info(3).into()], 1), Ok(0));
    }

    #[test]
    fn test_create_and_check_inherent() {
        let mut data = InherentData::new();
        data.put_data(PARACHAIN_INHERENT_IDENTIFIER, &info(8)).unwrap();

        let first: Transaction<UpForGrabs, SetParachainInfo> =
            SetParachainInfo::create_inherent(&data, None, 1).unwrap();
        assert!(first.inputs.is_empty());

        let hash = first.hash();
        let second = SetParachainInfo::create_inherent(&data, Some((first, hash)), 2).unwrap();
        assert_eq!(second.inputs[0].output_ref, OutputRef::new(hash, 0));

        let mut results = CheckInherentsResult::new();
        SetParachainInfo::check_inherent(&data, second, &mut results);
        assert!(results.ok());
    }

    #[test]
    fn test_check_inherent_para_id_mismatch() {
        let mut authoring = InherentData::new();
        authoring.put_data(PARACHAIN_INHERENT_IDENTIFIER, &info(8)).unwrap();
        let tx: Transaction<UpForGrabs, SetParachainInfo> =
            SetParachainInfo::create_inherent(&authoring, None, 1).unwrap();

        let mut importing = InherentData::new();
        let other = ParachainInfo {
            relay_parent_number: 8,
            para_id: 1,
        };
        importing.put_data(PARACHAIN_INHERENT_IDENTIFIER, &other).unwrap();
        let mut results = CheckInherentsResult::new();
        SetParachainInfo::check_inherent(&importing, tx, &mut results);
        assert!(results.fatal_error());
    }
}
