// Timestamp - Horodatage des blocs par inherent
//
// Each block's author notes the current time with a `SetTimestamp` inherent.
// It consumes the previous `BestTimestamp` and creates a new `BestTimestamp`
// plus a `NotedTimestamp` for the same time. The best one is consumed by the
// next block; noted ones stay around for transactions that peek at them and
// can be cleaned up once they are old enough.

use crate::constraint_checker::SimpleConstraintChecker;
use crate::inherents::{CheckInherentsResult, Inherent, InherentData, InherentError, InherentIdentifier};
use crate::types::{
    BlockNumber, DynamicallyTypedData, Hash, Input, Output, OutputRef, ResolvedInput, Timestamp, Transaction,
    UtxoData, Weight,
};
use crate::verifier::{UpForGrabs, Verifier};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Identifiant de la donnée d'inherent (millisecondes depuis l'epoch Unix)
pub const TIMESTAMP_INHERENT_IDENTIFIER: InherentIdentifier = *b"timstap0";

/// Écart minimal entre deux timestamps consécutifs (ms)
pub const MINIMUM_TIME_INTERVAL: Timestamp = 200;

/// Âge minimal d'un timestamp noté avant nettoyage: un jour (ms)
pub const CLEANUP_AGE: Timestamp = 1000 * 60 * 60 * 24;

/// Avance maximale d'un bloc importé sur l'horloge locale (ms)
pub const MAX_DRIFT: Timestamp = 60_000;

/// Le plus récent timestamp de la chaîne
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BestTimestamp(pub Timestamp);

impl UtxoData for BestTimestamp {
    const TYPE_ID: [u8; 4] = *b"best";
}

/// Un timestamp noté à un moment de l'histoire de la chaîne
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NotedTimestamp(pub Timestamp);

impl UtxoData for NotedTimestamp {
    const TYPE_ID: [u8; 4] = *b"note";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("Donnée mal typée")]
    BadlyTyped,
    #[error("Missing new best timestamp output")]
    MissingNewBestTimestamp,
    #[error("Missing new noted timestamp output")]
    MissingNewNotedTimestamp,
    #[error("Setting the timestamp creates exactly two outputs")]
    TooManyOutputsWhileSettingTimestamp,
    #[error("Missing previous best timestamp input")]
    MissingPreviousBestTimestamp,
    #[error("Setting the timestamp consumes exactly one input")]
    TooManyInputsWhileSettingTimestamp,
    #[error("First block timestamp may not consume inputs")]
    InputsInFirstBlock,
    #[error("New timestamp is not far enough after the previous one")]
    TimestampTooOld,
    #[error("Best and noted timestamps differ")]
    InconsistentBestAndNotedTimestamps,
    #[error("Cleanup needs one noted timestamp peek as reference")]
    CleanupRequiresOneReference,
    #[error("Cleanup cannot create state")]
    CleanupCannotCreateState,
    #[error("Timestamp is not old enough to be cleaned up")]
    DontBeSoHasty,
}

/// Met à jour le meilleur timestamp. Only valid as an inherent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SetTimestamp;

impl SimpleConstraintChecker for SetTimestamp {
    type Error = TimestampError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        _peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        block_height: BlockNumber,
    ) -> Result<Weight, TimestampError> {
        let new_best = outputs
            .first()
            .ok_or(TimestampError::MissingNewBestTimestamp)?
            .extract::<BestTimestamp>()
            .map_err(|_| TimestampError::BadlyTyped)?;
        let new_noted = outputs
            .get(1)
            .ok_or(TimestampError::MissingNewNotedTimestamp)?
            .extract::<NotedTimestamp>()
            .map_err(|_| TimestampError::BadlyTyped)?;
        if outputs.len() > 2 {
            return Err(TimestampError::TooManyOutputsWhileSettingTimestamp);
        }
        if new_best.0 != new_noted.0 {
            return Err(TimestampError::InconsistentBestAndNotedTimestamps);
        }

        // Premier bloc: rien à consommer
        if block_height == 1 {
            debug!("🕰️ First block timestamp {}", new_best.0);
            if !inputs.is_empty() {
                return Err(TimestampError::InputsInFirstBlock);
            }
            return Ok(0);
        }

        let old_best = match inputs {
            [] => return Err(TimestampError::MissingPreviousBestTimestamp),
            [old] => old
                .payload
                .extract::<BestTimestamp>()
                .map_err(|_| TimestampError::BadlyTyped)?,
            _ => return Err(TimestampError::TooManyInputsWhileSettingTimestamp),
        };
        if new_best.0 < old_best.0.saturating_add(MINIMUM_TIME_INTERVAL) {
            return Err(TimestampError::TimestampTooOld);
        }
        Ok(0)
    }
}

impl Inherent for SetTimestamp {
    const INHERENT_IDENTIFIER: InherentIdentifier = TIMESTAMP_INHERENT_IDENTIFIER;

    fn create_inherent<V: Verifier + From<UpForGrabs>>(
        authoring_data: &InherentData,
        previous_inherent: Option<(Transaction<V, Self>, Hash)>,
        block_height: BlockNumber,
    ) -> Result<Transaction<V, Self>, InherentError> {
        let now: Timestamp = authoring_data.require(&TIMESTAMP_INHERENT_IDENTIFIER)?;
        debug!("🕰️ Local time while creating inherent: {}", now);

        let mut inputs = Vec::new();
        match (previous_inherent, block_height) {
            (None, 1) => {}
            (None, height) => return Err(InherentError::MissingPrevious(height)),
            (Some((previous, previous_hash)), _) => {
                let index = previous
                    .outputs
                    .iter()
                    .position(|output| output.payload.is::<BestTimestamp>())
                    .ok_or_else(|| InherentError::MalformedPrevious("no best timestamp output".to_string()))?;
                let index = u32::try_from(index)
                    .map_err(|_| InherentError::MalformedPrevious("output index overflow".to_string()))?;
                // La sortie est UpForGrabs: redeemer vide
                inputs.push(Input::unsigned(OutputRef::new(previous_hash, index)));
            }
        }

        Ok(Transaction {
            inputs,
            peeks: Vec::new(),
            outputs: vec![
                Output::new(BestTimestamp(now), UpForGrabs),
                Output::new(NotedTimestamp(now), UpForGrabs),
            ],
            checker: SetTimestamp,
        })
    }

    fn check_inherent<V: Verifier>(
        importing_data: &InherentData,
        inherent: Transaction<V, Self>,
        results: &mut CheckInherentsResult,
    ) {
        let local: Timestamp = match importing_data.require(&TIMESTAMP_INHERENT_IDENTIFIER) {
            Ok(local) => local,
            Err(e) => {
                results.put_error(TIMESTAMP_INHERENT_IDENTIFIER, &e, true);
                return;
            }
        };

        let on_chain = inherent
            .outputs
            .iter()
            .find_map(|output| output.payload.extract::<BestTimestamp>().ok());
        let Some(on_chain) = on_chain else {
            results.put_error(TIMESTAMP_INHERENT_IDENTIFIER, &"no best timestamp output", true);
            return;
        };

        debug!("🕰️ Local time {} / block time {}", local, on_chain.0);
        // L'intervalle minimal est vérifié on-chain par le checker
        if on_chain.0 > local.saturating_add(MAX_DRIFT) {
            warn!("🕰️ Block timestamp {} too far in the future (local {})", on_chain.0, local);
            results.put_error(TIMESTAMP_INHERENT_IDENTIFIER, &"timestamp too far in future", true);
        }
    }
}

/// Nettoyage volontaire des timestamps notés, given a peeked reference at
/// least `CLEANUP_AGE` newer than each of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanUpTimestamp;

impl SimpleConstraintChecker for CleanUpTimestamp {
    type Error = TimestampError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        _block_height: BlockNumber,
    ) -> Result<Weight, TimestampError> {
        let reference = peeks
            .first()
            .ok_or(TimestampError::CleanupRequiresOneReference)?
            .extract::<NotedTimestamp>()
            .map_err(|_| TimestampError::BadlyTyped)?;

        if !outputs.is_empty() {
            return Err(TimestampError::CleanupCannotCreateState);
        }

        for input in inputs {
            let old = input
                .payload
                .extract::<NotedTimestamp>()
                .map_err(|_| TimestampError::BadlyTyped)?;
            if old.0.saturating_add(CLEANUP_AGE) >= reference.0 {
                return Err(TimestampError::DontBeSoHasty);
            }
        }
        Ok(0)
    }
}
