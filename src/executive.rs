// Executive - Cycle de vie des blocs, validation et application des transactions
//
// Block lifecycle: Closed -> Open -> Accumulating -> Closed.
// A block is Open right after `open_block`; inherents may only be applied
// while it is Open. The first ordinary extrinsic moves it to Accumulating.
// `close_block` computes both roots and returns the finalized header.

use crate::constraint_checker::ConstraintChecker;
use crate::inherents::{CheckInherentsResult, InherentData, InherentError, InherentHooks};
use crate::storage::{KeyValueStore, StorageError, UtxoChanges, UtxoSet};
use crate::types::{
    extrinsics_root, Block, BlockNumber, CodecError, DynamicallyTypedData, Hash, Header, OutputRef, ResolvedInput,
    Transaction, TransactionLongevity, TransactionPriority, TransactionTag, Weight,
};
use crate::verifier::{Verifier, VerifierError};
use std::collections::BTreeSet;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

// =============================================================================
// Errors
// =============================================================================

/// Transaction-level validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UtxoError<E> {
    #[error("Entrée dupliquée: {0}")]
    DuplicateInput(OutputRef),

    #[error("Peek dupliqué ou déjà utilisé comme entrée: {0}")]
    DuplicatePeek(OutputRef),

    #[error("Output {0} already exists")]
    PreExistingOutput(OutputRef),

    #[error("Input or peek {0} is not in the UTXO set")]
    MissingInput(OutputRef),

    #[error("Verifier rejected input {output_ref}: {error}")]
    VerifierError {
        output_ref: OutputRef,
        error: VerifierError,
    },

    #[error("Constraint checker error: {0}")]
    ConstraintCheckerError(E),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

// Une sortie illisible est une erreur d'encodage, pas de stockage
impl<E> From<StorageError> for UtxoError<E> {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Corrupted(e) => UtxoError::Codec(e),
            other => UtxoError::Storage(other),
        }
    }
}

impl<E> UtxoError<E> {
    /// The pool may keep a transaction that failed only because a dependency
    /// is not there yet or a lock has not expired. Inside a block the same
    /// errors are fatal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UtxoError::MissingInput(_)
                | UtxoError::VerifierError {
                    error: VerifierError::NotYetEligible { .. },
                    ..
                }
        )
    }
}

/// Block-level errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutiveError<E> {
    #[error("No block is open")]
    NoBlockOpen,

    #[error("A block is already open")]
    BlockAlreadyOpen,

    #[error("Inherent applied after an ordinary extrinsic")]
    InherentAfterExtrinsic,

    #[error("Inherents cannot be submitted to the pool")]
    InherentNotAllowedInPool,

    #[error("Extrinsic {index} failed: {error}")]
    BadExtrinsic { index: usize, error: UtxoError<E> },

    #[error("Transaction invalide: {0}")]
    Transaction(#[from] UtxoError<E>),

    #[error("State root mismatch: header {expected}, computed {computed}")]
    StateRootMismatch { expected: Hash, computed: Hash },

    #[error("Extrinsics root mismatch: header {expected}, computed {computed}")]
    ExtrinsicsRootMismatch { expected: Hash, computed: Hash },

    #[error("Header mismatch after execution")]
    HeaderMismatch,

    #[error("Inherent error: {0}")]
    Inherent(#[from] InherentError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// Validation results & events
// =============================================================================

/// Result of pool-level validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTransaction {
    /// Encoded refs of inputs/peeks not yet in the set
    pub requires: Vec<TransactionTag>,
    /// Encoded refs of the outputs this transaction creates
    pub provides: Vec<TransactionTag>,
    pub priority: TransactionPriority,
    pub longevity: TransactionLongevity,
    pub propagate: bool,
}

/// What `apply_extrinsic` reports for a successfully applied extrinsic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub index: usize,
    pub tx_hash: Hash,
    pub weight: Weight,
    pub inherent: bool,
}

/// Événements émis pendant la construction d'un bloc
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutiveEvent {
    BlockOpened { number: BlockNumber },
    ExtrinsicApplied(ApplyOutcome),
    BlockClosed { number: BlockNumber, hash: Hash, weight: Weight },
}

/// Phase du bloc en cours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPhase {
    Closed,
    Open,
    Accumulating,
}

struct BlockInProgress<V, C> {
    header: Header,
    extrinsics: Vec<Transaction<V, C>>,
    weight: Weight,
}

enum State<V, C> {
    Closed,
    Open(BlockInProgress<V, C>),
    Accumulating(BlockInProgress<V, C>),
}

/// Everything validation learned about a transaction
struct CheckedTransaction {
    valid: ValidTransaction,
    missing: Vec<OutputRef>,
    weight: Weight,
}

// =============================================================================
// Executive
// =============================================================================

pub struct Executive<V, C> {
    state: State<V, C>,
    events: Vec<ExecutiveEvent>,
    _types: PhantomData<(V, C)>,
}

impl<V, C> Default for Executive<V, C>
where
    V: Verifier,
    C: ConstraintChecker<V>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, C> Executive<V, C>
where
    V: Verifier,
    C: ConstraintChecker<V>,
{
    pub fn new() -> Self {
        Self {
            state: State::Closed,
            events: Vec::new(),
            _types: PhantomData,
        }
    }

    pub fn phase(&self) -> BlockPhase {
        match self.state {
            State::Closed => BlockPhase::Closed,
            State::Open(_) => BlockPhase::Open,
            State::Accumulating(_) => BlockPhase::Accumulating,
        }
    }

    /// Hauteur du bloc en cours, s'il y en a un
    pub fn block_height(&self) -> Option<BlockNumber> {
        match &self.state {
            State::Closed => None,
            State::Open(b) | State::Accumulating(b) => Some(b.header.number),
        }
    }

    /// Événements du dernier bloc construit ou exécuté
    pub fn events(&self) -> &[ExecutiveEvent] {
        &self.events
    }

    // -------------------------------------------------------------------------
    // Transaction validation & application
    // -------------------------------------------------------------------------

    fn check_transaction<S: KeyValueStore>(
        set: &UtxoSet<S, V>,
        transaction: &Transaction<V, C>,
        block_height: BlockNumber,
    ) -> Result<CheckedTransaction, UtxoError<C::Error>> {
        // Chaque OutputRef au plus une fois parmi inputs + peeks
        let mut seen = BTreeSet::new();
        for input in &transaction.inputs {
            if !seen.insert(input.output_ref) {
                return Err(UtxoError::DuplicateInput(input.output_ref));
            }
        }
        for peek in &transaction.peeks {
            if !seen.insert(*peek) {
                return Err(UtxoError::DuplicatePeek(*peek));
            }
        }

        let simplified_tx = transaction.simplified_bytes();

        let mut missing = Vec::new();
        let mut resolved_inputs = Vec::with_capacity(transaction.inputs.len());
        for input in &transaction.inputs {
            match set.get(&input.output_ref)? {
                Some(output) => {
                    output
                        .verifier
                        .verify(&simplified_tx, block_height, &input.redeemer)
                        .map_err(|error| UtxoError::VerifierError {
                            output_ref: input.output_ref,
                            error,
                        })?;
                    resolved_inputs.push(ResolvedInput {
                        output_ref: input.output_ref,
                        payload: output.payload,
                    });
                }
                None => missing.push(input.output_ref),
            }
        }

        let mut peek_data = Vec::with_capacity(transaction.peeks.len());
        for peek in &transaction.peeks {
            match set.get(peek)? {
                Some(output) => peek_data.push(output.payload),
                None => missing.push(*peek),
            }
        }

        let output_refs = transaction.output_refs();
        for output_ref in &output_refs {
            debug!("🔍 Checking for pre-existing output {}", output_ref);
            if set.contains(output_ref)? {
                return Err(UtxoError::PreExistingOutput(*output_ref));
            }
        }
        let provides: Vec<TransactionTag> = output_refs.iter().map(OutputRef::to_tag).collect();

        // Dépendances manquantes: le checker sera exécuté à l'application
        if !missing.is_empty() {
            return Ok(CheckedTransaction {
                valid: ValidTransaction {
                    requires: missing.iter().map(OutputRef::to_tag).collect(),
                    provides,
                    priority: 0,
                    longevity: TransactionLongevity::MAX,
                    propagate: true,
                },
                missing,
                weight: 0,
            });
        }

        let output_data: Vec<DynamicallyTypedData> =
            transaction.outputs.iter().map(|o| o.payload.clone()).collect();

        let weight = transaction
            .checker
            .check(&resolved_inputs, &peek_data, &output_data, block_height)
            .map_err(UtxoError::ConstraintCheckerError)?;

        Ok(CheckedTransaction {
            valid: ValidTransaction {
                requires: Vec::new(),
                provides,
                priority: weight,
                longevity: TransactionLongevity::MAX,
                propagate: true,
            },
            missing,
            weight,
        })
    }

    /// Validates a transaction against the current set without mutating it.
    ///
    /// Missing inputs or peeks are not an error: they are reported in
    /// `requires` so that the pool can wait for them, and the constraint
    /// checker is skipped until they are all present.
    pub fn validate_tuxedo_transaction<S: KeyValueStore>(
        set: &UtxoSet<S, V>,
        transaction: &Transaction<V, C>,
        block_height: BlockNumber,
    ) -> Result<ValidTransaction, UtxoError<C::Error>> {
        Self::check_transaction(set, transaction, block_height).map(|checked| checked.valid)
    }

    /// Validates and, when fully resolved, applies a transaction.
    /// Removals and insertions are committed as one atomic batch.
    pub fn apply_tuxedo_transaction<S: KeyValueStore>(
        set: &mut UtxoSet<S, V>,
        transaction: &Transaction<V, C>,
        block_height: BlockNumber,
    ) -> Result<Weight, UtxoError<C::Error>> {
        debug!("⚙️ Applying transaction {}", transaction.hash());

        let checked = Self::check_transaction(set, transaction, block_height)?;
        if let Some(missing) = checked.missing.first() {
            return Err(UtxoError::MissingInput(*missing));
        }

        let changes = UtxoChanges {
            consumed: transaction.inputs.iter().map(|i| i.output_ref).collect(),
            created: transaction
                .output_refs()
                .into_iter()
                .zip(transaction.outputs.iter().cloned())
                .collect(),
        };
        set.commit(changes)?;

        Ok(checked.weight)
    }

    /// Pool entry point: inherents are rejected, everything else is validated
    /// for inclusion at `block_height`.
    pub fn validate_transaction<S: KeyValueStore>(
        set: &UtxoSet<S, V>,
        transaction: &Transaction<V, C>,
        block_height: BlockNumber,
    ) -> Result<ValidTransaction, ExecutiveError<C::Error>> {
        if transaction.checker.is_inherent() {
            warn!("🚫 Rejecting inherent submitted to the pool");
            return Err(ExecutiveError::InherentNotAllowedInPool);
        }

        let result = Self::validate_tuxedo_transaction(set, transaction, block_height);
        debug!("🔍 Pool validation result: {:?}", result);
        Ok(result?)
    }

    // -------------------------------------------------------------------------
    // Block lifecycle
    // -------------------------------------------------------------------------

    /// Starts a new block. The header's roots are ignored and recomputed at close.
    pub fn open_block(&mut self, header: Header) -> Result<(), ExecutiveError<C::Error>> {
        if !matches!(self.state, State::Closed) {
            return Err(ExecutiveError::BlockAlreadyOpen);
        }

        info!("📦 Opening block #{}", header.number);
        self.events.clear();
        self.events.push(ExecutiveEvent::BlockOpened {
            number: header.number,
        });
        self.state = State::Open(BlockInProgress {
            header,
            extrinsics: Vec::new(),
            weight: 0,
        });
        Ok(())
    }

    /// Applies one extrinsic to the open block. Inherents must come first.
    pub fn apply_extrinsic<S: KeyValueStore>(
        &mut self,
        set: &mut UtxoSet<S, V>,
        extrinsic: Transaction<V, C>,
    ) -> Result<ApplyOutcome, ExecutiveError<C::Error>> {
        let inherent = extrinsic.checker.is_inherent();

        let (block, accumulating) = match &mut self.state {
            State::Closed => return Err(ExecutiveError::NoBlockOpen),
            State::Open(block) => (block, false),
            State::Accumulating(block) => (block, true),
        };

        if inherent && accumulating {
            warn!("🚫 Inherent after ordinary extrinsic in block #{}", block.header.number);
            return Err(ExecutiveError::InherentAfterExtrinsic);
        }

        let index = block.extrinsics.len();
        let tx_hash = extrinsic.hash();
        let weight = Self::apply_tuxedo_transaction(set, &extrinsic, block.header.number)
            .map_err(|error| {
                warn!("❌ Extrinsic {} ({}) rejected: {}", index, tx_hash, error);
                ExecutiveError::BadExtrinsic { index, error }
            })?;

        block.extrinsics.push(extrinsic);
        block.weight = block.weight.saturating_add(weight);

        let outcome = ApplyOutcome {
            index,
            tx_hash,
            weight,
            inherent,
        };
        debug!("✅ Applied extrinsic {} ({}) weight {}", index, tx_hash, weight);
        self.events.push(ExecutiveEvent::ExtrinsicApplied(outcome));

        if !inherent && !accumulating {
            if let State::Open(block) = std::mem::replace(&mut self.state, State::Closed) {
                self.state = State::Accumulating(block);
            }
        }

        Ok(outcome)
    }

    /// Finalizes the block: computes the extrinsics root and the state root.
    pub fn close_block<S: KeyValueStore>(
        &mut self,
        set: &UtxoSet<S, V>,
    ) -> Result<Header, ExecutiveError<C::Error>> {
        let block = match std::mem::replace(&mut self.state, State::Closed) {
            State::Closed => return Err(ExecutiveError::NoBlockOpen),
            State::Open(block) | State::Accumulating(block) => block,
        };

        let mut header = block.header;
        header.extrinsics_root = extrinsics_root(&block.extrinsics);
        header.state_root = set.state_root()?;

        let hash = header.hash();
        info!(
            "🏁 Closed block #{} ({}) with {} extrinsics, weight {}",
            header.number,
            hash,
            block.extrinsics.len(),
            block.weight
        );
        self.events.push(ExecutiveEvent::BlockClosed {
            number: header.number,
            hash,
            weight: block.weight,
        });

        Ok(header)
    }

    /// Replays an imported block and checks its header.
    ///
    /// Runs on an overlay of `set`; changes are written only if every
    /// extrinsic applies and both roots match.
    pub fn execute_block<S: KeyValueStore>(
        &mut self,
        set: &mut UtxoSet<S, V>,
        block: &Block<V, C>,
    ) -> Result<(), ExecutiveError<C::Error>> {
        if !matches!(self.state, State::Closed) {
            return Err(ExecutiveError::BlockAlreadyOpen);
        }
        info!("📥 Executing block #{} ({})", block.header.number, block.hash());

        let expected = block.header.clone();
        let result = set.execute_atomic(|overlay| -> Result<(), ExecutiveError<C::Error>> {
            self.open_block(Header::new(expected.parent_hash, expected.number))?;
            for extrinsic in &block.extrinsics {
                self.apply_extrinsic(overlay, extrinsic.clone())?;
            }
            let computed = self.close_block(overlay)?;

            if computed.state_root != expected.state_root {
                return Err(ExecutiveError::StateRootMismatch {
                    expected: expected.state_root,
                    computed: computed.state_root,
                });
            }
            if computed.extrinsics_root != expected.extrinsics_root {
                return Err(ExecutiveError::ExtrinsicsRootMismatch {
                    expected: expected.extrinsics_root,
                    computed: computed.extrinsics_root,
                });
            }
            if computed != expected {
                return Err(ExecutiveError::HeaderMismatch);
            }
            Ok(())
        });

        if let Err(e) = &result {
            warn!("❌ Block #{} rejected: {}", block.header.number, e);
            self.state = State::Closed;
        }
        result
    }

    // -------------------------------------------------------------------------
    // Inherents
    // -------------------------------------------------------------------------

    /// Leading inherents of a block, with their hashes
    fn leading_inherents(block: &Block<V, C>) -> Vec<(Transaction<V, C>, Hash)> {
        block
            .extrinsics
            .iter()
            .take_while(|tx| tx.checker.is_inherent())
            .map(|tx| (tx.clone(), tx.hash()))
            .collect()
    }

    /// Builds the inherents for block `block_height` from the author's data
    /// and the inherents found at the start of the parent block.
    pub fn create_inherents(
        authoring_data: &InherentData,
        parent: Option<&Block<V, C>>,
        block_height: BlockNumber,
    ) -> Result<Vec<Transaction<V, C>>, ExecutiveError<C::Error>> {
        let previous = parent.map(Self::leading_inherents).unwrap_or_default();
        debug!(
            "🧩 Creating inherents for block #{} ({} previous)",
            block_height,
            previous.len()
        );
        Ok(<C::Hooks as InherentHooks<V, C>>::create_inherents(
            authoring_data,
            previous,
            block_height,
        )?)
    }

    /// Off-chain checks on the inherents of an imported block
    pub fn check_inherents(block: &Block<V, C>, importing_data: &InherentData) -> CheckInherentsResult {
        let mut result = CheckInherentsResult::new();
        let inherents = Self::leading_inherents(block)
            .into_iter()
            .map(|(tx, _)| tx)
            .collect();
        <C::Hooks as InherentHooks<V, C>>::check_inherents(importing_data, inherents, &mut result);

        if !result.ok() {
            warn!("⚠️ Inherent check failed for block #{}", block.header.number);
        }
        result
    }
}
