// Construction du genesis - Sorties initiales et bloc 0
use crate::constraint_checker::ConstraintChecker;
use crate::inherents::InherentHooks;
use crate::storage::{KeyValueStore, StorageError, UtxoChanges, UtxoSet};
use crate::types::{extrinsics_root, Block, Hash, Header, Output, OutputRef, Transaction};
use crate::verifier::Verifier;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Domaine du hash de transaction genesis
const GENESIS_DOMAIN: &[u8] = b"KRATOS_UTXO_GENESIS_V1";

/// Fixed transaction hash the raw genesis outputs are addressed under
pub fn genesis_tx_hash() -> Hash {
    Hash::hash(GENESIS_DOMAIN)
}

/// Erreurs de construction du genesis
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenesisError {
    #[error("Genesis transaction {0} has inputs or peeks")]
    TransactionWithInputs(usize),

    #[error("Genesis inherent {0} comes after an ordinary transaction")]
    InherentAfterExtrinsic(usize),

    #[error("Sortie genesis dupliquée: {0}")]
    DuplicateOutput(OutputRef),

    #[error("A different output already exists at {0}")]
    ConflictingOutput(OutputRef),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Contenu du genesis: raw outputs plus genesis transactions
#[derive(Debug, Clone, PartialEq)]
pub struct GenesisConfig<V, C> {
    pub outputs: Vec<Output<V>>,
    pub transactions: Vec<Transaction<V, C>>,
}

impl<V, C> GenesisConfig<V, C>
where
    V: Verifier,
    C: ConstraintChecker<V>,
{
    /// Raw outputs, preceded by whatever genesis transactions the runtime's
    /// inherents ask for.
    pub fn new(outputs: Vec<Output<V>>) -> Self {
        Self {
            outputs,
            transactions: <C::Hooks as InherentHooks<V, C>>::genesis_transactions(),
        }
    }

    pub fn with_transaction(mut self, transaction: Transaction<V, C>) -> Self {
        self.transactions.push(transaction);
        self
    }

    /// Toutes les sorties genesis avec leur référence, dans l'ordre
    pub fn output_refs(&self) -> Vec<(OutputRef, Output<V>)> {
        let genesis_hash = genesis_tx_hash();
        let mut entries: Vec<(OutputRef, Output<V>)> = self
            .outputs
            .iter()
            .enumerate()
            .map(|(i, output)| (OutputRef::new(genesis_hash, i as u32), output.clone()))
            .collect();

        for transaction in &self.transactions {
            entries.extend(transaction.output_refs().into_iter().zip(transaction.outputs.iter().cloned()));
        }
        entries
    }
}

/// Writes the genesis state into a UTXO set and returns block 0
pub struct GenesisBuilder<V, C> {
    config: GenesisConfig<V, C>,
}

impl<V, C> GenesisBuilder<V, C>
where
    V: Verifier,
    C: ConstraintChecker<V>,
{
    pub fn new(config: GenesisConfig<V, C>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenesisConfig<V, C> {
        &self.config
    }

    fn validate_transactions(&self) -> Result<(), GenesisError> {
        let mut seen_ordinary = false;
        for (index, transaction) in self.config.transactions.iter().enumerate() {
            if !transaction.inputs.is_empty() || !transaction.peeks.is_empty() {
                return Err(GenesisError::TransactionWithInputs(index));
            }
            if transaction.checker.is_inherent() {
                if seen_ordinary {
                    return Err(GenesisError::InherentAfterExtrinsic(index));
                }
            } else {
                seen_ordinary = true;
            }
        }
        Ok(())
    }

    /// Genesis block without touching any store
    pub fn genesis_block<S: KeyValueStore>(&self, set: &UtxoSet<S, V>) -> Result<Block<V, C>, GenesisError> {
        let mut header = Header::new(Hash::ZERO, 0);
        header.state_root = set.state_root()?;
        header.extrinsics_root = extrinsics_root(&self.config.transactions);
        Ok(Block::new(header, self.config.transactions.clone()))
    }

    /// Inserts every genesis output and returns the genesis block.
    ///
    /// Running it again over the same set is a no-op: outputs already present
    /// with identical content are skipped.
    pub fn build<S: KeyValueStore>(&self, set: &mut UtxoSet<S, V>) -> Result<Block<V, C>, GenesisError> {
        self.validate_transactions()?;

        let mut pending = BTreeMap::new();
        for (output_ref, output) in self.config.output_refs() {
            if pending.contains_key(&output_ref) {
                return Err(GenesisError::DuplicateOutput(output_ref));
            }
            pending.insert(output_ref, output);
        }

        let mut created = Vec::with_capacity(pending.len());
        for (output_ref, output) in pending {
            match set.get(&output_ref)? {
                Some(existing) if existing == output => {
                    debug!("Genesis output {} already present", output_ref);
                }
                Some(_) => return Err(GenesisError::ConflictingOutput(output_ref)),
                None => created.push((output_ref, output)),
            }
        }

        let inserted = created.len();
        set.commit(UtxoChanges {
            consumed: Vec::new(),
            created,
        })?;

        let block = self.genesis_block(set)?;
        info!(
            "🌱 Genesis block {} built ({} outputs inserted, {} transactions)",
            block.hash(),
            inserted,
            block.extrinsics.len()
        );
        Ok(block)
    }
}
