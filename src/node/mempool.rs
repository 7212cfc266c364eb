// Mempool - Pool de transactions UTXO avec tags provides/requires
//
// Features:
// - Priority ordering (checker weight), FIFO for equal priority
// - Dependency tracking: a transaction waits until every input it
//   requires is in the set or provided by a transaction selected before it
// - Replace-by-priority for transactions spending the same output
// - Eviction of the lowest priority transaction when the pool is full
// - Pruning of transactions whose inputs were consumed by a block
// - Time-locked spends are held until the height at which they unlock

use crate::constraint_checker::ConstraintChecker;
use crate::executive::{Executive, ExecutiveError, UtxoError, ValidTransaction};
use crate::storage::{KeyValueStore, UtxoSet};
use crate::types::{
    codec, BlockNumber, Hash, OutputRef, Transaction, TransactionLongevity, TransactionPriority, TransactionTag,
};
use crate::verifier::{Verifier, VerifierError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Mempool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolConfig {
    /// Maximum number of transactions in pool
    pub max_size: usize,

    /// Maximum encoded size of one transaction (bytes)
    pub max_tx_bytes: usize,

    /// Replace-by-priority minimum increase (percentage)
    pub replace_min_increase_pct: u8,

    /// Transaction expiration time (seconds)
    pub tx_expiration_secs: u64,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            max_tx_bytes: 256 * 1024,
            replace_min_increase_pct: 10,
            tx_expiration_secs: 3600,
        }
    }
}

// =============================================================================
// PRIORITY WRAPPER
// =============================================================================

/// Heap entry; stale entries are skipped at selection time
#[derive(Debug, Clone)]
struct PrioritizedTx {
    hash: Hash,
    priority: TransactionPriority,
    /// Submission order, for FIFO among equal priorities
    seq: u64,
}

impl PartialEq for PrioritizedTx {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for PrioritizedTx {}

impl PartialOrd for PrioritizedTx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedTx {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.priority.cmp(&other.priority) {
            // Plus ancien d'abord
            Ordering::Equal => other.seq.cmp(&self.seq),
            other_cmp => other_cmp,
        }
    }
}

struct PoolEntry<V, C> {
    transaction: Transaction<V, C>,
    priority: TransactionPriority,
    requires: Vec<TransactionTag>,
    provides: Vec<TransactionTag>,
    seq: u64,
    added_at: Instant,
    /// Hauteur avant laquelle un verrou refuse encore la dépense
    eligible_at: Option<BlockNumber>,
}

impl<V, C> PoolEntry<V, C> {
    fn is_ready(&self) -> bool {
        self.requires.is_empty() && self.eligible_at.is_none()
    }

    fn is_eligible(&self, block_height: BlockNumber) -> bool {
        self.eligible_at.map_or(true, |height| block_height >= height)
    }
}

/// Hauteur de déverrouillage, si l'erreur n'est qu'un verrou pas encore expiré
fn unlock_height<E>(error: &ExecutiveError<E>) -> Option<BlockNumber> {
    match error {
        ExecutiveError::Transaction(UtxoError::VerifierError {
            error: VerifierError::NotYetEligible { unlock_height, .. },
            ..
        }) => Some(*unlock_height),
        _ => None,
    }
}

// =============================================================================
// TRANSACTION POOL
// =============================================================================

/// Pool statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Total transactions added
    pub total_added: u64,
    /// Total transactions removed (included in blocks)
    pub total_removed: u64,
    /// Total evicted (pool full, expired or invalidated)
    pub total_evicted: u64,
    /// Total rejected (validation failed)
    pub total_rejected: u64,
    /// Total replaced (conflicting spend with higher priority)
    pub total_replaced: u64,
}

/// Pool errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("Transaction already exists")]
    AlreadyExists,

    #[error("Pool is full")]
    PoolFull,

    #[error("Transaction too large: {size} > {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("Replacement priority insufficient: need {need_pct}% increase")]
    ReplacementPriorityTooLow { need_pct: u8 },

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Transaction pool for one runtime
pub struct TransactionPool<V, C> {
    /// Configuration (public for test access)
    pub config: MempoolConfig,

    /// All transactions by hash
    transactions: HashMap<Hash, PoolEntry<V, C>>,

    /// Which pool transaction spends each output
    spent_by: HashMap<OutputRef, Hash>,

    /// Priority queue for block selection
    priority_queue: BinaryHeap<PrioritizedTx>,

    next_seq: u64,

    /// Statistics
    stats: PoolStats,
}

impl<V, C> TransactionPool<V, C>
where
    V: Verifier,
    C: ConstraintChecker<V>,
{
    /// Create a new transaction pool with default config
    pub fn new(max_size: usize) -> Self {
        Self::with_config(MempoolConfig {
            max_size,
            ..Default::default()
        })
    }

    /// Create with custom configuration
    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            transactions: HashMap::new(),
            spent_by: HashMap::new(),
            priority_queue: BinaryHeap::new(),
            next_seq: 0,
            stats: PoolStats::default(),
        }
    }

    /// Validates `tx` against `set` for inclusion at `block_height` and adds it.
    ///
    /// Transactions with missing inputs are accepted and wait in the pool.
    /// So do spends of time-locked outputs: they wait, with no priority,
    /// until the lock height is reached.
    pub fn submit<S: KeyValueStore>(
        &mut self,
        set: &UtxoSet<S, V>,
        tx: Transaction<V, C>,
        block_height: BlockNumber,
    ) -> Result<Hash, PoolError> {
        let hash = tx.hash();
        if self.transactions.contains_key(&hash) {
            return Err(PoolError::AlreadyExists);
        }

        let size = codec::encode(&tx).len();
        if size > self.config.max_tx_bytes {
            self.stats.total_rejected += 1;
            return Err(PoolError::TooLarge {
                size,
                max: self.config.max_tx_bytes,
            });
        }

        let (valid, eligible_at) = match Executive::<V, C>::validate_transaction(set, &tx, block_height) {
            Ok(valid) => (valid, None),
            Err(e) => match unlock_height(&e) {
                Some(height) => {
                    debug!("⏳ Transaction {} held until its lock expires: {}", hash, e);
                    let held = ValidTransaction {
                        requires: Vec::new(),
                        provides: tx.output_refs().iter().map(OutputRef::to_tag).collect(),
                        priority: 0,
                        longevity: TransactionLongevity::MAX,
                        propagate: true,
                    };
                    (held, Some(height))
                }
                None => {
                    self.stats.total_rejected += 1;
                    debug!("🚫 Transaction {} rejected: {}", hash, e);
                    return Err(PoolError::Validation(e.to_string()));
                }
            },
        };

        // Conflicting spends: the newcomer must clearly outbid every one of them
        let conflicts = self.conflicts_of(&tx);
        if !conflicts.is_empty() {
            let need = conflicts
                .iter()
                .filter_map(|h| self.transactions.get(h))
                .map(|e| self.replacement_threshold(e.priority))
                .max()
                .unwrap_or(0);
            if valid.priority < need {
                self.stats.total_rejected += 1;
                return Err(PoolError::ReplacementPriorityTooLow {
                    need_pct: self.config.replace_min_increase_pct,
                });
            }
            for old in &conflicts {
                self.remove_internal(old);
                self.stats.total_replaced += 1;
                info!("🔄 Transaction replaced by priority: {} -> {}", old, hash);
            }
        }

        // Pool full - try eviction
        if self.transactions.len() >= self.config.max_size && !self.evict_lowest_priority(valid.priority) {
            self.stats.total_rejected += 1;
            return Err(PoolError::PoolFull);
        }

        for input in &tx.inputs {
            self.spent_by.insert(input.output_ref, hash);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.priority_queue.push(PrioritizedTx {
            hash,
            priority: valid.priority,
            seq,
        });
        self.transactions.insert(
            hash,
            PoolEntry {
                transaction: tx,
                priority: valid.priority,
                requires: valid.requires,
                provides: valid.provides,
                seq,
                added_at: Instant::now(),
                eligible_at,
            },
        );

        debug!(
            "✅ Transaction {} added to pool (priority={}, total={})",
            hash,
            valid.priority,
            self.transactions.len()
        );
        self.stats.total_added += 1;
        Ok(hash)
    }

    fn replacement_threshold(&self, priority: TransactionPriority) -> TransactionPriority {
        let increase = priority.saturating_mul(self.config.replace_min_increase_pct as u64) / 100;
        // Au moins +1: une égalité ne remplace jamais
        priority.saturating_add(increase.max(1))
    }

    fn conflicts_of(&self, tx: &Transaction<V, C>) -> Vec<Hash> {
        let mut conflicts: Vec<Hash> = tx
            .inputs
            .iter()
            .filter_map(|input| self.spent_by.get(&input.output_ref).copied())
            .collect();
        conflicts.sort();
        conflicts.dedup();
        conflicts
    }

    /// Remove a transaction from the pool
    pub fn remove(&mut self, hash: &Hash) -> Option<Transaction<V, C>> {
        let tx = self.remove_internal(hash)?;
        self.stats.total_removed += 1;
        debug!(
            "Transaction {} removed from pool (remaining: {})",
            hash,
            self.transactions.len()
        );
        Some(tx)
    }

    /// Internal remove without stats update
    fn remove_internal(&mut self, hash: &Hash) -> Option<Transaction<V, C>> {
        let entry = self.transactions.remove(hash)?;
        for input in &entry.transaction.inputs {
            if self.spent_by.get(&input.output_ref) == Some(hash) {
                self.spent_by.remove(&input.output_ref);
            }
        }
        // Note: priority_queue entries are cleaned up lazily
        Some(entry.transaction)
    }

    /// Evict lowest priority transaction to make room
    fn evict_lowest_priority(&mut self, new_priority: TransactionPriority) -> bool {
        let lowest = self
            .transactions
            .iter()
            .filter(|(_, e)| e.priority < new_priority)
            .min_by_key(|(_, e)| (e.priority, std::cmp::Reverse(e.seq)))
            .map(|(h, e)| (*h, e.priority));

        if let Some((hash, priority)) = lowest {
            self.remove_internal(&hash);
            self.stats.total_evicted += 1;
            info!("Evicted transaction {} (priority={})", hash, priority);
            true
        } else {
            false
        }
    }

    /// Get a transaction by hash
    pub fn get(&self, hash: &Hash) -> Option<&Transaction<V, C>> {
        self.transactions.get(hash).map(|e| &e.transaction)
    }

    /// Check if transaction exists
    pub fn contains(&self, hash: &Hash) -> bool {
        self.transactions.contains_key(hash)
    }

    /// Tags a pool transaction still waits for
    pub fn requires(&self, hash: &Hash) -> Option<&[TransactionTag]> {
        self.transactions.get(hash).map(|e| e.requires.as_slice())
    }

    /// Height from which a held time-locked spend can be included
    pub fn eligible_at(&self, hash: &Hash) -> Option<BlockNumber> {
        self.transactions.get(hash).and_then(|e| e.eligible_at)
    }

    /// Number of transactions whose inputs were all present and unlocked at last validation
    pub fn ready_count(&self) -> usize {
        self.transactions.values().filter(|e| e.is_ready()).count()
    }

    /// Select best transactions for block production.
    ///
    /// Walks the pool by priority and picks every transaction whose inputs
    /// and peeks are either in `set` or created by a transaction already
    /// picked. Picking a transaction can unlock lower-positioned ones, so the
    /// walk restarts from the top after each pick. Held spends whose lock
    /// has not expired at `block_height` are left out.
    pub fn select_transactions<S: KeyValueStore>(
        &self,
        set: &UtxoSet<S, V>,
        block_height: BlockNumber,
        max_count: usize,
    ) -> Vec<Transaction<V, C>> {
        let mut ordered: Vec<PrioritizedTx> = self
            .priority_queue
            .iter()
            .filter(|p| {
                self.transactions
                    .get(&p.hash)
                    .map_or(false, |e| e.seq == p.seq)
            })
            .cloned()
            .collect();
        ordered.sort_by(|a, b| b.cmp(a));

        let mut selected = Vec::with_capacity(max_count.min(ordered.len()));
        let mut seen = HashSet::new();
        let mut provided: HashSet<TransactionTag> = HashSet::new();

        'outer: while selected.len() < max_count {
            for entry in &ordered {
                if seen.contains(&entry.hash) {
                    continue;
                }
                let pooled = match self.transactions.get(&entry.hash) {
                    Some(e) => e,
                    None => continue,
                };
                if !pooled.is_eligible(block_height) {
                    continue;
                }

                let tx = &pooled.transaction;
                let refs = tx.inputs.iter().map(|i| i.output_ref).chain(tx.peeks.iter().copied());
                let mut satisfied = true;
                for output_ref in refs {
                    let available = provided.contains(&output_ref.to_tag())
                        || set.contains(&output_ref).unwrap_or(false);
                    if !available {
                        satisfied = false;
                        break;
                    }
                }
                if !satisfied {
                    continue;
                }

                seen.insert(entry.hash);
                provided.extend(pooled.provides.iter().cloned());
                selected.push(tx.clone());
                continue 'outer;
            }
            break;
        }

        selected
    }

    /// Remove all transactions included in a block
    pub fn remove_included(&mut self, block_txs: &[Transaction<V, C>]) {
        for tx in block_txs {
            self.remove(&tx.hash());
        }
    }

    /// Revalidates every remaining transaction against the new set.
    ///
    /// Transactions whose inputs were consumed, or that no longer pass
    /// validation, are evicted. The others get fresh tags and priority.
    pub fn prune<S: KeyValueStore>(&mut self, set: &UtxoSet<S, V>, next_height: BlockNumber) {
        let expiration = Duration::from_secs(self.config.tx_expiration_secs);
        let now = Instant::now();

        // Outputs pool transactions will create: a missing input is only
        // worth waiting for if some pool transaction provides it
        let pool_provides: HashSet<TransactionTag> = self
            .transactions
            .values()
            .flat_map(|e| e.provides.iter().cloned())
            .collect();

        let hashes: Vec<Hash> = self.transactions.keys().copied().collect();
        for hash in hashes {
            let entry = match self.transactions.get(&hash) {
                Some(e) => e,
                None => continue,
            };

            if now.duration_since(entry.added_at) > expiration {
                self.remove_internal(&hash);
                self.stats.total_evicted += 1;
                debug!("Expired transaction {} removed", hash);
                continue;
            }

            match Executive::<V, C>::validate_transaction(set, &entry.transaction, next_height) {
                Ok(valid) if valid.requires.iter().all(|tag| pool_provides.contains(tag)) => {
                    if let Some(entry) = self.transactions.get_mut(&hash) {
                        if entry.priority != valid.priority {
                            self.priority_queue.push(PrioritizedTx {
                                hash,
                                priority: valid.priority,
                                seq: entry.seq,
                            });
                        }
                        entry.priority = valid.priority;
                        entry.requires = valid.requires;
                        entry.provides = valid.provides;
                        entry.eligible_at = None;
                    }
                }
                Err(e) if unlock_height(&e).is_some() => {
                    debug!("⏳ Transaction {} still locked: {}", hash, e);
                    if let Some(entry) = self.transactions.get_mut(&hash) {
                        entry.eligible_at = unlock_height(&e);
                    }
                }
                Ok(_) => {
                    self.remove_internal(&hash);
                    self.stats.total_evicted += 1;
                    debug!("🗑️ Transaction {} evicted: inputs consumed", hash);
                }
                Err(e) => {
                    self.remove_internal(&hash);
                    self.stats.total_evicted += 1;
                    warn!("🗑️ Transaction {} evicted: {}", hash, e);
                }
            }
        }

        // Rebuild priority queue (remove stale entries)
        let mut new_heap = BinaryHeap::new();
        for entry in self.priority_queue.drain() {
            let live = self
                .transactions
                .get(&entry.hash)
                .map_or(false, |e| e.seq == entry.seq && e.priority == entry.priority);
            if live {
                new_heap.push(entry);
            }
        }
        self.priority_queue = new_heap;

        info!(
            "Mempool pruned for block {}: {} transactions remaining",
            next_height,
            self.transactions.len()
        );
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn stats(&self) -> &PoolStats {
        &self.stats
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }
}
