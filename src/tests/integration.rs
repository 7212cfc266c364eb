// Integration Tests - Scénarios de bout en bout
//
// Spends guarded by signatures and locks, genesis replay, and blocks flowing
// from one node's pool to another node's import.

use crate::executive::UtxoError;
use crate::genesis::{genesis_tx_hash, GenesisBuilder, GenesisConfig};
use crate::inherents::InherentData;
use crate::node::{BlockProducer, ProducerConfig, TransactionPool};
use crate::pieces::money::{Coin, MoneyConstraintChecker};
use crate::pieces::timestamp::TIMESTAMP_INHERENT_IDENTIFIER;
use crate::runtime::{
    dev_pubkey, dev_signing_key, development_genesis_config, Executive, OuterConstraintChecker,
    OuterVerifier, Transaction, DEV_ENDOWMENT,
};
use crate::storage::{MemoryStore, UtxoSet};
use crate::types::{Input, Output, OutputRef};
use crate::verifier::simple_signature::test_keys::{ed25519_pair, ed25519_sign};
use crate::verifier::{Ed25519Signature, TimeLock, VerifierError};
use ed25519_dalek::SigningKey;

type Set = UtxoSet<MemoryStore, OuterVerifier>;

fn coin(value: u128, verifier: impl Into<OuterVerifier>) -> Output<OuterVerifier> {
    Output::new(Coin::<0>::new(value), verifier)
}

fn owned_by(key: &SigningKey) -> Ed25519Signature {
    Ed25519Signature::new(key.verifying_key().to_bytes())
}

fn spend(inputs: Vec<OutputRef>, outputs: Vec<Output<OuterVerifier>>) -> Transaction {
    Transaction {
        inputs: inputs.into_iter().map(Input::unsigned).collect(),
        peeks: vec![],
        outputs,
        checker: MoneyConstraintChecker::<0>::Spend.into(),
    }
}

/// Chaque entrée signée par `key` sur la transaction simplifiée
fn sign_all(mut tx: Transaction, key: &SigningKey) -> Transaction {
    let signature = ed25519_sign(key, &tx.simplified_bytes());
    for input in tx.inputs.iter_mut() {
        input.redeemer = signature.as_bytes().to_vec();
    }
    tx
}

/// Set initialisé avec les outputs donnés au genesis
fn genesis_set(outputs: Vec<Output<OuterVerifier>>) -> Set {
    let mut set = Set::new(MemoryStore::new());
    GenesisBuilder::new(GenesisConfig::<OuterVerifier, OuterConstraintChecker>::new(outputs))
        .build(&mut set)
        .unwrap();
    set
}

fn timestamp(now: u64) -> InherentData {
    let mut data = InherentData::new();
    data.put_data(TIMESTAMP_INHERENT_IDENTIFIER, &now).unwrap();
    data
}

// =============================================================================
// Signed spends
// =============================================================================

#[cfg(test)]
mod signed_spends {
    use super::*;

    #[test]
    fn test_simple_signed_spend() {
        let alice = ed25519_pair(1);
        let bob = ed25519_pair(2);
        let mut set = genesis_set(vec![coin(100, owned_by(&alice))]);
        let alice_coin = OutputRef::new(genesis_tx_hash(), 0);

        let tx = sign_all(
            spend(vec![alice_coin], vec![coin(60, owned_by(&bob)), coin(40, owned_by(&alice))]),
            &alice,
        );
        let weight = Executive::apply_tuxedo_transaction(&mut set, &tx, 1).unwrap();
        assert_eq!(weight, 0);

        assert!(!set.contains(&alice_coin).unwrap());
        let to_bob = set.get(&tx.output_ref(0)).unwrap().unwrap();
        assert_eq!(to_bob.payload.extract::<Coin<0>>().unwrap().value(), 60);
        assert_eq!(to_bob.verifier, OuterVerifier::Ed25519Signature(owned_by(&bob)));
        assert_eq!(set.len().unwrap(), 2);
    }

    #[test]
    fn test_double_spend_reports_missing_input() {
        let alice = ed25519_pair(1);
        let mut set = genesis_set(vec![coin(100, owned_by(&alice))]);
        let alice_coin = OutputRef::new(genesis_tx_hash(), 0);

        let first = sign_all(spend(vec![alice_coin], vec![coin(100, owned_by(&alice))]), &alice);
        Executive::apply_tuxedo_transaction(&mut set, &first, 1).unwrap();

        let second = sign_all(spend(vec![alice_coin], vec![coin(99, owned_by(&alice))]), &alice);
        let err = Executive::apply_tuxedo_transaction(&mut set, &second, 1).unwrap_err();
        assert_eq!(err, UtxoError::MissingInput(alice_coin));
        assert!(err.is_retryable());

        // The pool sees the same thing as an unmet requirement
        let valid = Executive::validate_tuxedo_transaction(&set, &second, 1).unwrap();
        assert_eq!(valid.requires, vec![alice_coin.to_tag()]);
    }

    #[test]
    fn test_bad_signature_leaves_set_unchanged() {
        let alice = ed25519_pair(1);
        let mallory = ed25519_pair(9);
        let mut set = genesis_set(vec![coin(100, owned_by(&alice))]);
        let alice_coin = OutputRef::new(genesis_tx_hash(), 0);
        let root = set.state_root().unwrap();

        let theft = sign_all(spend(vec![alice_coin], vec![coin(100, owned_by(&mallory))]), &mallory);
        assert_eq!(
            Executive::apply_tuxedo_transaction(&mut set, &theft, 1),
            Err(UtxoError::VerifierError {
                output_ref: alice_coin,
                error: VerifierError::BadProof
            })
        );
        assert_eq!(set.state_root().unwrap(), root);
        assert!(set.contains(&alice_coin).unwrap());
    }

    #[test]
    fn test_signature_covers_outputs() {
        let alice = ed25519_pair(1);
        let mallory = ed25519_pair(9);
        let mut set = genesis_set(vec![coin(100, owned_by(&alice))]);
        let alice_coin = OutputRef::new(genesis_tx_hash(), 0);

        // Signed by alice, outputs swapped afterwards
        let mut tx = sign_all(spend(vec![alice_coin], vec![coin(100, owned_by(&alice))]), &alice);
        tx.outputs = vec![coin(100, owned_by(&mallory))];
        assert!(matches!(
            Executive::apply_tuxedo_transaction(&mut set, &tx, 1),
            Err(UtxoError::VerifierError { .. })
        ));
    }
}

// =============================================================================
// Locks
// =============================================================================

#[cfg(test)]
mod locks {
    use super::*;

    #[test]
    fn test_time_lock_eligibility() {
        let bob = ed25519_pair(2);
        let mut set = genesis_set(vec![coin(10, TimeLock { unlock_block_height: 100 })]);
        let locked = OutputRef::new(genesis_tx_hash(), 0);
        let tx = spend(vec![locked], vec![coin(10, owned_by(&bob))]);

        assert_eq!(
            Executive::apply_tuxedo_transaction(&mut set, &tx, 50),
            Err(UtxoError::VerifierError {
                output_ref: locked,
                error: VerifierError::NotYetEligible {
                    unlock_height: 100,
                    current_height: 50
                }
            })
        );
        assert!(set.contains(&locked).unwrap());

        Executive::apply_tuxedo_transaction(&mut set, &tx, 100).unwrap();
        assert!(!set.contains(&locked).unwrap());
        assert!(set.contains(&tx.output_ref(0)).unwrap());
    }

    #[test]
    fn test_pool_holds_locked_spend_until_unlock() {
        let bob = ed25519_pair(2);
        let set = genesis_set(vec![coin(10, TimeLock { unlock_block_height: 100 })]);
        let locked = OutputRef::new(genesis_tx_hash(), 0);
        let tx = spend(vec![locked], vec![coin(10, owned_by(&bob))]);
        let mut pool = TransactionPool::<OuterVerifier, OuterConstraintChecker>::new(10);

        // Trop tôt: gardée, pas rejetée
        let hash = pool.submit(&set, tx.clone(), 50).unwrap();
        assert_eq!(pool.eligible_at(&hash), Some(100));
        assert_eq!(pool.ready_count(), 0);
        assert!(pool.select_transactions(&set, 50, 10).is_empty());
        assert!(pool.select_transactions(&set, 99, 10).is_empty());

        pool.prune(&set, 60);
        assert!(pool.contains(&hash));
        assert_eq!(pool.eligible_at(&hash), Some(100));

        assert_eq!(pool.select_transactions(&set, 100, 10), vec![tx.clone()]);
        pool.prune(&set, 100);
        assert_eq!(pool.eligible_at(&hash), None);
        assert_eq!(pool.ready_count(), 1);
    }

    #[test]
    fn test_pool_still_rejects_forged_spend_of_unlocked_coin() {
        let alice = ed25519_pair(1);
        let mallory = ed25519_pair(9);
        let set = genesis_set(vec![coin(10, owned_by(&alice))]);
        let tx = sign_all(
            spend(vec![OutputRef::new(genesis_tx_hash(), 0)], vec![coin(10, owned_by(&mallory))]),
            &mallory,
        );
        let mut pool = TransactionPool::<OuterVerifier, OuterConstraintChecker>::new(10);

        assert!(matches!(
            pool.submit(&set, tx, 50),
            Err(crate::node::PoolError::Validation(_))
        ));
        assert!(pool.is_empty());
    }
}

// =============================================================================
// Genesis
// =============================================================================

#[cfg(test)]
mod genesis_replay {
    use super::*;

    #[test]
    fn test_genesis_is_idempotent() {
        let mut set = Set::new(MemoryStore::new());
        let builder = GenesisBuilder::new(development_genesis_config());

        let first = builder.build(&mut set).unwrap();
        let root = set.state_root().unwrap();
        let len = set.len().unwrap();

        let second = builder.build(&mut set).unwrap();
        assert_eq!(first.hash(), second.hash());
        assert_eq!(set.state_root().unwrap(), root);
        assert_eq!(set.len().unwrap(), len);
    }

    #[test]
    fn test_dev_key_owns_its_endowment() {
        let mut set = Set::new(MemoryStore::new());
        GenesisBuilder::new(development_genesis_config()).build(&mut set).unwrap();

        let key = dev_signing_key();
        let endowment = OutputRef::new(genesis_tx_hash(), 0);
        let tx = sign_all(spend(vec![endowment], vec![coin(DEV_ENDOWMENT, owned_by(&key))]), &key);
        Executive::apply_tuxedo_transaction(&mut set, &tx, 1).unwrap();
        assert_eq!(
            set.get(&tx.output_ref(0)).unwrap().unwrap().verifier,
            OuterVerifier::Ed25519Signature(Ed25519Signature::new(dev_pubkey()))
        );
    }
}

// =============================================================================
// Block flow between nodes
// =============================================================================

#[cfg(test)]
mod block_flow {
    use super::*;

    type DevProducer = BlockProducer<MemoryStore, OuterVerifier, OuterConstraintChecker>;
    type DevPool = TransactionPool<OuterVerifier, OuterConstraintChecker>;

    #[test]
    fn test_chained_spends_reach_follower() {
        let mut author = DevProducer::new(MemoryStore::new(), ProducerConfig::default());
        let mut follower = DevProducer::new(MemoryStore::new(), ProducerConfig::default());
        author.initialize(development_genesis_config()).unwrap();
        follower.initialize(development_genesis_config()).unwrap();

        let dev = dev_signing_key();
        let bob = ed25519_pair(2);
        let mut pool = DevPool::new(100);

        // dev -> bob, then bob -> bob before the first one is in a block
        let to_bob = sign_all(
            spend(vec![OutputRef::new(genesis_tx_hash(), 0)], vec![coin(90, owned_by(&bob))]),
            &dev,
        );
        let bob_again = sign_all(spend(vec![to_bob.output_ref(0)], vec![coin(90, owned_by(&bob))]), &bob);

        pool.submit(author.utxo_set(), to_bob.clone(), 1).unwrap();
        pool.submit(author.utxo_set(), bob_again.clone(), 1).unwrap();
        assert_eq!(pool.len(), 2);

        let mut blocks = Vec::new();
        for (i, now) in [10_000u64, 13_000, 16_000].into_iter().enumerate() {
            let block = author.produce_block(&mut pool, &timestamp(now)).unwrap();
            if i == 0 {
                // Timestamp inherent, then both spends in dependency order
                assert_eq!(block.extrinsics.len(), 3);
                assert_eq!(block.extrinsics[1], to_bob);
                assert_eq!(block.extrinsics[2], bob_again);
            }
            blocks.push((block, now));
        }
        assert!(pool.is_empty());

        for (block, now) in blocks {
            follower.import_block(block, &timestamp(now + 500), None).unwrap();
        }
        assert_eq!(
            follower.utxo_set().state_root().unwrap(),
            author.utxo_set().state_root().unwrap()
        );
        assert_eq!(follower.best_block().map(|b| b.hash()), author.best_block().map(|b| b.hash()));
        assert!(follower.utxo_set().contains(&bob_again.output_ref(0)).unwrap());
    }

    #[test]
    fn test_follower_rejects_tampered_block() {
        let mut author = DevProducer::new(MemoryStore::new(), ProducerConfig::default());
        let mut follower = DevProducer::new(MemoryStore::new(), ProducerConfig::default());
        author.initialize(development_genesis_config()).unwrap();
        follower.initialize(development_genesis_config()).unwrap();

        let mut pool = DevPool::new(100);
        let dev = dev_signing_key();
        let tx = sign_all(
            spend(vec![OutputRef::new(genesis_tx_hash(), 0)], vec![coin(50, owned_by(&dev))]),
            &dev,
        );
        pool.submit(author.utxo_set(), tx, 1).unwrap();
        let mut block = author.produce_block(&mut pool, &timestamp(10_000)).unwrap();

        // Drop the spend, keep the header
        block.extrinsics.truncate(1);
        let before = follower.utxo_set().state_root().unwrap();
        assert!(follower.import_block(block, &timestamp(10_500), None).is_err());
        assert_eq!(follower.utxo_set().state_root().unwrap(), before);
    }
}
