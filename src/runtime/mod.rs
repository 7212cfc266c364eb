// Runtime - Runtime de développement (verifiers + pieces agrégés)
//
// Everything the node runs is a concrete instantiation of the generic
// executive: one outer verifier, one outer constraint checker.

pub mod parachain;

use crate::genesis::GenesisConfig;
use crate::inherents::InherentAdapter;
use crate::pieces::amoeba::{AmoebaCreation, AmoebaDeath, AmoebaMitosis};
use crate::pieces::kitties::{FreeKittyConstraintChecker, KittyData, Parent};
use crate::pieces::money::{Coin, MoneyConstraintChecker};
use crate::pieces::poe::{PoeClaim, PoeDispute, PoeRevoke};
use crate::pieces::runtime_upgrade::{RuntimeRef, RuntimeUpgrade};
use crate::pieces::timestamp::{CleanUpTimestamp, SetTimestamp};
use crate::types;
use crate::verifier::{
    BlakeHashLock, Ed25519Signature, HashTimeLockContract, Sr25519Signature, ThresholdMultiSignature,
    TimeLock, Unspendable, UpForGrabs, P2PKH,
};
use ed25519_dalek::SigningKey;

/// Identifiant du code runtime enregistré au genesis
pub const RUNTIME_CODE: &[u8] = b"kratos-utxo-dev-runtime-v1";

/// Seed of the well-known development key. Never use it outside a dev chain.
pub const DEV_SEED: [u8; 32] = *b"kratos-utxo development seed 001";

/// Montants du genesis de développement
pub const DEV_ENDOWMENT: u128 = 100;
pub const FAUCET_AMOUNT: u128 = 10;

crate::aggregate_verifier! {
    /// Every way an output of the dev runtime can be guarded
    pub enum OuterVerifier {
        Ed25519Signature(Ed25519Signature),
        Sr25519Signature(Sr25519Signature),
        P2PKH(P2PKH),
        ThresholdMultiSignature(ThresholdMultiSignature),
        TimeLock(TimeLock),
        BlakeHashLock(BlakeHashLock),
        HashTimeLockContract(HashTimeLockContract),
        UpForGrabs(UpForGrabs),
        Unspendable(Unspendable),
    }
}

crate::aggregate_constraint_checker! {
    verifier: OuterVerifier;
    error: OuterConstraintCheckerError;
    /// Every piece of the dev runtime
    pub enum OuterConstraintChecker {
        Money(MoneyConstraintChecker<0>),
        FreeKitty(FreeKittyConstraintChecker),
        AmoebaCreation(AmoebaCreation),
        AmoebaMitosis(AmoebaMitosis),
        AmoebaDeath(AmoebaDeath),
        PoeClaim(PoeClaim),
        PoeRevoke(PoeRevoke),
        PoeDispute(PoeDispute),
        RuntimeUpgrade(RuntimeUpgrade),
        CleanUpTimestamp(CleanUpTimestamp),
        SetTimestamp(InherentAdapter<SetTimestamp>),
    }
}

pub type Transaction = types::Transaction<OuterVerifier, OuterConstraintChecker>;
pub type Block = types::Block<OuterVerifier, OuterConstraintChecker>;
pub type Output = types::Output<OuterVerifier>;
pub type Executive = crate::executive::Executive<OuterVerifier, OuterConstraintChecker>;

/// La clé de développement
pub fn dev_signing_key() -> SigningKey {
    SigningKey::from_bytes(&DEV_SEED)
}

pub fn dev_pubkey() -> [u8; 32] {
    dev_signing_key().verifying_key().to_bytes()
}

/// Genesis of the development chain:
/// - one coin owned by the dev key, one behind its P2PKH, one up for grabs
/// - the reference to the current runtime code
/// - a first kitty owned by the dev key
pub fn development_genesis_config() -> GenesisConfig<OuterVerifier, OuterConstraintChecker> {
    let pubkey = dev_pubkey();
    let outputs = vec![
        Output::new(Coin::<0>::new(DEV_ENDOWMENT), Ed25519Signature::new(pubkey)),
        Output::new(Coin::<0>::new(DEV_ENDOWMENT), P2PKH::from_pubkey(&pubkey)),
        Output::new(Coin::<0>::new(FAUCET_AMOUNT), UpForGrabs),
        Output::new(RuntimeRef::of(RUNTIME_CODE), UpForGrabs),
    ];

    GenesisConfig::new(outputs).with_transaction(KittyData::mint::<_, OuterVerifier, OuterConstraintChecker>(
        Parent::mom(),
        b"genesis kitty",
        Ed25519Signature::new(pubkey),
    ))
}
