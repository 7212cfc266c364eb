// KratOs UTXO - Moteur d'exécution d'un ledger UTXO
//
// Outputs carry dynamically typed data guarded by a verifier; transactions
// are judged by a constraint checker. Runtimes aggregate verifiers and
// pieces with the `aggregate_*` macros and run them through the executive.

pub mod aggregator;
pub mod cli;
pub mod constraint_checker;
pub mod executive;
pub mod genesis;
pub mod inherents;
pub mod node;
pub mod pieces;
pub mod runtime;
pub mod storage;
pub mod types;
pub mod verifier;

#[cfg(test)]
mod tests;
