// Tests module
// Integration: end-to-end spends, locks, genesis and multi-node block flow
// Ledger invariants: conservation, atomicity, typing and ordering guarantees

pub mod integration;
