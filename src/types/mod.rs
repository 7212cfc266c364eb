// Types fondamentaux du ledger UTXO
// Principe: Minimal, auditable, durable

pub mod primitives;
pub mod codec;
pub mod signature;
pub mod dynamic_typing;
pub mod transaction;
pub mod block;
pub mod merkle;

pub use primitives::*;
pub use codec::CodecError;
pub use signature::*;
pub use dynamic_typing::*;
pub use transaction::*;
pub use block::*;
pub use merkle::*;
