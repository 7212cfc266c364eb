// Pieces - Modules métier composables d'un runtime
//
// Each piece owns its data types (tagged with a 4-byte type id) and its
// constraint checkers. A runtime assembles the pieces it wants with
// `aggregate_constraint_checker!`.

pub mod amoeba;
pub mod kitties;
pub mod money;
pub mod parachain_info;
pub mod poe;
pub mod runtime_upgrade;
pub mod timestamp;
