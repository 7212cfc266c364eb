// Parachain runtime - Le runtime de dev plus l'inherent parachain info
use super::OuterVerifier;
use crate::inherents::InherentAdapter;
use crate::pieces::parachain_info::SetParachainInfo;
use crate::types;

crate::aggregate_constraint_checker! {
    verifier: OuterVerifier;
    error: ParachainConstraintCheckerError;
    /// The dev runtime's pieces, nested, plus the parachain info inherent
    pub enum ParachainConstraintChecker {
        Dev(super::OuterConstraintChecker),
        ParachainInfo(InherentAdapter<SetParachainInfo>),
    }
}

pub type Transaction = types::Transaction<OuterVerifier, ParachainConstraintChecker>;
pub type Block = types::Block<OuterVerifier, ParachainConstraintChecker>;
pub type Executive = crate::executive::Executive<OuterVerifier, ParachainConstraintChecker>;
