// Money - Jeton fongible simple
//
// Coins are plain `u128` amounts. Several independent currencies can live in
// the same runtime: each `ID` gets its own type id.

use crate::constraint_checker::SimpleConstraintChecker;
use crate::types::{BlockNumber, DynamicallyTypedData, ResolvedInput, UtxoData, Weight};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Une pièce de monnaie de la devise `ID`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coin<const ID: u8>(pub u128);

impl<const ID: u8> Coin<ID> {
    pub fn new(amount: u128) -> Self {
        Coin(amount)
    }

    pub fn value(&self) -> u128 {
        self.0
    }
}

impl<const ID: u8> UtxoData for Coin<ID> {
    const TYPE_ID: [u8; 4] = [b'c', b'o', b'i', ID];
}

/// Erreurs du checker monétaire
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Donnée mal typée (attendu: coin)")]
    BadlyTyped,

    #[error("Minting transaction consumes inputs")]
    MintingWithInputs,

    #[error("Minting transaction creates no coin")]
    MintingNothing,

    #[error("Spend transaction consumes no input")]
    SpendingNothing,

    #[error("Outputs are worth more than inputs")]
    OutputsExceedInputs,

    #[error("Coin value overflow")]
    ValueOverflow,

    #[error("Coin with zero value")]
    ZeroValueCoin,
}

/// Règles de la monnaie `ID`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoneyConstraintChecker<const ID: u8> {
    /// Consume coins, create coins worth at most as much. The difference is burned.
    Spend,
    /// Create coins out of nothing. Publicly available on dev chains.
    Mint,
}

fn coin_value<const ID: u8>(data: &DynamicallyTypedData) -> Result<u128, MoneyError> {
    data.extract::<Coin<ID>>()
        .map(|coin| coin.0)
        .map_err(|_| MoneyError::BadlyTyped)
}

/// Sum of the output coins, rejecting zero-valued ones
fn sum_outputs<const ID: u8>(outputs: &[DynamicallyTypedData]) -> Result<u128, MoneyError> {
    let mut total: u128 = 0;
    for output in outputs {
        let value = coin_value::<ID>(output)?;
        if value == 0 {
            return Err(MoneyError::ZeroValueCoin);
        }
        total = total.checked_add(value).ok_or(MoneyError::ValueOverflow)?;
    }
    Ok(total)
}

impl<const ID: u8> SimpleConstraintChecker for MoneyConstraintChecker<ID> {
    type Error = MoneyError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        _peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        _block_height: BlockNumber,
    ) -> Result<Weight, MoneyError> {
        match self {
            Self::Spend => {
                if inputs.is_empty() {
                    return Err(MoneyError::SpendingNothing);
                }

                let mut total_input: u128 = 0;
                for input in inputs {
                    let value = coin_value::<ID>(&input.payload)?;
                    total_input = total_input.checked_add(value).ok_or(MoneyError::ValueOverflow)?;
                }
                let total_output = sum_outputs::<ID>(outputs)?;

                if total_output > total_input {
                    return Err(MoneyError::OutputsExceedInputs);
                }

                // Le montant brûlé sert de poids (et donc de priorité)
                let burned = total_input - total_output;
                debug!("💰 Spend: in {} out {} burned {}", total_input, total_output, burned);
                Ok(u64::try_from(burned).unwrap_or(u64::MAX))
            }
            Self::Mint => {
                if !inputs.is_empty() {
                    return Err(MoneyError::MintingWithInputs);
                }
                if outputs.is_empty() {
                    return Err(MoneyError::MintingNothing);
                }
                let minted = sum_outputs::<ID>(outputs)?;
                debug!("🪙 Mint: {} new coins worth {}", outputs.len(), minted);
                Ok(0)
            }
        }
    }
}
