// Kitties - NFT inspiré de CryptoKitties
//
// Create: no inputs, one or more kitties out.
// UpdateKittyName: each input kitty is re-created with only its name changed,
// in the same order.
// Breed: inputs are [mom, dad], outputs are [mom, dad, child]. Both parents
// must be rested and have free breedings left. The child's DNA is the hash
// of (mom dna, dad dna, mom breedings, dad breedings) after the update.

use crate::constraint_checker::SimpleConstraintChecker;
use crate::types::{
    codec, BlockNumber, DynamicallyTypedData, Hash, Output, ResolvedInput, Transaction, UtxoData, Weight,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Nombre de reproductions gratuites d'un chaton
pub const NUM_FREE_BREEDINGS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DadKittyStatus {
    #[default]
    RearinToGo,
    Tired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MomKittyStatus {
    #[default]
    RearinToGo,
    HadBirthRecently,
}

/// Rôle (et état) d'un chaton lors d'une reproduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parent {
    Mom(MomKittyStatus),
    Dad(DadKittyStatus),
}

impl Parent {
    pub fn mom() -> Self {
        Parent::Mom(MomKittyStatus::RearinToGo)
    }

    pub fn dad() -> Self {
        Parent::Dad(DadKittyStatus::RearinToGo)
    }

    fn is_rested(&self) -> bool {
        matches!(
            self,
            Parent::Mom(MomKittyStatus::RearinToGo) | Parent::Dad(DadKittyStatus::RearinToGo)
        )
    }
}

impl Default for Parent {
    fn default() -> Self {
        Parent::mom()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KittyData {
    pub parent: Parent,
    pub free_breedings: u64,
    pub dna: Hash,
    pub num_breedings: u128,
    pub name: [u8; 4],
}

impl Default for KittyData {
    fn default() -> Self {
        Self {
            parent: Parent::default(),
            free_breedings: NUM_FREE_BREEDINGS,
            dna: Hash::hash(b"kitty"),
            num_breedings: 0,
            name: *b"kity",
        }
    }
}

impl UtxoData for KittyData {
    const TYPE_ID: [u8; 4] = *b"Kitt";
}

impl KittyData {
    /// Transaction de création d'un seul chaton
    pub fn mint<V, OV, OC>(parent: Parent, dna_preimage: &[u8], verifier: V) -> Transaction<OV, OC>
    where
        OV: From<V>,
        OC: From<FreeKittyConstraintChecker>,
    {
        let kitty = KittyData {
            parent,
            dna: Hash::hash(dna_preimage),
            ..Default::default()
        };
        Transaction {
            inputs: vec![],
            peeks: vec![],
            outputs: vec![Output::new(kitty, verifier)],
            checker: FreeKittyConstraintChecker::Create.into(),
        }
    }

    /// ADN de l'enfant de `mom` et `dad` (parents déjà mis à jour)
    pub fn child_dna(mom: &KittyData, dad: &KittyData) -> Hash {
        Hash::hash(&codec::encode(&(mom.dna, dad.dna, mom.num_breedings, dad.num_breedings)))
    }
}

fn kitty(data: &DynamicallyTypedData) -> Result<KittyData, KittyError> {
    data.extract().map_err(|_| KittyError::BadlyTyped)
}

/// Erreurs des chatons
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KittyError {
    #[error("Donnée mal typée (attendu: kitty)")]
    BadlyTyped,
    #[error("Breeding needs exactly two parents")]
    TwoParentsDoNotExist,
    #[error("Breeding must output mom, dad and child")]
    NotEnoughFamilyMembers,
    #[error("Mom gave birth recently")]
    MomNotReadyYet,
    #[error("Dad is too tired")]
    DadTooTired,
    #[error("Two moms cannot breed")]
    TwoMomsNotValid,
    #[error("Two dads cannot breed")]
    TwoDadsNotValid,
    #[error("New mom should have given birth recently")]
    NewMomIsStillRearinToGo,
    #[error("New dad should be tired")]
    NewDadIsStillRearinToGo,
    #[error("Parent free breedings not decremented")]
    NewParentFreeBreedingsIncorrect,
    #[error("Parent DNA changed")]
    NewParentDnaDoesntMatchOld,
    #[error("Parent breedings not incremented")]
    NewParentNumberBreedingsIncorrect,
    #[error("Child DNA is incorrect")]
    NewChildDnaIncorrect,
    #[error("Child free breedings is incorrect")]
    NewChildFreeBreedingsIncorrect,
    #[error("Child already has breedings")]
    NewChildHasNonZeroBreedings,
    #[error("Child cannot start tired or after a birth")]
    NewChildIncorrectParentInfo,
    #[error("Kitty cannot breed any more")]
    TooManyBreedingsForKitty,
    #[error("No free breedings left")]
    NotEnoughFreeBreedings,
    #[error("Creation outputs no kitty")]
    CreatingNothing,
    #[error("Creation consumes inputs")]
    CreatingWithInputs,
    #[error("Inputs and outputs count mismatch")]
    NumberOfInputOutputMismatch,
    #[error("DNA differs between input and output")]
    DnaMismatchBetweenInputAndOutput,
    #[error("Name is unchanged")]
    KittyNameUnAltered,
    #[error("Free breedings cannot be updated")]
    FreeBreedingCannotBeUpdated,
    #[error("Number of breedings cannot be updated")]
    NumOfBreedingCannotBeUpdated,
    #[error("Gender cannot be updated")]
    KittyGenderCannotBeUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreeKittyConstraintChecker {
    Create,
    UpdateKittyName,
    Breed,
}

impl SimpleConstraintChecker for FreeKittyConstraintChecker {
    type Error = KittyError;

    fn check(
        &self,
        inputs: &[ResolvedInput],
        _peeks: &[DynamicallyTypedData],
        outputs: &[DynamicallyTypedData],
        _block_height: BlockNumber,
    ) -> Result<Weight, KittyError> {
        match self {
            Self::Create => {
                if !inputs.is_empty() {
                    return Err(KittyError::CreatingWithInputs);
                }
                if outputs.is_empty() {
                    return Err(KittyError::CreatingNothing);
                }
                for output in outputs {
                    kitty(output)?;
                }
                debug!("🐱 Creating {} kitties", outputs.len());
            }
            Self::UpdateKittyName => {
                if inputs.len() != outputs.len() || inputs.is_empty() {
                    return Err(KittyError::NumberOfInputOutputMismatch);
                }
                for (input, output) in inputs.iter().zip(outputs) {
                    check_name_update(&kitty(&input.payload)?, &kitty(output)?)?;
                }
            }
            Self::Breed => {
                let [mom, dad] = inputs else {
                    return Err(KittyError::TwoParentsDoNotExist);
                };
                let mom = kitty(&mom.payload)?;
                let dad = kitty(&dad.payload)?;
                check_can_breed(&mom, &dad)?;

                let [new_mom, new_dad, child] = outputs else {
                    return Err(KittyError::NotEnoughFamilyMembers);
                };
                let new_mom = kitty(new_mom)?;
                let new_dad = kitty(new_dad)?;
                let child = kitty(child)?;
                check_new_parent(&mom, &new_mom)?;
                check_new_parent(&dad, &new_dad)?;
                check_child(&new_mom, &new_dad, &child)?;
                debug!("🐱 Breeding produced {}", child.dna);
            }
        }
        Ok(0)
    }
}

fn check_can_breed(mom: &KittyData, dad: &KittyData) -> Result<(), KittyError> {
    match mom.parent {
        Parent::Mom(MomKittyStatus::HadBirthRecently) => return Err(KittyError::MomNotReadyYet),
        Parent::Dad(_) => return Err(KittyError::TwoDadsNotValid),
        Parent::Mom(MomKittyStatus::RearinToGo) => {}
    }
    match dad.parent {
        Parent::Dad(DadKittyStatus::Tired) => return Err(KittyError::DadTooTired),
        Parent::Mom(_) => return Err(KittyError::TwoMomsNotValid),
        Parent::Dad(DadKittyStatus::RearinToGo) => {}
    }
    if mom.num_breedings == u128::MAX || dad.num_breedings == u128::MAX {
        return Err(KittyError::TooManyBreedingsForKitty);
    }
    if mom.free_breedings == 0 || dad.free_breedings == 0 {
        return Err(KittyError::NotEnoughFreeBreedings);
    }
    Ok(())
}

/// Le parent sort de la reproduction fatigué, same DNA, one breeding more
fn check_new_parent(old: &KittyData, new: &KittyData) -> Result<(), KittyError> {
    match (old.parent, new.parent) {
        (Parent::Mom(_), Parent::Mom(MomKittyStatus::RearinToGo)) => {
            return Err(KittyError::NewMomIsStillRearinToGo)
        }
        (Parent::Dad(_), Parent::Dad(DadKittyStatus::RearinToGo)) => {
            return Err(KittyError::NewDadIsStillRearinToGo)
        }
        (Parent::Mom(_), Parent::Dad(_)) => return Err(KittyError::TwoDadsNotValid),
        (Parent::Dad(_), Parent::Mom(_)) => return Err(KittyError::TwoMomsNotValid),
        _ => {}
    }

    if Some(new.free_breedings) != old.free_breedings.checked_sub(1) {
        return Err(KittyError::NewParentFreeBreedingsIncorrect);
    }
    if Some(new.num_breedings) != old.num_breedings.checked_add(1) {
        return Err(KittyError::NewParentNumberBreedingsIncorrect);
    }
    if new.dna != old.dna {
        return Err(KittyError::NewParentDnaDoesntMatchOld);
    }
    Ok(())
}

fn check_child(new_mom: &KittyData, new_dad: &KittyData, child: &KittyData) -> Result<(), KittyError> {
    if child.dna != KittyData::child_dna(new_mom, new_dad) {
        return Err(KittyError::NewChildDnaIncorrect);
    }
    if child.free_breedings != NUM_FREE_BREEDINGS {
        return Err(KittyError::NewChildFreeBreedingsIncorrect);
    }
    if child.num_breedings != 0 {
        return Err(KittyError::NewChildHasNonZeroBreedings);
    }
    if !child.parent.is_rested() {
        return Err(KittyError::NewChildIncorrectParentInfo);
    }
    Ok(())
}

fn check_name_update(original: &KittyData, updated: &KittyData) -> Result<(), KittyError> {
    if original.dna != updated.dna {
        return Err(KittyError::DnaMismatchBetweenInputAndOutput);
    }
    if original == updated {
        return Err(KittyError::KittyNameUnAltered);
    }
    if original.free_breedings != updated.free_breedings {
        return Err(KittyError::FreeBreedingCannotBeUpdated);
    }
    if original.num_breedings != updated.num_breedings {
        return Err(KittyError::NumOfBreedingCannotBeUpdated);
    }
    if original.parent != updated.parent {
        return Err(KittyError::KittyGenderCannotBeUpdated);
    }
    Ok(())
}
