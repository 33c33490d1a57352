//! # ferritin-core
//!
//! Core data structures for template featurization.
//!
//! __ferritin-core__ provides:
//! * Residue and atom constants (atom37 ordering, HHblits alphabet)
//! * [`TemplateStructure`], the parsed-structure model consumed by the template pipeline
//!
mod info;
mod structure;

pub use self::info::constants::{
    aa3to1, hhblits_aa_to_id, is_amino_acid, sequence_to_onehot, AAAtom, ATOM_TYPE_NUM, GAP,
    RESTYPE_WITH_X_AND_GAP_NUM,
};
pub use self::structure::{ChainShapeError, TemplateChain, TemplateStructure};
