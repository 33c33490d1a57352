//! # Constants
//!
//! Residue and atom tables shared by the template pipeline.
//!
//! ## Atom Types
//! Atoms are stored in the fixed 37-slot ordering used by structure prediction
//! models (`N, CA, C, CB, O, ...`). See [`AAAtom`].
//!
//! ## Residue Alphabet
//! Template sequences are one-hot encoded over the HHblits alphabet:
//! the 20 canonical amino acids, `X` for unknown and `-` for gaps.
//!
use ndarray::Array2;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Number of atom slots per residue.
pub const ATOM_TYPE_NUM: usize = 37;

/// Number of classes in the one-hot template sequence encoding.
pub const RESTYPE_WITH_X_AND_GAP_NUM: usize = 22;

/// Gap character used for query positions without a template residue.
pub const GAP: char = '-';

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum AAAtom {
    N = 0,    CA = 1,   C = 2,    CB = 3,   O = 4,
    CG = 5,   CG1 = 6,  CG2 = 7,  OG = 8,   OG1 = 9,
    SG = 10,  CD = 11,  CD1 = 12, CD2 = 13, ND1 = 14,
    ND2 = 15, OD1 = 16, OD2 = 17, SD = 18,  CE = 19,
    CE1 = 20, CE2 = 21, CE3 = 22, NE = 23,  NE1 = 24,
    NE2 = 25, OE1 = 26, OE2 = 27, CH2 = 28, NH1 = 29,
    NH2 = 30, OH = 31,  CZ = 32,  CZ2 = 33, CZ3 = 34,
    NZ = 35,  OXT = 36,
}

impl AAAtom {
    pub fn to_index(&self) -> usize {
        *self as usize
    }

    /// Look up an atom slot by its PDB atom name (`"CA"`, `"OXT"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        name.trim().parse().ok()
    }

    pub fn names() -> impl Iterator<Item = String> {
        AAAtom::iter().map(|atom| atom.to_string())
    }
}

#[rustfmt::skip]
pub fn aa3to1(aa: &str) -> char {
    match aa {
        "ALA" => 'A', "CYS" => 'C', "ASP" => 'D',
        "GLU" => 'E', "PHE" => 'F', "GLY" => 'G',
        "HIS" => 'H', "ILE" => 'I', "LYS" => 'K',
        "LEU" => 'L', "MET" => 'M', "ASN" => 'N',
        "PRO" => 'P', "GLN" => 'Q', "ARG" => 'R',
        "SER" => 'S', "THR" => 'T', "VAL" => 'V',
        "TRP" => 'W', "TYR" => 'Y',
        // selenomethionine is read as methionine
        "MSE" => 'M',
        _     => 'X',
    }
}

/// True for the canonical amino acids and selenomethionine.
pub fn is_amino_acid(aa: &str) -> bool {
    aa3to1(aa) != 'X'
}

/// HHblits residue ids. Ambiguity codes fold into their closest canonical
/// residue; anything unrecognized is `X`.
#[rustfmt::skip]
pub fn hhblits_aa_to_id(aa: char) -> usize {
    match aa {
        'A' => 0,  'C' => 1,  'D' => 2,  'E' => 3,  'F' => 4,
        'G' => 5,  'H' => 6,  'I' => 7,  'K' => 8,  'L' => 9,
        'M' => 10, 'N' => 11, 'P' => 12, 'Q' => 13, 'R' => 14,
        'S' => 15, 'T' => 16, 'V' => 17, 'W' => 18, 'Y' => 19,
        'B' => 2,  'Z' => 3,  'U' => 1,
        '-' => 21,
        _   => 20,
    }
}

/// One-hot encode a sequence as a `[len, 22]` array.
pub fn sequence_to_onehot(sequence: &str) -> Array2<f32> {
    let mut onehot = Array2::<f32>::zeros((sequence.len(), RESTYPE_WITH_X_AND_GAP_NUM));
    for (idx, aa) in sequence.chars().enumerate() {
        onehot[[idx, hhblits_aa_to_id(aa)]] = 1.0;
    }
    onehot
}
