//! Template Structure
//!
//! A parsed structure as seen by the template pipeline: an ordered set of
//! chains, each carrying its full sequence and per-residue atom37 coordinates.
//!
//! Chains keep the order in which the parser produced them. Searches that
//! return "the first matching chain" rely on this ordering.
use crate::info::constants::ATOM_TYPE_NUM;
use chrono::NaiveDate;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ChainShapeError {
    #[error("chain {chain}: positions have shape {positions:?}, expected ({residues}, 37, 3)")]
    Positions {
        chain: String,
        positions: Vec<usize>,
        residues: usize,
    },
    #[error("chain {chain}: mask has shape {mask:?}, expected ({residues}, 37)")]
    Mask {
        chain: String,
        mask: Vec<usize>,
        residues: usize,
    },
    #[error("duplicate chain id {0}")]
    DuplicateChain(String),
}

/// One chain: sequence plus `[residues, 37, 3]` positions and `[residues, 37]` mask.
#[derive(Debug, Clone)]
pub struct TemplateChain {
    id: String,
    sequence: String,
    positions: Array3<f32>,
    mask: Array2<f32>,
}

impl TemplateChain {
    pub fn new(
        id: impl Into<String>,
        sequence: impl Into<String>,
        positions: Array3<f32>,
        mask: Array2<f32>,
    ) -> Result<Self, ChainShapeError> {
        let id = id.into();
        let sequence = sequence.into();
        let residues = sequence.len();
        if positions.dim() != (residues, ATOM_TYPE_NUM, 3) {
            return Err(ChainShapeError::Positions {
                chain: id,
                positions: positions.shape().to_vec(),
                residues,
            });
        }
        if mask.dim() != (residues, ATOM_TYPE_NUM) {
            return Err(ChainShapeError::Mask {
                chain: id,
                mask: mask.shape().to_vec(),
                residues,
            });
        }
        Ok(Self {
            id,
            sequence,
            positions,
            mask,
        })
    }

    /// A chain with no observed atoms.
    pub fn unobserved(id: impl Into<String>, sequence: impl Into<String>) -> Self {
        let sequence = sequence.into();
        let residues = sequence.len();
        Self {
            id: id.into(),
            sequence,
            positions: Array3::zeros((residues, ATOM_TYPE_NUM, 3)),
            mask: Array2::zeros((residues, ATOM_TYPE_NUM)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn sequence(&self) -> &str {
        &self.sequence
    }
    pub fn len(&self) -> usize {
        self.sequence.len()
    }
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
    pub fn positions(&self) -> ArrayView3<'_, f32> {
        self.positions.view()
    }
    pub fn mask(&self) -> ArrayView2<'_, f32> {
        self.mask.view()
    }
}

#[derive(Debug, Clone)]
pub struct TemplateStructure {
    file_id: String,
    chains: Vec<TemplateChain>,
    release_date: Option<NaiveDate>,
}

impl TemplateStructure {
    pub fn new(file_id: impl Into<String>, release_date: Option<NaiveDate>) -> Self {
        Self {
            file_id: file_id.into(),
            chains: Vec::new(),
            release_date,
        }
    }

    pub fn push_chain(&mut self, chain: TemplateChain) -> Result<(), ChainShapeError> {
        if self.chain(chain.id()).is_some() {
            return Err(ChainShapeError::DuplicateChain(chain.id));
        }
        self.chains.push(chain);
        Ok(())
    }

    pub fn with_chain(mut self, chain: TemplateChain) -> Result<Self, ChainShapeError> {
        self.push_chain(chain)?;
        Ok(self)
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }
    pub fn release_date(&self) -> Option<NaiveDate> {
        self.release_date
    }
    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
    pub fn chains(&self) -> impl Iterator<Item = &TemplateChain> {
        self.chains.iter()
    }
    pub fn chain(&self, chain_id: &str) -> Option<&TemplateChain> {
        self.chains.iter().find(|chain| chain.id == chain_id)
    }
    pub fn chain_sequence(&self, chain_id: &str) -> Option<&str> {
        self.chain(chain_id).map(TemplateChain::sequence)
    }

    /// Chain id / sequence pairs in parser order.
    pub fn chain_sequences(&self) -> impl Iterator<Item = (&str, &str)> {
        self.chains
            .iter()
            .map(|chain| (chain.id.as_str(), chain.sequence.as_str()))
    }

    /// Positions `[residues, 37, 3]` and mask `[residues, 37]` for a chain.
    pub fn atom_coordinates(
        &self,
        chain_id: &str,
    ) -> Option<(ArrayView3<'_, f32>, ArrayView2<'_, f32>)> {
        self.chain(chain_id)
            .map(|chain| (chain.positions(), chain.mask()))
    }
}
