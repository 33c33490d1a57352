use ferritin_io::{IoError, StructureError};
use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole featurization call.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("hit.name did not start with PDBID_chain: {0}")]
    MalformedHitName(String),
    #[error("max_template_date must be set and have format YYYY-MM-DD, got {0:?}")]
    InvalidMaxTemplateDate(String),
    #[error("could not find .{extension} structures in {}", dir.display())]
    NoStructureFiles { dir: PathBuf, extension: String },
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    #[error("failed to export template features: {0}")]
    Export(String),
    #[error(transparent)]
    Hit(#[from] HitError),
}

/// Cheap, structure-free rejections. See [`crate::prefilter`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PrefilterError {
    #[error("Date ({date}) > max template date ({cutoff}).")]
    Date { date: String, cutoff: String },
    #[error("Proportion of residues aligned to query too small. Align ratio: {0}.")]
    AlignRatio(f64),
    #[error("Template is an exact subsequence of query with large coverage. Length ratio: {0}.")]
    Duplicate(f64),
    #[error("Template too short. Length: {0}.")]
    Length(usize),
}

impl PrefilterError {
    /// Rejections that strict mode reports as errors.
    pub fn is_strict(&self) -> bool {
        matches!(self, PrefilterError::Date { .. } | PrefilterError::Duplicate(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("The distance between residues {residue_a} and {residue_b} is {distance} > limit {limit}.")]
pub struct CaDistanceError {
    pub residue_a: usize,
    pub residue_b: usize,
    pub distance: f32,
    pub limit: f32,
}

/// Failures of a single hit after it passed the prefilter.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HitError {
    #[error("No chains in PDB: {0}")]
    NoChains(String),
    #[error("{0}")]
    SequenceNotInTemplate(String),
    #[error("{0}")]
    QueryToTemplateAlign(String),
    #[error("{0}")]
    NoAtomDataInTemplate(String),
    #[error("{0}")]
    TemplateAtomMaskAllZeros(String),
    #[error("{0}")]
    StructureUnavailable(String),
}

impl HitError {
    /// Missing experimental data rather than a search problem; reported as warnings
    /// unless strict.
    pub fn is_missing_data(&self) -> bool {
        matches!(
            self,
            HitError::NoChains(_)
                | HitError::NoAtomDataInTemplate(_)
                | HitError::TemplateAtomMaskAllZeros(_)
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlignError {
    #[error("kalign requires sequences of at least 6 residues, got {0}")]
    SequenceTooShort(usize),
    #[error("aligner failed: {0}")]
    Failed(String),
    #[error("aligner returned {0} sequences, expected 2")]
    UnexpectedOutput(usize),
}
