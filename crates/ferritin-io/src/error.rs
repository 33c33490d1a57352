use ferritin_core::ChainShapeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid release date table: {0}")]
    ReleaseDateTable(#[from] serde_json::Error),
    #[error("invalid release date {date:?} for {pdb_id}")]
    InvalidDate { pdb_id: String, date: String },
    #[error("obsolete PDB mapping contains a reference cycle through {0}")]
    ObsoleteCycle(String),
}

#[derive(Debug, Error)]
pub enum StructureError {
    #[error(transparent)]
    Shape(#[from] ChainShapeError),
}
