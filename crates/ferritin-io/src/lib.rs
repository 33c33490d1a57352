//! ferritin-io
//!
//! Reading the on-disk inputs of template featurization: structure files,
//! the release date table and the PDB obsolete listing.
mod cif;
mod error;
mod header;
mod obsolete;
mod parser;
mod release_dates;
mod seqres;
mod store;

pub use error::{IoError, StructureError};
pub use header::release_date;
pub use obsolete::ObsoletePdbs;
pub use parser::{DocumentFormat, PdbtbxParser, StructureParse, StructureParser};
pub use release_dates::{parse_iso_date, ReleaseDates};
pub use seqres::{seqres_chains, SeqresChain, SeqresResidue};
pub use store::{DocumentCache, StructureStore, DEFAULT_CACHE_CAPACITY};
