//! ferritin-templates
//!
//! Template featurization for structure prediction:
//!
//! - prefilter search hits against a query sequence
//! - locate each hit in its experimental structure, realigning when the sequence drifted
//! - extract atom coordinates and place them onto the query
//! - stack accepted templates into fixed-shape arrays and export them as safetensors
//!
//! ```no_run
//! use ferritin_templates::{load_hits, TemplateFeaturizerConfig, TemplateHitFeaturizer};
//! use ferritin_templates::GlobalAligner;
//! use ferritin_io::PdbtbxParser;
//!
//! # fn main() -> Result<(), ferritin_templates::TemplateError> {
//! let config = TemplateFeaturizerConfig {
//!     structure_dir: "pdb_mmcif".into(),
//!     max_template_date: "2021-10-10".into(),
//!     ..Default::default()
//! };
//! let featurizer = TemplateHitFeaturizer::new(config, PdbtbxParser, GlobalAligner::default())?;
//! let hits = load_hits("hits.json")?;
//! let result = featurizer.get_templates("MKTAYIAKQRQISFVKSHFSRQ", &hits)?;
//! result.features.save_safetensors("templates.safetensors")?;
//! # Ok(())
//! # }
//! ```
mod align;
mod error;
mod extract;
mod features;
mod featurizer;
mod hit;
mod locate;
mod mapping;
mod prefilter;
mod realign;

pub use align::{parse_a3m, parse_fasta, Aligner, GlobalAligner, KalignAligner};
pub use error::{AlignError, CaDistanceError, HitError, PrefilterError, TemplateError};
pub use extract::{check_residue_distances, get_atom_positions, zero_center, MAX_CA_CA_DISTANCE};
pub use features::{
    assemble_template_features, TemplateFeatureStack, TemplateFeatures, MIN_OBSERVED_ATOMS,
};
pub use featurizer::{
    extract_template_features, get_custom_template_features, ExtractionOptions, ScoreOrdering,
    SingleHitResult, TemplateFeaturizerConfig, TemplateHitFeaturizer, TemplateSearchResult,
};
pub use hit::{hits_from_json_str, load_hits, TemplateHit, GAP_INDEX};
pub use locate::{find_template_in_structure, TemplateMatch};
pub use mapping::{build_query_to_hit_index_mapping, identity_mapping, mapping_for_hit, IndexMapping};
pub use prefilter::{assess_hit, resolve_pdb_id, Prefilter, PrefilterResult, PrefilterThresholds};
pub use realign::{realign_template_to_query, Realignment, MIN_REALIGN_IDENTITY};
