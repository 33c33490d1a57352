//! Template Hit Featurizer
//!
//! Turns a ranked list of search hits into a stack of template features:
//!
//! 1. prefilter every hit (no structure files touched)
//! 2. sort the survivors by `sum_probs`, optionally shuffling the top k
//! 3. featurize hits in that order until `max_hits` distinct templates are accepted
//! 4. stack the accepted templates, or return the empty placeholder
//!
//! Per-hit failures never abort the call. They come back as error or warning
//! strings next to the features.
use crate::align::{Aligner, GlobalAligner};
use crate::error::{HitError, TemplateError};
use crate::extract::{get_atom_positions, MAX_CA_CA_DISTANCE};
use crate::features::{assemble_template_features, TemplateFeatureStack, TemplateFeatures};
use crate::hit::TemplateHit;
use crate::locate::find_template_in_structure;
use crate::mapping::{identity_mapping, mapping_for_hit, IndexMapping};
use crate::prefilter::{resolve_pdb_id, Prefilter, PrefilterThresholds};
use crate::realign::realign_template_to_query;
use chrono::NaiveDate;
use ferritin_core::TemplateStructure;
use ferritin_io::{ObsoletePdbs, PdbtbxParser, ReleaseDates, StructureParse, StructureParser, StructureStore};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::PathBuf;

/// How hits are ranked before featurization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ScoreOrdering {
    /// Descending `sum_probs`; hits without a score go after every scored hit.
    #[default]
    Raw,
    /// Descending `sum_probs` with a missing score read as 0. Skipped hits are logged at debug.
    MissingAsZero,
}

impl ScoreOrdering {
    /// Stable sort, best first.
    pub fn sort(&self, hits: &mut [&TemplateHit]) {
        match self {
            ScoreOrdering::Raw => hits.sort_by(|a, b| match (a.sum_probs, b.sum_probs) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }),
            ScoreOrdering::MissingAsZero => {
                hits.sort_by(|a, b| b.sum_probs_or_zero().total_cmp(&a.sum_probs_or_zero()))
            }
        }
    }

    fn log_skipped(&self, hit: &TemplateHit, error: Option<&str>, warning: Option<&str>) {
        let level = match self {
            ScoreOrdering::Raw => log::Level::Info,
            ScoreOrdering::MissingAsZero => log::Level::Debug,
        };
        log::log!(
            level,
            "Skipped invalid hit {}, error: {:?}, warning: {:?}",
            hit.name,
            error,
            warning
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionOptions {
    pub zero_center_positions: bool,
    pub max_ca_ca_distance: f32,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            zero_center_positions: true,
            max_ca_ca_distance: MAX_CA_CA_DISTANCE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateFeaturizerConfig {
    /// Directory of `<pdb_id>.<structure_extension>` files.
    pub structure_dir: PathBuf,
    pub structure_extension: String,
    /// `YYYY-MM-DD`; templates released after this are dropped.
    pub max_template_date: String,
    pub max_hits: usize,
    pub release_dates_path: Option<PathBuf>,
    pub obsolete_pdbs_path: Option<PathBuf>,
    /// Report date/duplicate rejections and missing structure data as errors.
    pub strict_error_check: bool,
    pub shuffle_top_k: Option<usize>,
    /// Seed for the top-k shuffle. Unseeded runs draw from OS entropy.
    pub seed: Option<u64>,
    pub score_ordering: ScoreOrdering,
    pub prefilter: PrefilterThresholds,
    pub extraction: ExtractionOptions,
}

impl Default for TemplateFeaturizerConfig {
    fn default() -> Self {
        Self {
            structure_dir: PathBuf::new(),
            structure_extension: "cif".to_string(),
            max_template_date: String::new(),
            max_hits: 20,
            release_dates_path: None,
            obsolete_pdbs_path: None,
            strict_error_check: false,
            shuffle_top_k: None,
            seed: None,
            score_ordering: ScoreOrdering::default(),
            prefilter: PrefilterThresholds::default(),
            extraction: ExtractionOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SingleHitResult {
    pub features: Option<TemplateFeatures>,
    pub error: Option<String>,
    pub warning: Option<String>,
}

impl SingleHitResult {
    fn error(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    fn warning(warning: String) -> Self {
        Self {
            warning: Some(warning),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSearchResult {
    pub features: TemplateFeatureStack,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Locate, optionally realign, extract and assemble one template.
///
/// Returns the features and, when the hit had to be realigned, a warning saying so.
#[allow(clippy::too_many_arguments)]
pub fn extract_template_features<A: Aligner + ?Sized>(
    structure: Option<&TemplateStructure>,
    pdb_id: &str,
    mapping: IndexMapping,
    template_sequence: &str,
    query: &str,
    template_chain_id: &str,
    aligner: &A,
    options: &ExtractionOptions,
) -> Result<(TemplateFeatures, Option<String>), HitError> {
    let structure = match structure {
        Some(structure) if !structure.is_empty() => structure,
        _ => return Err(HitError::NoChains(format!("{}_{}", pdb_id, template_chain_id))),
    };

    let mut warning = None;
    let (template_sequence, chain_id, mapping, mapping_offset) =
        match find_template_in_structure(template_chain_id, template_sequence, structure) {
            Ok(found) => (template_sequence.to_string(), found.chain_id, mapping, found.offset),
            Err(HitError::SequenceNotInTemplate(_)) => {
                let message = format!(
                    "The exact sequence {} was not found in {}_{}. Realigning the template to the actual sequence.",
                    template_sequence, pdb_id, template_chain_id
                );
                log::warn!("{}", message);
                let realigned = realign_template_to_query(
                    template_sequence,
                    template_chain_id,
                    structure,
                    &mapping,
                    aligner,
                )?;
                log::info!(
                    "Sequence in {}_{}: {} successfully realigned to {}",
                    pdb_id,
                    realigned.chain_id,
                    template_sequence,
                    realigned.sequence
                );
                warning = Some(message);
                (realigned.sequence, realigned.chain_id, realigned.mapping, 0)
            }
            Err(e) => return Err(e),
        };

    let (positions, mask) = get_atom_positions(
        structure,
        &chain_id,
        options.max_ca_ca_distance,
        options.zero_center_positions,
    )?;
    let features = assemble_template_features(
        query.len(),
        &mapping,
        mapping_offset,
        &template_sequence,
        positions.view(),
        mask.view(),
        pdb_id,
        &chain_id,
    )?;
    Ok((features, warning))
}

/// Features from one user-supplied structure, aligned residue-for-residue to the query.
pub fn get_custom_template_features<A: Aligner + ?Sized>(
    structure: &TemplateStructure,
    query: &str,
    pdb_id: &str,
    chain_id: &str,
    aligner: &A,
) -> Result<TemplateSearchResult, TemplateError> {
    let template_sequence = structure
        .chain_sequence(chain_id)
        .ok_or_else(|| HitError::NoChains(format!("{}_{}", pdb_id, chain_id)))?;
    let (mut features, warning) = extract_template_features(
        Some(structure),
        pdb_id,
        identity_mapping(query.len()),
        template_sequence,
        query,
        chain_id,
        aligner,
        &ExtractionOptions::default(),
    )?;
    features.sum_probs = 1.0;

    Ok(TemplateSearchResult {
        features: TemplateFeatureStack::stack(query.len(), &[features])?,
        errors: Vec::new(),
        warnings: warning.into_iter().collect(),
    })
}

pub struct TemplateHitFeaturizer<P = PdbtbxParser, A = GlobalAligner> {
    config: TemplateFeaturizerConfig,
    max_template_date: NaiveDate,
    release_dates: ReleaseDates,
    obsolete_pdbs: ObsoletePdbs,
    store: StructureStore,
    parser: P,
    aligner: A,
    rng: RefCell<StdRng>,
}

impl<P: StructureParser, A: Aligner> TemplateHitFeaturizer<P, A> {
    /// Build from config, loading the optional release date and obsolete tables.
    pub fn new(config: TemplateFeaturizerConfig, parser: P, aligner: A) -> Result<Self, TemplateError> {
        let release_dates = match &config.release_dates_path {
            Some(path) => {
                log::info!("Using precomputed release dates {}.", path.display());
                ReleaseDates::from_path(path)?
            }
            None => ReleaseDates::default(),
        };
        let obsolete_pdbs = match &config.obsolete_pdbs_path {
            Some(path) => {
                log::info!("Using precomputed obsolete pdbs {}.", path.display());
                ObsoletePdbs::from_path(path)?
            }
            None => ObsoletePdbs::default(),
        };
        Self::with_tables(config, release_dates, obsolete_pdbs, parser, aligner)
    }

    /// Build with tables already in memory. The table paths in `config` are ignored.
    pub fn with_tables(
        config: TemplateFeaturizerConfig,
        release_dates: ReleaseDates,
        obsolete_pdbs: ObsoletePdbs,
        parser: P,
        aligner: A,
    ) -> Result<Self, TemplateError> {
        let store = StructureStore::new(&config.structure_dir, &config.structure_extension);
        if !store.has_documents().unwrap_or(false) {
            log::error!(
                "Could not find .{} files in {}",
                store.extension(),
                store.dir().display()
            );
            return Err(TemplateError::NoStructureFiles {
                dir: store.dir().to_path_buf(),
                extension: store.extension().to_string(),
            });
        }

        let max_template_date = NaiveDate::parse_from_str(&config.max_template_date, "%Y-%m-%d")
            .map_err(|_| TemplateError::InvalidMaxTemplateDate(config.max_template_date.clone()))?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            max_template_date,
            release_dates,
            obsolete_pdbs,
            store,
            parser,
            aligner,
            rng: RefCell::new(rng),
        })
    }

    pub fn config(&self) -> &TemplateFeaturizerConfig {
        &self.config
    }

    pub fn max_template_date(&self) -> NaiveDate {
        self.max_template_date
    }

    fn prefilter(&self) -> Prefilter<'_> {
        Prefilter {
            release_dates: &self.release_dates,
            obsolete: &self.obsolete_pdbs,
            cutoff: self.max_template_date,
            thresholds: self.config.prefilter,
            strict_error_check: self.config.strict_error_check,
        }
    }

    /// Indices into the sorted hits, with the first `shuffle_top_k` permuted.
    fn processing_order(&self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        if let Some(k) = self.config.shuffle_top_k.filter(|&k| k > 0) {
            let k = k.min(n);
            order[..k].shuffle(&mut *self.rng.borrow_mut());
        }
        order
    }

    pub fn get_templates(
        &self,
        query: &str,
        hits: &[TemplateHit],
    ) -> Result<TemplateSearchResult, TemplateError> {
        log::info!("Searching for template for: {}", query);
        let prefilter = self.prefilter();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let mut filtered: Vec<&TemplateHit> = Vec::new();
        for hit in hits {
            let result = prefilter.check(query, hit)?;
            errors.extend(result.error);
            warnings.extend(result.warning);
            if result.valid {
                filtered.push(hit);
            }
        }
        self.config.score_ordering.sort(&mut filtered);

        let mut already_seen: HashSet<String> = HashSet::new();
        let mut accepted: Vec<TemplateFeatures> = Vec::new();
        for i in self.processing_order(filtered.len()) {
            if already_seen.len() >= self.config.max_hits {
                break;
            }
            let hit = filtered[i];
            let SingleHitResult {
                features,
                error,
                warning,
            } = self.process_single_hit(query, hit)?;

            match features {
                None => {
                    self.config
                        .score_ordering
                        .log_skipped(hit, error.as_deref(), warning.as_deref());
                }
                Some(features) => {
                    if already_seen.insert(features.sequence.clone()) {
                        accepted.push(features);
                    }
                }
            }
            errors.extend(error);
            warnings.extend(warning);
        }

        Ok(TemplateSearchResult {
            features: TemplateFeatureStack::stack(query.len(), &accepted)?,
            errors,
            warnings,
        })
    }

    /// Featurize one hit that already passed the prefilter.
    ///
    /// Only a malformed hit name is an `Err`; everything else is reported in the result.
    pub fn process_single_hit(
        &self,
        query: &str,
        hit: &TemplateHit,
    ) -> Result<SingleHitResult, TemplateError> {
        let (pdb_id, chain_id) = hit.pdb_id_and_chain()?;
        let pdb_id = resolve_pdb_id(pdb_id, &self.release_dates, &self.obsolete_pdbs);
        let mapping = mapping_for_hit(hit, query);
        let template_sequence = hit.ungapped_hit_sequence();

        log::info!(
            "Reading PDB entry from {}. Query: {}, template: {}",
            self.store.path_for(&pdb_id).display(),
            query,
            template_sequence
        );
        let parsed = match self.load_structure(&pdb_id) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Ok(SingleHitResult::error(describe_failure(
                    &pdb_id, &chain_id, hit, &e, &[],
                )))
            }
        };

        if let Some(date) = parsed.structure.as_ref().and_then(TemplateStructure::release_date) {
            if date > self.max_template_date {
                let error = format!(
                    "Template {} date ({}) > max template date ({}).",
                    pdb_id, date, self.max_template_date
                );
                if self.config.strict_error_check {
                    return Ok(SingleHitResult::error(error));
                }
                log::info!("{}", error);
                return Ok(SingleHitResult::default());
            }
        }

        match extract_template_features(
            parsed.structure.as_ref(),
            &pdb_id,
            mapping,
            &template_sequence,
            query,
            &chain_id,
            &self.aligner,
            &self.config.extraction,
        ) {
            Ok((mut features, warning)) => {
                features.sum_probs = hit.sum_probs_or_zero();
                Ok(SingleHitResult {
                    features: Some(features),
                    error: None,
                    warning,
                })
            }
            Err(e) => {
                let message = describe_failure(&pdb_id, &chain_id, hit, &e, &parsed.errors);
                if e.is_missing_data() && !self.config.strict_error_check {
                    Ok(SingleHitResult::warning(message))
                } else {
                    Ok(SingleHitResult::error(message))
                }
            }
        }
    }

    fn load_structure(&self, pdb_id: &str) -> Result<StructureParse, HitError> {
        let document = self.store.read(pdb_id).map_err(|e| {
            HitError::StructureUnavailable(format!("Could not read structure {}: {}", pdb_id, e))
        })?;
        self.parser.parse(pdb_id, &document).map_err(|e| {
            HitError::StructureUnavailable(format!("Could not parse structure {}: {}", pdb_id, e))
        })
    }
}

fn describe_failure(
    pdb_id: &str,
    chain_id: &str,
    hit: &TemplateHit,
    error: &HitError,
    parsing_errors: &[String],
) -> String {
    format!(
        "{}_{} (sum_probs: {:.2}, rank: {}): feature extracting errors: {}, mmCIF parsing errors: {:?}",
        pdb_id,
        chain_id,
        hit.sum_probs_or_zero(),
        hit.index,
        error,
        parsing_errors
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::tests::ungapped_hit;
    use crate::realign::tests::FixedAligner;
    use ferritin_core::{AAAtom, TemplateChain, ATOM_TYPE_NUM};
    use ndarray::{Array2, Array3};

    /// Backbone atoms observed on every residue, CAs 3.8 apart along x.
    fn observed_chain(id: &str, sequence: &str) -> TemplateChain {
        let n = sequence.len();
        let mut positions = Array3::zeros((n, ATOM_TYPE_NUM, 3));
        let mut mask = Array2::zeros((n, ATOM_TYPE_NUM));
        for i in 0..n {
            for atom in [AAAtom::N, AAAtom::CA, AAAtom::C, AAAtom::O] {
                positions[[i, atom.to_index(), 0]] = 3.8 * i as f32;
                mask[[i, atom.to_index()]] = 1.0;
            }
        }
        TemplateChain::new(id, sequence, positions, mask).unwrap()
    }

    fn structure(sequence: &str) -> TemplateStructure {
        TemplateStructure::new("1abc", None)
            .with_chain(observed_chain("A", sequence))
            .unwrap()
    }

    #[test]
    fn test_raw_ordering_puts_missing_scores_last() {
        let mut a = ungapped_hit("1abc_A", "MKV", 0);
        let mut b = ungapped_hit("2abc_A", "MKV", 0);
        let mut c = ungapped_hit("3abc_A", "MKV", 0);
        a.sum_probs = None;
        b.sum_probs = Some(10.0);
        c.sum_probs = Some(-5.0);

        let mut hits = vec![&a, &b, &c];
        ScoreOrdering::Raw.sort(&mut hits);
        let names: Vec<_> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["2abc_A", "3abc_A", "1abc_A"]);

        let mut hits = vec![&a, &b, &c];
        ScoreOrdering::MissingAsZero.sort(&mut hits);
        let names: Vec<_> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["2abc_A", "1abc_A", "3abc_A"]);
    }

    #[test]
    fn test_ordering_is_stable() {
        let a = ungapped_hit("1abc_A", "MKV", 0);
        let b = ungapped_hit("2abc_A", "MKV", 0);
        let mut hits = vec![&a, &b];
        ScoreOrdering::Raw.sort(&mut hits);
        assert_eq!(hits[0].name, "1abc_A");
    }

    #[test]
    fn test_extract_exact_match() {
        let query = "GGMKTAYIAK";
        let structure = structure("MKTAYIAK");
        let hit = ungapped_hit("1abc_A", "MKTAYIAK", 2);
        let (features, warning) = extract_template_features(
            Some(&structure),
            "1abc",
            mapping_for_hit(&hit, query),
            "MKTAYIAK",
            query,
            "A",
            &GlobalAligner::default(),
            &ExtractionOptions::default(),
        )
        .unwrap();
        assert!(warning.is_none());
        assert_eq!(features.sequence, "--MKTAYIAK");
        assert_eq!(features.domain_name, "1abc_A");
        assert_eq!(features.all_atom_mask.sum(), 32.0);
    }

    #[test]
    fn test_extract_realigns_with_warning() {
        let query = "MKTAYIAKQR";
        let structure = structure("MKTAYIAKQR");
        let aligner = FixedAligner("MKTAYIAKQW".into(), "MKTAYIAKQR".into());
        let (features, warning) = extract_template_features(
            Some(&structure),
            "1abc",
            identity_mapping(query.len()),
            "MKTAYIAKQW",
            query,
            "A",
            &aligner,
            &ExtractionOptions::default(),
        )
        .unwrap();
        assert!(warning.unwrap().contains("Realigning"));
        assert_eq!(features.sequence, "MKTAYIAKQR");
    }

    #[test]
    fn test_extract_without_chains() {
        let empty = TemplateStructure::new("1abc", None);
        for structure in [None, Some(&empty)] {
            let err = extract_template_features(
                structure,
                "1abc",
                identity_mapping(3),
                "MKV",
                "MKV",
                "A",
                &GlobalAligner::default(),
                &ExtractionOptions::default(),
            )
            .unwrap_err();
            assert_eq!(err, HitError::NoChains("1abc_A".to_string()));
        }
    }

    #[test]
    fn test_custom_template_features() {
        let query = "MKTAYIAK";
        let result =
            get_custom_template_features(&structure(query), query, "1abc", "A", &GlobalAligner::default())
                .unwrap();
        assert_eq!(result.features.num_templates(), 1);
        assert_eq!(result.features.sum_probs[[0, 0]], 1.0);
        assert_eq!(result.features.sequences, vec![query.to_string()]);
        assert!(result.errors.is_empty() && result.warnings.is_empty());
    }
}
