use super::read_query;
use ferritin_io::PdbtbxParser;
use ferritin_templates::{
    load_hits, Aligner, ExtractionOptions, GlobalAligner, KalignAligner, ScoreOrdering,
    TemplateFeaturizerConfig, TemplateHitFeaturizer,
};
use std::path::PathBuf;

pub struct FeaturizeArgs {
    pub query: String,
    pub hits: PathBuf,
    pub structure_dir: PathBuf,
    pub structure_extension: String,
    pub max_template_date: String,
    pub output: PathBuf,
    pub max_hits: usize,
    pub release_dates: Option<PathBuf>,
    pub obsolete_pdbs: Option<PathBuf>,
    pub strict: bool,
    pub shuffle_top_k: Option<usize>,
    pub seed: Option<u64>,
    pub zero_center: bool,
    pub kalign: Option<PathBuf>,
    pub ordering: ScoreOrdering,
}

pub fn execute(args: FeaturizeArgs) -> anyhow::Result<()> {
    let config = TemplateFeaturizerConfig {
        structure_dir: args.structure_dir.clone(),
        structure_extension: args.structure_extension.clone(),
        max_template_date: args.max_template_date.clone(),
        max_hits: args.max_hits,
        release_dates_path: args.release_dates.clone(),
        obsolete_pdbs_path: args.obsolete_pdbs.clone(),
        strict_error_check: args.strict,
        shuffle_top_k: args.shuffle_top_k,
        seed: args.seed,
        score_ordering: args.ordering,
        extraction: ExtractionOptions {
            zero_center_positions: args.zero_center,
            ..Default::default()
        },
        ..Default::default()
    };
    match &args.kalign {
        Some(binary) => run(&args, config, KalignAligner::new(binary)),
        None => run(&args, config, GlobalAligner::default()),
    }
}

fn run<A: Aligner>(args: &FeaturizeArgs, config: TemplateFeaturizerConfig, aligner: A) -> anyhow::Result<()> {
    let query = read_query(&args.query)?;
    let hits = load_hits(&args.hits)?;
    let featurizer = TemplateHitFeaturizer::new(config, PdbtbxParser, aligner)?;
    let result = featurizer.get_templates(&query, &hits)?;

    for warning in &result.warnings {
        log::warn!("{}", warning);
    }
    for error in &result.errors {
        log::error!("{}", error);
    }
    log::info!(
        "Accepted {} of {} hits: {:?}",
        result.features.num_templates(),
        hits.len(),
        result.features.domain_names
    );
    result.features.save_safetensors(&args.output)?;
    Ok(())
}
