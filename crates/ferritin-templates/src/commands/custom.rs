use super::read_query;
use anyhow::Context;
use ferritin_io::{PdbtbxParser, StructureParser};
use ferritin_templates::{get_custom_template_features, GlobalAligner};
use std::path::PathBuf;

pub fn execute(query: String, structure: PathBuf, chain: String, output: PathBuf) -> anyhow::Result<()> {
    let query = read_query(&query)?;
    let file_id = structure
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("structure path has no file name")?
        .to_lowercase();
    let document = std::fs::read_to_string(&structure)
        .with_context(|| format!("reading {}", structure.display()))?;

    let parsed = PdbtbxParser.parse(&file_id, &document)?;
    let template = parsed.structure.with_context(|| {
        format!("could not parse {}: {:?}", structure.display(), parsed.errors)
    })?;

    let result = get_custom_template_features(&template, &query, &file_id, &chain, &GlobalAligner::default())?;
    for warning in &result.warnings {
        log::warn!("{}", warning);
    }
    result.features.save_safetensors(&output)?;
    Ok(())
}
