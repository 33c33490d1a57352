pub mod custom;
pub mod featurize;
pub mod release_dates;

use anyhow::Context;
use ferritin_templates::parse_fasta;
use std::path::Path;

/// A literal sequence, or the first record of a FASTA file at that path.
/// Either way the result is trimmed and uppercased.
pub fn read_query(query: &str) -> anyhow::Result<String> {
    if !Path::new(query).is_file() {
        return Ok(normalize_query(query));
    }
    let text = std::fs::read_to_string(query).with_context(|| format!("reading {}", query))?;
    let (_, sequence) = parse_fasta(&text)
        .into_iter()
        .next()
        .with_context(|| format!("no FASTA records in {}", query))?;
    Ok(normalize_query(&sequence))
}

fn normalize_query(sequence: &str) -> String {
    sequence.trim().to_uppercase()
}
