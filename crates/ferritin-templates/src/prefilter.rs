//! Prefilter
//!
//! Sequence-only checks run on every hit before any structure file is read.
use crate::error::{PrefilterError, TemplateError};
use crate::hit::TemplateHit;
use chrono::NaiveDate;
use ferritin_io::{ObsoletePdbs, ReleaseDates};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefilterThresholds {
    /// Hits must align strictly more than this fraction of the query.
    pub min_align_ratio: f64,
    /// Exact subsequences of the query covering more than this fraction are duplicates.
    pub max_subsequence_ratio: f64,
    pub min_template_length: usize,
}

impl Default for PrefilterThresholds {
    fn default() -> Self {
        Self {
            min_align_ratio: 0.1,
            max_subsequence_ratio: 0.95,
            min_template_length: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrefilterResult {
    pub valid: bool,
    pub error: Option<String>,
    pub warning: Option<String>,
}

/// Substitute the replacement id for an obsolete entry that has no release date of its own.
pub fn resolve_pdb_id(pdb_id: String, release_dates: &ReleaseDates, obsolete: &ObsoletePdbs) -> String {
    if release_dates.contains(&pdb_id) {
        return pdb_id;
    }
    match obsolete.get(&pdb_id) {
        Some(replacement) => replacement.to_string(),
        None => pdb_id,
    }
}

/// Run the checks in order: date, align ratio, duplicate, length.
pub fn assess_hit(
    hit: &TemplateHit,
    pdb_id: &str,
    query: &str,
    release_dates: &ReleaseDates,
    cutoff: NaiveDate,
    thresholds: &PrefilterThresholds,
) -> Result<(), PrefilterError> {
    let query_len = query.len() as f64;
    let template_sequence = hit.ungapped_hit_sequence();
    let (align_ratio, length_ratio) = if query.is_empty() {
        (0.0, 0.0)
    } else {
        (
            hit.aligned_cols as f64 / query_len,
            template_sequence.len() as f64 / query_len,
        )
    };

    if release_dates.is_after_cutoff(pdb_id, cutoff) {
        let date = release_dates
            .get(pdb_id)
            .map(|date| date.to_string())
            .unwrap_or_default();
        return Err(PrefilterError::Date {
            date,
            cutoff: cutoff.to_string(),
        });
    }

    if align_ratio <= thresholds.min_align_ratio {
        return Err(PrefilterError::AlignRatio(align_ratio));
    }

    if query.contains(template_sequence.as_str()) && length_ratio > thresholds.max_subsequence_ratio {
        return Err(PrefilterError::Duplicate(length_ratio));
    }

    if template_sequence.len() < thresholds.min_template_length {
        return Err(PrefilterError::Length(template_sequence.len()));
    }
    Ok(())
}

/// Shared inputs of the prefilter for one featurizer.
#[derive(Debug, Clone, Copy)]
pub struct Prefilter<'a> {
    pub release_dates: &'a ReleaseDates,
    pub obsolete: &'a ObsoletePdbs,
    pub cutoff: NaiveDate,
    pub thresholds: PrefilterThresholds,
    pub strict_error_check: bool,
}

impl Prefilter<'_> {
    /// Prefilter one hit.
    ///
    /// Rejections never fail the call; in strict mode date and duplicate
    /// rejections come back as an error message. A malformed hit name is a hard error.
    pub fn check(&self, query: &str, hit: &TemplateHit) -> Result<PrefilterResult, TemplateError> {
        let (pdb_id, chain_id) = hit.pdb_id_and_chain()?;
        let pdb_id = resolve_pdb_id(pdb_id, self.release_dates, self.obsolete);

        match assess_hit(
            hit,
            &pdb_id,
            query,
            self.release_dates,
            self.cutoff,
            &self.thresholds,
        ) {
            Ok(()) => Ok(PrefilterResult {
                valid: true,
                ..Default::default()
            }),
            Err(e) => {
                let msg = format!("hit {}_{} did not pass prefilter: {}", pdb_id, chain_id, e);
                log::info!("{}", msg);
                let error = (self.strict_error_check && e.is_strict()).then_some(msg);
                Ok(PrefilterResult {
                    valid: false,
                    error,
                    warning: None,
                })
            }
        }
    }
}
