//! Query to template index mapping.
use crate::hit::{TemplateHit, GAP_INDEX};
use std::collections::BTreeMap;

/// Query position -> template position.
pub type IndexMapping = BTreeMap<usize, usize>;

/// Map positions of the full query onto positions of the ungapped hit sequence.
///
/// The hit's index arrays are relative to whatever the search tool saw; both are
/// shifted to start at zero and the query side is re-anchored where the aligned
/// query segment occurs in `original_query`. Columns where either side is a gap,
/// or that fall outside either sequence, are dropped.
pub fn build_query_to_hit_index_mapping(
    hit_query_sequence: &str,
    hit_sequence: &str,
    indices_hit: &[i64],
    indices_query: &[i64],
    original_query: &str,
) -> IndexMapping {
    let mut mapping = IndexMapping::new();
    if hit_query_sequence.is_empty() {
        return mapping;
    }

    let search_query = hit_query_sequence.replace('-', "");
    let hit_len = hit_sequence.replace('-', "").len();
    let query_offset = match original_query.find(&search_query) {
        Some(offset) => offset,
        None => {
            log::warn!(
                "Aligned query segment {} not found in query {}, assuming offset 0",
                search_query,
                original_query
            );
            0
        }
    };

    let fixed_hit = normalize_indices(indices_hit);
    let fixed_query = normalize_indices(indices_query);

    for (q, t) in fixed_query.into_iter().zip(fixed_hit) {
        let (Some(q), Some(t)) = (q, t) else {
            continue;
        };
        let q = q + query_offset;
        if t >= hit_len || q >= original_query.len() {
            continue;
        }
        mapping.insert(q, t);
    }
    mapping
}

pub fn mapping_for_hit(hit: &TemplateHit, original_query: &str) -> IndexMapping {
    build_query_to_hit_index_mapping(
        &hit.query,
        &hit.hit_sequence,
        &hit.indices_hit,
        &hit.indices_query,
        original_query,
    )
}

/// Identity mapping over a query of `len` residues.
pub fn identity_mapping(len: usize) -> IndexMapping {
    (0..len).map(|i| (i, i)).collect()
}

/// Shift indices so the smallest non-gap value is zero. Gaps become `None`.
fn normalize_indices(indices: &[i64]) -> Vec<Option<usize>> {
    let min = indices.iter().copied().filter(|&i| i > GAP_INDEX).min();
    indices
        .iter()
        .map(|&i| match min {
            Some(min) if i > GAP_INDEX => usize::try_from(i - min).ok(),
            _ => None,
        })
        .collect()
}
