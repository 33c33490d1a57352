//! Realignment of a hit whose sequence is not found verbatim in its structure,
//! typically because the search database holds an older version of the entry.
use crate::align::Aligner;
use crate::error::HitError;
use crate::mapping::IndexMapping;
use ferritin_core::{TemplateStructure, GAP};
use std::collections::HashMap;

/// Minimum fraction of identical aligned columns, relative to the shorter sequence.
pub const MIN_REALIGN_IDENTITY: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Realignment {
    /// The chain sequence as found in the structure.
    pub sequence: String,
    pub chain_id: String,
    /// Query positions onto `sequence`, with no further offset.
    pub mapping: IndexMapping,
}

pub fn realign_template_to_query<A: Aligner + ?Sized>(
    old_template_sequence: &str,
    template_chain_id: &str,
    structure: &TemplateStructure,
    old_mapping: &IndexMapping,
    aligner: &A,
) -> Result<Realignment, HitError> {
    let file_id = structure.file_id();
    let (chain_id, new_template_sequence) = match structure.chain_sequence(template_chain_id) {
        Some(sequence) if !sequence.is_empty() => (template_chain_id, sequence),
        _ => {
            let mut chains = structure.chain_sequences();
            match (chains.next(), chains.next()) {
                (Some((only_id, only_sequence)), None) => {
                    log::info!(
                        "Could not find {} in {}, but there is only 1 sequence, so using that one.",
                        template_chain_id,
                        file_id
                    );
                    (only_id, only_sequence)
                }
                _ => {
                    return Err(HitError::QueryToTemplateAlign(format!(
                        "Could not find chain {} in {}. If there are no mmCIF parsing errors, \
                         it is possible it was not a protein chain.",
                        template_chain_id, file_id
                    )))
                }
            }
        }
    };

    let (old_aligned, new_aligned) = aligner
        .align(&[old_template_sequence, new_template_sequence])
        .map_err(|e| {
            HitError::QueryToTemplateAlign(format!(
                "Could not align old template {} to template {} ({}_{}). Error: {}",
                old_template_sequence, new_template_sequence, file_id, template_chain_id, e
            ))
        })?;
    log::info!(
        "Old aligned template: {}\nNew aligned template: {}",
        old_aligned,
        new_aligned
    );

    let mut old_to_new: HashMap<usize, usize> = HashMap::new();
    let (mut old_index, mut new_index) = (0usize, 0usize);
    let mut num_same = 0usize;
    for (old_aa, new_aa) in old_aligned.chars().zip(new_aligned.chars()) {
        let (old_gap, new_gap) = (old_aa == GAP, new_aa == GAP);
        if !old_gap && !new_gap {
            old_to_new.insert(old_index, new_index);
            if old_aa == new_aa {
                num_same += 1;
            }
        }
        old_index += usize::from(!old_gap);
        new_index += usize::from(!new_gap);
    }

    let shorter = old_template_sequence.len().min(new_template_sequence.len());
    let identity = if shorter == 0 {
        0.0
    } else {
        num_same as f64 / shorter as f64
    };
    if identity < MIN_REALIGN_IDENTITY {
        return Err(HitError::QueryToTemplateAlign(format!(
            "Insufficient similarity of the sequence in the database: {} to the actual \
             sequence in the mmCIF file {}_{}: {}. We require at least 90 % similarity wrt \
             to the shorter of the sequences. This is not a problem unless you think this \
             is a template that should be included.",
            old_template_sequence, file_id, template_chain_id, new_template_sequence
        )));
    }

    let mapping = old_mapping
        .iter()
        .filter_map(|(&query_index, old)| old_to_new.get(old).map(|&new| (query_index, new)))
        .collect();

    Ok(Realignment {
        sequence: new_template_sequence.replace(GAP, ""),
        chain_id: chain_id.to_string(),
        mapping,
    })
}
