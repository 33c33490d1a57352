//! Find a hit's template sequence inside a parsed structure.
use crate::error::HitError;
use ferritin_core::TemplateStructure;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    /// Full sequence of the matching chain.
    pub chain_sequence: String,
    pub chain_id: String,
    /// Start of the template sequence within `chain_sequence`.
    pub offset: usize,
}

/// Search order: exact chain and subsequence, then subsequence in any chain,
/// then a fuzzy match where `X` on either side matches any residue.
pub fn find_template_in_structure(
    template_chain_id: &str,
    template_sequence: &str,
    structure: &TemplateStructure,
) -> Result<TemplateMatch, HitError> {
    let pdb_id = structure.file_id();

    if let Some(chain_sequence) = structure.chain_sequence(template_chain_id) {
        if let Some(offset) = chain_sequence.find(template_sequence) {
            log::info!("Found an exact template match {}_{}.", pdb_id, template_chain_id);
            return Ok(TemplateMatch {
                chain_sequence: chain_sequence.to_string(),
                chain_id: template_chain_id.to_string(),
                offset,
            });
        }
    }

    for (chain_id, chain_sequence) in structure.chain_sequences() {
        if chain_sequence.is_empty() {
            continue;
        }
        if let Some(offset) = chain_sequence.find(template_sequence) {
            log::info!("Found a sequence-only match {}_{}.", pdb_id, chain_id);
            return Ok(TemplateMatch {
                chain_sequence: chain_sequence.to_string(),
                chain_id: chain_id.to_string(),
                offset,
            });
        }
    }

    if let Some(regex) = fuzzy_pattern(template_sequence) {
        for (chain_id, chain_sequence) in structure.chain_sequences() {
            if let Some(found) = regex.find(chain_sequence) {
                log::info!("Found a fuzzy sequence-only match {}_{}.", pdb_id, chain_id);
                return Ok(TemplateMatch {
                    chain_sequence: chain_sequence.to_string(),
                    chain_id: chain_id.to_string(),
                    offset: found.start(),
                });
            }
        }
    }

    let chains: Vec<String> = structure
        .chain_sequences()
        .map(|(id, seq)| format!("{id}: {seq}"))
        .collect();
    Err(HitError::SequenceNotInTemplate(format!(
        "Could not find the template sequence in {}_{}. Template sequence: {}, chain_to_seqres: {{{}}}",
        pdb_id,
        template_chain_id,
        template_sequence,
        chains.join(", ")
    )))
}

/// `X` in the template matches anything; every other residue matches itself or `X`.
fn fuzzy_pattern(template_sequence: &str) -> Option<Regex> {
    let pattern: String = template_sequence
        .chars()
        .map(|aa| match aa {
            'X' => ".".to_string(),
            aa => format!("(?:{}|X)", regex::escape(&aa.to_string())),
        })
        .collect();
    match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            log::warn!("Could not build fuzzy pattern for {}: {}", template_sequence, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferritin_core::TemplateChain;

    fn structure(chains: &[(&str, &str)]) -> TemplateStructure {
        let mut structure = TemplateStructure::new("1abc", None);
        for (id, seq) in chains {
            structure
                .push_chain(TemplateChain::unobserved(*id, *seq))
                .unwrap();
        }
        structure
    }

    #[test]
    fn test_exact_match() {
        let s = structure(&[("A", "GGMKVLGG"), ("B", "MKVL")]);
        let found = find_template_in_structure("A", "MKVL", &s).unwrap();
        assert_eq!(found.chain_id, "A");
        assert_eq!(found.offset, 2);
        assert_eq!(found.chain_sequence, "GGMKVLGG");
    }

    #[test]
    fn test_sequence_only_match_uses_chain_order() {
        let s = structure(&[("C", "PPPP"), ("B", "AMKVL"), ("A", "MKVL")]);
        let found = find_template_in_structure("Z", "MKVL", &s).unwrap();
        assert_eq!(found.chain_id, "B");
        assert_eq!(found.offset, 1);
    }

    #[test]
    fn test_fuzzy_match() {
        // unknown residue in the structure, and in the template
        let s = structure(&[("A", "GGMKXLGG")]);
        let found = find_template_in_structure("A", "MKVL", &s).unwrap();
        assert_eq!((found.chain_id.as_str(), found.offset), ("A", 2));

        let found = find_template_in_structure("A", "KXL", &s).unwrap();
        assert_eq!(found.offset, 3);
    }

    #[test]
    fn test_not_found() {
        let s = structure(&[("A", "GGGG")]);
        let err = find_template_in_structure("A", "MKVL", &s).unwrap_err();
        assert!(matches!(err, HitError::SequenceNotInTemplate(_)));
        assert!(err.to_string().contains("1abc_A"));
    }
}
