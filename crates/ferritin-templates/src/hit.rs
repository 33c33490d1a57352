//! Template Hits
//!
//! One row of a template search result. Hits are read from JSON:
//!
//! ```json
//! {"index": 0, "name": "1abc_A mol:protein", "aligned_cols": 87, "sum_probs": 80.3,
//!  "query": "MKV-L", "hit_sequence": "MKVAL",
//!  "indices_query": [3, 4, 5, -1, 6], "indices_hit": [10, 11, 12, 13, 14]}
//! ```
//!
//! `query` and `hit_sequence` are the gapped aligned segments; the index arrays
//! give, per alignment column, the position in the full query and the full hit
//! sequence with `-1` marking a gap.
use crate::error::TemplateError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Index value marking a gap column.
pub const GAP_INDEX: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateHit {
    pub index: usize,
    pub name: String,
    pub aligned_cols: usize,
    #[serde(default)]
    pub sum_probs: Option<f32>,
    pub query: String,
    pub hit_sequence: String,
    pub indices_query: Vec<i64>,
    pub indices_hit: Vec<i64>,
}

impl TemplateHit {
    /// `(pdb_id, chain_id)` from a name beginning with `<4 alnum>_<alnum or '.'>+`.
    ///
    /// The pdb id is lowercased. Anything after the chain id is ignored.
    pub fn pdb_id_and_chain(&self) -> Result<(String, String), TemplateError> {
        let malformed = || TemplateError::MalformedHitName(self.name.clone());
        let name = self.name.as_str();

        let pdb_id = name
            .get(..4)
            .filter(|id| id.chars().all(|c| c.is_ascii_alphanumeric()))
            .ok_or_else(malformed)?;
        let rest = name[4..].strip_prefix('_').ok_or_else(malformed)?;
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.'))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(malformed());
        }
        Ok((pdb_id.to_lowercase(), rest[..end].to_string()))
    }

    /// The hit sequence with alignment gaps removed.
    pub fn ungapped_hit_sequence(&self) -> String {
        self.hit_sequence.replace('-', "")
    }

    pub fn sum_probs_or_zero(&self) -> f32 {
        self.sum_probs.unwrap_or(0.0)
    }
}

pub fn hits_from_json_str(contents: &str) -> Result<Vec<TemplateHit>, TemplateError> {
    Ok(serde_json::from_str(contents)?)
}

pub fn load_hits(path: impl AsRef<Path>) -> Result<Vec<TemplateHit>, TemplateError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ferritin_io::IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    hits_from_json_str(&contents)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ferritin_test_data::TestFile;

    /// A hit whose aligned segments are fully ungapped and start at `query_start`.
    pub(crate) fn ungapped_hit(name: &str, sequence: &str, query_start: i64) -> TemplateHit {
        let n = sequence.len() as i64;
        TemplateHit {
            index: 0,
            name: name.to_string(),
            aligned_cols: sequence.len(),
            sum_probs: Some(50.0),
            query: sequence.to_string(),
            hit_sequence: sequence.to_string(),
            indices_query: (query_start..query_start + n).collect(),
            indices_hit: (0..n).collect(),
        }
    }

    fn named(name: &str) -> TemplateHit {
        ungapped_hit(name, "MKV", 0)
    }

    #[test]
    fn test_pdb_id_and_chain() {
        assert_eq!(
            named("1ABC_A mol:protein length:20").pdb_id_and_chain().unwrap(),
            ("1abc".to_string(), "A".to_string())
        );
        assert_eq!(
            named("4hhb_AB").pdb_id_and_chain().unwrap(),
            ("4hhb".to_string(), "AB".to_string())
        );
        assert_eq!(
            named("4hhb_.").pdb_id_and_chain().unwrap(),
            ("4hhb".to_string(), ".".to_string())
        );
    }

    #[test]
    fn test_malformed_names() {
        for name in ["1ab_A", "1abcA", "1abc_", "1abc_ A", "", "1a-c_A"] {
            assert!(
                matches!(
                    named(name).pdb_id_and_chain(),
                    Err(TemplateError::MalformedHitName(_))
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn test_load_hits() {
        let (path, _temp) = TestFile::hits_01().create_temp().unwrap();
        let hits = load_hits(path).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].sum_probs, Some(95.0));
        assert_eq!(hits[0].ungapped_hit_sequence(), "MKTAYIAKQRQISFVKSHFS");
        assert_eq!(hits[1].aligned_cols, 1);
    }

    #[test]
    fn test_missing_sum_probs() {
        let hits = hits_from_json_str(
            r#"[{"index": 3, "name": "1abc_A", "aligned_cols": 2, "query": "MK",
                 "hit_sequence": "M-", "indices_query": [0, 1], "indices_hit": [0, -1]}]"#,
        )
        .unwrap();
        assert_eq!(hits[0].sum_probs, None);
        assert_eq!(hits[0].sum_probs_or_zero(), 0.0);
        assert_eq!(hits[0].ungapped_hit_sequence(), "M");
    }
}
