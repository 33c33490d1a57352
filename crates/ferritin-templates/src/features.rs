//! Template Features
//!
//! Per-hit features are laid out along the query: every array has the query
//! length as its leading dimension. [`TemplateFeatureStack`] stacks accepted
//! hits along a new leading template axis.
//!
//! | tensor                        | shape          |
//! |-------------------------------|----------------|
//! | `template_aatype`             | `(N, L, 22)`   |
//! | `template_all_atom_positions` | `(N, L, 37, 3)`|
//! | `template_all_atom_mask`      | `(N, L, 37)`   |
//! | `template_sum_probs`          | `(N, 1)`       |
use crate::error::{HitError, TemplateError};
use crate::mapping::IndexMapping;
use ferritin_core::{sequence_to_onehot, ATOM_TYPE_NUM, GAP, RESTYPE_WITH_X_AND_GAP_NUM};
use ndarray::{s, stack, Array, Array2, Array3, Array4, ArrayView2, ArrayView3, Axis, Dimension};
use safetensors::tensor::{Dtype, TensorView};
use std::collections::HashMap;
use std::path::Path;

/// Alanine, the smallest residue, has five heavy atoms.
pub const MIN_OBSERVED_ATOMS: f32 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateFeatures {
    /// Query-length template sequence, `-` where no template residue is mapped.
    pub sequence: String,
    pub aatype: Array2<f32>,
    pub all_atom_positions: Array3<f32>,
    pub all_atom_mask: Array2<f32>,
    /// `<pdb_id>_<chain_id>`
    pub domain_name: String,
    pub sum_probs: f32,
}

impl TemplateFeatures {
    pub fn query_len(&self) -> usize {
        self.sequence.len()
    }
}

/// Place template residues onto query positions.
///
/// For each `(q, t)` in `mapping`, residue `t + mapping_offset` of the chain arrays
/// lands at query position `q` and `template_sequence[t]` becomes the sequence
/// character there.
#[allow(clippy::too_many_arguments)]
pub fn assemble_template_features(
    query_len: usize,
    mapping: &IndexMapping,
    mapping_offset: usize,
    template_sequence: &str,
    positions: ArrayView3<'_, f32>,
    mask: ArrayView2<'_, f32>,
    pdb_id: &str,
    chain_id: &str,
) -> Result<TemplateFeatures, HitError> {
    let template_residues = template_sequence.as_bytes();
    let chain_len = positions.len_of(Axis(0));

    let mut out_positions = Array3::<f32>::zeros((query_len, ATOM_TYPE_NUM, 3));
    let mut out_mask = Array2::<f32>::zeros((query_len, ATOM_TYPE_NUM));
    let mut sequence = vec![GAP as u8; query_len];

    for (&q, &t) in mapping {
        let template_index = t + mapping_offset;
        let residue = template_residues.get(t).copied();
        let (Some(residue), true, true) = (residue, template_index < chain_len, q < query_len) else {
            return Err(HitError::NoAtomDataInTemplate(format!(
                "Could not get atom data ({}_{}): residue {} outside of template with {} residues",
                pdb_id, chain_id, template_index, chain_len
            )));
        };
        out_positions
            .slice_mut(s![q, .., ..])
            .assign(&positions.slice(s![template_index, .., ..]));
        out_mask
            .slice_mut(s![q, ..])
            .assign(&mask.slice(s![template_index, ..]));
        sequence[q] = residue;
    }

    if out_mask.sum() < MIN_OBSERVED_ATOMS {
        let low = mapping.values().min().map_or(0, |v| v + mapping_offset);
        let high = mapping.values().max().map_or(0, |v| v + mapping_offset);
        return Err(HitError::TemplateAtomMaskAllZeros(format!(
            "Template all atom mask was all zeros: {}_{}. Residue range: {}-{}",
            pdb_id, chain_id, low, high
        )));
    }

    let sequence = String::from_utf8_lossy(&sequence).into_owned();
    Ok(TemplateFeatures {
        aatype: sequence_to_onehot(&sequence),
        sequence,
        all_atom_positions: out_positions,
        all_atom_mask: out_mask,
        domain_name: format!("{}_{}", pdb_id.to_lowercase(), chain_id),
        sum_probs: 0.0,
    })
}

/// Accepted templates stacked along a leading template axis.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateFeatureStack {
    pub aatype: Array3<f32>,
    pub all_atom_positions: Array4<f32>,
    pub all_atom_mask: Array3<f32>,
    pub sum_probs: Array2<f32>,
    pub domain_names: Vec<String>,
    pub sequences: Vec<String>,
}

impl TemplateFeatureStack {
    /// Zero templates for a query of `query_len` residues.
    ///
    /// Shapes are `(0, L, ...)`; names and sequences hold a single empty entry.
    pub fn empty(query_len: usize) -> Self {
        Self {
            aatype: Array3::zeros((0, query_len, RESTYPE_WITH_X_AND_GAP_NUM)),
            all_atom_positions: Array4::zeros((0, query_len, ATOM_TYPE_NUM, 3)),
            all_atom_mask: Array3::zeros((0, query_len, ATOM_TYPE_NUM)),
            sum_probs: Array2::zeros((0, 1)),
            domain_names: vec![String::new()],
            sequences: vec![String::new()],
        }
    }

    /// Stack per-hit features, or the empty placeholder when there are none.
    pub fn stack(query_len: usize, features: &[TemplateFeatures]) -> Result<Self, TemplateError> {
        if features.is_empty() {
            return Ok(Self::empty(query_len));
        }
        let aatype: Vec<_> = features.iter().map(|f| f.aatype.view()).collect();
        let positions: Vec<_> = features.iter().map(|f| f.all_atom_positions.view()).collect();
        let masks: Vec<_> = features.iter().map(|f| f.all_atom_mask.view()).collect();
        let sum_probs = features.iter().map(|f| f.sum_probs).collect();

        Ok(Self {
            aatype: stack(Axis(0), &aatype)?,
            all_atom_positions: stack(Axis(0), &positions)?,
            all_atom_mask: stack(Axis(0), &masks)?,
            sum_probs: Array2::from_shape_vec((features.len(), 1), sum_probs)?,
            domain_names: features.iter().map(|f| f.domain_name.clone()).collect(),
            sequences: features.iter().map(|f| f.sequence.clone()).collect(),
        })
    }

    pub fn num_templates(&self) -> usize {
        self.aatype.len_of(Axis(0))
    }

    pub fn query_len(&self) -> usize {
        self.aatype.len_of(Axis(1))
    }

    /// Write the numeric features as f32 tensors. Domain names and sequences go
    /// into the header metadata as JSON lists.
    pub fn save_safetensors(&self, path: impl AsRef<Path>) -> Result<(), TemplateError> {
        let tensors = [
            ("template_aatype", tensor_bytes(&self.aatype)),
            ("template_all_atom_positions", tensor_bytes(&self.all_atom_positions)),
            ("template_all_atom_mask", tensor_bytes(&self.all_atom_mask)),
            ("template_sum_probs", tensor_bytes(&self.sum_probs)),
        ];
        let views = tensors
            .iter()
            .map(|(name, (shape, bytes))| {
                TensorView::new(Dtype::F32, shape.clone(), bytes).map(|view| (*name, view))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TemplateError::Export(format!("{e:?}")))?;

        let metadata = HashMap::from([
            (
                "template_domain_names".to_string(),
                serde_json::to_string(&self.domain_names)?,
            ),
            (
                "template_sequence".to_string(),
                serde_json::to_string(&self.sequences)?,
            ),
        ]);
        safetensors::serialize_to_file(views, &Some(metadata), path.as_ref())
            .map_err(|e| TemplateError::Export(format!("{e:?}")))
    }
}

fn tensor_bytes<D: Dimension>(array: &Array<f32, D>) -> (Vec<usize>, Vec<u8>) {
    let bytes = array.iter().flat_map(|v| v.to_le_bytes()).collect();
    (array.shape().to_vec(), bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tests::ca_chain;
    use ferritin_core::AAAtom;
    use safetensors::SafeTensors;

    /// Five observed atoms (N, CA, C, O, CB) on every residue.
    fn backbone(n: usize) -> (Array3<f32>, Array2<f32>) {
        let mut positions = Array3::zeros((n, ATOM_TYPE_NUM, 3));
        let mut mask = Array2::zeros((n, ATOM_TYPE_NUM));
        for i in 0..n {
            for atom in [AAAtom::N, AAAtom::CA, AAAtom::C, AAAtom::O, AAAtom::CB] {
                mask[[i, atom.to_index()]] = 1.0;
                positions[[i, atom.to_index(), 0]] = i as f32;
            }
        }
        (positions, mask)
    }

    #[test]
    fn test_assemble_places_residues() {
        let (positions, mask) = backbone(6);
        let mapping: IndexMapping = [(1, 0), (2, 1), (4, 3)].into_iter().collect();
        let features = assemble_template_features(
            5,
            &mapping,
            2,
            "MKVL",
            positions.view(),
            mask.view(),
            "1ABC",
            "A",
        )
        .unwrap();

        assert_eq!(features.sequence, "-MK-L");
        assert_eq!(features.domain_name, "1abc_A");
        assert_eq!(features.aatype.dim(), (5, RESTYPE_WITH_X_AND_GAP_NUM));
        assert_eq!(features.all_atom_positions.dim(), (5, ATOM_TYPE_NUM, 3));
        // query 4 <- template 3 + offset 2
        let ca = AAAtom::CA.to_index();
        assert_eq!(features.all_atom_positions[[4, ca, 0]], 5.0);
        assert_eq!(features.all_atom_mask.row(0).sum(), 0.0);
        assert_eq!(features.all_atom_mask.sum(), 15.0);
        // gap column
        assert_eq!(features.aatype[[0, 21]], 1.0);
    }

    #[test]
    fn test_mask_below_minimum() {
        // a single observed CA is not enough
        let chain = ca_chain("A", &[0.0, 3.8], &[true, false]);
        let mapping: IndexMapping = [(0, 0), (1, 1)].into_iter().collect();
        let err = assemble_template_features(
            2,
            &mapping,
            0,
            "AA",
            chain.positions(),
            chain.mask(),
            "1abc",
            "A",
        )
        .unwrap_err();
        assert!(matches!(err, HitError::TemplateAtomMaskAllZeros(_)));
        assert_eq!(
            err.to_string(),
            "Template all atom mask was all zeros: 1abc_A. Residue range: 0-1"
        );
    }

    #[test]
    fn test_out_of_range_template_index() {
        let (positions, mask) = backbone(2);
        let mapping: IndexMapping = [(0, 1)].into_iter().collect();
        let err = assemble_template_features(
            3,
            &mapping,
            5,
            "MK",
            positions.view(),
            mask.view(),
            "1abc",
            "A",
        )
        .unwrap_err();
        assert!(matches!(err, HitError::NoAtomDataInTemplate(_)));
    }

    #[test]
    fn test_empty_stack() {
        let stack = TemplateFeatureStack::stack(7, &[]).unwrap();
        assert_eq!(stack.num_templates(), 0);
        assert_eq!(stack.aatype.dim(), (0, 7, 22));
        assert_eq!(stack.all_atom_positions.dim(), (0, 7, 37, 3));
        assert_eq!(stack.all_atom_mask.dim(), (0, 7, 37));
        assert_eq!(stack.sum_probs.dim(), (0, 1));
        assert_eq!(stack.domain_names, [""]);
        assert_eq!(stack.sequences, [""]);
    }

    #[test]
    fn test_stack_and_save() {
        let (positions, mask) = backbone(3);
        let mapping: IndexMapping = [(0, 0), (1, 1), (2, 2)].into_iter().collect();
        let mut first =
            assemble_template_features(3, &mapping, 0, "MKV", positions.view(), mask.view(), "1abc", "A")
                .unwrap();
        first.sum_probs = 80.0;
        let second =
            assemble_template_features(3, &mapping, 0, "MKL", positions.view(), mask.view(), "2abc", "B")
                .unwrap();

        let stack = TemplateFeatureStack::stack(3, &[first, second]).unwrap();
        assert_eq!(stack.num_templates(), 2);
        assert_eq!(stack.query_len(), 3);
        assert_eq!(stack.all_atom_positions.dim(), (2, 3, 37, 3));
        assert_eq!(stack.sum_probs.column(0).to_vec(), [80.0, 0.0]);
        assert_eq!(stack.domain_names, ["1abc_A", "2abc_B"]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.safetensors");
        stack.save_safetensors(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let tensors = SafeTensors::deserialize(&bytes).unwrap();
        let aatype = tensors.tensor("template_aatype").unwrap();
        assert_eq!(aatype.shape(), [2, 3, 22]);
        assert_eq!(aatype.dtype(), Dtype::F32);
        let sum_probs = tensors.tensor("template_sum_probs").unwrap();
        assert_eq!(&sum_probs.data()[..4], 80.0f32.to_le_bytes());

        let (_, metadata) = SafeTensors::read_metadata(&bytes).unwrap();
        let names = metadata.metadata().as_ref().unwrap()["template_domain_names"].clone();
        assert_eq!(names, r#"["1abc_A","2abc_B"]"#);
    }
}
