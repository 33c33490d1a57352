//! Atom coordinate extraction and sanity checks.
use crate::error::{CaDistanceError, HitError};
use ferritin_core::{AAAtom, TemplateStructure};
use ndarray::{s, Array1, Array2, Array3, ArrayView2, ArrayView3, Axis};

/// Loose enough to only catch gross parsing errors such as mis-threaded chains.
pub const MAX_CA_CA_DISTANCE: f32 = 150.0;

/// Each CA must lie within `max_ca_ca_distance` of the previous residue with a CA.
pub fn check_residue_distances(
    positions: ArrayView3<'_, f32>,
    mask: ArrayView2<'_, f32>,
    max_ca_ca_distance: f32,
) -> Result<(), CaDistanceError> {
    let ca = AAAtom::CA.to_index();
    let mut previous: Option<(usize, Array1<f32>)> = None;

    for i in 0..positions.len_of(Axis(0)) {
        if mask[[i, ca]] == 0.0 {
            continue;
        }
        let this_ca = positions.slice(s![i, ca, ..]).to_owned();
        if let Some((prev_index, prev_ca)) = &previous {
            let distance = (&this_ca - prev_ca).mapv(|d| d * d).sum().sqrt();
            if distance > max_ca_ca_distance {
                return Err(CaDistanceError {
                    residue_a: *prev_index,
                    residue_b: i,
                    distance,
                    limit: max_ca_ca_distance,
                });
            }
        }
        previous = Some((i, this_ca));
    }
    Ok(())
}

/// Translate observed atoms so their centroid sits at the origin. Unobserved atoms stay zero.
pub fn zero_center(positions: &mut Array3<f32>, mask: ArrayView2<'_, f32>) {
    let observed = mask.sum();
    if observed == 0.0 {
        return;
    }
    let mut center = [0.0f32; 3];
    for ((residue, atom), &m) in mask.indexed_iter() {
        if m > 0.0 {
            for (k, c) in center.iter_mut().enumerate() {
                *c += positions[[residue, atom, k]];
            }
        }
    }
    center.iter_mut().for_each(|c| *c /= observed);

    for ((residue, atom), &m) in mask.indexed_iter() {
        if m > 0.0 {
            for (k, c) in center.iter().enumerate() {
                positions[[residue, atom, k]] -= c;
            }
        }
    }
}

/// Positions and mask for one chain, optionally zero-centered, after the CA distance check.
pub fn get_atom_positions(
    structure: &TemplateStructure,
    chain_id: &str,
    max_ca_ca_distance: f32,
    zero_center_positions: bool,
) -> Result<(Array3<f32>, Array2<f32>), HitError> {
    let pdb_id = structure.file_id();
    let (positions, mask) = structure.atom_coordinates(chain_id).ok_or_else(|| {
        HitError::NoAtomDataInTemplate(format!(
            "Could not get atom data ({}_{}): chain {} not in structure",
            pdb_id, chain_id, chain_id
        ))
    })?;

    let mut positions = positions.to_owned();
    let mask = mask.to_owned();
    if zero_center_positions {
        zero_center(&mut positions, mask.view());
    }
    check_residue_distances(positions.view(), mask.view(), max_ca_ca_distance).map_err(|e| {
        HitError::NoAtomDataInTemplate(format!(
            "Could not get atom data ({}_{}): {}",
            pdb_id, chain_id, e
        ))
    })?;
    Ok((positions, mask))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ferritin_core::{TemplateChain, ATOM_TYPE_NUM};

    /// A chain whose residue `i` has a CA at `(xs[i], 0, 0)`, observed where `observed[i]`.
    pub(crate) fn ca_chain(id: &str, xs: &[f32], observed: &[bool]) -> TemplateChain {
        let n = xs.len();
        let ca = AAAtom::CA.to_index();
        let mut positions = Array3::zeros((n, ATOM_TYPE_NUM, 3));
        let mut mask = Array2::zeros((n, ATOM_TYPE_NUM));
        for i in 0..n {
            positions[[i, ca, 0]] = xs[i];
            if observed[i] {
                mask[[i, ca]] = 1.0;
            }
        }
        TemplateChain::new(id, "A".repeat(n), positions, mask).unwrap()
    }

    #[test]
    fn test_distance_skips_masked_residues() {
        let chain = ca_chain("A", &[0.0, 5.0, 200.0], &[true, false, true]);
        let err = check_residue_distances(chain.positions(), chain.mask(), MAX_CA_CA_DISTANCE).unwrap_err();
        assert_eq!((err.residue_a, err.residue_b), (0, 2));
        assert_eq!(err.distance, 200.0);
        assert_eq!(err.limit, 150.0);
    }

    #[test]
    fn test_distance_within_limit() {
        let chain = ca_chain("A", &[0.0, 3.8, 7.6, 500.0], &[true, true, true, false]);
        assert!(check_residue_distances(chain.positions(), chain.mask(), MAX_CA_CA_DISTANCE).is_ok());
    }

    #[test]
    fn test_zero_center() {
        let chain = ca_chain("A", &[2.0, 4.0, 100.0], &[true, true, false]);
        let mut positions = chain.positions().to_owned();
        zero_center(&mut positions, chain.mask());
        let ca = AAAtom::CA.to_index();
        assert_eq!(positions[[0, ca, 0]], -1.0);
        assert_eq!(positions[[1, ca, 0]], 1.0);
        // unobserved atoms are left alone
        assert_eq!(positions[[2, ca, 0]], 100.0);
        assert_eq!(positions[[0, 0, 0]], 0.0);
    }

    #[test]
    fn test_get_atom_positions_wraps_errors() {
        let structure = TemplateStructure::new("1abc", None)
            .with_chain(ca_chain("A", &[0.0, 5.0, 200.0], &[true, false, true]))
            .unwrap();
        let err = get_atom_positions(&structure, "A", MAX_CA_CA_DISTANCE, true).unwrap_err();
        assert!(matches!(&err, HitError::NoAtomDataInTemplate(msg) if msg.contains("1abc_A")));
        assert!(err.is_missing_data());

        assert!(matches!(
            get_atom_positions(&structure, "B", MAX_CA_CA_DISTANCE, true),
            Err(HitError::NoAtomDataInTemplate(_))
        ));
    }
}
