//! Structure Parsing
//!
//! The pipeline only needs chain sequences and atom37 coordinates from a
//! template file. [`StructureParser`] is that seam; [`PdbtbxParser`] is the
//! default implementation backed by `pdbtbx`.
use crate::error::StructureError;
use crate::header;
use crate::seqres::{seqres_chains, SeqresChain};
use ferritin_core::{aa3to1, is_amino_acid, AAAtom, TemplateChain, TemplateStructure, ATOM_TYPE_NUM};
use ndarray::{Array2, Array3};
use pdbtbx::{Format, ReadOptions, Residue, StrictnessLevel, PDB};
use std::collections::HashMap;
use std::io::BufReader;

/// Result of parsing one document.
///
/// `structure` is `None` when the document could not be read at all;
/// `errors` always carries whatever diagnostics the parser produced.
#[derive(Debug, Clone, Default)]
pub struct StructureParse {
    pub structure: Option<TemplateStructure>,
    pub errors: Vec<String>,
}

pub trait StructureParser {
    fn parse(&self, file_id: &str, document: &str) -> Result<StructureParse, StructureError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Mmcif,
    Pdb,
}

impl DocumentFormat {
    /// mmCIF documents open with a `data_` block header; anything else is read as PDB.
    pub fn detect(document: &str) -> Self {
        let first = document
            .lines()
            .map(str::trim_start)
            .find(|line| !line.is_empty() && !line.starts_with('#'));
        match first {
            Some(line) if line.starts_with("data_") => DocumentFormat::Mmcif,
            _ => DocumentFormat::Pdb,
        }
    }
}

impl From<DocumentFormat> for Format {
    fn from(format: DocumentFormat) -> Self {
        match format {
            DocumentFormat::Mmcif => Format::Mmcif,
            DocumentFormat::Pdb => Format::Pdb,
        }
    }
}

/// Gaps in residue numbering larger than this are not padded.
const MAX_GAP_FILL: isize = 10_000;

/// Reads documents from memory with `pdbtbx`.
///
/// Strictness is `Loose`: deposited files routinely disagree with their own
/// SEQRES records, and those disagreements must not cost the template.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdbtbxParser;

impl StructureParser for PdbtbxParser {
    fn parse(&self, file_id: &str, document: &str) -> Result<StructureParse, StructureError> {
        let format = DocumentFormat::detect(document);
        let read = ReadOptions::default()
            .set_format(format.into())
            .set_level(StrictnessLevel::Loose)
            .set_only_first_model(true)
            .read_raw(BufReader::new(document.as_bytes()));

        match read {
            Ok((pdb, warnings)) => {
                let errors: Vec<String> = warnings.iter().map(ToString::to_string).collect();
                if !errors.is_empty() {
                    log::debug!("{}: {} parser warnings", file_id, errors.len());
                }
                let release_date = header::release_date(document);
                let seqres = seqres_chains(document);
                let structure = structure_from_pdb(file_id, &pdb, &seqres, release_date)?;
                Ok(StructureParse {
                    structure: Some(structure),
                    errors,
                })
            }
            Err(errors) => Ok(StructureParse {
                structure: None,
                errors: errors.iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

type ResidueKey = (isize, Option<String>);

fn residue_key(residue: &Residue) -> ResidueKey {
    let (number, insertion_code) = residue.id();
    (number, insertion_code.map(str::to_string))
}

/// Observed residues laid out by author numbering, gaps filled with `X`.
fn numbered_slots<'a>(residues: &[&'a Residue]) -> (String, Vec<Option<&'a Residue>>) {
    let mut sequence = String::with_capacity(residues.len());
    let mut slots: Vec<Option<&Residue>> = Vec::with_capacity(residues.len());
    let mut previous: Option<isize> = None;
    for &residue in residues {
        let (number, _insertion_code) = residue.id();
        if let Some(prev) = previous {
            let missing = (number - prev - 1).clamp(0, MAX_GAP_FILL) as usize;
            for _ in 0..missing {
                sequence.push('X');
                slots.push(None);
            }
        }
        previous = Some(number);
        sequence.push(aa3to1(residue.name().unwrap_or_default()));
        slots.push(Some(residue));
    }
    (sequence, slots)
}

/// Place observed residues onto the full chain sequence.
///
/// Numbered records (mmCIF) are matched by author number and insertion code.
/// Unnumbered records (PDB SEQRES) take the first offset where the gap-filled
/// observed sequence agrees with the record, `X` matching anything.
fn place_on_seqres<'a>(
    seqres: &SeqresChain,
    residues: &[&'a Residue],
) -> Option<(String, Vec<Option<&'a Residue>>)> {
    let sequence = seqres.sequence();
    let length = seqres.residues.len();

    if seqres.is_numbered() {
        let index: HashMap<ResidueKey, usize> = seqres
            .residues
            .iter()
            .enumerate()
            .filter_map(|(idx, residue)| residue.number.clone().map(|key| (key, idx)))
            .collect();
        let mut slots = vec![None; length];
        let placed = residues.iter().all(|&residue| match index.get(&residue_key(residue)) {
            Some(&idx) => {
                slots[idx] = Some(residue);
                true
            }
            None => false,
        });
        if placed {
            return Some((sequence, slots));
        }
    }

    let (observed, observed_slots) = numbered_slots(residues);
    let record: Vec<char> = sequence.chars().collect();
    let observed: Vec<char> = observed.chars().collect();
    if observed.len() > record.len() {
        return None;
    }
    let offset = (0..=record.len() - observed.len()).find(|&offset| {
        observed
            .iter()
            .zip(&record[offset..])
            .all(|(&seen, &expected)| seen == 'X' || expected == 'X' || seen == expected)
    })?;
    let mut slots = vec![None; length];
    slots[offset..offset + observed_slots.len()].copy_from_slice(&observed_slots);
    Some((sequence, slots))
}

/// Collect the first model's protein chains.
///
/// The chain sequence is the full sequence record when the file has one, with
/// unobserved residues carrying an all-zero mask. Without a usable record,
/// residues are placed by author numbering and numbering gaps become `X`.
/// Chain ids already seen are skipped.
fn structure_from_pdb(
    file_id: &str,
    pdb: &PDB,
    seqres: &[SeqresChain],
    release_date: Option<chrono::NaiveDate>,
) -> Result<TemplateStructure, StructureError> {
    let mut structure = TemplateStructure::new(file_id, release_date);

    for chain in pdb.chains() {
        if structure.chain(chain.id()).is_some() {
            continue;
        }
        // SEQRES validation inserts atomless residues; only observed ones count
        let residues: Vec<&Residue> = chain
            .residues()
            .filter(|residue| residue.atom_count() > 0)
            .filter(|residue| residue.name().is_some_and(is_amino_acid))
            .collect();
        if residues.is_empty() {
            continue;
        }

        let record = seqres
            .iter()
            .find(|record| record.chain_id == chain.id() && !record.residues.is_empty());
        let placed = record.and_then(|record| place_on_seqres(record, &residues));
        if record.is_some() && placed.is_none() {
            log::debug!(
                "{}: chain {} does not fit its sequence record, using residue numbering",
                file_id,
                chain.id()
            );
        }
        let (sequence, slots) = placed.unwrap_or_else(|| numbered_slots(&residues));

        let mut positions = Array3::<f32>::zeros((slots.len(), ATOM_TYPE_NUM, 3));
        let mut mask = Array2::<f32>::zeros((slots.len(), ATOM_TYPE_NUM));
        for (idx, residue) in slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.map(|residue| (idx, residue)))
        {
            let selenomethionine = residue.name() == Some("MSE");
            for atom in residue.atoms() {
                let name = match atom.name() {
                    "SE" if selenomethionine => "SD",
                    name => name,
                };
                let Some(atom_type) = AAAtom::from_name(name) else {
                    continue;
                };
                let slot = atom_type.to_index();
                // first conformer wins
                if mask[[idx, slot]] > 0.0 {
                    continue;
                }
                let (x, y, z) = atom.pos();
                positions[[idx, slot, 0]] = x as f32;
                positions[[idx, slot, 1]] = y as f32;
                positions[[idx, slot, 2]] = z as f32;
                mask[[idx, slot]] = 1.0;
            }
        }

        structure.push_chain(TemplateChain::new(chain.id(), sequence, positions, mask)?)?;
    }
    Ok(structure)
}
