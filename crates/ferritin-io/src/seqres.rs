//! Full chain sequences from the sequence records of a structure file.
//!
//! PDB: `SEQRES` records. mmCIF: `_pdbx_poly_seq_scheme`, the per-chain
//! expansion of `_entity_poly_seq` keyed by author chain id, which also
//! carries the author residue numbering used in `_atom_site`.
use crate::cif::{self, CifTable};
use crate::parser::DocumentFormat;
use ferritin_core::aa3to1;
use std::collections::HashSet;

const POLY_SEQ_SCHEME: &str = "_pdbx_poly_seq_scheme";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqresResidue {
    /// Three-letter residue name.
    pub name: String,
    /// Author residue number and insertion code, when the record carries them.
    pub number: Option<(isize, Option<String>)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqresChain {
    pub chain_id: String,
    pub residues: Vec<SeqresResidue>,
}

impl SeqresChain {
    pub fn sequence(&self) -> String {
        self.residues.iter().map(|residue| aa3to1(&residue.name)).collect()
    }

    pub fn is_numbered(&self) -> bool {
        !self.residues.is_empty() && self.residues.iter().all(|residue| residue.number.is_some())
    }
}

/// Chains in first-seen order. Empty when the document has no sequence records.
pub fn seqres_chains(document: &str) -> Vec<SeqresChain> {
    match DocumentFormat::detect(document) {
        DocumentFormat::Mmcif => cif::read_category(document, POLY_SEQ_SCHEME)
            .map(|table| mmcif_seqres(&table))
            .unwrap_or_default(),
        DocumentFormat::Pdb => pdb_seqres(document),
    }
}

fn chain_entry<'a>(chains: &'a mut Vec<SeqresChain>, chain_id: &str) -> &'a mut SeqresChain {
    let index = match chains.iter().position(|chain| chain.chain_id == chain_id) {
        Some(index) => index,
        None => {
            chains.push(SeqresChain {
                chain_id: chain_id.to_string(),
                residues: Vec::new(),
            });
            chains.len() - 1
        }
    };
    &mut chains[index]
}

fn pdb_seqres(document: &str) -> Vec<SeqresChain> {
    let mut chains = Vec::new();
    for line in document.lines().filter(|line| line.starts_with("SEQRES")) {
        let Some(chain_id) = line.get(11..12) else {
            continue;
        };
        let names = line.get(19..).unwrap_or_default().split_whitespace();
        chain_entry(&mut chains, chain_id.trim())
            .residues
            .extend(names.map(|name| SeqresResidue {
                name: name.to_string(),
                number: None,
            }));
    }
    chains
}

fn mmcif_seqres(table: &CifTable) -> Vec<SeqresChain> {
    let chain_column = table.column("pdb_strand_id").or_else(|| table.column("asym_id"));
    let (Some(chain_column), Some(seq_id), Some(mon_id)) =
        (chain_column, table.column("seq_id"), table.column("mon_id"))
    else {
        return Vec::new();
    };
    let number_column = table.column("pdb_seq_num");
    let insertion_column = table.column("pdb_ins_code");

    let mut chains = Vec::new();
    // microheterogeneity lists several residues at one position; the first is kept
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for row in table.rows() {
        if !seen.insert((row[chain_column].clone(), row[seq_id].clone())) {
            continue;
        }
        let number = number_column
            .and_then(|column| row[column].parse::<isize>().ok())
            .map(|number| {
                let insertion = insertion_column
                    .map(|column| row[column].as_str())
                    .filter(|code| !cif::is_null(code))
                    .map(str::to_string);
                (number, insertion)
            });
        chain_entry(&mut chains, &row[chain_column])
            .residues
            .push(SeqresResidue {
                name: row[mon_id].clone(),
                number,
            });
    }
    chains
}
