//! Obsolete PDB ids.
//!
//! Reads the `OBSLTE` records of the PDB `obsolete.dat` listing:
//!
//! ```text
//! OBSLTE    31-JUL-94 116L     216L
//! ```
//!
//! Replacement chains (`A -> B -> C`) are flattened once at load time so every
//! lookup is a single map access returning the newest id.
use crate::error::IoError;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ObsoletePdbs {
    replacements: HashMap<String, String>,
}

impl ObsoletePdbs {
    pub fn parse(contents: &str) -> Result<Self, IoError> {
        let mut raw = HashMap::new();
        for line in contents.lines().map(str::trim) {
            // entries without a successor are skipped
            if !(line.starts_with("OBSLTE") && line.len() > 30) {
                continue;
            }
            if let (Some(from), Some(to)) = (line.get(20..24), line.get(29..33)) {
                raw.insert(from.to_lowercase(), to.to_lowercase());
            }
        }
        Self::from_mapping(raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| IoError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Build from an unflattened `old -> new` mapping.
    ///
    /// Fails with [`IoError::ObsoleteCycle`] if following replacements revisits an id.
    pub fn from_mapping(mapping: HashMap<String, String>) -> Result<Self, IoError> {
        let raw: HashMap<String, String> = mapping
            .into_iter()
            .map(|(from, to)| (from.to_lowercase(), to.to_lowercase()))
            .collect();
        Ok(Self {
            replacements: flatten_replacements(&raw)?,
        })
    }

    /// The newest id replacing `pdb_id`, if it is obsolete.
    pub fn get(&self, pdb_id: &str) -> Option<&str> {
        self.replacements
            .get(&pdb_id.to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

fn flatten_replacements(raw: &HashMap<String, String>) -> Result<HashMap<String, String>, IoError> {
    let mut resolved: HashMap<String, String> = HashMap::with_capacity(raw.len());

    for (start, first) in raw {
        if resolved.contains_key(start) {
            continue;
        }
        let mut path = vec![start.as_str()];
        let mut seen = HashSet::from([start.as_str()]);
        let mut current = first.as_str();

        let leaf = loop {
            if let Some(leaf) = resolved.get(current) {
                break leaf.clone();
            }
            match raw.get(current) {
                None => break current.to_string(),
                Some(next) => {
                    if !seen.insert(current) {
                        return Err(IoError::ObsoleteCycle(current.to_string()));
                    }
                    path.push(current);
                    current = next.as_str();
                }
            }
        };

        for id in path {
            resolved.insert(id.to_string(), leaf.clone());
        }
    }
    Ok(resolved)
}
