//! Release date index.
//!
//! Loaded from a JSON table of the form
//! `{"1abc": {"release_date": "1999-03-11", ...}, ...}`; ids are stored uppercased.
//! The table can be generated from a directory of mmCIF files.
use crate::error::IoError;
use crate::header;
use crate::parser::DocumentFormat;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

#[derive(Deserialize, Serialize)]
struct ReleaseDateEntry {
    release_date: Option<String>,
}

/// Parse the leading `YYYY-MM-DD` of a date string. Trailing time components are ignored.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let day = value.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, Default)]
pub struct ReleaseDates {
    dates: HashMap<String, NaiveDate>,
}

impl ReleaseDates {
    pub fn from_json_str(contents: &str) -> Result<Self, IoError> {
        let raw: HashMap<String, ReleaseDateEntry> = serde_json::from_str(contents)?;
        let mut dates = HashMap::with_capacity(raw.len());
        for (pdb_id, entry) in raw {
            let Some(date) = entry.release_date else {
                continue;
            };
            let parsed = parse_iso_date(&date).ok_or_else(|| IoError::InvalidDate {
                pdb_id: pdb_id.clone(),
                date: date.clone(),
            })?;
            dates.insert(pdb_id.to_uppercase(), parsed);
        }
        Ok(Self { dates })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| IoError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_dates<I, S>(dates: I) -> Self
    where
        I: IntoIterator<Item = (S, NaiveDate)>,
        S: AsRef<str>,
    {
        Self {
            dates: dates
                .into_iter()
                .map(|(id, date)| (id.as_ref().to_uppercase(), date))
                .collect(),
        }
    }

    /// Scan `dir` for `*.cif` files, record each header release date keyed by
    /// file stem and write the table to `out`.
    ///
    /// Files that cannot be read, are not mmCIF, or carry no revision
    /// history are skipped with a warning.
    pub fn generate_from_dir(dir: impl AsRef<Path>, out: impl AsRef<Path>) -> Result<Self, IoError> {
        let dir = dir.as_ref();
        let read_error = |source| IoError::Read {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_error)? {
            let path = entry.map_err(read_error)?.path();
            if path.extension().is_some_and(|extension| extension == "cif") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut table = BTreeMap::new();
        let mut dates = HashMap::new();
        for path in paths {
            let Some(file_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let document = match fs::read_to_string(&path) {
                Ok(document) => document,
                Err(err) => {
                    log::warn!("Skipping {}: {}", path.display(), err);
                    continue;
                }
            };
            if DocumentFormat::detect(&document) != DocumentFormat::Mmcif {
                log::warn!("Skipping {}: not an mmCIF document", path.display());
                continue;
            }
            let Some(date) = header::release_date(&document) else {
                log::warn!("Skipping {}: no release date in header", path.display());
                continue;
            };
            table.insert(
                file_id.to_string(),
                ReleaseDateEntry {
                    release_date: Some(date.format("%Y-%m-%d").to_string()),
                },
            );
            dates.insert(file_id.to_uppercase(), date);
        }

        let out = out.as_ref();
        let contents = serde_json::to_string_pretty(&table)?;
        fs::write(out, contents).map_err(|source| IoError::Write {
            path: out.to_path_buf(),
            source,
        })?;
        log::info!("Wrote {} release dates to {}", dates.len(), out.display());
        Ok(Self { dates })
    }

    pub fn get(&self, pdb_id: &str) -> Option<NaiveDate> {
        self.dates.get(&pdb_id.to_uppercase()).copied()
    }

    pub fn contains(&self, pdb_id: &str) -> bool {
        self.dates.contains_key(&pdb_id.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// True only when the id is known and released strictly after `cutoff`.
    ///
    /// Unknown ids are not rejected here; the structure's own date is checked
    /// again once it has been parsed.
    pub fn is_after_cutoff(&self, pdb_id: &str, cutoff: NaiveDate) -> bool {
        match self.get(pdb_id) {
            Some(date) => date > cutoff,
            None => {
                log::info!("Template structure not in release dates dict: {}", pdb_id);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferritin_test_data::TestFile;

    fn date(value: &str) -> NaiveDate {
        parse_iso_date(value).unwrap()
    }

    #[test]
    fn test_parse_table() {
        let (path, _temp) = TestFile::release_dates_01().create_temp().unwrap();
        let dates = ReleaseDates::from_path(path).unwrap();
        assert_eq!(dates.len(), 4);
        assert_eq!(dates.get("1tst"), Some(date("2001-05-02")));
        assert_eq!(dates.get("5XYZ"), Some(date("2021-07-14")));
        assert!(dates.contains("4abc"));
        assert!(!dates.contains("9zzz"));
    }

    #[test]
    fn test_is_after_cutoff() {
        let dates = ReleaseDates::from_dates([("1abc", date("2010-01-01"))]);
        assert!(dates.is_after_cutoff("1abc", date("2009-12-31")));
        assert!(!dates.is_after_cutoff("1ABC", date("2010-01-01")));
        // unknown ids are let through
        assert!(!dates.is_after_cutoff("9zzz", date("1900-01-01")));
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2001-05-02 00:00:00"), Some(date("2001-05-02")));
        assert_eq!(parse_iso_date("02-MAY-01"), None);
        assert_eq!(parse_iso_date("2001"), None);
    }

    #[test]
    fn test_generate_from_dir() {
        let structures = tempfile::tempdir().unwrap();
        TestFile::template_03().write_to_dir(structures.path()).unwrap();
        // not mmCIF, wrong extension
        TestFile::template_01().write_to_dir(structures.path()).unwrap();
        fs::write(structures.path().join("broken.cif"), "data_BROKEN\n#\n").unwrap();

        let out = tempfile::tempdir().unwrap();
        let table = out.path().join("release_dates.json");
        let generated = ReleaseDates::generate_from_dir(structures.path(), &table).unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(generated.get("3TST"), Some(date("2004-07-20")));

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&table).unwrap()).unwrap();
        assert_eq!(raw["3tst"]["release_date"], "2004-07-20");

        let reloaded = ReleaseDates::from_path(&table).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("3tst"), generated.get("3tst"));
        assert!(!reloaded.contains("broken"));
    }

    #[test]
    fn test_generate_from_missing_dir() {
        let out = tempfile::tempdir().unwrap();
        let result = ReleaseDates::generate_from_dir(out.path().join("missing"), out.path().join("dates.json"));
        assert!(matches!(result, Err(IoError::Read { .. })));
    }

    #[test]
    fn test_invalid_date() {
        let result = ReleaseDates::from_json_str(r#"{"1abc": {"release_date": "yesterday"}}"#);
        assert!(matches!(result, Err(IoError::InvalidDate { .. })));
        let missing = ReleaseDates::from_json_str(r#"{"1abc": {"resolution": 2.0}}"#).unwrap();
        assert!(missing.is_empty());
    }
}
