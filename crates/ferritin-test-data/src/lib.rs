//! ferretin-test-data
//!
//! A module to provide test files embedded in the crate for use in testing.
//! Example data is included in the crate distribution for reference files.
//!
//! The test files are represented as `TestFile` objects which package the raw binary data
//! and create temporary files for programs to operate on.
use std::fs;
use std::path::Path;
use tempfile::{Builder, NamedTempFile};

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use ferritin_test_data::TestFile;
/// let (prot_file, _temp) = TestFile::template_01().create_temp().unwrap();
/// let (dates_file, _temp) = TestFile::release_dates_01().create_temp().unwrap();
///
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    name: &'static str,
    suffix: &'static str,
}

impl TestFile {
    /// 1TST.pdb
    /// A 20 residue backbone+CB chain `A` (MKTAYIAKQRQISFVKSHFS) with residue 8 unobserved.
    /// Released 02-MAY-01.
    pub fn template_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/structures/1tst.pdb"),
            name: "1tst",
            suffix: "pdb",
        }
    }
    /// 2TST.pdb
    /// `template_01` renumbered from 3 with SEQRES records for the full 24
    /// residue construct (GS tag in front, GG behind). Released 14-JAN-03.
    pub fn template_02() -> Self {
        Self {
            filebinary: include_bytes!("../data/structures/2tst.pdb"),
            name: "2tst",
            suffix: "pdb",
        }
    }
    /// 3TST.cif
    /// The `template_02` chain as mmCIF, with author numbering starting at 101
    /// and a `_pdbx_poly_seq_scheme` table. Released 2004-07-20.
    pub fn template_03() -> Self {
        Self {
            filebinary: include_bytes!("../data/structures/3tst.cif"),
            name: "3tst",
            suffix: "cif",
        }
    }
    /// Release date table in the `{pdb_id: {"release_date": ...}}` layout.
    pub fn release_dates_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/tables/release_dates.json"),
            name: "release_dates",
            suffix: "json",
        }
    }
    /// PDB `obsolete.dat` excerpt. Contains the chain 1ABC -> 1DEF -> 1GHI.
    pub fn obsolete_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/tables/obsolete.dat"),
            name: "obsolete",
            suffix: "dat",
        }
    }
    /// Two search hits against `1tst_A`-like data; the second fails the align ratio.
    pub fn hits_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/tables/hits.json"),
            name: "hits",
            suffix: "json",
        }
    }
    /// Query for `hits_01`.
    pub fn query_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/tables/query.fasta"),
            name: "query",
            suffix: "fasta",
        }
    }

    pub fn as_str(&self) -> &'static str {
        std::str::from_utf8(self.filebinary).unwrap_or_default()
    }

    /// `<name>.<suffix>`, e.g. `1tst.pdb`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.suffix)
    }

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }

    /// Write the file into `dir` under its canonical name and return the path.
    pub fn write_to_dir(&self, dir: &Path) -> std::io::Result<String> {
        let path = dir.join(self.file_name());
        fs::write(&path, self.filebinary)?;
        Ok(path.to_string_lossy().into_owned())
    }
}
