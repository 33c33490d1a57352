//! Release dates from structure file headers.
//!
//! mmCIF: earliest date in `_pdbx_audit_revision_history.revision_date`,
//! in either loop or single-row form.
//! PDB: earliest `REVDAT` record.
use crate::cif;
use crate::parser::DocumentFormat;
use crate::release_dates::parse_iso_date;
use chrono::NaiveDate;

const REVISION_CATEGORY: &str = "_pdbx_audit_revision_history";

pub fn release_date(document: &str) -> Option<NaiveDate> {
    match DocumentFormat::detect(document) {
        DocumentFormat::Mmcif => mmcif_release_date(document),
        DocumentFormat::Pdb => pdb_release_date(document),
    }
}

fn mmcif_release_date(document: &str) -> Option<NaiveDate> {
    cif::read_category(document, REVISION_CATEGORY)?
        .values("revision_date")?
        .filter_map(parse_iso_date)
        .min()
}

fn pdb_release_date(document: &str) -> Option<NaiveDate> {
    document
        .lines()
        .filter(|line| line.starts_with("REVDAT"))
        .filter_map(|line| line.get(13..22))
        .filter_map(|date| NaiveDate::parse_from_str(date.trim(), "%d-%b-%y").ok())
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferritin_test_data::TestFile;

    const CIF_LOOP: &str = "data_1ABC
#
loop_
_pdbx_audit_revision_history.ordinal
_pdbx_audit_revision_history.data_content_type
_pdbx_audit_revision_history.major_revision
_pdbx_audit_revision_history.minor_revision
_pdbx_audit_revision_history.revision_date
1 'Structure model' 1 0 2004-07-20
2 'Structure model' 1 1 2008-04-30
3 'Structure model' 1 2 2011-07-13
#
";

    const CIF_SINGLE: &str = "data_1ABC
#
_pdbx_audit_revision_history.ordinal             1
_pdbx_audit_revision_history.data_content_type   'Structure model'
_pdbx_audit_revision_history.revision_date       1999-03-11
#
";

    #[test]
    fn test_mmcif_release_date() {
        assert_eq!(release_date(CIF_LOOP), NaiveDate::from_ymd_opt(2004, 7, 20));
        assert_eq!(release_date(CIF_SINGLE), NaiveDate::from_ymd_opt(1999, 3, 11));
        assert_eq!(release_date("data_1ABC\n#\n"), None);
    }

    #[test]
    fn test_pdb_release_date() {
        let document = TestFile::template_01().as_str();
        assert_eq!(release_date(document), NaiveDate::from_ymd_opt(2001, 5, 2));
        assert_eq!(release_date("HEADER    NOTHING\nEND\n"), None);
    }
}
