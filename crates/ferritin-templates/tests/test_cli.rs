use assert_cmd::Command;
use ferritin_test_data::TestFile;
use safetensors::SafeTensors;
use std::fs;

#[test]
fn test_cli_featurize() {
    let structures = tempfile::tempdir().unwrap();
    TestFile::template_01().write_to_dir(structures.path()).unwrap();
    let (query, _query_tmp) = TestFile::query_01().create_temp().unwrap();
    let (hits, _hits_tmp) = TestFile::hits_01().create_temp().unwrap();
    let (dates, _dates_tmp) = TestFile::release_dates_01().create_temp().unwrap();
    let (obsolete, _obsolete_tmp) = TestFile::obsolete_01().create_temp().unwrap();
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("templates.safetensors");

    let mut cmd = Command::cargo_bin("ferritin-templates").unwrap();
    cmd.arg("featurize")
        .arg("--query")
        .arg(&query)
        .arg("--hits")
        .arg(&hits)
        .arg("--structure-dir")
        .arg(structures.path())
        .arg("--structure-extension")
        .arg("pdb")
        .arg("--max-template-date")
        .arg("2021-01-01")
        .arg("--release-dates")
        .arg(&dates)
        .arg("--obsolete-pdbs")
        .arg(&obsolete)
        .arg("--output")
        .arg(&output);
    cmd.assert().success();

    let bytes = fs::read(&output).unwrap();
    let tensors = SafeTensors::deserialize(&bytes).unwrap();
    let positions = tensors.tensor("template_all_atom_positions").unwrap();
    assert_eq!(positions.shape(), &[1, 24, 37, 3]);
    let sum_probs = tensors.tensor("template_sum_probs").unwrap();
    assert_eq!(sum_probs.shape(), &[1, 1]);
}

#[test]
fn test_cli_custom() {
    let (structure, _structure_tmp) = TestFile::template_01().create_temp().unwrap();
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("custom.safetensors");

    let mut cmd = Command::cargo_bin("ferritin-templates").unwrap();
    cmd.arg("custom")
        .arg("--query")
        .arg("MKTAYIAXQRQISFVKSHFS")
        .arg("--structure")
        .arg(&structure)
        .arg("--chain")
        .arg("A")
        .arg("--output")
        .arg(&output);
    cmd.assert().success();
    assert!(output.exists());
}

#[test]
fn test_cli_rejects_bad_date() {
    let structures = tempfile::tempdir().unwrap();
    TestFile::template_01().write_to_dir(structures.path()).unwrap();
    let (hits, _hits_tmp) = TestFile::hits_01().create_temp().unwrap();

    let mut cmd = Command::cargo_bin("ferritin-templates").unwrap();
    cmd.arg("featurize")
        .arg("--query")
        .arg("GSMKTAYIAKQRQISFVKSHFSGG")
        .arg("--hits")
        .arg(&hits)
        .arg("--structure-dir")
        .arg(structures.path())
        .arg("--structure-extension")
        .arg("pdb")
        .arg("--max-template-date")
        .arg("yesterday")
        .arg("--output")
        .arg(structures.path().join("out.safetensors"));
    cmd.assert().failure();
}

#[test]
fn test_cli_release_dates() {
    let structures = tempfile::tempdir().unwrap();
    TestFile::template_03().write_to_dir(structures.path()).unwrap();
    fs::write(structures.path().join("empty.cif"), "").unwrap();
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("release_dates.json");

    let mut cmd = Command::cargo_bin("ferritin-templates").unwrap();
    cmd.arg("release-dates")
        .arg("--structure-dir")
        .arg(structures.path())
        .arg("--output")
        .arg(&output);
    cmd.assert().success();

    let table: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(table["3tst"]["release_date"], "2004-07-20");
    assert!(table.get("empty").is_none());
}
