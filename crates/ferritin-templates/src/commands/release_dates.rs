use ferritin_io::ReleaseDates;
use std::path::PathBuf;

pub fn execute(structure_dir: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let dates = ReleaseDates::generate_from_dir(&structure_dir, &output)?;
    if dates.is_empty() {
        log::warn!("No release dates found under {}", structure_dir.display());
    }
    Ok(())
}
