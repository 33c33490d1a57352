use super::commands;
use clap::{Parser, Subcommand};
use ferritin_templates::ScoreOrdering;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Featurize template search hits for a query
    Featurize {
        /// Query sequence, or a FASTA file whose first record is the query
        #[arg(short, long)]
        query: String,
        /// JSON list of template hits
        #[arg(long)]
        hits: PathBuf,
        /// Directory of template structures named <pdb_id>.<extension>
        #[arg(short, long)]
        structure_dir: PathBuf,
        #[arg(long, default_value = "cif")]
        structure_extension: String,
        /// YYYY-MM-DD
        #[arg(short, long)]
        max_template_date: String,
        /// Output safetensors file
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 20)]
        max_hits: usize,
        #[arg(long)]
        release_dates: Option<PathBuf>,
        #[arg(long)]
        obsolete_pdbs: Option<PathBuf>,
        #[arg(long)]
        strict: bool,
        /// Shuffle the first k hits after sorting
        #[arg(long)]
        shuffle_top_k: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        no_zero_center: bool,
        /// Realign with this kalign binary instead of the built-in aligner
        #[arg(long)]
        kalign: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ScoreOrdering::Raw)]
        ordering: ScoreOrdering,
    },
    /// Featurize a single user-supplied structure as the only template
    Custom {
        #[arg(short, long)]
        query: String,
        /// PDB or mmCIF file
        #[arg(short, long)]
        structure: PathBuf,
        #[arg(short, long, default_value = "A")]
        chain: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Build a release date table from a directory of mmCIF files
    ReleaseDates {
        /// Directory scanned for *.cif files
        #[arg(short, long)]
        structure_dir: PathBuf,
        /// Output JSON table
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl Cli {
    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Featurize {
                query,
                hits,
                structure_dir,
                structure_extension,
                max_template_date,
                output,
                max_hits,
                release_dates,
                obsolete_pdbs,
                strict,
                shuffle_top_k,
                seed,
                no_zero_center,
                kalign,
                ordering,
            } => commands::featurize::execute(commands::featurize::FeaturizeArgs {
                query,
                hits,
                structure_dir,
                structure_extension,
                max_template_date,
                output,
                max_hits,
                release_dates,
                obsolete_pdbs,
                strict,
                shuffle_top_k,
                seed,
                zero_center: !no_zero_center,
                kalign,
                ordering,
            }),
            Commands::Custom {
                query,
                structure,
                chain,
                output,
            } => commands::custom::execute(query, structure, chain, output),
            Commands::ReleaseDates {
                structure_dir,
                output,
            } => commands::release_dates::execute(structure_dir, output),
        }
    }
}
