use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Runs the direct, via-person and via-genre pipelines in sequence.
    Run {
        #[arg(long, help = "Path to the TOML configuration file")]
        config: PathBuf,
    },
    /// Prints the last persisted cursor for each pipeline.
    Progress {
        #[arg(long, help = "Cursor state directory", default_value = ".pg2es")]
        state_dir: PathBuf,
    },
}
