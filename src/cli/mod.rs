pub mod commands;
pub mod formatter;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "gist",
    version,
    about = "Stratified subsampling and similarity search for genomic surveillance datasets",
    long_about = "gist selects a representative, stratified subset of viral genomes by geography, \
                  lineage, date and length using augur, and finds genomes similar to a query set \
                  using BLAST."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors and the final summary
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Number of threads to use (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a stratified subsample of a sequence + metadata corpus
    Subsample(commands::subsample::SubsampleArgs),

    /// Find genomes similar to a query set
    Similar(commands::similar::SimilarArgs),

    /// Check a schema file without running anything
    ValidateSchema(commands::validate_schema::ValidateSchemaArgs),

    /// Show how the configured external tools resolve
    CheckTools(commands::check_tools::CheckToolsArgs),

    /// Write a configuration file with every default filled in
    InitConfig(commands::init_config::InitConfigArgs),
}

/// Which filtering engine runs the strata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    /// augur filter, with the ncov sanitizer scripts
    Augur,
    /// Built-in engine; for small inputs and dry runs
    Memory,
}
