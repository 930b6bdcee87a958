use crate::cli::formatter::{
    self, format_number, print_section, print_stats_table, print_success, print_warning,
};
use crate::core::job::{check_file, JobContext};
use crate::core::report::{JobReport, REPORT_FILE};
use crate::core::schema::SimilaritySchema;
use crate::core::similar::SimilaritySearch;
use crate::tools::BlastToolkit;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct SimilarArgs {
    /// Query genomes (FASTA)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Sequences to search (FASTA, optionally gzipped)
    #[arg(short, long, value_name = "FILE")]
    pub sequences: PathBuf,

    /// Metadata table for the searched sequences (TSV, optionally gzipped)
    #[arg(short, long, value_name = "FILE")]
    pub metadata: PathBuf,

    /// Similarity schema (JSON)
    #[arg(long, value_name = "FILE")]
    pub schema: PathBuf,

    /// Directory the job directory is created in
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Configuration file
    #[arg(short = 'c', long, env = "GIST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of threads (passed from global)
    #[arg(skip)]
    pub threads: usize,
}

pub fn run(args: SimilarArgs) -> anyhow::Result<()> {
    formatter::init();

    check_file(&args.input)?;
    check_file(&args.sequences)?;
    check_file(&args.metadata)?;
    check_file(&args.schema)?;
    let schema = SimilaritySchema::load(&args.schema)?;
    let config = super::resolve_config(args.config.as_deref())?;
    let blast = BlastToolkit::from_config(&config.tools)?;

    let ctx = JobContext::create(&args.output_dir, &schema.job_name, args.threads)?;
    info!(
        "Job '{}' in {} (identity {}-{}, up to {} genomes)",
        schema.job_name,
        ctx.job_dir().display(),
        schema.min_id,
        schema.max_id,
        schema.max_number_of_similar_genomes
    );

    let report = JobReport::start(&schema.job_name, "similar");
    let outcome = SimilaritySearch::new(&ctx, &blast, &config).run(
        &args.input,
        &args.sequences,
        &args.metadata,
        &schema,
    )?;

    let report = report
        .count("hits", outcome.hits)
        .count("similar", outcome.ranked.len())
        .count("sequences", outcome.selection.sequences)
        .count("metadata_rows", outcome.selection.metadata_rows)
        .with_warnings(&outcome.warnings)
        .finish();
    report.write(&ctx.path(REPORT_FILE))?;

    print_section(&format!("Similarity job '{}'", schema.job_name));
    print_stats_table(
        "Summary",
        &[
            ("Alignment hits", format_number(outcome.hits)),
            ("Similar genomes", format_number(outcome.ranked.len())),
            ("Sequences written", format_number(outcome.selection.sequences)),
            ("Elapsed", format!("{:.1}s", report.elapsed_seconds)),
        ],
    );
    for warning in &outcome.warnings {
        print_warning(warning);
    }
    print_success(&format!("Outputs written to {}", ctx.job_dir().display()));
    Ok(())
}
