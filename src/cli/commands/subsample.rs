use crate::cli::formatter::{
    self, format_number, print_section, print_stats_table, print_success, print_warning,
};
use crate::cli::Engine;
use crate::core::job::{check_file, JobContext, PreparedInputs};
use crate::core::planner::SubsamplingPlanner;
use crate::core::report::{JobReport, REPORT_FILE};
use crate::core::schema::SubsamplingSchema;
use crate::tools::traits::{FilterEngine, InputPreparer};
use crate::tools::{AugurToolkit, MemoryToolkit};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct SubsampleArgs {
    /// Raw sequences (FASTA, optionally gzipped)
    #[arg(short, long, value_name = "FILE")]
    pub sequences: PathBuf,

    /// Raw metadata table (TSV, optionally gzipped)
    #[arg(short, long, value_name = "FILE")]
    pub metadata: PathBuf,

    /// Subsampling schema (JSON)
    #[arg(long, value_name = "FILE")]
    pub schema: PathBuf,

    /// Directory the job directory is created in
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// ncov workflow checkout providing the sanitizer scripts
    #[arg(long, value_name = "DIR")]
    pub ncov_dir: Option<PathBuf>,

    /// Configuration file
    #[arg(short = 'c', long, env = "GIST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Filtering engine
    #[arg(long, value_enum, default_value = "augur")]
    pub engine: Engine,

    /// Use the inputs as given instead of sanitizing them (they are still indexed)
    #[arg(long)]
    pub no_sanitize: bool,

    /// Number of threads (passed from global)
    #[arg(skip)]
    pub threads: usize,

    /// Hide progress output (passed from global)
    #[arg(skip)]
    pub quiet: bool,
}

pub fn run(args: SubsampleArgs) -> anyhow::Result<()> {
    formatter::init();

    // Every configuration problem surfaces here, before any tool runs.
    check_file(&args.sequences)?;
    check_file(&args.metadata)?;
    check_file(&args.schema)?;
    let schema = SubsamplingSchema::load(&args.schema)?;

    let mut config = super::resolve_config(args.config.as_deref())?;
    if let Some(ncov_dir) = &args.ncov_dir {
        crate::core::job::check_dir(ncov_dir)?;
        config.tools.ncov_dir = Some(ncov_dir.clone());
    }

    let (engine, preparer): (Box<dyn FilterEngine>, Box<dyn InputPreparer>) = match args.engine {
        Engine::Augur => {
            let toolkit = AugurToolkit::from_config(&config.tools, &config.sanitize)?;
            if !args.no_sanitize && !toolkit.can_sanitize() {
                anyhow::bail!(crate::GistError::Config(
                    "sanitizing needs an ncov checkout; pass --ncov-dir or --no-sanitize"
                        .to_string()
                ));
            }
            (Box::new(toolkit.clone()), Box::new(toolkit))
        }
        Engine::Memory => {
            let toolkit = MemoryToolkit::new(&config.columns, &config.sanitize);
            (Box::new(toolkit.clone()), Box::new(toolkit))
        }
    };

    let ctx = JobContext::create(&args.output_dir, &schema.job_name, args.threads)?;
    info!(
        "Job '{}' in {} ({} threads, {} engine)",
        schema.job_name,
        ctx.job_dir().display(),
        ctx.threads(),
        engine.name()
    );

    let report = JobReport::start(&schema.job_name, "subsample");

    let inputs = if args.no_sanitize {
        PreparedInputs::indexed(&ctx, preparer.as_ref(), &args.sequences, &args.metadata)?
    } else {
        PreparedInputs::prepare(&ctx, preparer.as_ref(), &args.sequences, &args.metadata)?
    };

    let outcome = SubsamplingPlanner::new(&ctx, engine.as_ref(), &inputs, &schema, &config)
        .with_progress(!args.quiet)
        .run()?;

    let mut report = report
        .with_strata(&outcome.strata)
        .count("target", outcome.target.len())
        .count("background", outcome.background.len())
        .count("combined", outcome.combined.len())
        .count("complement_sequences", outcome.complement_selection.sequences)
        .count("combined_sequences", outcome.combined_selection.sequences)
        .with_warnings(&outcome.warnings);
    if let Some(selection) = &outcome.target_selection {
        report = report.count("target_sequences", selection.sequences);
    }
    let report = report.finish();
    report.write(&ctx.path(REPORT_FILE))?;

    print_section(&format!("Subsampling job '{}'", schema.job_name));
    let stats: Vec<(&str, String)> = vec![
        ("Strata", outcome.strata.len().to_string()),
        ("Target genomes", format_number(outcome.target.len())),
        ("Background genomes", format_number(outcome.background.len())),
        ("Combined genomes", format_number(outcome.combined.len())),
        (
            "Sequences written",
            format_number(outcome.combined_selection.sequences),
        ),
        ("Elapsed", format!("{:.1}s", report.elapsed_seconds)),
    ];
    print_stats_table("Summary", &stats);

    for warning in &outcome.warnings {
        print_warning(warning);
    }
    print_success(&format!("Outputs written to {}", ctx.job_dir().display()));
    Ok(())
}
