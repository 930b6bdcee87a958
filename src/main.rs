use clap::Parser;
use gist::cli::{Cli, Commands};
use gist::GistError;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // GIST_LOG wins, then RUST_LOG, then the -v / -q flags.
    let default_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = std::env::var("GIST_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        gist::cli::formatter::print_error(&format!("{:#}", e));
        process::exit(exit_code(&e));
    }
}

fn exit_code(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<GistError>() {
        Some(GistError::Config(_)) => 2,
        Some(GistError::Io(_)) => 3,
        Some(GistError::Parse(_)) | Some(GistError::Json(_)) | Some(GistError::Csv(_)) => 4,
        Some(GistError::Tool { .. })
        | Some(GistError::Timeout { .. })
        | Some(GistError::StrataFailed(_)) => 5,
        _ => 1,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let threads = gist::utils::parallel::resolve_threads(cli.threads);
    if cli.verbose > 0 {
        eprintln!("Using {} threads", threads);
    }

    match cli.command {
        Commands::Subsample(mut args) => {
            args.threads = threads;
            args.quiet = cli.quiet;
            gist::cli::commands::subsample::run(args)
        }
        Commands::Similar(mut args) => {
            args.threads = threads;
            gist::cli::commands::similar::run(args)
        }
        Commands::ValidateSchema(args) => gist::cli::commands::validate_schema::run(args),
        Commands::CheckTools(args) => gist::cli::commands::check_tools::run(args),
        Commands::InitConfig(args) => gist::cli::commands::init_config::run(args),
    }
}
