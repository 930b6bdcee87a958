use crate::cli::formatter::{print_success, print_tip};
use crate::core::config::{default_config, save_config};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InitConfigArgs {
    /// Where to write the configuration
    #[arg(value_name = "FILE", default_value = "gist.toml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitConfigArgs) -> anyhow::Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(crate::GistError::Config(format!(
            "{} already exists; pass --force to overwrite it",
            args.output.display()
        )));
    }
    save_config(&args.output, &default_config())?;
    print_success(&format!("Wrote {}", args.output.display()));
    print_tip("set tools.ncov_dir to your ncov checkout to enable sanitizing");
    Ok(())
}
