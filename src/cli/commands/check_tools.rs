use crate::tools::process::resolve_executable;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, Table};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CheckToolsArgs {
    /// Configuration file
    #[arg(short = 'c', long, env = "GIST_CONFIG")]
    pub config: Option<PathBuf>,
}

pub fn run(args: CheckToolsArgs) -> anyhow::Result<()> {
    let config = super::resolve_config(args.config.as_deref())?;
    let tools = &config.tools;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Tool").add_attribute(Attribute::Bold),
        Cell::new("Configured").add_attribute(Attribute::Bold),
        Cell::new("Resolved").add_attribute(Attribute::Bold),
    ]);

    let mut missing = 0;
    for (name, program) in [
        ("augur", &tools.augur),
        ("python", &tools.python),
        ("makeblastdb", &tools.makeblastdb),
        ("blastn", &tools.blastn),
    ] {
        let resolved = match resolve_executable(program) {
            Ok(path) => Cell::new(path.display().to_string()).fg(Color::Green),
            Err(_) => {
                missing += 1;
                Cell::new("not found").fg(Color::Red)
            }
        };
        table.add_row(vec![Cell::new(name), Cell::new(program), resolved]);
    }

    let scripts = match &tools.ncov_dir {
        Some(dir) if dir.join("scripts").join("sanitize_metadata.py").is_file() => {
            Cell::new(dir.join("scripts").display().to_string()).fg(Color::Green)
        }
        Some(_) => Cell::new("scripts missing").fg(Color::Red),
        None => Cell::new("not configured"),
    };
    table.add_row(vec![
        Cell::new("ncov scripts"),
        Cell::new(
            tools
                .ncov_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        ),
        scripts,
    ]);

    println!("\nExternal Tools");
    println!("{}", table);
    if missing > 0 {
        println!(
            "\n{} tool(s) could not be resolved; set their paths in the [tools] config section",
            missing
        );
    }
    Ok(())
}
