/// Augur and ncov-workflow backed preparation and filtering
use crate::core::config::{SanitizeConfig, ToolsConfig};
use crate::tools::process::{resolve_executable, ToolCommand};
use crate::tools::request::{FilterOutput, FilterRequest};
use crate::tools::traits::{FilterEngine, InputPreparer};
use crate::{GistError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct AugurToolkit {
    augur: PathBuf,
    python: Option<PathBuf>,
    scripts_dir: Option<PathBuf>,
    sanitize: SanitizeConfig,
    timeout: Duration,
}

impl AugurToolkit {
    /// Resolve every executable up front. The Python interpreter and the
    /// ncov scripts are only required when an ncov checkout is configured.
    pub fn from_config(tools: &ToolsConfig, sanitize: &SanitizeConfig) -> Result<Self> {
        let augur = resolve_executable(&tools.augur)?;

        let (python, scripts_dir) = match &tools.ncov_dir {
            Some(ncov_dir) => {
                let scripts = ncov_dir.join("scripts");
                for script in ["sanitize_sequences.py", "sanitize_metadata.py"] {
                    if !scripts.join(script).is_file() {
                        return Err(GistError::Config(format!(
                            "{} not found in {}",
                            script,
                            scripts.display()
                        )));
                    }
                }
                (Some(resolve_executable(&tools.python)?), Some(scripts))
            }
            None => (None, None),
        };

        Ok(Self {
            augur,
            python,
            scripts_dir,
            sanitize: sanitize.clone(),
            timeout: Duration::from_secs(tools.timeout_secs),
        })
    }

    pub fn can_sanitize(&self) -> bool {
        self.scripts_dir.is_some()
    }

    fn script(&self, name: &str) -> Result<ToolCommand> {
        match (&self.python, &self.scripts_dir) {
            (Some(python), Some(scripts)) => {
                Ok(ToolCommand::new(name, python).arg(scripts.join(name)))
            }
            _ => Err(GistError::Config(format!(
                "{} needs an ncov checkout; set tools.ncov_dir or pass --ncov-dir",
                name
            ))),
        }
    }
}

/// Arguments for `sanitize_sequences.py`.
pub fn sanitize_sequences_args(
    config: &SanitizeConfig,
    raw: &Path,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--sequences".into(), raw.into()];
    if !config.strip_prefixes.is_empty() {
        args.push("--strip-prefixes".into());
        args.extend(config.strip_prefixes.iter().map(OsString::from));
    }
    args.push("--output".into());
    args.push(output.into());
    args
}

/// Arguments for `sanitize_metadata.py`.
pub fn sanitize_metadata_args(config: &SanitizeConfig, raw: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--metadata".into(), raw.into()];

    let mut list = |flag: &str, values: &[String]| {
        if !values.is_empty() {
            args.push(flag.into());
            args.extend(values.iter().map(OsString::from));
        }
    };
    list("--metadata-id-columns", &config.metadata_id_columns);
    list("--database-id-columns", &config.database_id_columns);
    list("--rename-fields", &config.rename_fields);
    list("--strip-prefixes", &config.strip_prefixes);

    if !config.location_field.is_empty() {
        args.push("--parse-location-field".into());
        args.push(config.location_field.as_str().into());
    }
    args.push("--output".into());
    args.push(output.into());
    args
}

/// Arguments for `augur filter`, starting after the subcommand.
pub fn filter_args(request: &FilterRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--metadata".into(), request.metadata.as_os_str().into()];

    if let Some(index) = &request.sequence_index {
        args.push("--sequence-index".into());
        args.push(index.into());
    }
    if let Some(sequences) = &request.sequences {
        args.push("--sequences".into());
        args.push(sequences.into());
    }
    if let Some(date) = request.min_date {
        args.push("--min-date".into());
        args.push(date.format("%Y-%m-%d").to_string().into());
    }
    if let Some(date) = request.max_date {
        args.push("--max-date".into());
        args.push(date.format("%Y-%m-%d").to_string().into());
    }
    if let Some(length) = request.min_length {
        args.push("--min-length".into());
        args.push(length.to_string().into());
    }
    if !request.exclude.is_empty() {
        args.push("--exclude".into());
        args.extend(request.exclude.iter().map(OsString::from));
    }
    if request.exclude_all {
        args.push("--exclude-all".into());
    }
    if !request.include.is_empty() {
        args.push("--include".into());
        args.extend(request.include.iter().map(OsString::from));
    }
    if let Some(query) = &request.query {
        args.push("--query".into());
        args.push(query.render().into());
    }
    if let Some(max) = request.max_sequences {
        args.push("--subsample-max-sequences".into());
        args.push(max.to_string().into());
    }
    if request.exclude_ambiguous_dates {
        args.push("--exclude-ambiguous-dates-by".into());
        args.push("any".into());
    }
    if !request.group_by.is_empty() {
        args.push("--group-by".into());
        args.extend(request.group_by.iter().map(OsString::from));
    }

    match &request.output {
        FilterOutput::Strains(path) => {
            args.push("--output-strains".into());
            args.push(path.into());
        }
        FilterOutput::Records { metadata, sequences } => {
            args.push("--output-metadata".into());
            args.push(metadata.into());
            args.push("--output-sequences".into());
            args.push(sequences.into());
        }
    }
    args
}

impl InputPreparer for AugurToolkit {
    fn sanitize_sequences(&self, raw: &Path, output: &Path) -> Result<()> {
        info!("Sanitizing sequences from {}", raw.display());
        self.script("sanitize_sequences.py")?
            .args(sanitize_sequences_args(&self.sanitize, raw, output))
            .run(self.timeout)
    }

    fn index_sequences(&self, sequences: &Path, output: &Path) -> Result<()> {
        info!("Indexing {}", sequences.display());
        ToolCommand::new("augur index", &self.augur)
            .arg("index")
            .opt("--sequences", sequences)
            .opt("--output", output)
            .run(self.timeout)
    }

    fn sanitize_metadata(&self, raw: &Path, output: &Path) -> Result<()> {
        info!("Sanitizing metadata from {}", raw.display());
        self.script("sanitize_metadata.py")?
            .args(sanitize_metadata_args(&self.sanitize, raw, output))
            .run(self.timeout)
    }
}

impl FilterEngine for AugurToolkit {
    fn name(&self) -> &str {
        "augur"
    }

    fn filter(&self, request: &FilterRequest) -> Result<()> {
        request.validate()?;
        ToolCommand::new("augur filter", &self.augur)
            .arg("filter")
            .args(filter_args(request))
            .run(self.timeout)
    }
}
