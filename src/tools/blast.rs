/// NCBI BLAST+ nucleotide search (`makeblastdb` + `blastn`)
use crate::bio::hits::HIT_COLUMNS;
use crate::core::config::ToolsConfig;
use crate::tools::process::{resolve_executable, ToolCommand};
use crate::tools::request::{DatabaseHandle, SearchRequest};
use crate::tools::traits::AlignmentEngine;
use crate::{GistError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub fn output_format() -> String {
    format!("6 {}", HIT_COLUMNS.join(" "))
}

pub struct BlastToolkit {
    makeblastdb: PathBuf,
    blastn: PathBuf,
    timeout: Duration,
}

impl BlastToolkit {
    pub fn from_config(tools: &ToolsConfig) -> Result<Self> {
        Ok(Self {
            makeblastdb: resolve_executable(&tools.makeblastdb)?,
            blastn: resolve_executable(&tools.blastn)?,
            timeout: Duration::from_secs(tools.timeout_secs),
        })
    }
}

pub fn makeblastdb_args(sequences: &Path, prefix: &Path) -> Vec<OsString> {
    vec![
        "-dbtype".into(),
        "nucl".into(),
        "-in".into(),
        sequences.into(),
        "-out".into(),
        prefix.into(),
    ]
}

pub fn blastn_args(request: &SearchRequest) -> Vec<OsString> {
    vec![
        "-query".into(),
        request.query.as_os_str().into(),
        "-db".into(),
        request.database.prefix.as_os_str().into(),
        "-out".into(),
        request.output.as_os_str().into(),
        "-outfmt".into(),
        output_format().into(),
        "-task".into(),
        request.task.as_str().into(),
        "-evalue".into(),
        request.evalue.to_string().into(),
        "-num_threads".into(),
        request.threads.to_string().into(),
    ]
}

impl AlignmentEngine for BlastToolkit {
    fn name(&self) -> &str {
        "blastn"
    }

    fn build_database(&self, sequences: &Path, prefix: &Path) -> Result<DatabaseHandle> {
        if crate::utils::io::is_gzipped(sequences) {
            return Err(GistError::InvalidRequest(format!(
                "makeblastdb cannot read compressed input {}",
                sequences.display()
            )));
        }
        if let Some(parent) = prefix.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("Building BLAST database from {}", sequences.display());
        ToolCommand::new("makeblastdb", &self.makeblastdb)
            .args(makeblastdb_args(sequences, prefix))
            .run(self.timeout)?;
        Ok(DatabaseHandle {
            prefix: prefix.to_path_buf(),
        })
    }

    fn search(&self, request: &SearchRequest) -> Result<()> {
        request.validate()?;
        info!(
            "Searching {} against {} ({})",
            request.query.display(),
            request.database.prefix.display(),
            request.task
        );
        ToolCommand::new("blastn", &self.blastn)
            .args(blastn_args(request))
            .run(self.timeout)
    }
}
