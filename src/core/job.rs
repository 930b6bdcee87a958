/// Explicit per-job context. Built once at job start and passed by reference
/// to every component; nothing below the CLI reads global state.
use crate::tools::traits::InputPreparer;
use crate::{GistError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn check_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(GistError::Config(format!(
            "Input file not found: {}",
            path.display()
        )));
    }
    std::fs::File::open(path).map_err(|e| {
        GistError::Config(format!("Input file {} is not readable: {}", path.display(), e))
    })?;
    Ok(())
}

pub fn check_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(GistError::Config(format!(
            "Directory not found: {}",
            path.display()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct JobContext {
    job_dir: PathBuf,
    threads: usize,
}

impl JobContext {
    /// Create `<output_dir>/<job_name>`. The output directory itself must
    /// already exist; the job directory is created if absent and reused if
    /// present, so a rerun overwrites in place.
    pub fn create(output_dir: &Path, job_name: &str, threads: usize) -> Result<Self> {
        check_dir(output_dir)?;
        let job_dir = output_dir.join(job_name);
        if !job_dir.exists() {
            info!("Creating job directory {}", job_dir.display());
            std::fs::create_dir_all(&job_dir)?;
        }
        Ok(Self {
            job_dir,
            threads: crate::utils::parallel::resolve_threads(threads),
        })
    }

    pub fn job_dir(&self) -> &Path {
        &self.job_dir
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Path of a named artifact inside the job directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.job_dir.join(name)
    }
}

/// Sequence store, metadata table and optional sequence index that every
/// filtering step reads. Read-only once prepared.
#[derive(Debug, Clone)]
pub struct PreparedInputs {
    pub sequences: PathBuf,
    pub metadata: PathBuf,
    pub sequence_index: Option<PathBuf>,
}

impl PreparedInputs {
    /// Use the inputs as given, without sanitizing or indexing.
    pub fn raw(sequences: &Path, metadata: &Path) -> Self {
        Self {
            sequences: sequences.to_path_buf(),
            metadata: metadata.to_path_buf(),
            sequence_index: None,
        }
    }

    /// Use the inputs as given, but build a sequence index for them.
    pub fn indexed(
        ctx: &JobContext,
        preparer: &dyn InputPreparer,
        sequences: &Path,
        metadata: &Path,
    ) -> Result<Self> {
        let sequence_index = ctx.path("sequence_index.tsv.gz");
        info!("Indexing sequences without sanitizing");
        preparer.index_sequences(sequences, &sequence_index)?;
        Ok(Self {
            sequence_index: Some(sequence_index),
            ..Self::raw(sequences, metadata)
        })
    }

    /// Sanitize sequences and metadata into the job directory and index the
    /// sanitized sequences.
    pub fn prepare(
        ctx: &JobContext,
        preparer: &dyn InputPreparer,
        raw_sequences: &Path,
        raw_metadata: &Path,
    ) -> Result<Self> {
        let sequences = ctx.path("sequences.fasta.gz");
        let metadata = ctx.path("metadata.tsv.gz");
        let sequence_index = ctx.path("sequence_index.tsv.gz");

        info!("Sanitizing and indexing sequences");
        preparer.sanitize_sequences(raw_sequences, &sequences)?;
        preparer.index_sequences(&sequences, &sequence_index)?;

        info!("Sanitizing metadata");
        preparer.sanitize_metadata(raw_metadata, &metadata)?;

        Ok(Self {
            sequences,
            metadata,
            sequence_index: Some(sequence_index),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_job_dir() {
        let dir = TempDir::new().unwrap();
        let ctx = JobContext::create(dir.path(), "job1", 2).unwrap();
        assert!(dir.path().join("job1").is_dir());
        assert_eq!(ctx.threads(), 2);
        assert_eq!(ctx.path("a.txt"), dir.path().join("job1").join("a.txt"));

        // Reusing an existing job directory is allowed.
        assert!(JobContext::create(dir.path(), "job1", 1).is_ok());
    }

    #[test]
    fn test_missing_output_dir_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = JobContext::create(&dir.path().join("nope"), "job", 1).unwrap_err();
        assert!(matches!(err, GistError::Config(_)));
    }

    #[test]
    fn test_check_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x.fasta");
        std::fs::write(&file, ">a\nA\n").unwrap();
        assert!(check_file(&file).is_ok());
        assert!(check_file(dir.path()).is_err());
        assert!(check_file(&dir.path().join("missing")).is_err());
    }
}
