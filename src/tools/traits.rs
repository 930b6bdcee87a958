/// Trait definitions for the external collaborators
///
/// Each seam the pipelines depend on is a trait, so the augur/BLAST
/// implementations can be swapped for the in-process engine in tests.
use crate::tools::request::{DatabaseHandle, FilterRequest, SearchRequest};
use crate::Result;
use std::path::Path;

/// Sanitizes raw inputs and builds the sequence index.
pub trait InputPreparer: Send + Sync {
    /// Strip identifier prefixes and normalise the sequence store
    fn sanitize_sequences(&self, raw: &Path, output: &Path) -> Result<()>;

    /// Summarise every sequence (length and base composition) by identifier
    fn index_sequences(&self, sequences: &Path, output: &Path) -> Result<()>;

    /// Normalise id columns, split location fields and rename columns
    fn sanitize_metadata(&self, raw: &Path, output: &Path) -> Result<()>;
}

/// Executes date/length/lineage/group-size queries against a metadata +
/// sequence-index pair.
pub trait FilterEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Run one request. Implementations must call `request.validate()`
    /// before doing any work.
    fn filter(&self, request: &FilterRequest) -> Result<()>;
}

/// Pairwise local-alignment search.
pub trait AlignmentEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Build a searchable database from a nucleotide FASTA file
    fn build_database(&self, sequences: &Path, prefix: &Path) -> Result<DatabaseHandle>;

    /// Search queries against a database, writing tabular hit rows
    fn search(&self, request: &SearchRequest) -> Result<()>;
}
