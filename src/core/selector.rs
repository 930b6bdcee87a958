/// Record selection: cut the sequence store and metadata table down to a
/// finalized identifier set.
use crate::bio::fasta::{open_fasta, write_record};
use crate::bio::metadata::select_rows;
use crate::utils::io::create_writer;
use crate::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// What a selection wrote. An empty selection is a valid result, reported
/// through `is_empty` rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionSummary {
    pub requested: usize,
    pub sequences: usize,
    pub metadata_rows: usize,
}

impl SelectionSummary {
    pub fn is_empty(&self) -> bool {
        self.sequences == 0 && self.metadata_rows == 0
    }

    /// Requested identifiers with no sequence record.
    pub fn missing_sequences(&self) -> usize {
        self.requested.saturating_sub(self.sequences)
    }
}

pub struct RecordSelector {
    strain_column: String,
}

impl RecordSelector {
    pub fn new(strain_column: &str) -> Self {
        Self {
            strain_column: strain_column.to_string(),
        }
    }

    /// Stream `sequences` once, keeping the first record for every requested
    /// identifier, then filter `metadata` on the strain column.
    pub fn select(
        &self,
        sequences: &Path,
        metadata: &Path,
        ids: &HashSet<String>,
        output_sequences: &Path,
        output_metadata: &Path,
    ) -> Result<SelectionSummary> {
        let mut writer = create_writer(output_sequences)?;
        let mut written = HashSet::with_capacity(ids.len());

        for record in open_fasta(sequences)? {
            let record = record?;
            if ids.contains(&record.id) && !written.contains(&record.id) {
                write_record(&mut writer, &record)?;
                written.insert(record.id);
            }
        }
        writer.finish()?;

        let metadata_rows = select_rows(metadata, output_metadata, &self.strain_column, ids)?;

        let summary = SelectionSummary {
            requested: ids.len(),
            sequences: written.len(),
            metadata_rows,
        };

        if summary.is_empty() {
            warn!(
                "No records matched the {} requested identifiers; wrote empty {}",
                ids.len(),
                output_sequences.display()
            );
        } else {
            info!(
                "Selected {} sequences and {} metadata rows ({} requested)",
                summary.sequences, summary.metadata_rows, summary.requested
            );
            if summary.missing_sequences() > 0 {
                warn!(
                    "{} requested identifiers have no sequence record",
                    summary.missing_sequences()
                );
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::fasta::parse_fasta;
    use std::fs;
    use tempfile::TempDir;

    fn inputs(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let sequences = dir.join("sequences.fasta");
        let metadata = dir.join("metadata.tsv");
        fs::write(&sequences, ">a\nACGT\n>b\nGGGG\n>a\nTTTT\n>c\nCCCC\n").unwrap();
        fs::write(&metadata, "strain\tcountry\na\tBrazil\nb\tChile\nc\tPeru\n").unwrap();
        (sequences, metadata)
    }

    #[test]
    fn test_selection_is_a_set_filter() {
        let dir = TempDir::new().unwrap();
        let (sequences, metadata) = inputs(dir.path());
        let ids: HashSet<String> = ["a", "c", "zz"].iter().map(|s| s.to_string()).collect();

        let out_seqs = dir.path().join("out.fasta");
        let out_meta = dir.path().join("out.tsv");
        let summary = RecordSelector::new("strain")
            .select(&sequences, &metadata, &ids, &out_seqs, &out_meta)
            .unwrap();

        assert_eq!(summary.sequences, 2);
        assert_eq!(summary.metadata_rows, 2);
        assert_eq!(summary.missing_sequences(), 1);

        let records = parse_fasta(&out_seqs).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        // First occurrence wins.
        assert_eq!(records[0].sequence, b"ACGT");
    }

    #[test]
    fn test_empty_selection_is_reported_not_failed() {
        let dir = TempDir::new().unwrap();
        let (sequences, metadata) = inputs(dir.path());
        let out_seqs = dir.path().join("out.fasta");
        let out_meta = dir.path().join("out.tsv");

        let summary = RecordSelector::new("strain")
            .select(&sequences, &metadata, &HashSet::new(), &out_seqs, &out_meta)
            .unwrap();
        assert!(summary.is_empty());
        assert!(out_seqs.exists());
        assert_eq!(fs::read_to_string(&out_meta).unwrap(), "strain\tcountry\n");
    }
}
