//! Similarity ranking and record selection through the public API.
mod common;

use common::{strain_lines, Workspace};
use gist::bio::fasta::parse_fasta;
use gist::bio::hits::AlignmentHit;
use gist::bio::metadata::MetadataTable;
use gist::core::config::Config;
use gist::core::job::JobContext;
use gist::core::schema::SimilaritySchema;
use gist::core::similar::{SimilaritySearch, HITS_FILE, SIMILAR_SEQUENCES, SIMILAR_STRAINS};
use gist::tools::request::{DatabaseHandle, SearchRequest};
use gist::tools::traits::AlignmentEngine;
use gist::{RecordSelector, SimilarityRanker};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

fn hit(matched: &str, pident: f64, qcov: f64, bitscore: f64) -> AlignmentHit {
    AlignmentHit {
        query_id: "query".to_string(),
        matched_id: matched.to_string(),
        percent_identity: pident,
        e_value: 0.0,
        bit_score: bitscore,
        query_coverage: qcov,
    }
}

fn schema(min_id: f64, max_id: f64, max: usize) -> SimilaritySchema {
    SimilaritySchema::from_json(&format!(
        r#"{{"job_name": "near", "min_id": {}, "max_id": {}, "max_number_of_similar_genomes": {}}}"#,
        min_id, max_id, max
    ))
    .unwrap()
}

#[test]
fn test_duplicate_and_out_of_range_hits_dropped() {
    let hits = vec![
        hit("A", 99.95, 100.0, 500.0),
        hit("A", 99.95, 100.0, 300.0),
        hit("B", 80.0, 100.0, 400.0),
    ];
    let ranked = SimilarityRanker::new(&schema(95.0, 100.0, 10)).rank(&hits);
    assert_eq!(ranked, vec!["A".to_string()]);
}

#[rstest]
#[case(1, vec!["C"])]
#[case(2, vec!["C", "A"])]
#[case(10, vec!["C", "A", "B"])]
fn test_rank_cap(#[case] max: usize, #[case] expected: Vec<&str>) {
    let hits = vec![
        hit("A", 99.0, 100.0, 450.0),
        hit("B", 98.0, 100.0, 410.0),
        hit("C", 99.5, 100.0, 480.0),
    ];
    let ranked = SimilarityRanker::new(&schema(95.0, 100.0, max)).rank(&hits);
    assert_eq!(ranked, expected);
}

#[test]
fn test_record_selector_is_set_filter() {
    let ws = Workspace::new();
    let sequences = ws.write("seqs.fasta", ">a\nACGT\n>b\nGGGG\n>c\nCCCC\n>a\nTTTT\n");
    let metadata = ws.write("meta.tsv", "strain\tcountry\na\tBrazil\nb\tChile\nc\tPeru\n");
    let ids: HashSet<String> = ["a", "c", "zz"].iter().map(|s| s.to_string()).collect();

    let summary = RecordSelector::new("strain")
        .select(
            &sequences,
            &metadata,
            &ids,
            &ws.path("out.fasta"),
            &ws.path("out.tsv"),
        )
        .unwrap();

    let written: Vec<String> = parse_fasta(ws.path("out.fasta"))
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(written, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(summary.sequences, 2);
    assert_eq!(summary.metadata_rows, 2);
    assert_eq!(summary.missing_sequences(), 1);
    assert_eq!(MetadataTable::read(&ws.path("out.tsv")).unwrap().len(), 2);
}

/// Writes a fixed hit table instead of running BLAST.
struct FixedHits(&'static str);

impl AlignmentEngine for FixedHits {
    fn name(&self) -> &str {
        "fixed"
    }

    fn build_database(&self, _sequences: &Path, prefix: &Path) -> gist::Result<DatabaseHandle> {
        Ok(DatabaseHandle {
            prefix: prefix.to_path_buf(),
        })
    }

    fn search(&self, request: &SearchRequest) -> gist::Result<()> {
        request.validate()?;
        fs::write(&request.output, self.0)?;
        Ok(())
    }
}

#[test]
fn test_similarity_job_outputs() {
    let ws = Workspace::new();
    let query = ws.write("query.fasta", ">q1\nACGTACGT\n");
    let sequences = ws.write(
        "db.fasta",
        ">Brazil/SP-1/2021\nACGTACGT\n>Brazil/RJ-1/2021\nACGTACGA\n>Chile/STG-1/2021\nTTTTACGT\n",
    );
    let metadata = ws.write(
        "db.tsv",
        "strain\tcountry\nBrazil/SP-1/2021\tBrazil\nBrazil/RJ-1/2021\tBrazil\nChile/STG-1/2021\tChile\n",
    );
    let engine = FixedHits(
        "q1\tBrazil/RJ-1/2021\t99.9\t0.0\t300\t100\n\
         q1\tBrazil/SP-1/2021\t100.0\t0.0\t320\t100\n\
         q1\tChile/STG-1/2021\t62.0\t1e-3\t90\t100\n",
    );

    let schema = schema(99.0, 100.0, 5);
    let config = Config::default();
    let ctx = JobContext::create(&ws.output_dir(), &schema.job_name, 1).unwrap();
    let outcome = SimilaritySearch::new(&ctx, &engine, &config)
        .run(&query, &sequences, &metadata, &schema)
        .unwrap();

    assert_eq!(outcome.hits, 3);
    assert_eq!(
        strain_lines(&ctx.path(SIMILAR_STRAINS)),
        vec!["Brazil/SP-1/2021".to_string(), "Brazil/RJ-1/2021".to_string()]
    );
    assert!(ctx.path(HITS_FILE).exists());
    let written: Vec<String> = parse_fasta(ctx.path(SIMILAR_SEQUENCES))
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(written, vec!["Brazil/SP-1/2021".to_string(), "Brazil/RJ-1/2021".to_string()]);
    assert!(outcome.warnings.is_empty());
}
