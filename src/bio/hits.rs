/// Pairwise alignment hits in BLAST tabular form
/// (`6 qseqid sseqid pident evalue bitscore qcovhsp`).
use crate::{GistError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Columns requested from the search engine, in order.
pub const HIT_COLUMNS: [&str; 6] = ["qseqid", "sseqid", "pident", "evalue", "bitscore", "qcovhsp"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentHit {
    pub query_id: String,
    pub matched_id: String,
    pub percent_identity: f64,
    pub e_value: f64,
    pub bit_score: f64,
    pub query_coverage: f64,
}

fn parse_field(field: &str, name: &str, line_no: usize) -> Result<f64> {
    field.trim().parse().map_err(|_| {
        GistError::Parse(format!(
            "Invalid {} value {:?} at hit line {}",
            name, field, line_no
        ))
    })
}

pub fn parse_hit_line(line: &str, line_no: usize) -> Result<AlignmentHit> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < HIT_COLUMNS.len() {
        return Err(GistError::Parse(format!(
            "Expected {} columns at hit line {}, found {}",
            HIT_COLUMNS.len(),
            line_no,
            parts.len()
        )));
    }

    Ok(AlignmentHit {
        query_id: parts[0].to_string(),
        matched_id: parts[1].to_string(),
        percent_identity: parse_field(parts[2], "pident", line_no)?,
        e_value: parse_field(parts[3], "evalue", line_no)?,
        bit_score: parse_field(parts[4], "bitscore", line_no)?,
        query_coverage: parse_field(parts[5], "qcovhsp", line_no)?,
    })
}

/// Read every hit, preserving the engine's row order.
pub fn read_hits(path: &Path) -> Result<Vec<AlignmentHit>> {
    let reader = BufReader::new(File::open(path)?);
    let mut hits = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        hits.push(parse_hit_line(&line, idx + 1)?);
    }

    Ok(hits)
}
