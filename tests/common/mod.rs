//! Shared fixtures for the integration tests.
//!
//! Inputs are written in the raw submission layout (prefixed virus names,
//! a single `Location` field) so the full sanitize, index and filter path
//! is exercised with the built-in engine.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const FULL: &str = "ACGTACGTACGTACGTACGTACGT";
pub const MOSTLY_N: &str = "ACGTNNNNNNNNNNNNNNNNNNNN";

/// One raw metadata row.
pub struct Submission {
    pub name: &'static str,
    pub date: &'static str,
    pub location: &'static str,
    pub host: &'static str,
    pub lineage: &'static str,
    pub sequence: &'static str,
}

impl Submission {
    pub fn strain(&self) -> String {
        self.name.trim_start_matches("hCoV-19/").to_string()
    }
}

pub fn submissions() -> Vec<Submission> {
    vec![
        Submission {
            name: "hCoV-19/Brazil/SP-1/2021",
            date: "2021-02-01",
            location: "South America / Brazil / São Paulo",
            host: "Human",
            lineage: "P.1",
            sequence: FULL,
        },
        Submission {
            name: "hCoV-19/Brazil/SP-2/2021",
            date: "2021-03-05",
            location: "South America / Brazil / São Paulo",
            host: "Human",
            lineage: "P.1",
            sequence: FULL,
        },
        Submission {
            name: "hCoV-19/Brazil/SP-3/2021",
            date: "2021-03-07",
            location: "South America / Brazil / São Paulo",
            host: "Felis catus",
            lineage: "P.1",
            sequence: FULL,
        },
        Submission {
            name: "hCoV-19/Brazil/SP-4/2021",
            date: "2021-03-09",
            location: "South America / Brazil / São Paulo",
            host: "Human",
            lineage: "B.1.1.7",
            sequence: FULL,
        },
        Submission {
            name: "hCoV-19/Brazil/SP-5/2021",
            date: "2021-03-11",
            location: "South America / Brazil / São Paulo",
            host: "Human",
            lineage: "P.1",
            sequence: MOSTLY_N,
        },
        Submission {
            name: "hCoV-19/Brazil/RJ-1/2021",
            date: "2021-02-14",
            location: "South America / Brazil / Rio de Janeiro",
            host: "Human",
            lineage: "P.1",
            sequence: FULL,
        },
        Submission {
            name: "hCoV-19/Brazil/RJ-2/2020",
            date: "2020-03-01",
            location: "South America / Brazil / Rio de Janeiro",
            host: "Human",
            lineage: "B.1.1.28",
            sequence: FULL,
        },
        Submission {
            name: "hCoV-19/Chile/STG-1/2021",
            date: "2021-04-02",
            location: "South America / Chile / Santiago",
            host: "Human",
            lineage: "P.1",
            sequence: FULL,
        },
        Submission {
            name: "hCoV-19/Peru/LIM-1/2021",
            date: "2021-04-20",
            location: "South America / Peru / Lima",
            host: "Human",
            lineage: "P.1",
            sequence: FULL,
        },
    ]
}

/// Scratch directory holding raw inputs and the job output directory.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("out")).expect("Failed to create output dir");
        Self { dir }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path("out")
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        fs::write(&path, contents).expect("Failed to write fixture");
        path
    }

    /// Raw FASTA and metadata for `rows`, returned as (sequences, metadata).
    pub fn write_submissions(&self, rows: &[Submission]) -> (PathBuf, PathBuf) {
        let mut fasta = String::new();
        let mut tsv = String::from(
            "Virus name\tAccession ID\tCollection date\tLocation\tHost\tPango lineage\n",
        );
        for (i, row) in rows.iter().enumerate() {
            fasta.push_str(&format!(">{}\n{}\n", row.name, row.sequence));
            tsv.push_str(&format!(
                "{}\tEPI_ISL_{}\t{}\t{}\t{}\t{}\n",
                row.name,
                1000 + i,
                row.date,
                row.location,
                row.host,
                row.lineage
            ));
        }
        (
            self.write("raw_sequences.fasta", &fasta),
            self.write("raw_metadata.tsv", &tsv),
        )
    }
}

/// A subsampling schema over São Paulo (target) and Rio de Janeiro.
pub fn subsampling_schema_json(job_name: &str, countries: &str) -> String {
    format!(
        r#"{{
    "job_name": "{}",
    "min_date": "2021-01-01",
    "max_date": "2021-06-30",
    "min_genome_len": 20,
    "target_lineages": ["P.1"],
    "outgroup_lineages": ["B.1.1.28"],
    "states": [
        {{"name": "São Paulo", "sigla": "SP", "max_genomes": 100}},
        {{"name": "Rio de Janeiro", "sigla": "RJ", "max_genomes": 100}}
    ],
    "countries": {},
    "target_states": ["SP"]
}}"#,
        job_name, countries
    )
}

pub fn strain_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("Failed to read strain file")
        .lines()
        .map(str::to_string)
        .collect()
}
