/// Job schemas. Both are parsed from JSON into raw shapes, validated once,
/// and handed out as immutable values for the rest of the job.
use crate::{GistError, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::OnceLock;

fn job_name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").ok()).as_ref()
}

fn validate_job_name(name: &str) -> Result<()> {
    if name == "." || name == ".." || !job_name_pattern().is_some_and(|re| re.is_match(name)) {
        return Err(GistError::Config(format!(
            "job_name {:?} must be a plain directory name (letters, digits, '.', '_', '-')",
            name
        )));
    }
    Ok(())
}

/// A named subgroup of the genome population with its own quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stratum {
    pub name: String,
    pub sigla: String,
    pub max_genomes: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStratum {
    name: String,
    sigla: String,
    max_genomes: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSubsamplingSchema {
    job_name: String,
    min_date: NaiveDate,
    max_date: NaiveDate,
    min_genome_len: i64,
    target_lineages: Vec<String>,
    outgroup_lineages: Vec<String>,
    states: Vec<RawStratum>,
    #[serde(default)]
    countries: Option<Vec<RawStratum>>,
    #[serde(default)]
    target_states: Vec<String>,
    #[serde(default)]
    home_country: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubsamplingSchema {
    pub job_name: String,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub min_genome_len: u32,
    pub target_lineages: BTreeSet<String>,
    pub outgroup_lineages: BTreeSet<String>,
    pub states: Vec<Stratum>,
    pub countries: Vec<Stratum>,
    pub target_states: BTreeSet<String>,
    /// Overrides the configured home country when present.
    pub home_country: Option<String>,
}

fn lineage_set(field: &str, lineages: Vec<String>) -> Result<BTreeSet<String>> {
    let mut set = BTreeSet::new();
    for lineage in lineages {
        let lineage = lineage.trim().to_string();
        if lineage.is_empty() {
            return Err(GistError::Config(format!("{} contains an empty lineage", field)));
        }
        set.insert(lineage);
    }
    if set.is_empty() {
        return Err(GistError::Config(format!("{} must not be empty", field)));
    }
    Ok(set)
}

fn strata(field: &str, raw: Vec<RawStratum>) -> Result<Vec<Stratum>> {
    let mut seen = HashSet::new();
    let mut strata = Vec::with_capacity(raw.len());

    for stratum in raw {
        if stratum.name.trim().is_empty() || stratum.sigla.trim().is_empty() {
            return Err(GistError::Config(format!(
                "{} entries need a non-empty name and sigla",
                field
            )));
        }
        if stratum.max_genomes <= 0 {
            return Err(GistError::Config(format!(
                "{} entry '{}' has max_genomes {}, expected a positive count",
                field, stratum.sigla, stratum.max_genomes
            )));
        }
        // The sigla names the stratum's output file.
        validate_job_name(&stratum.sigla).map_err(|_| {
            GistError::Config(format!(
                "{} sigla {:?} must contain only letters, digits, '.', '_' or '-'",
                field, stratum.sigla
            ))
        })?;
        if !seen.insert(stratum.sigla.clone()) {
            return Err(GistError::Config(format!(
                "{} sigla '{}' appears more than once",
                field, stratum.sigla
            )));
        }
        strata.push(Stratum {
            name: stratum.name,
            sigla: stratum.sigla,
            max_genomes: stratum.max_genomes as usize,
        });
    }

    Ok(strata)
}

impl SubsamplingSchema {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GistError::Config(format!("Cannot read schema {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let raw: RawSubsamplingSchema = serde_json::from_str(contents)
            .map_err(|e| GistError::Config(format!("Invalid subsampling schema: {}", e)))?;
        Self::validate(raw)
    }

    fn validate(raw: RawSubsamplingSchema) -> Result<Self> {
        validate_job_name(&raw.job_name)?;

        if raw.min_date > raw.max_date {
            return Err(GistError::Config(format!(
                "min_date {} is after max_date {}",
                raw.min_date, raw.max_date
            )));
        }
        if raw.min_genome_len <= 0 || raw.min_genome_len > u32::MAX as i64 {
            return Err(GistError::Config(format!(
                "min_genome_len must be a positive length, got {}",
                raw.min_genome_len
            )));
        }

        let states = strata("states", raw.states)?;
        let countries = strata("countries", raw.countries.unwrap_or_default())?;

        let target_states: BTreeSet<String> = raw.target_states.into_iter().collect();
        for sigla in &target_states {
            let matches = states.iter().filter(|s| &s.sigla == sigla).count();
            if matches != 1 {
                return Err(GistError::Config(format!(
                    "target_states entry '{}' does not match any states sigla",
                    sigla
                )));
            }
        }

        if let Some(home) = &raw.home_country {
            if home.trim().is_empty() {
                return Err(GistError::Config("home_country must not be empty".to_string()));
            }
        }

        Ok(Self {
            job_name: raw.job_name,
            min_date: raw.min_date,
            max_date: raw.max_date,
            min_genome_len: raw.min_genome_len as u32,
            target_lineages: lineage_set("target_lineages", raw.target_lineages)?,
            outgroup_lineages: lineage_set("outgroup_lineages", raw.outgroup_lineages)?,
            states,
            countries,
            target_states,
            home_country: raw.home_country,
        })
    }

    pub fn is_target(&self, sigla: &str) -> bool {
        self.target_states.contains(sigla)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSimilaritySchema {
    job_name: String,
    min_id: f64,
    max_id: f64,
    max_number_of_similar_genomes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilaritySchema {
    pub job_name: String,
    pub min_id: f64,
    pub max_id: f64,
    pub max_number_of_similar_genomes: usize,
}

impl SimilaritySchema {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GistError::Config(format!("Cannot read schema {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let raw: RawSimilaritySchema = serde_json::from_str(contents)
            .map_err(|e| GistError::Config(format!("Invalid similarity schema: {}", e)))?;

        validate_job_name(&raw.job_name)?;
        if !(0.0..=100.0).contains(&raw.min_id) || !(0.0..=100.0).contains(&raw.max_id) {
            return Err(GistError::Config(format!(
                "min_id and max_id must be within 0-100, got {} and {}",
                raw.min_id, raw.max_id
            )));
        }
        if raw.min_id > raw.max_id {
            return Err(GistError::Config(format!(
                "min_id {} is greater than max_id {}",
                raw.min_id, raw.max_id
            )));
        }
        if raw.max_number_of_similar_genomes <= 0 {
            return Err(GistError::Config(format!(
                "max_number_of_similar_genomes must be positive, got {}",
                raw.max_number_of_similar_genomes
            )));
        }

        Ok(Self {
            job_name: raw.job_name,
            min_id: raw.min_id,
            max_id: raw.max_id,
            max_number_of_similar_genomes: raw.max_number_of_similar_genomes as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const VALID: &str = r#"{
        "job_name": "p1_sp",
        "min_date": "2020-11-01",
        "max_date": "2021-06-30",
        "min_genome_len": 27000,
        "target_lineages": ["P.1", "P.1.1"],
        "outgroup_lineages": ["B.1.1.28"],
        "states": [
            {"name": "São Paulo", "sigla": "SP", "max_genomes": 100},
            {"name": "Amazonas", "sigla": "AM", "max_genomes": 50}
        ],
        "countries": [{"name": "Chile", "sigla": "CL", "max_genomes": 20}],
        "target_states": ["SP"]
    }"#;

    fn with(field: &str, value: &str) -> String {
        let mut json: serde_json::Value = serde_json::from_str(VALID).unwrap();
        json[field] = serde_json::from_str(value).unwrap();
        json.to_string()
    }

    #[test]
    fn test_valid_schema() {
        let schema = SubsamplingSchema::from_json(VALID).unwrap();
        assert_eq!(schema.job_name, "p1_sp");
        assert_eq!(schema.min_genome_len, 27000);
        assert_eq!(schema.states.len(), 2);
        assert_eq!(schema.countries[0].sigla, "CL");
        assert!(schema.is_target("SP"));
        assert!(!schema.is_target("AM"));
        assert!(schema.target_lineages.contains("P.1.1"));
    }

    #[test]
    fn test_countries_and_targets_are_optional() {
        let mut json: serde_json::Value = serde_json::from_str(VALID).unwrap();
        json.as_object_mut().unwrap().remove("countries");
        json.as_object_mut().unwrap().remove("target_states");

        let schema = SubsamplingSchema::from_json(&json.to_string()).unwrap();
        assert!(schema.countries.is_empty());
        assert!(schema.target_states.is_empty());
    }

    #[rstest]
    #[case("target_states", r#"["RJ"]"#, "does not match any states sigla")]
    #[case("min_date", r#""2021-07-01""#, "is after max_date")]
    #[case("min_genome_len", "0", "min_genome_len")]
    #[case("min_genome_len", "-5", "min_genome_len")]
    #[case("job_name", r#""../escape""#, "job_name")]
    #[case("target_lineages", "[]", "target_lineages must not be empty")]
    #[case(
        "states",
        r#"[{"name": "A", "sigla": "SP", "max_genomes": 1}, {"name": "B", "sigla": "SP", "max_genomes": 1}]"#,
        "appears more than once"
    )]
    #[case("states", r#"[{"name": "A", "sigla": "SP", "max_genomes": 0}]"#, "positive count")]
    #[case("max_date", r#""2021-13-01""#, "Invalid subsampling schema")]
    #[case("unexpected", "1", "unknown field")]
    fn test_invalid_subsampling_schema(
        #[case] field: &str,
        #[case] value: &str,
        #[case] expected: &str,
    ) {
        let err = SubsamplingSchema::from_json(&with(field, value)).unwrap_err();
        assert!(matches!(err, GistError::Config(_)));
        assert!(err.to_string().contains(expected), "{}", err);
    }

    #[test]
    fn test_similarity_schema() {
        let schema = SimilaritySchema::from_json(
            r#"{"job_name": "near_p1", "min_id": 95, "max_id": 100, "max_number_of_similar_genomes": 10}"#,
        )
        .unwrap();
        assert_eq!(schema.min_id, 95.0);
        assert_eq!(schema.max_number_of_similar_genomes, 10);
    }

    #[rstest]
    #[case(r#"{"job_name": "j", "min_id": 99, "max_id": 95, "max_number_of_similar_genomes": 10}"#)]
    #[case(r#"{"job_name": "j", "min_id": 95, "max_id": 101, "max_number_of_similar_genomes": 10}"#)]
    #[case(r#"{"job_name": "j", "min_id": 95, "max_id": 100, "max_number_of_similar_genomes": 0}"#)]
    #[case(r#"{"job_name": "j", "min_id": 95, "max_id": 100}"#)]
    fn test_invalid_similarity_schema(#[case] json: &str) {
        assert!(matches!(
            SimilaritySchema::from_json(json),
            Err(GistError::Config(_))
        ));
    }
}
