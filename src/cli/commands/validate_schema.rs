use crate::cli::formatter::{info_box, print_success};
use crate::core::job::check_file;
use crate::core::schema::{SimilaritySchema, SubsamplingSchema};
use crate::Result;
use clap::{Args, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SchemaKind {
    Subsampling,
    Similarity,
}

#[derive(Args, Debug)]
pub struct ValidateSchemaArgs {
    /// Schema file (JSON)
    #[arg(value_name = "FILE")]
    pub schema: PathBuf,

    /// Which kind of schema the file holds
    #[arg(short, long, value_enum, default_value = "subsampling")]
    pub kind: SchemaKind,
}

pub fn describe(args: &ValidateSchemaArgs) -> Result<Vec<String>> {
    check_file(&args.schema)?;
    let lines = match args.kind {
        SchemaKind::Subsampling => {
            let schema = SubsamplingSchema::load(&args.schema)?;
            let targets: Vec<&str> = schema.target_states.iter().map(String::as_str).collect();
            vec![
                format!("Job: {}", schema.job_name),
                format!("Window: {} to {}", schema.min_date, schema.max_date),
                format!("Minimum genome length: {}", schema.min_genome_len),
                format!("State strata: {}", schema.states.len()),
                format!("Country strata: {}", schema.countries.len()),
                format!(
                    "Target states: {}",
                    if targets.is_empty() {
                        "none".to_string()
                    } else {
                        targets.join(", ")
                    }
                ),
            ]
        }
        SchemaKind::Similarity => {
            let schema = SimilaritySchema::load(&args.schema)?;
            vec![
                format!("Job: {}", schema.job_name),
                format!("Identity: {} to {}", schema.min_id, schema.max_id),
                format!("Maximum genomes: {}", schema.max_number_of_similar_genomes),
            ]
        }
    };
    Ok(lines)
}

pub fn run(args: ValidateSchemaArgs) -> anyhow::Result<()> {
    let lines = describe(&args)?;
    let items: Vec<&str> = lines.iter().map(String::as_str).collect();
    info_box(&format!("{}", args.schema.display()), &items);
    print_success("Schema is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_describe_similarity_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("similar.json");
        std::fs::write(
            &path,
            r#"{"job_name": "near", "min_id": 97.5, "max_id": 100, "max_number_of_similar_genomes": 3}"#,
        )
        .unwrap();

        let lines = describe(&ValidateSchemaArgs {
            schema: path,
            kind: SchemaKind::Similarity,
        })
        .unwrap();
        assert_eq!(lines[1], "Identity: 97.5 to 100");
    }

    #[test]
    fn test_wrong_kind_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("similar.json");
        std::fs::write(
            &path,
            r#"{"job_name": "near", "min_id": 97.5, "max_id": 100, "max_number_of_similar_genomes": 3}"#,
        )
        .unwrap();

        let err = describe(&ValidateSchemaArgs {
            schema: path,
            kind: SchemaKind::Subsampling,
        })
        .unwrap_err();
        assert!(matches!(err, crate::GistError::Config(_)));
    }
}
