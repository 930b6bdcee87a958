use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tool configuration. Everything here has a working default, so a config
/// file only needs the keys a site wants to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub sanitize: SanitizeConfig,
    pub columns: ColumnConfig,
    pub subsampling: SubsamplingConfig,
    pub similarity: SimilarityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub augur: String,
    pub python: String,
    pub makeblastdb: String,
    pub blastn: String,
    /// Checkout of the ncov workflow; its `scripts/` directory holds the
    /// sanitizer scripts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ncov_dir: Option<PathBuf>,
    /// Wall-clock budget for a single external invocation.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeConfig {
    pub strip_prefixes: Vec<String>,
    pub metadata_id_columns: Vec<String>,
    pub database_id_columns: Vec<String>,
    pub location_field: String,
    /// `old=new` column renames applied by the metadata sanitizer.
    pub rename_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub strain: String,
    pub country: String,
    pub division: String,
    pub lineage: String,
    pub host: String,
    pub date: String,
    pub length: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsamplingConfig {
    pub home_country: String,
    pub host: String,
    pub outgroup_max_genomes: usize,
    pub group_by: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    pub task: String,
    pub evalue: f64,
    pub min_query_coverage: f64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            augur: "augur".to_string(),
            python: "python3".to_string(),
            makeblastdb: "makeblastdb".to_string(),
            blastn: "blastn".to_string(),
            ncov_dir: None,
            timeout_secs: 3600,
        }
    }
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            strip_prefixes: vec!["hCoV-19/".to_string(), "SARS-CoV-2/".to_string()],
            metadata_id_columns: vec![
                "strain".to_string(),
                "name".to_string(),
                "Virus name".to_string(),
            ],
            database_id_columns: vec![
                "Accession ID".to_string(),
                "gisaid_epi_isl".to_string(),
                "genbank_accession".to_string(),
            ],
            location_field: "Location".to_string(),
            rename_fields: [
                "Virus name=strain",
                "Type=type",
                "Accession ID=gisaid_epi_isl",
                "Collection date=date",
                "Sequence length=length",
                "Host=host",
                "Pango lineage=pango_lineage",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            strain: "strain".to_string(),
            country: "country".to_string(),
            division: "division".to_string(),
            lineage: "pango_lineage".to_string(),
            host: "host".to_string(),
            date: "date".to_string(),
            length: "length".to_string(),
        }
    }
}

impl Default for SubsamplingConfig {
    fn default() -> Self {
        Self {
            home_country: "Brazil".to_string(),
            host: "Human".to_string(),
            outgroup_max_genomes: 30,
            group_by: vec![
                "pango_lineage".to_string(),
                "year".to_string(),
                "month".to_string(),
            ],
        }
    }
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            task: "megablast".to_string(),
            evalue: 0.00001,
            min_query_coverage: 99.9,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.tools.timeout_secs == 0 {
            return Err(crate::GistError::Config(
                "tools.timeout_secs must be positive".to_string(),
            ));
        }
        if self.subsampling.outgroup_max_genomes == 0 {
            return Err(crate::GistError::Config(
                "subsampling.outgroup_max_genomes must be positive".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.similarity.min_query_coverage) {
            return Err(crate::GistError::Config(format!(
                "similarity.min_query_coverage must be within 0-100, got {}",
                self.similarity.min_query_coverage
            )));
        }
        if self.similarity.evalue <= 0.0 {
            return Err(crate::GistError::Config(
                "similarity.evalue must be positive".to_string(),
            ));
        }
        for rename in &self.sanitize.rename_fields {
            match rename.split_once('=') {
                Some((from, to)) if !from.is_empty() && !to.is_empty() => {}
                _ => {
                    return Err(crate::GistError::Config(format!(
                        "sanitize.rename_fields entry {:?} is not of the form old=new",
                        rename
                    )))
                }
            }
        }
        Ok(())
    }
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| crate::GistError::Config(format!("Failed to parse config: {}", e)))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<()> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| crate::GistError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gist.toml");
        std::fs::write(
            &path,
            "[tools]\naugur = \"/opt/augur/bin/augur\"\n\n[subsampling]\nhome_country = \"Chile\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.tools.augur, "/opt/augur/bin/augur");
        assert_eq!(config.tools.blastn, "blastn");
        assert_eq!(config.subsampling.home_country, "Chile");
        assert_eq!(config.subsampling.outgroup_max_genomes, 30);
        assert_eq!(config.columns.lineage, "pango_lineage");
    }

    #[test]
    fn test_saved_default_config_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gist.toml");
        save_config(&path, &default_config()).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.similarity.task, "megablast");
        assert_eq!(config.sanitize.strip_prefixes.len(), 2);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = default_config();
        config.tools.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = default_config();
        config.sanitize.rename_fields.push("broken".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("old=new"));
    }
}
