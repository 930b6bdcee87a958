/// Machine-readable summary written next to every job's outputs.
use crate::core::stratum::{StratumKind, StratumResult, StratumRole};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const REPORT_FILE: &str = "job_report.json";

#[derive(Debug, Clone, Serialize)]
pub struct StratumEntry {
    pub kind: StratumKind,
    pub sigla: String,
    pub role: StratumRole,
    pub count: usize,
    pub file: String,
}

impl From<&StratumResult> for StratumEntry {
    fn from(result: &StratumResult) -> Self {
        Self {
            kind: result.kind,
            sigla: result.sigla.clone(),
            role: result.role,
            count: result.count,
            file: result
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_name: String,
    pub job_kind: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: f64,
    pub strata: Vec<StratumEntry>,
    pub counts: BTreeMap<String, usize>,
    pub warnings: Vec<String>,
}

impl JobReport {
    pub fn start(job_name: &str, job_kind: &str) -> Self {
        Self {
            job_name: job_name.to_string(),
            job_kind: job_kind.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            elapsed_seconds: 0.0,
            strata: Vec::new(),
            counts: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_strata(mut self, strata: &[StratumResult]) -> Self {
        self.strata = strata.iter().map(StratumEntry::from).collect();
        self
    }

    pub fn count(mut self, name: &str, value: usize) -> Self {
        self.counts.insert(name.to_string(), value);
        self
    }

    pub fn with_warnings(mut self, warnings: &[String]) -> Self {
        self.warnings.extend(warnings.iter().cloned());
        self
    }

    pub fn finish(mut self) -> Self {
        let now = Utc::now();
        self.elapsed_seconds = (now - self.started_at).num_milliseconds() as f64 / 1000.0;
        self.finished_at = Some(now);
        self
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_report_json() {
        let dir = TempDir::new().unwrap();
        let strata = vec![StratumResult {
            kind: StratumKind::State,
            sigla: "SP".to_string(),
            role: StratumRole::Target,
            path: dir.path().join("state_SP_sub.txt"),
            count: 0,
        }];
        let report = JobReport::start("job", "subsample")
            .with_strata(&strata)
            .count("combined", 12)
            .with_warnings(&["state stratum 'SP' selected no genomes".to_string()])
            .finish();

        let path = dir.path().join(REPORT_FILE);
        report.write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["strata"][0]["kind"], "state");
        assert_eq!(value["strata"][0]["role"], "target");
        assert_eq!(value["strata"][0]["file"], "state_SP_sub.txt");
        assert_eq!(value["counts"]["combined"], 12);
        assert_eq!(value["warnings"].as_array().unwrap().len(), 1);
        assert!(value["finished_at"].is_string());
    }
}
