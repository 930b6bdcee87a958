pub mod bio;
pub mod cli;
pub mod core;
pub mod tools;
pub mod utils;

pub use crate::core::{
    planner::SubsamplingPlanner, ranker::SimilarityRanker, selector::RecordSelector,
};

use std::fmt;
use thiserror::Error;

/// A stratum task that did not complete, with enough context to rerun it.
#[derive(Debug, Clone)]
pub struct StratumFailure {
    pub kind: crate::core::stratum::StratumKind,
    pub sigla: String,
    pub message: String,
}

impl fmt::Display for StratumFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stratum '{}': {}", self.kind, self.sigla, self.message)
    }
}

#[derive(Error, Debug)]
pub enum GistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid tool request: {0}")]
    InvalidRequest(String),

    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("{tool} timed out after {seconds} seconds")]
    Timeout { tool: String, seconds: u64 },

    #[error("{} strata failed: {}", .0.len(), join_failures(.0))]
    StrataFailed(Vec<StratumFailure>),
}

fn join_failures(failures: &[StratumFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, GistError>;
