//! Typed requests for the external collaborators. Every request is
//! validated before it is turned into a command line, and values reach the
//! tool as discrete arguments, never through a shell.

use crate::{GistError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn identifier_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
}

fn check_column(column: &str) -> Result<()> {
    if identifier_pattern().is_some_and(|re| re.is_match(column)) {
        Ok(())
    } else {
        Err(GistError::InvalidRequest(format!(
            "column name {:?} is not a plain identifier",
            column
        )))
    }
}

fn check_value(value: &str) -> Result<()> {
    if value.chars().any(|c| c.is_control()) {
        return Err(GistError::InvalidRequest(format!(
            "query value {:?} contains control characters",
            value
        )));
    }
    Ok(())
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// One predicate on a metadata column.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals { column: String, value: String },
    NotEquals { column: String, value: String },
    In { column: String, values: Vec<String> },
}

impl Condition {
    pub fn equals(column: &str, value: &str) -> Self {
        Condition::Equals {
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    pub fn not_equals(column: &str, value: &str) -> Self {
        Condition::NotEquals {
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    pub fn one_of<'a, I>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        Condition::In {
            column: column.to_string(),
            values: values.into_iter().cloned().collect(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Condition::Equals { column, .. }
            | Condition::NotEquals { column, .. }
            | Condition::In { column, .. } => column,
        }
    }

    fn validate(&self) -> Result<()> {
        check_column(self.column())?;
        match self {
            Condition::Equals { value, .. } | Condition::NotEquals { value, .. } => {
                check_value(value)
            }
            Condition::In { values, .. } => {
                if values.is_empty() {
                    return Err(GistError::InvalidRequest(format!(
                        "membership test on '{}' has no values",
                        self.column()
                    )));
                }
                values.iter().try_for_each(|v| check_value(v))
            }
        }
    }

    /// Evaluate against a row's value for this column (`None` = missing).
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Condition::Equals { value: expected, .. } => value == Some(expected.as_str()),
            Condition::NotEquals { value: expected, .. } => value != Some(expected.as_str()),
            Condition::In { values, .. } => {
                value.is_some_and(|v| values.iter().any(|candidate| candidate == v))
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equals { column, value } => write!(f, "({} == {})", column, quote(value)),
            Condition::NotEquals { column, value } => {
                write!(f, "({} != {})", column, quote(value))
            }
            Condition::In { column, values } => {
                let list: Vec<String> = values.iter().map(|v| quote(v)).collect();
                write!(f, "({} in [{}])", column, list.join(", "))
            }
        }
    }
}

/// Conjunction of conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: Vec<Condition>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn validate(&self) -> Result<()> {
        if self.conditions.is_empty() {
            return Err(GistError::InvalidRequest("query has no conditions".to_string()));
        }
        self.conditions.iter().try_for_each(Condition::validate)
    }

    /// Render in the pandas query dialect the filtering engine accepts.
    pub fn render(&self) -> String {
        self.conditions
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" & ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutput {
    /// Write only the selected strain identifiers.
    Strains(PathBuf),
    /// Write the selected metadata rows and sequences.
    Records { metadata: PathBuf, sequences: PathBuf },
}

/// One invocation of the filtering engine.
#[derive(Debug, Clone)]
pub struct FilterRequest {
    pub metadata: PathBuf,
    pub sequence_index: Option<PathBuf>,
    pub sequences: Option<PathBuf>,
    pub query: Option<Query>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub min_length: Option<u32>,
    pub group_by: Vec<String>,
    pub max_sequences: Option<usize>,
    pub exclude: Vec<PathBuf>,
    pub include: Vec<PathBuf>,
    pub exclude_all: bool,
    pub exclude_ambiguous_dates: bool,
    pub output: FilterOutput,
}

impl FilterRequest {
    /// Predicate mode: select strains matching a query, writing an id list.
    pub fn select(metadata: &Path, sequence_index: Option<&Path>, output: &Path) -> Self {
        Self {
            metadata: metadata.to_path_buf(),
            sequence_index: sequence_index.map(Path::to_path_buf),
            sequences: None,
            query: None,
            min_date: None,
            max_date: None,
            min_length: None,
            group_by: Vec::new(),
            max_sequences: None,
            exclude: Vec::new(),
            include: Vec::new(),
            exclude_all: false,
            exclude_ambiguous_dates: true,
            output: FilterOutput::Strains(output.to_path_buf()),
        }
    }

    /// Id-list mode: write exactly the strains listed in `include`.
    pub fn materialize(
        metadata: &Path,
        sequence_index: Option<&Path>,
        sequences: &Path,
        include: &Path,
        output_metadata: &Path,
        output_sequences: &Path,
    ) -> Self {
        Self {
            sequences: Some(sequences.to_path_buf()),
            include: vec![include.to_path_buf()],
            exclude_all: true,
            exclude_ambiguous_dates: false,
            output: FilterOutput::Records {
                metadata: output_metadata.to_path_buf(),
                sequences: output_sequences.to_path_buf(),
            },
            ..Self::select(metadata, sequence_index, output_metadata)
        }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_dates(mut self, min_date: Option<NaiveDate>, max_date: Option<NaiveDate>) -> Self {
        self.min_date = min_date;
        self.max_date = max_date;
        self
    }

    pub fn with_min_length(mut self, min_length: u32) -> Self {
        self.min_length = Some(min_length);
        self
    }

    pub fn with_cap(mut self, max_sequences: usize, group_by: &[String]) -> Self {
        self.max_sequences = Some(max_sequences);
        self.group_by = group_by.to_vec();
        self
    }

    pub fn with_exclude(mut self, path: &Path) -> Self {
        self.exclude.push(path.to_path_buf());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(query) = &self.query {
            query.validate()?;
        }
        if let (Some(min), Some(max)) = (self.min_date, self.max_date) {
            if min > max {
                return Err(GistError::InvalidRequest(format!(
                    "min date {} is after max date {}",
                    min, max
                )));
            }
        }
        if self.max_sequences == Some(0) {
            return Err(GistError::InvalidRequest(
                "max sequences must be positive".to_string(),
            ));
        }
        if !self.group_by.is_empty() && self.max_sequences.is_none() {
            return Err(GistError::InvalidRequest(
                "grouping needs a maximum sequence count".to_string(),
            ));
        }
        self.group_by.iter().try_for_each(|c| check_column(c))?;
        if self.exclude_all && self.include.is_empty() {
            return Err(GistError::InvalidRequest(
                "exclude-all without an include list selects nothing".to_string(),
            ));
        }
        if let FilterOutput::Records { .. } = self.output {
            if self.sequences.is_none() {
                return Err(GistError::InvalidRequest(
                    "record output needs a sequence store".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A searchable alignment database built from a sequence file.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseHandle {
    pub prefix: PathBuf,
}

/// One invocation of the alignment search engine.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: PathBuf,
    pub database: DatabaseHandle,
    pub output: PathBuf,
    pub task: String,
    pub evalue: f64,
    pub threads: usize,
}

impl SearchRequest {
    pub fn validate(&self) -> Result<()> {
        let task_chars_ok = self
            .task
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if self.task.is_empty() || !task_chars_ok {
            return Err(GistError::InvalidRequest(format!(
                "search task {:?} is not a valid task name",
                self.task
            )));
        }
        if !(self.evalue > 0.0) {
            return Err(GistError::InvalidRequest(format!(
                "e-value cutoff must be positive, got {}",
                self.evalue
            )));
        }
        if self.threads == 0 {
            return Err(GistError::InvalidRequest("search needs at least one thread".to_string()));
        }
        Ok(())
    }
}
