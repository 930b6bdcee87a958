//! Per-stratum filtering.
//!
//! Every stratum turns into exactly one filtering-engine request and one
//! uniquely named identifier file inside the job directory.

use crate::bio::strains::{read_strains, StrainSet};
use crate::core::config::Config;
use crate::core::job::{JobContext, PreparedInputs};
use crate::core::schema::{Stratum, SubsamplingSchema};
use crate::tools::request::{Condition, FilterOutput, FilterRequest, Query};
use crate::tools::traits::FilterEngine;
use crate::{GistError, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StratumKind {
    State,
    Country,
    Outgroup,
    Complement,
}

impl fmt::Display for StratumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StratumKind::State => write!(f, "state"),
            StratumKind::Country => write!(f, "country"),
            StratumKind::Outgroup => write!(f, "outgroup"),
            StratumKind::Complement => write!(f, "background complement"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StratumRole {
    Target,
    Background,
}

/// One stratum's selection. The identifier file always exists once a
/// result has been produced, even when it is empty.
#[derive(Debug, Clone, Serialize)]
pub struct StratumResult {
    pub kind: StratumKind,
    pub sigla: String,
    pub role: StratumRole,
    pub path: PathBuf,
    pub count: usize,
}

impl StratumResult {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn strains(&self) -> Result<StrainSet> {
        read_strains(&self.path)
    }
}

/// Identifier used for the single outgroup stratum.
pub const OUTGROUP_SIGLA: &str = "outgroup";
/// Identifier used for the rest-of-world background.
pub const COMPLEMENT_SIGLA: &str = "complement";

pub fn output_name(kind: StratumKind, sigla: &str) -> String {
    match kind {
        StratumKind::State => format!("state_{}_sub.txt", sigla),
        StratumKind::Country => format!("country_{}_sub.txt", sigla),
        StratumKind::Outgroup => "outgroup_sub.txt".to_string(),
        StratumKind::Complement => "background_complement_sub.txt".to_string(),
    }
}

fn required(kind: StratumKind, stratum: Option<&Stratum>) -> Result<&Stratum> {
    stratum.ok_or_else(|| GistError::InvalidRequest(format!("{} filter needs a stratum", kind)))
}

/// Builds and runs stratum requests against shared, read-only inputs.
pub struct StratumFilter<'a> {
    ctx: &'a JobContext,
    engine: &'a dyn FilterEngine,
    inputs: &'a PreparedInputs,
    schema: &'a SubsamplingSchema,
    config: &'a Config,
}

impl<'a> StratumFilter<'a> {
    pub fn new(
        ctx: &'a JobContext,
        engine: &'a dyn FilterEngine,
        inputs: &'a PreparedInputs,
        schema: &'a SubsamplingSchema,
        config: &'a Config,
    ) -> Self {
        Self {
            ctx,
            engine,
            inputs,
            schema,
            config,
        }
    }

    pub fn ctx(&self) -> &JobContext {
        self.ctx
    }

    pub fn engine(&self) -> &dyn FilterEngine {
        self.engine
    }

    pub fn home_country(&self) -> &str {
        self.schema
            .home_country
            .as_deref()
            .unwrap_or(&self.config.subsampling.home_country)
    }

    fn base(&self, output: &Path) -> FilterRequest {
        FilterRequest::select(
            &self.inputs.metadata,
            self.inputs.sequence_index.as_deref(),
            output,
        )
        .with_min_length(self.schema.min_genome_len)
    }

    fn target_lineages(&self) -> Condition {
        Condition::one_of(&self.config.columns.lineage, &self.schema.target_lineages)
    }

    fn human_host(&self) -> Condition {
        Condition::equals(&self.config.columns.host, &self.config.subsampling.host)
    }

    /// The request for one stratum. `stratum` is required for state and
    /// country strata and ignored for the outgroup.
    pub fn request(
        &self,
        kind: StratumKind,
        stratum: Option<&Stratum>,
    ) -> Result<FilterRequest> {
        let columns = &self.config.columns;
        let window = (Some(self.schema.min_date), Some(self.schema.max_date));
        let group_by = &self.config.subsampling.group_by;

        let request = match kind {
            StratumKind::State => {
                let stratum = required(kind, stratum)?;
                let query = Query::new()
                    .and(Condition::equals(&columns.country, self.home_country()))
                    .and(Condition::equals(&columns.division, &stratum.name))
                    .and(self.target_lineages())
                    .and(self.human_host());
                self.base(&self.ctx.path(&output_name(kind, &stratum.sigla)))
                    .with_query(query)
                    .with_dates(window.0, window.1)
                    .with_cap(stratum.max_genomes, group_by)
            }
            StratumKind::Country => {
                let stratum = required(kind, stratum)?;
                let query = Query::new()
                    .and(Condition::equals(&columns.country, &stratum.name))
                    .and(self.target_lineages())
                    .and(self.human_host());
                self.base(&self.ctx.path(&output_name(kind, &stratum.sigla)))
                    .with_query(query)
                    .with_dates(window.0, window.1)
                    .with_cap(stratum.max_genomes, group_by)
            }
            StratumKind::Outgroup => {
                let query = Query::new()
                    .and(Condition::one_of(&columns.lineage, &self.schema.outgroup_lineages))
                    .and(self.human_host());
                // Outgroup genomes predate the study window.
                self.base(&self.ctx.path(&output_name(kind, OUTGROUP_SIGLA)))
                    .with_query(query)
                    .with_dates(None, Some(self.schema.min_date))
                    .with_cap(self.config.subsampling.outgroup_max_genomes, group_by)
            }
            StratumKind::Complement => {
                let query = Query::new()
                    .and(Condition::not_equals(&columns.country, self.home_country()))
                    .and(self.target_lineages())
                    .and(self.human_host());
                self.base(&self.ctx.path(&output_name(kind, COMPLEMENT_SIGLA)))
                    .with_query(query)
                    .with_dates(window.0, window.1)
            }
        };
        Ok(request)
    }

    /// Run one request and collect its identifier file into a result.
    pub fn execute(
        &self,
        kind: StratumKind,
        sigla: &str,
        role: StratumRole,
        request: &FilterRequest,
    ) -> Result<StratumResult> {
        let path = match &request.output {
            FilterOutput::Strains(path) => path.clone(),
            FilterOutput::Records { .. } => {
                return Err(GistError::InvalidRequest(format!(
                    "{} stratum '{}' must write a strain list",
                    kind, sigla
                )))
            }
        };

        debug!("Filtering {} stratum '{}' with {}", kind, sigla, self.engine.name());
        self.engine.filter(request)?;

        // Downstream unions and exclude lists need the file even when the
        // engine selected nothing.
        if !path.exists() {
            std::fs::File::create(&path)?;
        }
        let count = read_strains(&path)?.len();
        if count == 0 {
            warn!("{} stratum '{}' selected no genomes", kind, sigla);
        } else {
            debug!("{} stratum '{}' selected {} genomes", kind, sigla, count);
        }

        Ok(StratumResult {
            kind,
            sigla: sigla.to_string(),
            role,
            path,
            count,
        })
    }

    /// Filter one state or country stratum, or the outgroup.
    pub fn run(&self, kind: StratumKind, stratum: Option<&Stratum>) -> Result<StratumResult> {
        let request = self.request(kind, stratum)?;
        let (sigla, role) = match (kind, stratum) {
            (StratumKind::State, Some(s)) if self.schema.is_target(&s.sigla) => {
                (s.sigla.as_str(), StratumRole::Target)
            }
            (StratumKind::State | StratumKind::Country, Some(s)) => {
                (s.sigla.as_str(), StratumRole::Background)
            }
            (StratumKind::Complement, _) => (COMPLEMENT_SIGLA, StratumRole::Background),
            _ => (OUTGROUP_SIGLA, StratumRole::Background),
        };
        self.execute(kind, sigla, role, &request)
    }
}
