//! Stratified subsampling.
//!
//! State strata (and country strata, when configured) are filtered
//! concurrently on a bounded pool that is built per batch. Each batch runs to
//! completion before its failures are reported, so one failing stratum never
//! cancels the others. Everything after the batches is sequential.

use crate::bio::strains::{union_files, write_strains, StrainSet};
use crate::core::complement::BackgroundComplement;
use crate::core::config::Config;
use crate::core::job::{JobContext, PreparedInputs};
use crate::core::schema::{Stratum, SubsamplingSchema};
use crate::core::selector::{RecordSelector, SelectionSummary};
use crate::core::stratum::{
    StratumFilter, StratumKind, StratumResult, StratumRole, COMPLEMENT_SIGLA, OUTGROUP_SIGLA,
};
use crate::tools::traits::FilterEngine;
use crate::utils::parallel::batch_pool;
use crate::{GistError, Result, StratumFailure};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const TARGET_STRAINS: &str = "target_strains.txt";
pub const SUBSAMPLED_STRAINS: &str = "subsampled_strains.txt";
pub const TARGET_METADATA: &str = "subsampled_target_states_metadata.tsv";
pub const TARGET_SEQUENCES: &str = "subsampled_target_states_sequences.fasta";
pub const COMBINED_METADATA: &str = "subsampled_metadata.tsv";
pub const COMBINED_SEQUENCES: &str = "subsampled_sequences.fasta";
pub const COMPLEMENT_METADATA: &str = "background_complement_metadata.tsv";
pub const COMPLEMENT_SEQUENCES: &str = "background_complement_sequences.fasta";

/// Everything a finished subsampling job selected.
#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub strata: Vec<StratumResult>,
    pub target: StrainSet,
    pub background: StrainSet,
    pub combined: StrainSet,
    pub target_selection: Option<SelectionSummary>,
    pub complement_selection: SelectionSummary,
    pub combined_selection: SelectionSummary,
    pub warnings: Vec<String>,
}

pub struct SubsamplingPlanner<'a> {
    ctx: &'a JobContext,
    inputs: &'a PreparedInputs,
    schema: &'a SubsamplingSchema,
    config: &'a Config,
    filter: StratumFilter<'a>,
    show_progress: bool,
}

fn paths(results: &[&StratumResult]) -> Vec<PathBuf> {
    results.iter().map(|r| r.path.clone()).collect()
}

/// Report a single sequential stratum the same way as a failed batch.
fn stratum_failed(kind: StratumKind, sigla: &str, e: GistError) -> GistError {
    error!("{} stratum '{}' failed: {}", kind, sigla, e);
    GistError::StrataFailed(vec![StratumFailure {
        kind,
        sigla: sigla.to_string(),
        message: e.to_string(),
    }])
}

impl<'a> SubsamplingPlanner<'a> {
    pub fn new(
        ctx: &'a JobContext,
        engine: &'a dyn FilterEngine,
        inputs: &'a PreparedInputs,
        schema: &'a SubsamplingSchema,
        config: &'a Config,
    ) -> Self {
        Self {
            ctx,
            inputs,
            schema,
            config,
            filter: StratumFilter::new(ctx, engine, inputs, schema, config),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self, len: usize, kind: StratumKind) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        let template = "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░");
        pb.set_style(style);
        pb.set_message(format!("{} strata", kind));
        pb
    }

    /// Filter one batch of independent strata on a fresh bounded pool.
    /// All tasks finish before any failure is reported.
    pub fn run_batch(
        &self,
        kind: StratumKind,
        strata: &[Stratum],
    ) -> Result<Vec<StratumResult>> {
        if strata.is_empty() {
            return Ok(Vec::new());
        }
        info!(
            "Filtering {} {} strata on {} threads",
            strata.len(),
            kind,
            self.ctx.threads()
        );

        let pool = batch_pool(self.ctx.threads())?;
        let pb = self.progress_bar(strata.len(), kind);
        let outcomes: Vec<(&Stratum, Result<StratumResult>)> = pool.install(|| {
            strata
                .par_iter()
                .map(|stratum| {
                    let outcome = self.filter.run(kind, Some(stratum));
                    pb.inc(1);
                    (stratum, outcome)
                })
                .collect()
        });
        pb.finish_and_clear();

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (stratum, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    info!("{} stratum '{}': {} genomes", kind, result.sigla, result.count);
                    results.push(result);
                }
                Err(e) => {
                    error!("{} stratum '{}' failed: {}", kind, stratum.sigla, e);
                    failures.push(StratumFailure {
                        kind,
                        sigla: stratum.sigla.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(results)
        } else {
            Err(GistError::StrataFailed(failures))
        }
    }

    fn materialize(
        &self,
        ids: &StrainSet,
        sequences: &Path,
        metadata: &Path,
    ) -> Result<SelectionSummary> {
        let ids: HashSet<String> = ids.iter().cloned().collect();
        RecordSelector::new(&self.config.columns.strain).select(
            &self.inputs.sequences,
            &self.inputs.metadata,
            &ids,
            sequences,
            metadata,
        )
    }

    pub fn run(&self) -> Result<PlanOutcome> {
        let mut strata = self.run_batch(StratumKind::State, &self.schema.states)?;
        if self.schema.countries.is_empty() {
            info!("No country strata configured");
        } else {
            strata.extend(self.run_batch(StratumKind::Country, &self.schema.countries)?);
        }

        info!("Filtering outgroup");
        let outgroup = self
            .filter
            .run(StratumKind::Outgroup, None)
            .map_err(|e| stratum_failed(StratumKind::Outgroup, OUTGROUP_SIGLA, e))?;
        strata.push(outgroup);

        let all: Vec<&StratumResult> = strata.iter().collect();
        let already_selected = union_files(&paths(&all))?;
        let complement = BackgroundComplement::new(&self.filter)
            .run(&already_selected)
            .map_err(|e| stratum_failed(StratumKind::Complement, COMPLEMENT_SIGLA, e))?;
        let complement_ids = complement.strains()?;
        strata.push(complement);

        let (targets, backgrounds): (Vec<&StratumResult>, Vec<&StratumResult>) =
            strata.iter().partition(|r| r.role == StratumRole::Target);
        let target = union_files(&paths(&targets))?;
        let background = union_files(&paths(&backgrounds))?;
        let combined: StrainSet = target.union(&background).cloned().collect();

        let mut warnings: Vec<String> = strata
            .iter()
            .filter(|r| r.is_empty())
            .map(|r| format!("{} stratum '{}' selected no genomes", r.kind, r.sigla))
            .collect();

        let target_selection = if targets.is_empty() {
            None
        } else {
            write_strains(&self.ctx.path(TARGET_STRAINS), &target)?;
            info!("Writing {} target genomes", target.len());
            let summary = self.materialize(
                &target,
                &self.ctx.path(TARGET_SEQUENCES),
                &self.ctx.path(TARGET_METADATA),
            )?;
            if summary.is_empty() {
                warnings.push("target-only output is empty".to_string());
            }
            Some(summary)
        };

        info!("Writing {} background complement genomes", complement_ids.len());
        let complement_selection = self.materialize(
            &complement_ids,
            &self.ctx.path(COMPLEMENT_SEQUENCES),
            &self.ctx.path(COMPLEMENT_METADATA),
        )?;

        write_strains(&self.ctx.path(SUBSAMPLED_STRAINS), &combined)?;
        info!(
            "Writing {} genomes ({} target, {} background)",
            combined.len(),
            target.len(),
            background.len()
        );
        let combined_selection = self.materialize(
            &combined,
            &self.ctx.path(COMBINED_SEQUENCES),
            &self.ctx.path(COMBINED_METADATA),
        )?;
        if combined_selection.is_empty() {
            warnings.push("combined output is empty".to_string());
        }

        for warning in &warnings {
            warn!("{}", warning);
        }

        Ok(PlanOutcome {
            strata,
            target,
            background,
            combined,
            target_selection,
            complement_selection,
            combined_selection,
            warnings,
        })
    }
}
