/// Similarity job: align queries against the sequence store, rank the hits
/// and pull out the matching records.
use crate::bio::hits::read_hits;
use crate::core::config::Config;
use crate::core::job::JobContext;
use crate::core::ranker::SimilarityRanker;
use crate::core::schema::SimilaritySchema;
use crate::core::selector::{RecordSelector, SelectionSummary};
use crate::tools::request::SearchRequest;
use crate::tools::traits::AlignmentEngine;
use crate::utils::io::{is_gzipped, open_reader};
use crate::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const HITS_FILE: &str = "blastn_hits.tsv";
pub const SIMILAR_STRAINS: &str = "similar_strains.txt";
pub const SIMILAR_SEQUENCES: &str = "similar_genomes.fasta";
pub const SIMILAR_METADATA: &str = "similar_genomes.tsv";

#[derive(Debug, Clone, Serialize)]
pub struct SimilarityOutcome {
    pub hits: usize,
    pub ranked: Vec<String>,
    pub selection: SelectionSummary,
    pub warnings: Vec<String>,
}

pub struct SimilaritySearch<'a> {
    ctx: &'a JobContext,
    engine: &'a dyn AlignmentEngine,
    config: &'a Config,
}

/// The search tools read plain FASTA only.
fn plain_fasta(ctx: &JobContext, path: &Path, name: &str) -> Result<PathBuf> {
    if !is_gzipped(path) {
        return Ok(path.to_path_buf());
    }
    let target = ctx.path(name);
    info!("Decompressing {} to {}", path.display(), target.display());
    let mut reader = open_reader(path)?;
    let mut writer = BufWriter::new(File::create(&target)?);
    std::io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    Ok(target)
}

impl<'a> SimilaritySearch<'a> {
    pub fn new(ctx: &'a JobContext, engine: &'a dyn AlignmentEngine, config: &'a Config) -> Self {
        Self {
            ctx,
            engine,
            config,
        }
    }

    pub fn run(
        &self,
        query: &Path,
        sequences: &Path,
        metadata: &Path,
        schema: &SimilaritySchema,
    ) -> Result<SimilarityOutcome> {
        let reference = plain_fasta(self.ctx, sequences, "reference_sequences.fasta")?;
        let query = plain_fasta(self.ctx, query, "query_sequences.fasta")?;

        let database = self
            .engine
            .build_database(&reference, &self.ctx.path("blastdb").join("reference"))?;

        let hits_path = self.ctx.path(HITS_FILE);
        self.engine.search(&SearchRequest {
            query,
            database,
            output: hits_path.clone(),
            task: self.config.similarity.task.clone(),
            evalue: self.config.similarity.evalue,
            threads: self.ctx.threads(),
        })?;

        let hits = read_hits(&hits_path)?;
        let ranked = SimilarityRanker::new(schema)
            .with_min_query_coverage(self.config.similarity.min_query_coverage)
            .rank(&hits);
        info!(
            "{} of {} hits kept after ranking with {}",
            ranked.len(),
            hits.len(),
            self.engine.name()
        );

        // Rank order, not sorted: the first line is the best match.
        let mut writer = BufWriter::new(File::create(self.ctx.path(SIMILAR_STRAINS))?);
        for id in &ranked {
            writeln!(writer, "{}", id)?;
        }
        writer.flush()?;

        let mut warnings = Vec::new();
        if ranked.is_empty() {
            warnings.push(format!(
                "no hits passed identity {}-{} and coverage {}",
                schema.min_id, schema.max_id, self.config.similarity.min_query_coverage
            ));
            warn!("{}", warnings[0]);
        }

        let ids: HashSet<String> = ranked.iter().cloned().collect();
        let selection = RecordSelector::new(&self.config.columns.strain).select(
            sequences,
            metadata,
            &ids,
            &self.ctx.path(SIMILAR_SEQUENCES),
            &self.ctx.path(SIMILAR_METADATA),
        )?;
        if selection.is_empty() && !ranked.is_empty() {
            warnings.push("none of the ranked matches were found in the inputs".to_string());
        }

        Ok(SimilarityOutcome {
            hits: hits.len(),
            ranked,
            selection,
            warnings,
        })
    }
}
