/// Rest-of-world background, disjoint from every stratum already selected.
use crate::bio::strains::{read_strains, write_strains, StrainSet};
use crate::core::stratum::{
    StratumFilter, StratumKind, StratumResult, StratumRole, COMPLEMENT_SIGLA,
};
use crate::Result;
use tracing::{info, warn};

/// Exclude-list file handed to the filtering engine.
pub const SELECTED_STRAINS: &str = "selected_strains.txt";

pub struct BackgroundComplement<'f, 'a> {
    filter: &'f StratumFilter<'a>,
}

impl<'f, 'a> BackgroundComplement<'f, 'a> {
    pub fn new(filter: &'f StratumFilter<'a>) -> Self {
        Self { filter }
    }

    /// Select the uncapped background outside the home country, excluding
    /// `already_selected`.
    pub fn run(&self, already_selected: &StrainSet) -> Result<StratumResult> {
        let exclude = self.filter.ctx().path(SELECTED_STRAINS);
        write_strains(&exclude, already_selected)?;
        info!(
            "Selecting background outside {} ({} strains excluded)",
            self.filter.home_country(),
            already_selected.len()
        );

        let request = self
            .filter
            .request(StratumKind::Complement, None)?
            .with_exclude(&exclude);
        let mut result = self.filter.execute(
            StratumKind::Complement,
            COMPLEMENT_SIGLA,
            StratumRole::Background,
            &request,
        )?;

        // The engine is trusted to honour the exclude list, but the output
        // must be disjoint regardless.
        let selected = read_strains(&result.path)?;
        let overlap = selected.intersection(already_selected).count();
        if overlap > 0 {
            warn!(
                "{} returned {} already selected strains for the background; dropping them",
                self.filter.engine().name(),
                overlap
            );
            let disjoint: StrainSet = selected.difference(already_selected).cloned().collect();
            result.count = write_strains(&result.path, &disjoint)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::job::{JobContext, PreparedInputs};
    use crate::core::schema::SubsamplingSchema;
    use crate::tools::request::{FilterOutput, FilterRequest};
    use crate::tools::traits::FilterEngine;
    use std::fs;
    use tempfile::TempDir;

    /// Ignores the exclude list and reports everything.
    struct CarelessEngine;

    impl FilterEngine for CarelessEngine {
        fn name(&self) -> &str {
            "careless"
        }

        fn filter(&self, request: &FilterRequest) -> Result<()> {
            if let FilterOutput::Strains(path) = &request.output {
                fs::write(path, "a\nb\nc\n")?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_complement_is_disjoint_even_if_engine_is_not() {
        let dir = TempDir::new().unwrap();
        let ctx = JobContext::create(dir.path(), "job", 1).unwrap();
        let inputs = PreparedInputs::raw(&dir.path().join("s.fasta"), &dir.path().join("m.tsv"));
        let schema = SubsamplingSchema::from_json(
            r#"{"job_name": "job", "min_date": "2021-01-01", "max_date": "2021-02-01",
                "min_genome_len": 1, "target_lineages": ["P.1"], "outgroup_lineages": ["B.1"],
                "states": []}"#,
        )
        .unwrap();
        let config = Config::default();
        let filter = StratumFilter::new(&ctx, &CarelessEngine, &inputs, &schema, &config);

        let already: StrainSet = ["b".to_string()].into_iter().collect();
        let result = BackgroundComplement::new(&filter).run(&already).unwrap();

        assert_eq!(result.count, 2);
        let strains = result.strains().unwrap();
        assert!(strains.is_disjoint(&already));
        assert_eq!(fs::read_to_string(ctx.path(SELECTED_STRAINS)).unwrap(), "b\n");
    }
}
