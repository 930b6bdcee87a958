/// Turns raw alignment hits into a ranked, deduplicated list of matches.
use crate::bio::hits::AlignmentHit;
use crate::core::schema::SimilaritySchema;
use std::collections::HashSet;

/// Minimum query coverage (percent) for a hit to count.
pub const DEFAULT_MIN_QUERY_COVERAGE: f64 = 99.9;

#[derive(Debug, Clone)]
pub struct SimilarityRanker {
    min_query_coverage: f64,
    min_identity: f64,
    max_identity: f64,
    max_results: usize,
}

impl SimilarityRanker {
    pub fn new(schema: &SimilaritySchema) -> Self {
        Self {
            min_query_coverage: DEFAULT_MIN_QUERY_COVERAGE,
            min_identity: schema.min_id,
            max_identity: schema.max_id,
            max_results: schema.max_number_of_similar_genomes,
        }
    }

    pub fn with_min_query_coverage(mut self, coverage: f64) -> Self {
        self.min_query_coverage = coverage;
        self
    }

    fn passes(&self, hit: &AlignmentHit) -> bool {
        hit.query_coverage >= self.min_query_coverage
            && hit.percent_identity >= self.min_identity
            && hit.percent_identity <= self.max_identity
    }

    /// Best hit per matched sequence, highest bit score first. Equal scores
    /// keep the engine's row order.
    pub fn rank_hits(&self, hits: &[AlignmentHit]) -> Vec<AlignmentHit> {
        let mut kept: Vec<&AlignmentHit> = hits.iter().filter(|h| self.passes(h)).collect();
        kept.sort_by(|a, b| b.bit_score.total_cmp(&a.bit_score));

        let mut seen = HashSet::new();
        kept.into_iter()
            .filter(|h| seen.insert(h.matched_id.as_str()))
            .take(self.max_results)
            .cloned()
            .collect()
    }

    /// Matched identifiers in rank order.
    pub fn rank(&self, hits: &[AlignmentHit]) -> Vec<String> {
        self.rank_hits(hits)
            .into_iter()
            .map(|h| h.matched_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn hit(matched: &str, pident: f64, qcov: f64, bitscore: f64) -> AlignmentHit {
        AlignmentHit {
            query_id: "q".to_string(),
            matched_id: matched.to_string(),
            percent_identity: pident,
            e_value: 0.0,
            bit_score: bitscore,
            query_coverage: qcov,
        }
    }

    fn ranker(min_id: f64, max_id: f64, max: usize) -> SimilarityRanker {
        SimilarityRanker::new(&SimilaritySchema {
            job_name: "j".to_string(),
            min_id,
            max_id,
            max_number_of_similar_genomes: max,
        })
    }

    #[test]
    fn test_duplicate_and_out_of_range_hits_are_dropped() {
        let hits = vec![
            hit("A", 99.95, 100.0, 500.0),
            hit("A", 99.95, 100.0, 300.0),
            hit("B", 80.0, 100.0, 400.0),
        ];
        assert_eq!(ranker(95.0, 100.0, 10).rank(&hits), vec!["A"]);
    }

    #[test]
    fn test_coverage_threshold_is_inclusive() {
        let hits = vec![hit("A", 99.0, 99.9, 10.0), hit("B", 99.0, 99.89, 20.0)];
        assert_eq!(ranker(95.0, 100.0, 10).rank(&hits), vec!["A"]);

        let relaxed = ranker(95.0, 100.0, 10).with_min_query_coverage(90.0);
        assert_eq!(relaxed.rank(&hits), vec!["B", "A"]);
    }

    #[test]
    fn test_identity_bounds_are_inclusive() {
        let hits = vec![hit("lo", 95.0, 100.0, 1.0), hit("hi", 100.0, 100.0, 2.0)];
        assert_eq!(ranker(95.0, 100.0, 10).rank(&hits), vec!["hi", "lo"]);
    }

    #[test]
    fn test_ties_keep_engine_order_and_truncate() {
        let hits = vec![
            hit("C", 99.0, 100.0, 100.0),
            hit("A", 99.0, 100.0, 100.0),
            hit("B", 99.0, 100.0, 100.0),
        ];
        assert_eq!(ranker(95.0, 100.0, 2).rank(&hits), vec!["C", "A"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(ranker(0.0, 100.0, 5).rank(&[]).is_empty());
    }

    fn arb_hit() -> impl Strategy<Value = AlignmentHit> {
        (0u8..8, 90.0f64..=100.0, 99.0f64..=100.0, 0.0f64..1000.0)
            .prop_map(|(id, pident, qcov, bits)| hit(&format!("s{}", id), pident, qcov, bits))
    }

    proptest! {
        #[test]
        fn prop_ranked_output_invariants(
            hits in prop::collection::vec(arb_hit(), 0..40),
            max in 1usize..6,
        ) {
            let ranker = ranker(95.0, 99.5, max);
            let ranked = ranker.rank_hits(&hits);

            prop_assert!(ranked.len() <= max);
            prop_assert!(ranked.windows(2).all(|w| w[0].bit_score >= w[1].bit_score));

            let unique: HashSet<&str> = ranked.iter().map(|h| h.matched_id.as_str()).collect();
            prop_assert_eq!(unique.len(), ranked.len());

            prop_assert_eq!(ranker.rank_hits(&ranked), ranked);
        }
    }
}
