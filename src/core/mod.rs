pub mod complement;
pub mod config;
pub mod job;
pub mod planner;
pub mod ranker;
pub mod report;
pub mod schema;
pub mod selector;
pub mod similar;
pub mod stratum;

pub use config::Config;
pub use planner::SubsamplingPlanner;
pub use ranker::SimilarityRanker;
pub use selector::RecordSelector;
