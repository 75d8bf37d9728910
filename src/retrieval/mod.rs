//! Query-time retrieval: ranking, adaptive truncation and temporal fusion.
//!
//! The query engine runs these in order: the searcher ranks highlights of one
//! modality, the gap filter trims audio candidates, and the fusion joiner
//! attaches the visuals shown while each remaining segment was spoken.

mod fusion;
mod gap_filter;
mod searcher;

pub use fusion::TemporalFusionJoiner;
pub use gap_filter::AdaptiveResultFilter;
pub use searcher::SimilaritySearcher;
