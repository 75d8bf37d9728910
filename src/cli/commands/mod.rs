//! CLI command implementations.

mod ask;
mod clear;
mod config;
mod delete;
mod ingest;
mod list;
mod search;
mod serve;
mod summary;

pub use ask::run_ask;
pub use clear::run_clear;
pub use config::run_config;
pub use delete::run_delete;
pub use ingest::run_ingest;
pub use list::run_list;
pub use search::run_search;
pub use serve::run_serve;
pub use summary::run_summary;
