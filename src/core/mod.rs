pub mod constants;
pub mod error;
pub mod indexer;
pub mod optimization;
pub mod paths;
pub mod pool;
pub mod route;
pub mod snapshot;
pub mod token;
pub mod token_graph;
pub mod types;
pub use anyhow::{Context, Result};
