pub mod pool;
pub use super::snapshot;
pub use anyhow::Result;
