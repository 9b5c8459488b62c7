use super::snapshot::{PoolDataSupplier, PoolRecord};
use super::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub fn write_pool_records_on_disk<P: AsRef<Path>>(
    poolmap_file_path: P,
    records: &[PoolRecord],
) -> Result<()> {
    let pool_list = PoolList {
        pools: records.to_vec(),
    };
    let json = serde_json::to_string_pretty(&pool_list)?;

    fs::write(poolmap_file_path, json)?;
    Ok(())
}

pub fn read_pool_records_from_disk<P: AsRef<Path>>(poolmap_file_path: P) -> Result<Vec<PoolRecord>> {
    let path = poolmap_file_path.as_ref();
    let pool_list_json = fs::read_to_string(path)
        .with_context(|| format!("Couldn't read pool data file {}", path.display()))?;
    let pool_list: PoolList = serde_json::from_str(&pool_list_json)
        .with_context(|| format!("Malformed pool data file {}", path.display()))?;
    Ok(pool_list.pools)
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct PoolList {
    pools: Vec<PoolRecord>,
}

/// Supplies pools from a JSON pool map previously written by an indexer.
#[derive(Clone, Debug)]
pub struct FilePoolSupplier {
    path: PathBuf,
}

impl FilePoolSupplier {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl PoolDataSupplier for FilePoolSupplier {
    fn fetch_pools(&self) -> Result<Vec<PoolRecord>> {
        read_pool_records_from_disk(&self.path)
    }
}
