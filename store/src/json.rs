//! JSON file backend.
//!
//! Layout under the data directory:
//!
//! | file | contents |
//! |---|---|
//! | `<kind>_blockchain.json` | pretty JSON array of blocks |
//! | `<kind>_staging.json` | pretty JSON array of transactions |
//! | `cache.json` | [`CacheSnapshot`] |
//!
//! Every write goes to a `.tmp` sibling first and is then renamed over the
//! target, so a crash mid-write leaves the previous file intact. A file that
//! fails to load is renamed to `<file>.corrupt` (then `.corrupt.1`, ...) and
//! never overwritten.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{CacheSnapshot, CacheStore, ChainStore, StagingStore, StoreError};
use dcns_types::{Block, ChainKind, Transaction};

pub const CACHE_FILE: &str = "cache.json";

#[derive(Clone, Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn chain_path(&self, kind: ChainKind) -> PathBuf {
        self.dir.join(format!("{}_blockchain.json", kind.file_stem()))
    }

    pub fn staging_path(&self, kind: ChainKind) -> PathBuf {
        self.dir.join(format!("{}_staging.json", kind.file_stem()))
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE)
    }
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(StoreError::Io(e)),
    };
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&raw)
        .map_err(|e| StoreError::Corruption(format!("{}: {e}", path.display())))
}

/// Rename `path` to the first free `<path>.corrupt[.N]` sibling.
fn set_aside(path: &Path) -> Result<Option<PathBuf>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let mut target = PathBuf::from(format!("{}.corrupt", path.display()));
    let mut n = 0u32;
    while target.exists() {
        n += 1;
        target = PathBuf::from(format!("{}.corrupt.{n}", path.display()));
    }
    fs::rename(path, &target)?;
    tracing::warn!(
        from = %path.display(),
        to = %target.display(),
        "unreadable file set aside"
    );
    Ok(Some(target))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl ChainStore for JsonFileStore {
    fn load_chain(&self, kind: ChainKind) -> Result<Vec<Block>, StoreError> {
        read_json(&self.chain_path(kind))
    }

    fn append_blocks(&self, kind: ChainKind, blocks: &[Block]) -> Result<(), StoreError> {
        if blocks.is_empty() {
            return Ok(());
        }
        let path = self.chain_path(kind);
        let mut stored: Vec<Block> = read_json(&path)?;
        stored.extend_from_slice(blocks);
        write_json(&path, &stored)
    }

    fn replace_chain(&self, kind: ChainKind, blocks: &[Block]) -> Result<(), StoreError> {
        write_json(&self.chain_path(kind), blocks)
    }

    fn set_aside_chain(&self, kind: ChainKind) -> Result<(), StoreError> {
        set_aside(&self.chain_path(kind)).map(|_| ())
    }
}

impl StagingStore for JsonFileStore {
    fn load_staged(&self, kind: ChainKind) -> Result<Vec<Transaction>, StoreError> {
        read_json(&self.staging_path(kind))
    }

    fn save_staged(&self, kind: ChainKind, entries: &[Transaction]) -> Result<(), StoreError> {
        write_json(&self.staging_path(kind), entries)
    }

    fn set_aside_staged(&self, kind: ChainKind) -> Result<(), StoreError> {
        set_aside(&self.staging_path(kind)).map(|_| ())
    }
}

impl CacheStore for JsonFileStore {
    fn save_cache(&self, snapshot: &CacheSnapshot) -> Result<(), StoreError> {
        write_json(&self.cache_path(), snapshot)
    }
}
