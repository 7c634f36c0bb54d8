//! Durable record of which article identifiers have had an enrichment
//! attempt. One attempt, one entry, success or failure alike.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::TARGET_STORE;

/// Backing storage for the ledger. Injected so tests can run in memory.
pub trait LedgerStore: Send {
    fn load(&mut self) -> Result<BTreeSet<String>>;
    fn append(&mut self, id: &str) -> Result<()>;
}

/// Append-only, one identifier per line. An operator can delete lines to
/// force reprocessing; the file is re-read as the source of truth on the
/// next load.
pub struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerStore for FileLedgerStore {
    fn load(&mut self) -> Result<BTreeSet<String>> {
        if !self.path.exists() {
            debug!(target: TARGET_STORE, "No ledger at {}, starting empty", self.path.display());
            return Ok(BTreeSet::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read ledger {}", self.path.display()))?;
        Ok(contents
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }

    fn append(&mut self, id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open ledger {}", self.path.display()))?;
        writeln!(file, "{}", id)
            .with_context(|| format!("failed to append to ledger {}", self.path.display()))?;
        file.sync_data()
            .with_context(|| format!("failed to flush ledger {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryLedgerStore {
    ids: BTreeSet<String>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&mut self) -> Result<BTreeSet<String>> {
        Ok(self.ids.clone())
    }

    fn append(&mut self, id: &str) -> Result<()> {
        self.ids.insert(id.to_string());
        Ok(())
    }
}

/// The loaded ledger plus its backing store. Identifiers are only ever
/// added by a run, never removed.
pub struct Ledger {
    seen: BTreeSet<String>,
    store: Box<dyn LedgerStore>,
}

impl Ledger {
    pub fn open(mut store: Box<dyn LedgerStore>) -> Result<Self> {
        let seen = store.load()?;
        info!(target: TARGET_STORE, "Loaded ledger with {} processed identifiers", seen.len());
        Ok(Self { seen, store })
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Records an enrichment attempt. Called exactly once per attempted
    /// identifier, immediately after the attempt resolves.
    pub fn mark_processed(&mut self, id: &str) -> Result<()> {
        if self.seen.insert(id.to_string()) {
            self.store.append(id)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
