//! Per-side strategy lists.
//!
//! Keys follow `{side}:{list}`, e.g. `plaintiff_lawyer:successful_strategies`.
//! Lists are append-only and keep insertion order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::trial::{Outcome, Side};

use super::{load_json, save_json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyList {
    Successful,
    Failed,
}

impl StrategyList {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Successful => "successful_strategies",
            Self::Failed => "failed_strategies",
        }
    }

    /// List a lesson lands in for `outcome`. Draws are not recorded.
    pub fn for_outcome(outcome: Outcome) -> Option<Self> {
        match outcome {
            Outcome::Win => Some(Self::Successful),
            Outcome::Loss => Some(Self::Failed),
            Outcome::Draw => None,
        }
    }
}

pub fn strategy_key(side: Side, list: StrategyList) -> String {
    format!("{}:{}", side.key_prefix(), list.suffix())
}

/// Append-only keyed lists of strategy lessons.
pub trait StrategyStore: Send + Sync {
    /// Append `value` to the list at `key`, creating it if absent.
    fn append_strategy(&self, key: &str, value: &str) -> Result<()>;

    /// All values at `key` in insertion order; empty if absent.
    fn list_strategies(&self, key: &str) -> Result<Vec<String>>;

    /// Remove every list.
    fn clear(&self) -> Result<()>;
}

type Lists = BTreeMap<String, Vec<String>>;

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryStrategyStore {
    lists: Mutex<Lists>,
}

impl InMemoryStrategyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StrategyStore for InMemoryStrategyStore {
    fn append_strategy(&self, key: &str, value: &str) -> Result<()> {
        let mut lists = self
            .lists
            .lock()
            .map_err(|_| anyhow!("strategy store lock poisoned"))?;
        lists
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    fn list_strategies(&self, key: &str) -> Result<Vec<String>> {
        let lists = self
            .lists
            .lock()
            .map_err(|_| anyhow!("strategy store lock poisoned"))?;
        Ok(lists.get(key).cloned().unwrap_or_default())
    }

    fn clear(&self) -> Result<()> {
        self.lists
            .lock()
            .map_err(|_| anyhow!("strategy store lock poisoned"))?
            .clear();
        Ok(())
    }
}

/// Store persisted as a single JSON object of `key -> [values]`.
///
/// The whole file is rewritten on every mutation while the lock is held,
/// so each append is atomic with respect to other appends.
#[derive(Debug)]
pub struct JsonStrategyStore {
    path: PathBuf,
    lists: Mutex<Lists>,
}

impl JsonStrategyStore {
    /// Open `path`, loading existing lists if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lists: Lists = load_json(&path)?.unwrap_or_default();
        tracing::debug!(path = %path.display(), keys = lists.len(), "Opened strategy store");
        Ok(Self {
            path,
            lists: Mutex::new(lists),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StrategyStore for JsonStrategyStore {
    fn append_strategy(&self, key: &str, value: &str) -> Result<()> {
        let mut lists = self
            .lists
            .lock()
            .map_err(|_| anyhow!("strategy store lock poisoned"))?;
        lists
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        save_json(&self.path, &*lists)
    }

    fn list_strategies(&self, key: &str) -> Result<Vec<String>> {
        let lists = self
            .lists
            .lock()
            .map_err(|_| anyhow!("strategy store lock poisoned"))?;
        Ok(lists.get(key).cloned().unwrap_or_default())
    }

    fn clear(&self) -> Result<()> {
        let mut lists = self
            .lists
            .lock()
            .map_err(|_| anyhow!("strategy store lock poisoned"))?;
        lists.clear();
        save_json(&self.path, &*lists)
    }
}
