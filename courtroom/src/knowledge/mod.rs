//! Persistent knowledge: per-side strategy lists and the precedent archive.
//!
//! Both stores are synchronous traits returning `anyhow::Result`; the only
//! suspension point in a trial is a generation call.

pub mod archive;
pub mod similarity;
pub mod strategy;

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use archive::{ArchivedCase, CaseArchive, InMemoryCaseArchive, JsonCaseArchive, SimilarCase};
pub use strategy::{
    strategy_key, InMemoryStrategyStore, JsonStrategyStore, StrategyList, StrategyStore,
};

use crate::trial::{Outcome, Side};

/// How repeated writes of identical knowledge are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Every trial appends, even when the same lesson or case already exists.
    #[default]
    AppendAlways,
    /// Identical lessons and identical (summary, verdict) cases are skipped.
    SkipDuplicates,
}

/// Record `lesson` for `side` given its `outcome`.
///
/// Wins go to the successful list and losses to the failed list, even when
/// the lesson is blank. Returns the key written, or `None` when nothing was
/// written (draw, or a duplicate under [`WritePolicy::SkipDuplicates`]).
pub fn commit_lesson(
    store: &dyn StrategyStore,
    side: Side,
    outcome: Outcome,
    lesson: &str,
    policy: WritePolicy,
) -> Result<Option<String>> {
    let Some(list) = StrategyList::for_outcome(outcome) else {
        return Ok(None);
    };
    let lesson = lesson.trim();
    if lesson.is_empty() {
        tracing::warn!(side = %side, "Reflection produced an empty lesson");
    }

    let key = strategy_key(side, list);
    if policy == WritePolicy::SkipDuplicates
        && store
            .list_strategies(&key)?
            .iter()
            .any(|existing| existing == lesson)
    {
        tracing::debug!(key = %key, "Duplicate lesson skipped");
        return Ok(None);
    }

    store.append_strategy(&key, lesson)?;
    Ok(Some(key))
}

/// Archive `case`. Returns whether a write happened.
pub fn commit_case(
    archive: &dyn CaseArchive,
    case: ArchivedCase,
    policy: WritePolicy,
) -> Result<bool> {
    if policy == WritePolicy::SkipDuplicates && archive.has_case(&case.summary, &case.verdict)? {
        tracing::debug!("Duplicate case skipped");
        return Ok(false);
    }
    archive.archive_case(case)?;
    Ok(true)
}

/// Read a JSON document, `None` if the file does not exist.
pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}

/// Write a JSON document via temp file + rename.
pub(crate) fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
