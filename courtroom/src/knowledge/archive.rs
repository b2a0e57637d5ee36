//! Precedent archive: completed cases with their verdict and lessons.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::trial::format::lesson_or_placeholder;

use super::similarity::bigram_cosine;
use super::{load_json, save_json};

/// One archived case. Lessons are never empty: blanks become `N/A`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedCase {
    pub summary: String,
    pub verdict: String,
    pub plaintiff_lesson: String,
    pub defendant_lesson: String,
    pub archived_at: DateTime<Utc>,
}

impl ArchivedCase {
    pub fn new(
        summary: &str,
        verdict: &str,
        plaintiff_lesson: &str,
        defendant_lesson: &str,
    ) -> Self {
        Self {
            summary: summary.to_string(),
            verdict: verdict.to_string(),
            plaintiff_lesson: lesson_or_placeholder(plaintiff_lesson),
            defendant_lesson: lesson_or_placeholder(defendant_lesson),
            archived_at: Utc::now(),
        }
    }

    /// Same summary and verdict.
    pub fn same_case(&self, summary: &str, verdict: &str) -> bool {
        self.summary == summary && self.verdict == verdict
    }
}

/// A search hit with its similarity in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarCase {
    pub case: ArchivedCase,
    pub similarity: f64,
}

pub trait CaseArchive: Send + Sync {
    /// Up to `k` cases most similar to `query`, best first.
    fn search_similar(&self, query: &str, k: usize) -> Result<Vec<SimilarCase>>;

    fn archive_case(&self, case: ArchivedCase) -> Result<()>;

    /// Whether a case with this summary and verdict is already archived.
    fn has_case(&self, summary: &str, verdict: &str) -> Result<bool>;

    fn clear(&self) -> Result<()>;

    fn case_count(&self) -> Result<usize>;
}

/// Rank `cases` against `query`. Cases sharing no bigram with the query
/// are not returned.
fn rank(cases: &[ArchivedCase], query: &str, k: usize) -> Vec<SimilarCase> {
    let mut hits: Vec<SimilarCase> = cases
        .iter()
        .map(|case| SimilarCase {
            similarity: bigram_cosine(query, &case.summary),
            case: case.clone(),
        })
        .filter(|hit| hit.similarity > 0.0)
        .collect();
    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    hits.truncate(k);
    hits
}

#[derive(Debug, Default)]
pub struct InMemoryCaseArchive {
    cases: Mutex<Vec<ArchivedCase>>,
}

impl InMemoryCaseArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cases(&self) -> Result<Vec<ArchivedCase>> {
        Ok(self
            .cases
            .lock()
            .map_err(|_| anyhow!("case archive lock poisoned"))?
            .clone())
    }
}

impl CaseArchive for InMemoryCaseArchive {
    fn search_similar(&self, query: &str, k: usize) -> Result<Vec<SimilarCase>> {
        let cases = self
            .cases
            .lock()
            .map_err(|_| anyhow!("case archive lock poisoned"))?;
        Ok(rank(&cases, query, k))
    }

    fn archive_case(&self, case: ArchivedCase) -> Result<()> {
        self.cases
            .lock()
            .map_err(|_| anyhow!("case archive lock poisoned"))?
            .push(case);
        Ok(())
    }

    fn has_case(&self, summary: &str, verdict: &str) -> Result<bool> {
        let cases = self
            .cases
            .lock()
            .map_err(|_| anyhow!("case archive lock poisoned"))?;
        Ok(cases.iter().any(|c| c.same_case(summary, verdict)))
    }

    fn clear(&self) -> Result<()> {
        self.cases
            .lock()
            .map_err(|_| anyhow!("case archive lock poisoned"))?
            .clear();
        Ok(())
    }

    fn case_count(&self) -> Result<usize> {
        Ok(self
            .cases
            .lock()
            .map_err(|_| anyhow!("case archive lock poisoned"))?
            .len())
    }
}

/// Archive persisted as a JSON array, rewritten on every mutation.
#[derive(Debug)]
pub struct JsonCaseArchive {
    path: PathBuf,
    cases: Mutex<Vec<ArchivedCase>>,
}

impl JsonCaseArchive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let cases: Vec<ArchivedCase> = load_json(&path)?.unwrap_or_default();
        tracing::debug!(path = %path.display(), cases = cases.len(), "Opened case archive");
        Ok(Self {
            path,
            cases: Mutex::new(cases),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaseArchive for JsonCaseArchive {
    fn search_similar(&self, query: &str, k: usize) -> Result<Vec<SimilarCase>> {
        let cases = self
            .cases
            .lock()
            .map_err(|_| anyhow!("case archive lock poisoned"))?;
        Ok(rank(&cases, query, k))
    }

    fn archive_case(&self, case: ArchivedCase) -> Result<()> {
        let mut cases = self
            .cases
            .lock()
            .map_err(|_| anyhow!("case archive lock poisoned"))?;
        cases.push(case);
        save_json(&self.path, &*cases)
    }

    fn has_case(&self, summary: &str, verdict: &str) -> Result<bool> {
        let cases = self
            .cases
            .lock()
            .map_err(|_| anyhow!("case archive lock poisoned"))?;
        Ok(cases.iter().any(|c| c.same_case(summary, verdict)))
    }

    fn clear(&self) -> Result<()> {
        let mut cases = self
            .cases
            .lock()
            .map_err(|_| anyhow!("case archive lock poisoned"))?;
        cases.clear();
        save_json(&self.path, &*cases)
    }

    fn case_count(&self) -> Result<usize> {
        Ok(self
            .cases
            .lock()
            .map_err(|_| anyhow!("case archive lock poisoned"))?
            .len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> InMemoryCaseArchive {
        let archive = InMemoryCaseArchive::new();
        for (summary, verdict) in [
            ("아파트 층간소음 손해배상", "주문: 원고 일부 승소"),
            ("층간소음 민원 위자료 청구", "주문: 원고 청구 기각"),
            ("중고차 매매 계약 해제", "주문: 피고 승소"),
        ] {
            archive
                .archive_case(ArchivedCase::new(summary, verdict, "교훈", ""))
                .unwrap();
        }
        archive
    }

    #[test]
    fn test_empty_lessons_get_placeholder() {
        let case = ArchivedCase::new("s", "v", "", "  ");
        assert_eq!(case.plaintiff_lesson, "N/A");
        assert_eq!(case.defendant_lesson, "N/A");
    }

    #[test]
    fn test_search_ranks_and_limits() {
        let archive = seeded();
        let hits = archive
            .search_similar("아파트 층간소음으로 인한 손해배상 청구", 2)
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].case.summary, "아파트 층간소음 손해배상");
        assert!(hits[0].similarity >= hits[1].similarity);
        assert!(hits.iter().all(|h| !h.case.summary.contains("중고차")));
    }

    #[test]
    fn test_search_empty_archive() {
        let archive = InMemoryCaseArchive::new();
        assert!(archive.search_similar("사건", 2).unwrap().is_empty());
    }

    #[test]
    fn test_has_case_and_clear() {
        let archive = seeded();
        assert!(archive
            .has_case("중고차 매매 계약 해제", "주문: 피고 승소")
            .unwrap());
        assert!(!archive
            .has_case("중고차 매매 계약 해제", "다른 판결")
            .unwrap());
        assert_eq!(archive.case_count().unwrap(), 3);
        archive.clear().unwrap();
        assert_eq!(archive.case_count().unwrap(), 0);
    }

    #[test]
    fn test_json_archive_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cases.json");
        let archive = JsonCaseArchive::open(&path).unwrap();
        archive
            .archive_case(ArchivedCase::new("층간소음", "주문: 기각", "", "반박 자료"))
            .unwrap();
        drop(archive);

        let reopened = JsonCaseArchive::open(&path).unwrap();
        assert_eq!(reopened.case_count().unwrap(), 1);
        let hits = reopened.search_similar("층간소음", 5).unwrap();
        assert_eq!(hits[0].case.plaintiff_lesson, "N/A");
        assert_eq!(hits[0].case.defendant_lesson, "반박 자료");
    }
}
