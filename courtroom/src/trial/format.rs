//! Text rendering of trial artifacts for prompt variables.

use crate::knowledge::SimilarCase;

use super::state::Speech;

/// Bound as `past_lessons` when a side has no recorded strategies.
pub const NO_HISTORY_MARKER: &str = "아직 재판 경험이 없습니다.";
/// Bound as `similar_cases` when the archive returns nothing.
pub const NO_SIMILAR_CASES: &str = "유사한 과거 사건을 찾지 못했습니다.";
/// Bound as `similar_cases` when the archive search fails.
pub const ARCHIVE_UNAVAILABLE: &str = "아직 검색할 과거 사건 데이터가 없습니다.";
/// Stored in place of an empty lesson.
pub const LESSON_PLACEHOLDER: &str = "N/A";
/// Expected opening of a presiding verdict. Not enforced.
pub const DISPOSITION_MARKER: &str = "주문:";

/// `"{agent_name}: {speech}"` per speech, newline separated.
pub fn format_transcript(speeches: &[Speech]) -> String {
    speeches
        .iter()
        .map(|s| format!("{}: {}", s.agent_name, s.speech))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Associate opinions as fed to the presiding adjudicator.
pub fn format_associate_opinions(opinions: &[Speech]) -> String {
    opinions
        .iter()
        .map(|s| format!("[{}의 의견]\n{}", s.agent_name, s.speech))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_past_lessons(successful: &[String], failed: &[String]) -> String {
    if successful.is_empty() && failed.is_empty() {
        return NO_HISTORY_MARKER.to_string();
    }
    format!(
        "성공 전략:\n{}\n\n실패 전략:\n{}",
        successful.join("\n"),
        failed.join("\n")
    )
}

pub fn format_similar_cases(cases: &[SimilarCase]) -> String {
    if cases.is_empty() {
        return NO_SIMILAR_CASES.to_string();
    }
    cases
        .iter()
        .map(|hit| {
            format!(
                "유사도 {:.2}% - 사건 요약: {}\n  - 최종 판결: {}\n  - 원고측 교훈: {}\n  - 피고측 교훈: {}",
                hit.similarity * 100.0,
                hit.case.summary,
                hit.case.verdict,
                hit.case.plaintiff_lesson,
                hit.case.defendant_lesson,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Trimmed lesson, or [`LESSON_PLACEHOLDER`] when nothing is left.
pub fn lesson_or_placeholder(lesson: &str) -> String {
    let trimmed = lesson.trim();
    if trimmed.is_empty() {
        LESSON_PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether `verdict` opens with the disposition marker.
pub fn has_disposition(verdict: &str) -> bool {
    verdict.trim_start().starts_with(DISPOSITION_MARKER)
}

/// First `limit` characters of `text` (not bytes).
pub fn char_prefix(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
