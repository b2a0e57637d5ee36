//! Plain-text rendering of trial progress and batch results.
//!
//! Every function returns a `String`; the binary decides where it goes.

use courtroom::batch::{BenchmarkMetrics, LearnSummary, LearnedCase};
use courtroom::{CritiqueItem, JudgePersona, Outcome, PhaseEvent, Side, TrialPhase, TrialState};

const RULE_WIDTH: usize = 60;

pub fn rule(title: &str) -> String {
    let label = format!(" {title} ");
    let pad = RULE_WIDTH.saturating_sub(label.chars().count());
    let left = pad / 2;
    format!("{}{}{}", "─".repeat(left), label, "─".repeat(pad - left))
}

pub fn header(title: &str) -> String {
    rule(&format!("⚖ {title} ⚖"))
}

pub fn judge_panel(judges: &[JudgePersona]) -> String {
    let mut out = String::from("[이번 재판의 배석판사 구성]\n");
    for (i, judge) in judges.iter().enumerate() {
        out.push_str(&format!("  - {}: {}\n", i + 1, judge.name));
    }
    out
}

/// Speaker label followed by the indented text.
pub fn speech(speaker: &str, text: &str) -> String {
    let body: Vec<String> = text.lines().map(|l| format!("  {l}")).collect();
    format!("[{speaker}]\n{}\n", body.join("\n"))
}

fn outcome_marker(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Win => "✅",
        Outcome::Loss => "❌",
        Outcome::Draw => "🟡",
    }
}

pub fn lesson(lawyer: &str, outcome: Outcome, lesson: &str) -> String {
    format!(
        "{} {lawyer} ({}) -> 학습된 교훈: {lesson}",
        outcome_marker(outcome),
        outcome.label()
    )
}

pub fn critique_line(item: &CritiqueItem) -> String {
    let verdict = if item.passed() { "PASS" } else { "FAIL" };
    format!("  [{verdict}] {}: {}", item.criteria.label(), item.reason)
}

/// Critique block; falls back to the raw critic output when it was unparsed.
pub fn critique(state: &TrialState) -> String {
    let mut out = rule("판결 품질 평가");
    out.push('\n');
    match state.critique_scores.as_deref() {
        Some(items) if !items.is_empty() => {
            for item in items {
                out.push_str(&critique_line(item));
                out.push('\n');
            }
        }
        _ => {
            out.push_str("  평가 결과를 해석하지 못했습니다.\n");
            if let Some(raw) = state.critique_raw.as_deref() {
                out.push_str(&speech("비평가 원문", raw));
            }
        }
    }
    out
}

/// Render what one completed phase step produced.
pub fn phase_event(event: &PhaseEvent) -> String {
    let state = &event.state;
    match event.phase {
        TrialPhase::Init => judge_panel(&state.selected_judges),
        TrialPhase::Debate => {
            let mut out = rule(&format!("변호사 토론 (턴 {})", state.turn_count));
            out.push('\n');
            if let Some(last) = state.debate_transcript.last() {
                out.push_str(&speech(&last.agent_name, &last.speech));
            }
            out
        }
        TrialPhase::AssociateDeliberation => {
            let mut out = rule("배석판사 의견");
            out.push('\n');
            for opinion in &state.associate_verdicts {
                out.push_str(&speech(&opinion.agent_name, &opinion.speech));
            }
            out
        }
        TrialPhase::FinalJudgment => {
            let mut out = rule("최종 판결");
            out.push('\n');
            if let Some(verdict) = state.final_verdict.as_deref() {
                out.push_str(&speech("재판장", verdict));
            }
            out
        }
        TrialPhase::KnowledgeUpdate => {
            let mut out = rule("변호사 지식 베이스 업데이트");
            out.push('\n');
            for side in Side::BOTH {
                if let (Some(outcome), Some(text)) =
                    (state.outcome_of(side), state.lesson_of(side))
                {
                    out.push_str(&lesson(state.label_of(side), outcome, text));
                    out.push('\n');
                }
            }
            out
        }
        TrialPhase::Critique => critique(state),
        TrialPhase::End | TrialPhase::Failed => String::new(),
    }
}

pub fn learned_case(index: usize, total: usize, case: &LearnedCase) -> String {
    format!(
        "[{}/{}] 사건 {} -> 원고 {} | 기록된 전략 {}개 | 아카이브 {}",
        index + 1,
        total,
        case.case_id,
        case.plaintiff_outcome.label(),
        case.recorded_keys.len(),
        if case.archived { "저장" } else { "중복 생략" }
    )
}

pub fn learn_summary(summary: &LearnSummary) -> String {
    format!("{}\n{}", rule("일괄 학습 완료"), summary.summary_line())
}

pub fn benchmark_summary(metrics: &BenchmarkMetrics) -> String {
    format!("{}\n{}", rule("벤치마크 결과"), metrics.format_report())
}
