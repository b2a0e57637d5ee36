//! Benchmark metrics tracking
//!
//! Collects per-case results and aggregates critique pass rates and
//! outcome-prediction quality.

use serde::{Deserialize, Serialize};

use crate::trial::{CritiqueCriterion, CritiqueItem, Outcome, TrialState};

/// Result of one benchmark case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub case_id: String,
    /// Dataset label, if the case has one
    pub expected: Option<Outcome>,
    /// Plaintiff outcome the trial produced
    pub predicted: Option<Outcome>,
    /// Critique items (empty when the critic output was unparseable)
    pub critique: Vec<CritiqueItem>,
}

impl CaseResult {
    pub fn from_state(case_id: &str, expected: Option<Outcome>, state: &TrialState) -> Self {
        Self {
            case_id: case_id.to_string(),
            expected,
            predicted: state.plaintiff_outcome,
            critique: state.critique_scores.clone().unwrap_or_default(),
        }
    }

    /// Whether the case can be scored against a label
    pub fn is_scorable(&self) -> bool {
        self.expected.is_some()
    }

    /// `None` for unlabeled cases
    pub fn is_correct(&self) -> Option<bool> {
        self.expected.map(|e| Some(e) == self.predicted)
    }

    pub fn item(&self, criterion: CritiqueCriterion) -> Option<&CritiqueItem> {
        self.critique.iter().find(|i| i.criteria == criterion)
    }

    /// Score for `criterion`; a missing item counts as 0
    pub fn score(&self, criterion: CritiqueCriterion) -> u8 {
        self.item(criterion).map(|i| i.score).unwrap_or(0)
    }
}

/// Pass rate of one critique criterion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriterionRate {
    pub criterion: CritiqueCriterion,
    /// Pass rate (%)
    pub pass_rate: f64,
}

/// Precision / recall / F1 for one expected label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelMetrics {
    pub label: Outcome,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Cases with this expected label
    pub support: usize,
}

/// Aggregated metrics for an entire benchmark session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub session_id: String,
    pub mode: String,
    pub total_cases: usize,
    /// Cases with an expected label
    pub scored_cases: usize,
    pub criterion_rates: Vec<CriterionRate>,
    /// Accuracy over scored cases (%)
    pub accuracy: f64,
    pub macro_f1: f64,
    /// Share of scored cases labelled as plaintiff win (%)
    pub expected_win_rate: f64,
    /// Share of scored cases predicted as plaintiff win (%)
    pub model_win_rate: f64,
    pub per_label: Vec<LabelMetrics>,
}

impl BenchmarkMetrics {
    pub fn pass_rate(&self, criterion: CritiqueCriterion) -> f64 {
        self.criterion_rates
            .iter()
            .find(|r| r.criterion == criterion)
            .map(|r| r.pass_rate)
            .unwrap_or(0.0)
    }

    /// Format as a markdown summary report
    pub fn format_report(&self) -> String {
        let mut report = String::new();

        report.push_str(&format!("# Benchmark Results ({})\n\n", self.mode));

        report.push_str("## Summary\n\n");
        report.push_str(&format!(
            "| Metric | Value |\n\
             |--------|-------|\n\
             | Total Cases | {} |\n\
             | Scored Cases | {} |\n\n",
            self.total_cases, self.scored_cases
        ));

        report.push_str("## Critique Pass Rates\n\n");
        report.push_str("| Criterion | Pass Rate |\n|-----------|-----------|\n");
        for rate in &self.criterion_rates {
            let row = format!("| {} | {:.2}% |\n", rate.criterion, rate.pass_rate);
            report.push_str(&row);
        }
        report.push('\n');

        report.push_str("## Outcome Prediction\n\n");
        report.push_str(&format!(
            "| Metric | Value |\n\
             |--------|-------|\n\
             | Accuracy | {:.2}% |\n\
             | Macro F1 | {:.4} |\n\
             | Expected Plaintiff Win Rate | {:.2}% |\n\
             | Model Plaintiff Win Rate | {:.2}% |\n\n",
            self.accuracy, self.macro_f1, self.expected_win_rate, self.model_win_rate
        ));

        if !self.per_label.is_empty() {
            report.push_str("## Per-Label Precision/Recall/F1\n\n");
            report.push_str("| Label | Precision | Recall | F1 | Support |\n");
            report.push_str("|-------|-----------|--------|----|---------|\n");
            for m in &self.per_label {
                report.push_str(&format!(
                    "| {} | {:.2} | {:.2} | {:.2} | {} |\n",
                    m.label, m.precision, m.recall, m.f1, m.support
                ));
            }
        }

        report
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

/// Builder for tracking metrics during a benchmark run
pub struct MetricsTracker {
    cases: Vec<CaseResult>,
    session_id: String,
    mode: String,
}

impl MetricsTracker {
    pub fn new(session_id: impl Into<String>, mode: impl Into<String>) -> Self {
        Self {
            cases: Vec::new(),
            session_id: session_id.into(),
            mode: mode.into(),
        }
    }

    pub fn add_case(&mut self, result: CaseResult) {
        self.cases.push(result);
    }

    pub fn cases(&self) -> &[CaseResult] {
        &self.cases
    }

    /// Build aggregated metrics
    pub fn build(&self) -> BenchmarkMetrics {
        let total = self.cases.len();

        let criterion_rates = CritiqueCriterion::ALL
            .iter()
            .map(|&criterion| {
                let passed: usize = self
                    .cases
                    .iter()
                    .map(|c| usize::from(c.score(criterion)))
                    .sum();
                CriterionRate {
                    criterion,
                    pass_rate: ratio(passed, total) * 100.0,
                }
            })
            .collect();

        // (expected, predicted) for labelled cases only
        let pairs: Vec<(Outcome, Option<Outcome>)> = self
            .cases
            .iter()
            .filter_map(|c| c.expected.map(|e| (e, c.predicted)))
            .collect();
        let scored = pairs.len();

        let correct = pairs.iter().filter(|(e, p)| Some(*e) == *p).count();
        let expected_wins = pairs.iter().filter(|(e, _)| *e == Outcome::Win).count();
        let model_wins = pairs
            .iter()
            .filter(|(_, p)| *p == Some(Outcome::Win))
            .count();

        let mut labels: Vec<Outcome> = pairs.iter().map(|(e, _)| *e).collect();
        labels.sort_by_key(|l| l.label());
        labels.dedup();

        let per_label: Vec<LabelMetrics> = labels
            .iter()
            .map(|&label| {
                let tp = pairs
                    .iter()
                    .filter(|(e, p)| *e == label && *p == Some(label))
                    .count();
                let fp = pairs
                    .iter()
                    .filter(|(e, p)| *e != label && *p == Some(label))
                    .count();
                let fn_ = pairs
                    .iter()
                    .filter(|(e, p)| *e == label && *p != Some(label))
                    .count();
                let precision = ratio(tp, tp + fp);
                let recall = ratio(tp, tp + fn_);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                LabelMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support: tp + fn_,
                }
            })
            .collect();

        let macro_f1 = if per_label.is_empty() {
            0.0
        } else {
            per_label.iter().map(|m| m.f1).sum::<f64>() / per_label.len() as f64
        };

        BenchmarkMetrics {
            session_id: self.session_id.clone(),
            mode: self.mode.clone(),
            total_cases: total,
            scored_cases: scored,
            criterion_rates,
            accuracy: ratio(correct, scored) * 100.0,
            macro_f1,
            expected_win_rate: ratio(expected_wins, scored) * 100.0,
            model_win_rate: ratio(model_wins, scored) * 100.0,
            per_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::Outcome::{Draw, Loss, Win};

    fn item(criteria: CritiqueCriterion, score: u8) -> CritiqueItem {
        CritiqueItem {
            criteria,
            score,
            reason: "r".into(),
        }
    }

    fn case(
        id: &str,
        expected: Option<Outcome>,
        predicted: Option<Outcome>,
        scores: [u8; 3],
    ) -> CaseResult {
        CaseResult {
            case_id: id.into(),
            expected,
            predicted,
            critique: CritiqueCriterion::ALL
                .iter()
                .zip(scores)
                .map(|(c, s)| item(*c, s))
                .collect(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_tracker() {
        let metrics = MetricsTracker::new("s", "trained").build();
        assert_eq!(metrics.total_cases, 0);
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.macro_f1, 0.0);
        assert!(metrics.per_label.is_empty());
        assert!(metrics.criterion_rates.iter().all(|r| r.pass_rate == 0.0));
    }

    #[test]
    fn test_pass_rates_count_missing_as_zero() {
        let mut tracker = MetricsTracker::new("s", "untrained");
        tracker.add_case(case("1", None, Some(Win), [1, 1, 0]));
        tracker.add_case(CaseResult {
            case_id: "2".into(),
            expected: None,
            predicted: Some(Loss),
            critique: Vec::new(),
        });
        let metrics = tracker.build();
        let logic = metrics.pass_rate(CritiqueCriterion::LogicalConsistency);
        let social = metrics.pass_rate(CritiqueCriterion::SocialConsideration);
        assert!(close(logic, 50.0));
        assert!(close(social, 0.0));
        assert_eq!(metrics.scored_cases, 0);
    }

    #[test]
    fn test_accuracy_and_macro_f1() {
        let mut tracker = MetricsTracker::new("s", "trained");
        tracker.add_case(case("1", Some(Win), Some(Win), [1, 1, 1]));
        tracker.add_case(case("2", Some(Win), Some(Loss), [1, 0, 1]));
        tracker.add_case(case("3", Some(Loss), Some(Loss), [0, 0, 1]));
        tracker.add_case(case("4", Some(Loss), Some(Win), [1, 1, 1]));
        tracker.add_case(case("5", None, Some(Draw), [1, 1, 1]));
        let metrics = tracker.build();

        assert_eq!(metrics.total_cases, 5);
        assert_eq!(metrics.scored_cases, 4);
        assert!(close(metrics.accuracy, 50.0));
        assert!(close(metrics.expected_win_rate, 50.0));
        assert!(close(metrics.model_win_rate, 50.0));
        // Each label: P = R = 0.5
        assert_eq!(metrics.per_label.len(), 2);
        for m in &metrics.per_label {
            assert!(close(m.precision, 0.5));
            assert!(close(m.recall, 0.5));
            assert!(close(m.f1, 0.5));
            assert_eq!(m.support, 2);
        }
        assert!(close(metrics.macro_f1, 0.5));
        let social = metrics.pass_rate(CritiqueCriterion::SocialConsideration);
        assert!(close(social, 100.0));
    }

    #[test]
    fn test_labels_limited_to_expected_set() {
        let mut tracker = MetricsTracker::new("s", "trained");
        tracker.add_case(case("1", Some(Win), Some(Draw), [0, 0, 0]));
        tracker.add_case(case("2", Some(Win), None, [0, 0, 0]));
        let metrics = tracker.build();
        assert_eq!(metrics.per_label.len(), 1);
        assert_eq!(metrics.per_label[0].label, Outcome::Win);
        assert_eq!(metrics.macro_f1, 0.0);
        assert_eq!(metrics.accuracy, 0.0);
    }

    #[test]
    fn test_report_and_json() {
        let mut tracker = MetricsTracker::new("session-1", "trained");
        tracker.add_case(case("1", Some(Win), Some(Win), [1, 0, 1]));
        let metrics = tracker.build();
        let report = metrics.format_report();
        assert!(report.contains("# Benchmark Results (trained)"));
        assert!(report.contains("| 논리적 일관성 | 100.00% |"));
        assert!(report.contains("| 승리 | 1.00 | 1.00 | 1.00 | 1 |"));
        let json = metrics.to_json().unwrap();
        assert!(json.contains("\"session_id\": \"session-1\""));
    }

    #[test]
    fn test_case_result_correctness() {
        let labelled = case("1", Some(Draw), Some(Draw), [1, 1, 1]);
        assert_eq!(labelled.is_correct(), Some(true));
        let unlabelled = case("2", None, Some(Draw), [1, 1, 1]);
        assert_eq!(unlabelled.is_correct(), None);
        assert!(!unlabelled.is_scorable());
    }
}
