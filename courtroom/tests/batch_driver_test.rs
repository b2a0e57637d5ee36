//! Batch learning and benchmark drivers over temp-file datasets.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use courtroom::batch::{
    load_cases, BatchError, BatchLearner, BenchmarkMode, BenchmarkRunner, CsvReport,
};
use courtroom::generation::vars;
use courtroom::{
    CaseArchive, CritiqueCriterion, GenerationError, Generator, InMemoryCaseArchive,
    InMemoryStrategyStore, JsonCaseArchive, JsonStrategyStore, Outcome, PromptTemplate, PromptVars,
    StrategyStore, TrialPhase,
};

/// Plaintiff wins whenever the plaintiff statement mentions "측정".
struct KeywordJudge {
    batch_calls: AtomicUsize,
    fail_after: Option<usize>,
}

impl KeywordJudge {
    fn new() -> Self {
        Self {
            batch_calls: AtomicUsize::new(0),
            fail_after: None,
        }
    }
}

#[async_trait]
impl Generator for KeywordJudge {
    async fn generate(
        &self,
        template: PromptTemplate,
        prompt_vars: &PromptVars,
    ) -> Result<String, GenerationError> {
        let text = match template {
            PromptTemplate::BatchJudge => {
                let n = self.batch_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_after.is_some_and(|limit| n >= limit) {
                    return Err(GenerationError::Inference {
                        template,
                        message: "rate limited".into(),
                    });
                }
                let plaintiff = prompt_vars.get(vars::PLAINTIFF_STATEMENT);
                if plaintiff.is_some_and(|p| p.contains("측정")) {
                    "주문: 원고 승소".to_string()
                } else {
                    "주문: 원고 청구 기각".to_string()
                }
            }
            PromptTemplate::PresidingJudge => {
                let transcript = prompt_vars.get(vars::TRANSCRIPT).unwrap_or_default();
                if transcript.contains("측정") {
                    "주문: 원고 승소".to_string()
                } else {
                    "주문: 원고 청구 기각".to_string()
                }
            }
            PromptTemplate::OutcomeClassifier => {
                if prompt_vars.get(vars::FINAL_VERDICT) == Some("주문: 원고 승소") {
                    "승리".to_string()
                } else {
                    "패배".to_string()
                }
            }
            PromptTemplate::Reflection => format!(
                "{} 사건에서 배운 점",
                prompt_vars.get(vars::OUTCOME).unwrap_or_default()
            ),
            PromptTemplate::Advocate => prompt_vars
                .get(vars::CASE_FILE)
                .unwrap_or_default()
                .lines()
                .next()
                .unwrap_or_default()
                .to_string(),
            PromptTemplate::AssociateJudge => "의견".to_string(),
            PromptTemplate::Critic => r#"[
                {"criteria": "논리적 일관성", "score": 1, "reason": "a"},
                {"criteria": "법률적 타당성", "score": 1, "reason": "b"},
                {"criteria": "사회적 가치 고려", "score": 0, "reason": "c"}
            ]"#
            .to_string(),
        };
        Ok(text)
    }
}

fn dataset(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

const TRAIN: [&str; 3] = [
    r#"{"caseId": 1, "plaintiff_statement": "소음 측정 결과 기준치 초과", "defendant_statement": "생활 소음일 뿐"}"#,
    r#"{"caseId": 2, "plaintiff_statement": "밤마다 시끄럽다", "defendant_statement": "증거가 없다"}"#,
    r#"{"caseId": "c-3", "plaintiff_statement": "층간소음 측정 보고서 제출", "defendant_statement": "방음 공사 완료"}"#,
];

#[tokio::test]
async fn learning_seeds_both_stores() {
    let file = dataset(&TRAIN);
    let cases = load_cases(file.path()).unwrap();
    let generator = KeywordJudge::new();
    let strategies = InMemoryStrategyStore::new();
    let archive = InMemoryCaseArchive::new();

    let mut seen = Vec::new();
    let summary = BatchLearner::new(&generator, &strategies, &archive)
        .with_pacing(Duration::ZERO)
        .run(&cases, |index, total, learned| {
            seen.push((index, total, learned.case_id.clone()));
        })
        .await
        .unwrap();

    assert_eq!(summary.cases, 3);
    assert_eq!(summary.wins, 2);
    assert_eq!(summary.losses, 1);
    assert_eq!(summary.strategies_recorded, 6);
    assert_eq!(
        seen,
        vec![
            (0, 3, "1".to_string()),
            (1, 3, "2".to_string()),
            (2, 3, "c-3".to_string())
        ]
    );

    assert_eq!(
        strategies
            .list_strategies("plaintiff_lawyer:successful_strategies")
            .unwrap(),
        vec!["승리 사건에서 배운 점", "승리 사건에서 배운 점"]
    );
    assert_eq!(
        strategies
            .list_strategies("defendant_lawyer:successful_strategies")
            .unwrap()
            .len(),
        1
    );

    let archived = archive.cases().unwrap();
    assert_eq!(archived.len(), 3);
    assert_eq!(
        archived[0].summary,
        "원고 주장: 소음 측정 결과 기준치 초과...\n피고 주장: 생활 소음일 뿐..."
    );
    assert_eq!(archived[1].verdict, "주문: 원고 청구 기각");
}

#[tokio::test]
async fn learning_aborts_on_capability_failure() {
    let file = dataset(&TRAIN);
    let cases = load_cases(file.path()).unwrap();
    let generator = KeywordJudge {
        batch_calls: AtomicUsize::new(0),
        fail_after: Some(1),
    };
    let strategies = InMemoryStrategyStore::new();
    let archive = InMemoryCaseArchive::new();

    let err = BatchLearner::new(&generator, &strategies, &archive)
        .with_pacing(Duration::ZERO)
        .run(&cases, |_, _, _| {})
        .await
        .unwrap_err();
    match err {
        BatchError::Generation { case_id, .. } => assert_eq!(case_id, "2"),
        other => panic!("unexpected error: {other}"),
    }
    // Only the first case made it in.
    assert_eq!(archive.case_count().unwrap(), 1);
}

#[tokio::test]
async fn benchmark_writes_rows_and_scores_predictions() {
    let file = dataset(&[
        r#"{"caseId": 10, "plaintiff_statement": "소음 측정 결과 제출", "defendant_statement": "부인", "expected_outcome": "승리"}"#,
        r#"{"caseId": 11, "plaintiff_statement": "시끄럽다", "defendant_statement": "증거 없음", "expected_outcome": "승리"}"#,
        r#"{"caseId": 12, "plaintiff_statement": "그냥 불편하다", "defendant_statement": "정상 생활", "expected_outcome": "패배"}"#,
        r#"{"caseId": 13, "plaintiff_statement": "측정 없음", "defendant_statement": "반박"}"#,
    ]);
    let cases = load_cases(file.path()).unwrap();
    let generator = KeywordJudge::new();
    let strategies = InMemoryStrategyStore::new();
    let archive = InMemoryCaseArchive::new();
    strategies
        .append_strategy("plaintiff_lawyer:successful_strategies", "old")
        .unwrap();

    let mut report = CsvReport::new(Vec::new()).unwrap();
    let mut debate_steps = 0;
    let metrics = BenchmarkRunner::new(&generator, &strategies, &archive)
        .with_pacing(Duration::ZERO)
        .run(BenchmarkMode::Untrained, &cases, &mut report, |_, _, event| {
            if event.phase == TrialPhase::Debate {
                debate_steps += 1;
            }
        })
        .await
        .unwrap();

    assert_eq!(debate_steps, 16);
    assert_eq!(metrics.mode, "untrained");
    assert_eq!(metrics.total_cases, 4);
    assert_eq!(metrics.scored_cases, 3);
    // 10 → win (correct), 11 → loss (wrong), 12 → loss (correct)
    assert!((metrics.accuracy - 200.0 / 3.0).abs() < 1e-9);
    let logic = metrics.pass_rate(CritiqueCriterion::LogicalConsistency);
    let social = metrics.pass_rate(CritiqueCriterion::SocialConsideration);
    assert!((logic - 100.0).abs() < 1e-9);
    assert_eq!(social, 0.0);
    assert_eq!(metrics.per_label.len(), 2);

    // Untrained mode wiped the seeded strategy before the first case.
    let successes = strategies
        .list_strategies("plaintiff_lawyer:successful_strategies")
        .unwrap();
    assert!(!successes.contains(&"old".to_string()));
    assert_eq!(archive.case_count().unwrap(), 4);

    assert_eq!(report.rows(), 4);
    let csv = String::from_utf8(report.into_inner()).unwrap();
    let lines: Vec<&str> = csv.trim_end().split("\r\n").collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("10,승리,승리,Y,1,a,1,b,0,c"));
    assert!(lines[2].starts_with("11,승리,패배,N,"));
    assert!(lines[4].starts_with("13,N/A,승리,N/A,"));
}

#[tokio::test]
async fn trained_mode_keeps_file_backed_knowledge() {
    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("cases.json");
    let strategies_path = dir.path().join("strategies.json");
    let strategies = JsonStrategyStore::open(&strategies_path).unwrap();
    let archive = JsonCaseArchive::open(&archive_path).unwrap();
    let generator = KeywordJudge::new();

    let train = dataset(&TRAIN[..1]);
    BatchLearner::new(&generator, &strategies, &archive)
        .with_pacing(Duration::ZERO)
        .run(&load_cases(train.path()).unwrap(), |_, _, _| {})
        .await
        .unwrap();

    let test = dataset(&[
        r#"{"caseId": 20, "plaintiff_statement": "소음 측정 결과 기준치 초과", "defendant_statement": "생활 소음일 뿐", "expected_outcome": "WIN"}"#,
    ]);
    let mut report = CsvReport::new(Vec::new()).unwrap();
    let metrics = BenchmarkRunner::new(&generator, &strategies, &archive)
        .with_pacing(Duration::ZERO)
        .run(
            BenchmarkMode::Trained,
            &load_cases(test.path()).unwrap(),
            &mut report,
            |_, _, _| {},
        )
        .await
        .unwrap();

    assert_eq!(metrics.per_label[0].label, Outcome::Win);
    // One learned case plus one benchmark case.
    let reopened = JsonCaseArchive::open(&archive_path).unwrap();
    assert_eq!(reopened.case_count().unwrap(), 2);
}
