//! Prompt templates for each courtroom role.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever a template changes so a
//! logged response can be traced back to the wording that produced it.
//!
//! Templates use `{name}` placeholders for the variables the trial engine
//! binds (see [`PromptTemplate::variables`]); `{{` and `}}` are literal braces.

use courtroom::{GenerationError, PromptTemplate, PromptVars};

/// Prompt version. Bump on any template change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Shared system preamble: every role answers in Korean, in character.
const COURT_PREAMBLE: &str = "\
당신은 대한민국 민사 법정을 모사하는 시뮬레이션의 참여자입니다. \
주어진 역할에서 벗어나지 말고, 모든 답변은 한국어로 작성하세요.";

const ADVOCATE: &str = "\
# 역할
당신은 {client_type}의 소송대리인입니다.

# 목표
사건 기록과 지금까지의 변론을 토대로 의뢰인에게 가장 유리하면서도 현실적인 결론을 끌어내세요.
- 의뢰인의 책임이 분명하다면 전면 승소 대신 책임과 손해를 줄이는 쪽으로 변론하세요.
- 근거 없는 주장으로 재판부의 신뢰를 잃지 마세요.

# 지침
1. 모든 주장은 사건 기록의 사실과 증거에 근거합니다.
2. 상대방 주장을 짧게 정리한 뒤 그 허점을 짚어 반박합니다.
3. 핵심 쟁점에 집중합니다.
4. 과거 재판의 교훈 중 성공 전략은 살리고 실패 전략은 피합니다.
5. 유사 사건과 이번 사건을 비교해 전략을 세웁니다.

[사건 기록]
{case_file}

[유사 과거 사건]
{similar_cases}

[과거 재판의 교훈]
{past_lessons}

[지금까지의 변론]
{transcript}

이제 당신의 차례입니다. 변론을 진행하세요.";

const ASSOCIATE_JUDGE: &str = "\
# 역할
당신은 합의부의 배석판사입니다.
- 이름: {judge_name}
- 판단 기준: {judge_description}

# 임무
아래 변론 전체를 읽고, 위 판단 기준에 따라 이 사건에 대한 의견을 한 문단으로 밝히세요.

[변론 기록]
{transcript}

[배석판사 의견]";

const PRESIDING_JUDGE: &str = "\
# 역할
당신은 이 재판의 재판장입니다.

# 임무
변론 기록과 배석판사들의 의견을 종합해 최종 판결문을 작성하세요.
판결문은 반드시 \"주문:\"으로 시작하고, 판결 요지를 간결하게 밝혀야 합니다.

[변론 기록]
{transcript}

[배석판사 의견]
{judge_verdicts}

[최종 판결문]";

const BATCH_JUDGE: &str = "\
# 역할
당신은 이 사건을 심리하는 판사입니다.

# 임무
원고와 피고의 진술에서 쟁점을 정리하고 최종 판결문을 작성하세요.
판결문은 반드시 \"주문:\"으로 시작하고, 핵심 이유를 두세 문장으로 덧붙이세요.

[원고 진술]
{plaintiff_statement}

[피고 진술]
{defendant_statement}

[최종 판결문]";

const OUTCOME_CLASSIFIER: &str = "\
# 역할
당신은 판결 분석가입니다.

# 임무
아래 판결문을 원고 입장에서 판정하세요.
- 원고 청구가 전부 또는 대부분 인용되었으면 \"승리\"
- 원고 청구가 전부 또는 대부분 기각되었으면 \"패배\"
- 일부 인용이나 조정 등 그 밖의 경우는 \"무승부\"
\"승리\", \"패배\", \"무승부\" 중 한 단어로만 답하세요.

[최종 판결문]
{final_verdict}

[원고 판정]";

const REFLECTION: &str = "\
# 역할
당신은 변론 전략 코치입니다.

# 임무
재판 결과와 본인의 변론을 돌아보고, 가장 효과적이었거나 가장 아쉬웠던 전략을 한 문장의 교훈으로 정리하세요.

[재판 결과]
{outcome}

[본인의 변론]
{my_speeches}

[교훈]";

const CRITIC: &str = "\
# 역할
당신은 객관적인 법률 분석가입니다.

# 임무
변론 기록과 최종 판결문을 읽고, 아래 세 기준 각각을 판결이 충족하는지 판단하세요.
- 충족하면 score 1, 미충족이면 score 0
- reason에는 판단 이유를 한 문장으로 적습니다.

# 평가 기준
1. 논리적 일관성: 변론과 판결의 논리가 서로 맞물리는가?
2. 법률적 타당성: 판결이 법 원칙과 일반적인 법 감정에 맞는가?
3. 사회적 가치 고려: 판결이 윤리적, 사회적 가치를 충분히 헤아렸는가?

다른 설명 없이 아래 형식의 JSON 객체 하나만 출력하세요.
{{
  \"evaluations\": [
    {{\"criteria\": \"논리적 일관성\", \"score\": 0, \"reason\": \"...\"}},
    {{\"criteria\": \"법률적 타당성\", \"score\": 0, \"reason\": \"...\"}},
    {{\"criteria\": \"사회적 가치 고려\", \"score\": 0, \"reason\": \"...\"}}
  ]
}}

[변론 기록]
{transcript}

[최종 판결문]
{final_verdict}";

/// System preamble for a template's agent.
pub fn preamble(template: PromptTemplate) -> &'static str {
    match template {
        PromptTemplate::OutcomeClassifier | PromptTemplate::Critic => {
            "당신은 지시된 형식으로만 답하는 판결 분석 도구입니다. 부가 설명을 붙이지 마세요."
        }
        _ => COURT_PREAMBLE,
    }
}

/// Raw template text.
pub fn template_text(template: PromptTemplate) -> &'static str {
    match template {
        PromptTemplate::Advocate => ADVOCATE,
        PromptTemplate::AssociateJudge => ASSOCIATE_JUDGE,
        PromptTemplate::PresidingJudge => PRESIDING_JUDGE,
        PromptTemplate::BatchJudge => BATCH_JUDGE,
        PromptTemplate::OutcomeClassifier => OUTCOME_CLASSIFIER,
        PromptTemplate::Reflection => REFLECTION,
        PromptTemplate::Critic => CRITIC,
    }
}

/// Substitute `vars` into the template. Every placeholder must be bound.
pub fn render(template: PromptTemplate, vars: &PromptVars) -> Result<String, GenerationError> {
    let text = template_text(template);
    let invalid = |message: String| GenerationError::InvalidPrompt { template, message };

    let mut out = String::with_capacity(text.len() + 256);
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let rest = &text[start + 1..];
                let end = rest
                    .find('}')
                    .ok_or_else(|| invalid(format!("unclosed placeholder at byte {start}")))?;
                let name = &rest[..end];
                let value = vars
                    .get(name)
                    .ok_or_else(|| invalid(format!("missing variable '{name}'")))?;
                out.push_str(value);
                // Skip the name and the closing brace.
                for _ in 0..name.chars().count() + 1 {
                    chars.next();
                }
            }
            '}' => return Err(invalid(format!("stray '}}' at byte {start}"))),
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Placeholder names appearing in a template, in order of first use.
pub fn placeholders(template: PromptTemplate) -> Vec<&'static str> {
    let text = template_text(template);
    let mut names = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        if after.starts_with('{') {
            rest = &after[1..];
            continue;
        }
        let Some(close) = after.find('}') else { break };
        let name = &after[..close];
        if !names.contains(&name) {
            names.push(name);
        }
        rest = &after[close + 1..];
    }
    names
}
