//! Associate adjudicator personas.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of associate adjudicators seated for one trial.
pub const ASSOCIATE_BENCH_SIZE: usize = 3;

/// A judging style an associate adjudicator is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JudgePersona {
    pub name: String,
    pub description: String,
}

impl JudgePersona {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

const PERSONA_POOL: [(&str, &str); 5] = [
    (
        "법리/판례 기반 판사",
        "과거의 법률과 유사 판례에만 근거하여 판단합니다. 사회적 여론이나 개인적인 감정은 철저히 배제합니다.",
    ),
    (
        "윤리/도덕 기반 판사",
        "법의 잣대를 넘어, 이 사건이 윤리적으로 어떤 의미를 갖는지, 그리고 더 정의로운 결정은 무엇인지 고심합니다.",
    ),
    (
        "사회적 이슈 기반 판사",
        "이 판결이 사회에 미칠 영향과 현재의 사회적 통념 및 여론을 가장 중요한 판단 기준으로 삼습니다.",
    ),
    (
        "결과주의 판사",
        "판결의 과정보다는, 어떤 판결이 궁극적으로 사회에 가장 큰 이익을 가져올 것인지 그 결과에만 집중합니다.",
    ),
    (
        "원칙주의 판사",
        "어떤 상황에서든 예외를 허용하지 않으며, 정해진 법률 원칙을 고수하는 것을 최우선으로 생각합니다.",
    ),
];

/// The fixed pool every trial samples its bench from.
pub fn persona_pool() -> Vec<JudgePersona> {
    PERSONA_POOL
        .iter()
        .map(|(name, description)| JudgePersona::new(name, description))
        .collect()
}

/// Sample `count` distinct personas uniformly without replacement.
///
/// `count` is clamped to the pool size.
pub fn select_judges<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<JudgePersona> {
    let pool = persona_pool();
    pool.choose_multiple(rng, count.min(pool.len()))
        .cloned()
        .collect()
}
