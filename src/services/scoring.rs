use serde::{Deserialize, Serialize};

/// Fraction of a correct answer cancelled by each wrong answer.
pub const WRONG_ANSWER_PENALTY: f64 = 0.25;

/// Raw answer counts for one subject.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnswerCounts {
    #[serde(default)]
    pub correct: u32,
    #[serde(default)]
    pub wrong: u32,
    #[serde(default)]
    pub blank: u32,
}

impl AnswerCounts {
    pub fn new(correct: u32, wrong: u32, blank: u32) -> Self {
        Self {
            correct,
            wrong,
            blank,
        }
    }

    /// A subject with no answers at all was not attempted.
    pub fn is_empty(&self) -> bool {
        self.correct == 0 && self.wrong == 0 && self.blank == 0
    }

    pub fn net(&self) -> f64 {
        net_score(self.correct, self.wrong)
    }
}

/// `correct - wrong * WRONG_ANSWER_PENALTY`. Blanks never count.
pub fn net_score(correct: u32, wrong: u32) -> f64 {
    f64::from(correct) - f64::from(wrong) * WRONG_ANSWER_PENALTY
}
