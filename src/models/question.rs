use serde::{Deserialize, Serialize};

/// A quiz question as stored inside `quizzes.questions`. Every option
/// carries its own point value; the selected option's points are what the
/// student earns for the question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: i32,
    pub prompt: String,
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub instruction: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    pub text: String,
    #[serde(default)]
    pub points: i32,
}

impl Question {
    /// The best points obtainable on this question.
    pub fn max_points(&self) -> i32 {
        self.options.iter().map(|o| o.points).max().unwrap_or(0)
    }
}
