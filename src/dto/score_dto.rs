use crate::models::score::{Score, ScoreEdit};
use crate::services::scoring::ScoringService;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    #[validate(length(min = 1))]
    pub answers: Vec<SubmitAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswer {
    pub question_id: i32,
    pub selected_option: Option<i32>,
    #[serde(default)]
    pub ranking: Option<Vec<i32>>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuizResponse {
    pub score_id: uuid::Uuid,
    pub percentage: rust_decimal::Decimal,
    pub total_score: rust_decimal::Decimal,
    pub max_marks: rust_decimal::Decimal,
    pub misconfigured: bool,
}

/// Admin edit request. Exactly one of the three targets must be present;
/// `reason` is mandatory and may not be blank.
///
/// Question scores may not exceed the question's own maximum. A question
/// edit re-derives the total from all answers and therefore takes
/// precedence over any earlier total-percentage override.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EditScoreRequest {
    pub new_total_percentage: Option<f64>,
    pub question_index: Option<i32>,
    pub new_question_score: Option<f64>,
    pub new_instruction_score: Option<f64>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub id: uuid::Uuid,
    pub quiz_id: uuid::Uuid,
    pub student_id: uuid::Uuid,
    pub student_name: String,
    pub quiz_title: String,
    pub college: String,
    pub percentage: rust_decimal::Decimal,
    /// Full-precision stored marks.
    pub total_score: rust_decimal::Decimal,
    pub max_marks: rust_decimal::Decimal,
    /// Rounded (or overridden) values for presentation.
    pub display_score: rust_decimal::Decimal,
    pub display_max_marks: rust_decimal::Decimal,
    pub answers: serde_json::Value,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Score> for ScoreResponse {
    fn from(s: Score) -> Self {
        let display_score = s
            .display_score
            .unwrap_or_else(|| ScoringService::display(s.total_score));
        let display_max_marks = s
            .display_max_marks
            .unwrap_or_else(|| ScoringService::display(s.max_marks));
        Self {
            id: s.id,
            quiz_id: s.quiz_id,
            student_id: s.student_id,
            student_name: s.student_name,
            quiz_title: s.quiz_title,
            college: s.college,
            percentage: s.percentage,
            total_score: s.total_score,
            max_marks: s.max_marks,
            display_score,
            display_max_marks,
            answers: s.answers,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreDetailResponse {
    #[serde(flatten)]
    pub score: ScoreResponse,
    pub edits: Vec<ScoreEdit>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ScoreFilter {
    pub quiz_id: Option<uuid::Uuid>,
    pub student_id: Option<uuid::Uuid>,
    pub college: Option<String>,
}
