use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// A student's persisted result for one quiz attempt.
///
/// `max_marks` is a snapshot of the quiz ceiling at submission time; it is
/// deliberately not a live reference and only changes through the explicit
/// resync operation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Score {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub quiz_title: String,
    pub college: String,
    pub percentage: rust_decimal::Decimal,
    pub total_score: rust_decimal::Decimal,
    pub max_marks: rust_decimal::Decimal,
    pub display_score: Option<rust_decimal::Decimal>,
    pub display_max_marks: Option<rust_decimal::Decimal>,
    pub answers: JsonValue,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Immutable audit record appended on every admin edit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScoreEdit {
    pub id: Uuid,
    pub score_id: Uuid,
    pub field: String,
    pub question_index: Option<i32>,
    pub old_value: rust_decimal::Decimal,
    pub new_value: rust_decimal::Decimal,
    pub reason: String,
    pub edited_by: Uuid,
    pub created_at: Option<DateTime<Utc>>,
}

/// One graded answer inside `scores.answers`. `points_awarded` and
/// `instruction_score` are decimals because admin edits may set fractional
/// values; grading itself only awards whole option points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: i32,
    pub selected_option: Option<i32>,
    #[serde(default)]
    pub ranking: Option<Vec<i32>>,
    #[serde(default)]
    pub reasoning: Option<String>,
    pub points_awarded: rust_decimal::Decimal,
    #[serde(default)]
    pub instruction_score: Option<rust_decimal::Decimal>,
    pub max_points: i32,
}
