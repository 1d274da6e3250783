use crate::models::question::Question;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuizPayload {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    pub description: Option<String>,
    /// Marks ceiling. Omitting it leaves the quiz on the default ceiling
    /// and the first submission will flag it misconfigured.
    pub max_marks: Option<f64>,
    pub questions: Option<Vec<Question>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateQuizPayload {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub max_marks: Option<f64>,
    pub questions: Option<Vec<Question>>,
    pub is_active: Option<bool>,
}

/// What the public simulations listing exposes: no option point values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuizSummary {
    pub id: uuid::Uuid,
    pub title: String,
    pub description: Option<String>,
    pub max_marks: Option<rust_decimal::Decimal>,
    pub total_questions: usize,
}
