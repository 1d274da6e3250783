use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Admin-set marks ceiling. NULL means the quiz was never configured;
    /// normalization falls back to 100 and flags the quiz.
    pub max_marks: Option<rust_decimal::Decimal>,
    pub questions: JsonValue,
    pub misconfigured: bool,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
