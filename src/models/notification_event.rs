use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One fan-out event, scoped to a college room. The delivery worker pushes
/// it to the notification server; clients may also poll it back.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub event_type: String,
    pub room: String,
    pub payload: JsonValue,
    pub target_url: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub http_status: Option<i32>,
    pub response_body: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
