use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Per-institution entitlement: caps student count and gates access.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct License {
    pub id: Uuid,
    pub college: String,
    pub max_students: i32,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub const LICENSE_ACTIVE: &str = "active";
pub const LICENSE_EXPIRED: &str = "expired";
pub const LICENSE_DISABLED: &str = "disabled";
