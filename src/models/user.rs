use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub college: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

pub const ROLE_STUDENT: &str = "student";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_COLLEGE_ADMIN: &str = "college_admin";
pub const ROLE_SUPER_ADMIN: &str = "super_admin";

pub const ADMIN_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_COLLEGE_ADMIN, ROLE_SUPER_ADMIN];
