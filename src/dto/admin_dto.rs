use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateLicenseRequest {
    #[validate(range(min = 0))]
    pub max_students: Option<i32>,
    pub status: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub college: String,
    pub is_active: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResyncResult {
    pub quiz_id: uuid::Uuid,
    pub scores_updated: u64,
    pub max_marks: rust_decimal::Decimal,
}
