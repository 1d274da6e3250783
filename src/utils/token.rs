use crate::config::get_config;
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::user::User;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

pub fn issue_token(user: &User, ttl_hours: i64) -> Result<String> {
    let claims = Claims {
        sub: user.id.to_string(),
        exp: (Utc::now() + Duration::hours(ttl_hours)).timestamp() as usize,
        role: Some(user.role.clone()),
        college: Some(user.college.clone()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(get_config().jwt_secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
}
