use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::dto::auth_dto::{LoginRequest, LoginResponse};
use crate::error::{Error, Result};
use crate::utils::crypto::verify_password;
use crate::utils::token::issue_token;
use crate::AppState;

const TOKEN_TTL_HOURS: i64 = 12;

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = Json<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    req.validate()?;

    let user = state
        .student_service
        .get_user_by_email(&req.email)
        .await?
        .ok_or_else(|| Error::Unauthorized("Invalid email or password".to_string()))?;

    if !user.is_active || !verify_password(&req.password, &user.password_hash)? {
        return Err(Error::Unauthorized("Invalid email or password".to_string()));
    }

    let token = issue_token(&user, TOKEN_TTL_HOURS)?;
    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        name: user.name,
        role: user.role,
        college: user.college,
    }))
}
