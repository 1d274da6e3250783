use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::user::{ADMIN_ROLES, ROLE_STUDENT, ROLE_SUPER_ADMIN};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
    pub college: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> crate::error::Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| crate::error::Error::Unauthorized("Malformed subject claim".to_string()))
    }

    pub fn role(&self) -> &str {
        self.role.as_deref().unwrap_or_default()
    }

    pub fn college(&self) -> &str {
        self.college.as_deref().unwrap_or_default()
    }

    pub fn is_super_admin(&self) -> bool {
        self.role().eq_ignore_ascii_case(ROLE_SUPER_ADMIN)
    }

    pub fn is_admin(&self) -> bool {
        ADMIN_ROLES
            .iter()
            .any(|r| r.eq_ignore_ascii_case(self.role()))
    }
}

fn unauthorized(reason: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": reason }))).into_response()
}

fn decode_claims(req: &Request) -> Result<Claims, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(unauthorized("missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(unauthorized("bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(unauthorized("unsupported_scheme"));
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| unauthorized("invalid_token"))
}

pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    match decode_claims(&req) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

pub async fn require_student(mut req: Request, next: Next) -> Response {
    match decode_claims(&req) {
        Ok(claims) => {
            if !claims.role().eq_ignore_ascii_case(ROLE_STUDENT) {
                return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"})))
                    .into_response();
            }
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

pub async fn require_admin(mut req: Request, next: Next) -> Response {
    match decode_claims(&req) {
        Ok(claims) => {
            if !claims.is_admin() {
                return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"})))
                    .into_response();
            }
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

pub async fn require_super_admin(mut req: Request, next: Next) -> Response {
    match decode_claims(&req) {
        Ok(claims) => {
            if !claims.is_super_admin() {
                return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"})))
                    .into_response();
            }
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}
