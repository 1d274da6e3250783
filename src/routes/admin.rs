use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::admin_dto::{CreateStudentRequest, ResyncResult, UpdateLicenseRequest};
use crate::dto::quiz_dto::{CreateQuizPayload, UpdateQuizPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::services::license_service::{LicenseGate, LicenseTransition};
use crate::services::notification_service::{
    EVENT_LICENSE_DISABLED, EVENT_LICENSE_EXPIRED, EVENT_LICENSE_LIMIT_REACHED,
    EVENT_LICENSE_REACTIVATED,
};
use crate::AppState;

// --- students ---

#[utoipa::path(
    get,
    path = "/api/admin/students",
    responses(
        (status = 200, description = "Students of the caller's college")
    )
)]
#[axum::debug_handler]
pub async fn list_students(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let students = state
        .student_service
        .list_students(claims.college())
        .await?;
    Ok(Json(students))
}

#[utoipa::path(
    post,
    path = "/api/admin/students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student created"),
        (status = 400, description = "Invalid payload or duplicate email"),
        (status = 403, description = "License missing, inactive, or at capacity")
    )
)]
#[axum::debug_handler]
pub async fn create_student(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateStudentRequest>,
) -> Result<impl IntoResponse> {
    req.validate()?;
    let college = claims.college().to_string();

    let current = state
        .student_service
        .count_active_students(&college)
        .await?;
    match state
        .license_service
        .check_can_add_student(&college, current)
        .await?
    {
        LicenseGate::Allowed => {}
        LicenseGate::NotLicensed(reason) => return Err(Error::Forbidden(reason)),
        LicenseGate::LimitReached => {
            if let Err(e) = state
                .notification_service
                .enqueue_license_event(
                    EVENT_LICENSE_LIMIT_REACHED,
                    &college,
                    "Student limit for this license has been reached",
                )
                .await
            {
                tracing::error!(college = %college, error = ?e, "Failed to enqueue license event");
            }
            return Err(Error::Forbidden(
                "License student limit reached".to_string(),
            ));
        }
    }

    let user = state.student_service.create_student(req, &college).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "college": user.college,
        })),
    ))
}

// --- license ---

#[utoipa::path(
    get,
    path = "/api/admin/license",
    responses(
        (status = 200, description = "License of the caller's college"),
        (status = 404, description = "No license registered")
    )
)]
#[axum::debug_handler]
pub async fn get_license(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let license = state.license_service.get_by_college(claims.college()).await?;
    Ok(Json(license))
}

#[utoipa::path(
    put,
    path = "/api/admin/license/{college}",
    params(
        ("college" = String, Path, description = "College name")
    ),
    request_body = UpdateLicenseRequest,
    responses(
        (status = 200, description = "License updated"),
        (status = 400, description = "Unknown status value"),
        (status = 403, description = "Super admin only")
    )
)]
#[axum::debug_handler]
pub async fn update_license(
    State(state): State<AppState>,
    Path(college): Path<String>,
    Json(req): Json<UpdateLicenseRequest>,
) -> Result<impl IntoResponse> {
    req.validate()?;
    let (license, transition) = state.license_service.update_license(&college, req).await?;

    let event = match transition {
        Some(LicenseTransition::Disabled) => {
            Some((EVENT_LICENSE_DISABLED, "License has been disabled"))
        }
        Some(LicenseTransition::Reactivated) => {
            Some((EVENT_LICENSE_REACTIVATED, "License has been reactivated"))
        }
        Some(LicenseTransition::Expired) => {
            Some((EVENT_LICENSE_EXPIRED, "License has expired"))
        }
        None => None,
    };
    if let Some((event_type, message)) = event {
        if let Err(e) = state
            .notification_service
            .enqueue_license_event(event_type, &college, message)
            .await
        {
            tracing::error!(college = %college, error = ?e, "Failed to enqueue license event");
        }
    }

    Ok(Json(license))
}

// --- quizzes ---

#[utoipa::path(
    post,
    path = "/api/admin/quizzes",
    request_body = CreateQuizPayload,
    responses(
        (status = 201, description = "Quiz created"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let quiz = state
        .quiz_service
        .create_quiz(payload, claims.user_id()?)
        .await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

#[utoipa::path(
    get,
    path = "/api/admin/quizzes",
    responses(
        (status = 200, description = "All quizzes")
    )
)]
#[axum::debug_handler]
pub async fn list_quizzes(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let quizzes = state.quiz_service.list_quizzes().await?;
    Ok(Json(quizzes))
}

#[utoipa::path(
    get,
    path = "/api/admin/quizzes/{id}",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 200, description = "Quiz"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let quiz = state.quiz_service.get_quiz_by_id(id).await?;
    Ok(Json(quiz))
}

#[utoipa::path(
    patch,
    path = "/api/admin/quizzes/{id}",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    request_body = UpdateQuizPayload,
    responses(
        (status = 200, description = "Quiz updated; existing scores keep their snapshot"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn update_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuizPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let quiz = state.quiz_service.update_quiz(id, payload).await?;
    Ok(Json(quiz))
}

#[utoipa::path(
    delete,
    path = "/api/admin/quizzes/{id}",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 204, description = "Quiz deleted"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.quiz_service.delete_quiz(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/quizzes/{id}/reset",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 200, description = "All scores for the quiz deleted; quiz untouched"),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn reset_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    // 404 before deleting anything
    let quiz = state.quiz_service.get_quiz_by_id(id).await?;
    let deleted = state.score_service.reset_quiz_scores(quiz.id).await?;
    Ok(Json(json!({
        "quiz_id": quiz.id,
        "scores_deleted": deleted,
    })))
}

#[utoipa::path(
    post,
    path = "/api/admin/quizzes/{id}/resync-scores",
    params(("id" = Uuid, Path, description = "Quiz ID")),
    responses(
        (status = 200, description = "Score snapshots re-synced to the quiz ceiling", body = Json<ResyncResult>),
        (status = 404, description = "Quiz not found")
    )
)]
#[axum::debug_handler]
pub async fn resync_quiz_scores(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let quiz = state.quiz_service.get_quiz_by_id(id).await?;
    let (updated, ceiling) = state.score_service.resync_quiz_scores(&quiz).await?;
    Ok(Json(ResyncResult {
        quiz_id: quiz.id,
        scores_updated: updated,
        max_marks: ceiling,
    }))
}
