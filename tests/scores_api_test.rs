use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;
use xaction_backend::models::user::User;
use xaction_backend::{routes, AppState};

async fn setup() -> Option<AppState> {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    }
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var("NOTIFY_WEBHOOK_URL", "http://localhost:9/notify");
    env::set_var("NOTIFY_WEBHOOK_SECRET", "nwsec_test");
    env::set_var("PUBLIC_RPS", "1000");
    env::set_var("ADMIN_RPS", "1000");

    let _ = xaction_backend::config::init_config();
    let pool = xaction_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    Some(AppState::new(pool))
}

async fn seed_user(state: &AppState, role: &str, college: &str) -> User {
    let id = Uuid::new_v4();
    let hash = xaction_backend::utils::crypto::hash_password("password123").expect("hash");
    sqlx::query(
        r#"INSERT INTO users (id, name, email, password_hash, role, college)
           VALUES ($1, $2, $3, $4, $5, $6)"#,
    )
    .bind(id)
    .bind(format!("{} {}", role, id))
    .bind(format!("{}_{}@example.com", role, id))
    .bind(&hash)
    .bind(role)
    .bind(college)
    .execute(&state.pool)
    .await
    .expect("seed user");

    sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
        .bind(id)
        .fetch_one(&state.pool)
        .await
        .expect("fetch seeded user")
}

fn token_for(user: &User) -> String {
    xaction_backend::utils::token::issue_token(user, 1).expect("token")
}

fn app(state: AppState) -> Router {
    let public_side = Router::new()
        .route(
            "/api/simulations/public",
            get(routes::public::list_public_simulations),
        )
        .route(
            "/api/simulations/:id/submit",
            post(routes::public::submit_simulation).layer(axum::middleware::from_fn(
                xaction_backend::middleware::auth::require_student,
            )),
        );

    let score_side = Router::new()
        .route("/api/scores", get(routes::scores::list_scores))
        .route("/api/scores/:id", get(routes::scores::get_score))
        .layer(axum::middleware::from_fn(
            xaction_backend::middleware::auth::require_bearer_auth,
        ));

    let edit_side = Router::new()
        .route("/api/scores/:id/edit", put(routes::scores::edit_score))
        .layer(axum::middleware::from_fn(
            xaction_backend::middleware::auth::require_admin,
        ));

    let admin_side = Router::new()
        .route(
            "/api/admin/quizzes",
            post(routes::admin::create_quiz),
        )
        .route(
            "/api/admin/quizzes/:id",
            get(routes::admin::get_quiz).patch(routes::admin::update_quiz),
        )
        .route(
            "/api/admin/quizzes/:id/reset",
            post(routes::admin::reset_quiz),
        )
        .route(
            "/api/admin/quizzes/:id/resync-scores",
            post(routes::admin::resync_quiz_scores),
        )
        .layer(axum::middleware::from_fn(
            xaction_backend::middleware::auth::require_admin,
        ));

    public_side
        .merge(score_side)
        .merge(edit_side)
        .merge(admin_side)
        .with_state(state)
}

fn dec_field(value: &JsonValue) -> f64 {
    if let Some(s) = value.as_str() {
        s.parse().expect("numeric string")
    } else {
        value.as_f64().expect("number")
    }
}

async fn json_body(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str, token: &str, body: Option<JsonValue>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));
    match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn five_question_quiz() -> JsonValue {
    let questions: Vec<JsonValue> = (0..5)
        .map(|i| {
            json!({
                "prompt": format!("Question {}", i + 1),
                "options": [
                    {"text": "wrong", "points": 0},
                    {"text": "right", "points": 1}
                ]
            })
        })
        .collect();
    json!({
        "title": "Market Entry Simulation",
        "max_marks": 50.0,
        "questions": questions
    })
}

#[tokio::test]
async fn submit_edit_audit_and_resync_flow() {
    let Some(state) = setup().await else { return };
    let college = format!("Hilltop-{}", Uuid::new_v4());

    let admin = seed_user(&state, "college_admin", &college).await;
    let student = seed_user(&state, "student", &college).await;
    let outsider = seed_user(&state, "college_admin", "Elsewhere").await;

    let admin_token = token_for(&admin);
    let student_token = token_for(&student);
    let outsider_token = token_for(&outsider);

    let app = app(state.clone());

    // admin creates a quiz with a 50-mark ceiling
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/admin/quizzes",
            &admin_token,
            Some(five_question_quiz()),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let quiz = json_body(resp).await;
    let quiz_id = quiz["id"].as_str().unwrap().to_string();

    // student answers 4 of 5 correctly: 80% of 50 -> 40 marks
    let answers: Vec<JsonValue> = (1..=5)
        .map(|qid| json!({"question_id": qid, "selected_option": if qid <= 4 { 1 } else { 0 }}))
        .collect();
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/simulations/{}/submit", quiz_id),
            &student_token,
            Some(json!({ "answers": answers })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(dec_field(&body["percentage"]), 80.0);
    assert_eq!(dec_field(&body["total_score"]), 40.0);
    assert_eq!(dec_field(&body["max_marks"]), 50.0);
    assert_eq!(body["misconfigured"], json!(false));
    let score_id = body["score_id"].as_str().unwrap().to_string();

    // a submission lands a score-submitted event in the college room
    let (event_count,): (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM notification_events WHERE room = $1 AND event_type = 'score-submitted'"#,
    )
    .bind(&college)
    .fetch_one(&state.pool)
    .await
    .unwrap();
    assert_eq!(event_count, 1);

    // empty reason is rejected no matter how valid the value is
    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/scores/{}/edit", score_id),
            &admin_token,
            Some(json!({"new_total_percentage": 90.0, "reason": "   "})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // out-of-range percentage is rejected
    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/scores/{}/edit", score_id),
            &admin_token,
            Some(json!({"new_total_percentage": 100.5, "reason": "fix"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // a question edit above the question's own 1-point maximum is rejected,
    // even though the value fits the global range
    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/scores/{}/edit", score_id),
            &admin_token,
            Some(json!({"question_index": 0, "new_question_score": 5.0, "reason": "overshoot"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // students cannot reach the edit endpoint at all
    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/scores/{}/edit", score_id),
            &student_token,
            Some(json!({"new_total_percentage": 90.0, "reason": "self-serve"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // an admin from another college is forbidden too
    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/scores/{}/edit", score_id),
            &outsider_token,
            Some(json!({"new_total_percentage": 90.0, "reason": "not mine"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // two sequential edits append two ordered audit entries
    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/scores/{}/edit", score_id),
            &admin_token,
            Some(json!({"new_total_percentage": 90.0, "reason": "moderation uplift"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/scores/{}/edit", score_id),
            &admin_token,
            Some(json!({"new_total_percentage": 70.0, "reason": "appeal outcome"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(dec_field(&body["score"]["total_score"]), 35.0);

    let resp = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/scores/{}", score_id),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let detail = json_body(resp).await;
    let edits = detail["edits"].as_array().unwrap();
    assert_eq!(edits.len(), 2);
    assert_eq!(edits[0]["reason"], json!("moderation uplift"));
    assert_eq!(edits[1]["reason"], json!("appeal outcome"));
    assert_eq!(dec_field(&edits[1]["old_value"]), 90.0);
    assert_eq!(dec_field(&edits[1]["new_value"]), 70.0);

    // raising the quiz ceiling leaves the stored snapshot alone...
    let resp = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/api/admin/quizzes/{}", quiz_id),
            &admin_token,
            Some(json!({"max_marks": 80.0})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/scores/{}", score_id),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    let detail = json_body(resp).await;
    assert_eq!(dec_field(&detail["max_marks"]), 50.0);

    // ...until the explicit resync re-derives against the new ceiling
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/admin/quizzes/{}/resync-scores", quiz_id),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["scores_updated"], json!(1));

    let resp = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/scores/{}", score_id),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    let detail = json_body(resp).await;
    assert_eq!(dec_field(&detail["max_marks"]), 80.0);
    // 70% of 80
    assert_eq!(dec_field(&detail["total_score"]), 56.0);

    // quiz reset deletes the scores but never the quiz
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/admin/quizzes/{}/reset", quiz_id),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["scores_deleted"], json!(1));

    let resp = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/scores/{}", score_id),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/admin/quizzes/{}", quiz_id),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn quiz_without_max_marks_falls_back_and_flags() {
    let Some(state) = setup().await else { return };
    let college = format!("Lakeside-{}", Uuid::new_v4());

    let admin = seed_user(&state, "college_admin", &college).await;
    let student = seed_user(&state, "student", &college).await;
    let admin_token = token_for(&admin);
    let student_token = token_for(&student);

    let app = app(state.clone());

    let mut payload = five_question_quiz();
    payload.as_object_mut().unwrap().remove("max_marks");
    let resp = app
        .clone()
        .oneshot(request("POST", "/api/admin/quizzes", &admin_token, Some(payload)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let quiz = json_body(resp).await;
    let quiz_id = quiz["id"].as_str().unwrap().to_string();

    let answers: Vec<JsonValue> = (1..=5)
        .map(|qid| json!({"question_id": qid, "selected_option": 1}))
        .collect();
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/simulations/{}/submit", quiz_id),
            &student_token,
            Some(json!({ "answers": answers })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    assert_eq!(body["misconfigured"], json!(true));
    assert_eq!(dec_field(&body["max_marks"]), 100.0);
    assert_eq!(dec_field(&body["total_score"]), 100.0);

    let resp = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/admin/quizzes/{}", quiz_id),
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    let quiz = json_body(resp).await;
    assert_eq!(quiz["misconfigured"], json!(true));
}
