use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, put},
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
    let admin_side = Router::new()
        .route(
            "/api/admin/students",
            get(routes::admin::list_students).post(routes::admin::create_student),
        )
        .route("/api/admin/license", get(routes::admin::get_license))
        .layer(axum::middleware::from_fn(
            xaction_backend::middleware::auth::require_admin,
        ));

    let super_side = Router::new()
        .route(
            "/api/admin/license/:college",
            put(routes::admin::update_license),
        )
        .layer(axum::middleware::from_fn(
            xaction_backend::middleware::auth::require_super_admin,
        ));

    let poll_side = Router::new()
        .route(
            "/api/notifications/poll",
            get(routes::notifications::poll_notifications),
        )
        .layer(axum::middleware::from_fn(
            xaction_backend::middleware::auth::require_bearer_auth,
        ));

    admin_side.merge(super_side).merge(poll_side).with_state(state)
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

fn new_student_body() -> JsonValue {
    json!({
        "name": "New Student",
        "email": format!("student_{}@example.com", Uuid::new_v4()),
        "password": "longenough1"
    })
}

#[tokio::test]
async fn license_gates_student_creation_and_broadcasts() {
    let Some(state) = setup().await else { return };
    let college = format!("Seaview-{}", Uuid::new_v4());

    let super_admin = seed_user(&state, "super_admin", "HQ").await;
    let admin = seed_user(&state, "college_admin", &college).await;
    let super_token = token_for(&super_admin);
    let admin_token = token_for(&admin);

    let app = app(state.clone());

    // without a license, creation is forbidden
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/admin/students",
            &admin_token,
            Some(new_student_body()),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // only a super admin may write licenses
    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/admin/license/{}", college),
            &admin_token,
            Some(json!({"max_students": 2})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/admin/license/{}", college),
            &super_token,
            Some(json!({"max_students": 2, "status": "active"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // two students fit under the cap
    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/admin/students",
                &admin_token,
                Some(new_student_body()),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // the third hits the cap and broadcasts license:limitReached
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/admin/students",
            &admin_token,
            Some(new_student_body()),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let (limit_events,): (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM notification_events WHERE room = $1 AND event_type = 'license:limitReached'"#,
    )
    .bind(&college)
    .fetch_one(&state.pool)
    .await
    .unwrap();
    assert_eq!(limit_events, 1);

    // disabling broadcasts license:disabled and blocks creation outright
    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/admin/license/{}", college),
            &super_token,
            Some(json!({"status": "disabled"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/admin/students",
            &admin_token,
            Some(new_student_body()),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // reactivation broadcasts license:reactivated
    let resp = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/admin/license/{}", college),
            &super_token,
            Some(json!({"status": "active"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    for event in ["license:disabled", "license:reactivated"] {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM notification_events WHERE room = $1 AND event_type = $2"#,
        )
        .bind(&college)
        .bind(event)
        .fetch_one(&state.pool)
        .await
        .unwrap();
        assert_eq!(count, 1, "expected one {} event", event);
    }

    // the college admin's poll sees its own room
    let resp = app
        .clone()
        .oneshot(request("GET", "/api/notifications/poll", &admin_token, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["room"], json!(college));
    let events = body["events"].as_array().unwrap();
    assert!(events
        .iter()
        .any(|e| e["event"] == json!("license:limitReached")));

    // but may not poll someone else's room
    let resp = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/notifications/poll?room=OtherCollege",
            &admin_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // super admins may
    let resp = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/notifications/poll?room={}", college),
            &super_token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // student roster reflects only this college
    let resp = app
        .clone()
        .oneshot(request("GET", "/api/admin/students", &admin_token, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}
