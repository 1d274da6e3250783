use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use xaction_backend::services::license_service::LicenseService;
use xaction_backend::services::notification_service::{
    NotificationService, EVENT_LICENSE_EXPIRED,
};
use xaction_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    {
        let state = app_state.clone();
        tokio::spawn(async move {
            let notif = NotificationService::new(
                state.pool.clone(),
                get_config().notify_webhook_url.clone(),
            );
            loop {
                match notif.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(1000)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Notification delivery worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    {
        let state = app_state.clone();
        tokio::spawn(async move {
            let license_svc = LicenseService::new(state.pool.clone());
            loop {
                match license_svc.expire_due().await {
                    Ok(expired) => {
                        for license in expired {
                            if let Err(e) = state
                                .notification_service
                                .enqueue_license_event(
                                    EVENT_LICENSE_EXPIRED,
                                    &license.college,
                                    "License has expired",
                                )
                                .await
                            {
                                tracing::error!(
                                    college = %license.college,
                                    error = ?e,
                                    "Failed to enqueue license:expired event"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("License sweeper error: {:?}", e);
                    }
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
    }

    let base_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/auth/login", post(routes::auth::login))
        .route(
            "/api/simulations/public",
            get(routes::public::list_public_simulations),
        );

    let student_api = Router::new()
        .route(
            "/api/simulations/:id/submit",
            post(routes::public::submit_simulation),
        )
        .layer(axum::middleware::from_fn(
            xaction_backend::middleware::auth::require_student,
        ));

    let score_api = Router::new()
        .route("/api/scores", get(routes::scores::list_scores))
        .route("/api/scores/:id", get(routes::scores::get_score))
        .layer(axum::middleware::from_fn(
            xaction_backend::middleware::auth::require_bearer_auth,
        ));

    let score_edit_api = Router::new()
        .route("/api/scores/:id/edit", put(routes::scores::edit_score))
        .layer(axum::middleware::from_fn(
            xaction_backend::middleware::auth::require_admin,
        ));

    let notification_api = Router::new()
        .route(
            "/api/notifications/poll",
            get(routes::notifications::poll_notifications),
        )
        .layer(axum::middleware::from_fn(
            xaction_backend::middleware::auth::require_bearer_auth,
        ));

    let admin_api = Router::new()
        .route(
            "/api/admin/students",
            get(routes::admin::list_students).post(routes::admin::create_student),
        )
        .route("/api/admin/license", get(routes::admin::get_license))
        .route(
            "/api/admin/quizzes",
            get(routes::admin::list_quizzes).post(routes::admin::create_quiz),
        )
        .route(
            "/api/admin/quizzes/:id",
            get(routes::admin::get_quiz)
                .patch(routes::admin::update_quiz)
                .delete(routes::admin::delete_quiz),
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

    let super_admin_api = Router::new()
        .route(
            "/api/admin/license/:college",
            put(routes::admin::update_license),
        )
        .layer(axum::middleware::from_fn(
            xaction_backend::middleware::auth::require_super_admin,
        ));

    let public_side = base_routes
        .merge(student_api)
        .layer(axum::middleware::from_fn_with_state(
            xaction_backend::middleware::rate_limit::new_rps_state(config.public_rps),
            xaction_backend::middleware::rate_limit::rps_middleware,
        ));

    let admin_side = score_api
        .merge(score_edit_api)
        .merge(notification_api)
        .merge(admin_api)
        .merge(super_admin_api)
        .layer(axum::middleware::from_fn_with_state(
            xaction_backend::middleware::rate_limit::new_rps_state(config.admin_rps),
            xaction_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = public_side
        .merge(admin_side)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
