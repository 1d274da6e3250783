pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    license_service::LicenseService, notification_service::NotificationService,
    quiz_service::QuizService, score_service::ScoreService, student_service::StudentService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub quiz_service: QuizService,
    pub score_service: ScoreService,
    pub student_service: StudentService,
    pub license_service: LicenseService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();

        let quiz_service = QuizService::new(pool.clone());
        let score_service = ScoreService::new(pool.clone());
        let student_service = StudentService::new(pool.clone());
        let license_service = LicenseService::new(pool.clone());
        let notification_service =
            NotificationService::new(pool.clone(), config.notify_webhook_url.clone());

        Self {
            pool,
            quiz_service,
            score_service,
            student_service,
            license_service,
            notification_service,
        }
    }
}
