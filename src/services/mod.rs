pub mod license_service;
pub mod notification_service;
pub mod quiz_service;
pub mod score_service;
pub mod scoring;
pub mod student_service;
