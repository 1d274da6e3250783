pub mod license;
pub mod notification_event;
pub mod question;
pub mod quiz;
pub mod score;
pub mod user;
