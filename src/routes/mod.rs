pub mod admin;
pub mod auth;
pub mod health;
pub mod notifications;
pub mod public;
pub mod scores;
