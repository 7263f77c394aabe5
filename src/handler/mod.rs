pub mod ai;
pub mod auth;
pub mod chat;
pub mod google_oauth;
pub mod notifications;
pub mod tasks;
pub mod users;
pub mod wallet;
