pub mod ai_service;
pub mod background_jobs;
pub mod chat_service;
pub mod error;
pub mod escrow_service;
pub mod google_oauth;
pub mod live;
pub mod notification_service;
pub mod phone_auth;
pub mod task_service;
