use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A one-time passcode sent to a phone number. Only the hash is kept.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PhoneOtp {
    pub id: Uuid,
    pub phone_number: String,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PhoneOtp {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
