// db/verificationdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::verificationmodels::PhoneOtp;

#[async_trait]
pub trait VerificationExt {
    /// Stores a new code for the number, dropping any unconsumed earlier ones.
    async fn create_phone_otp(
        &self,
        phone_number: &str,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PhoneOtp, sqlx::Error>;

    /// Latest unconsumed, unexpired code for the number.
    async fn get_active_phone_otp(&self, phone_number: &str)
        -> Result<Option<PhoneOtp>, sqlx::Error>;

    async fn increment_otp_attempts(&self, otp_id: Uuid) -> Result<i32, sqlx::Error>;

    /// False when the code was consumed by a concurrent request.
    async fn consume_phone_otp(&self, otp_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn cleanup_expired_otps(&self) -> Result<u64, sqlx::Error>;
}

#[async_trait]
impl VerificationExt for DBClient {
    async fn create_phone_otp(
        &self,
        phone_number: &str,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PhoneOtp, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(r#"DELETE FROM phone_otps WHERE phone_number = $1 AND consumed_at IS NULL"#)
            .bind(phone_number)
            .execute(&mut *tx)
            .await?;

        let otp = sqlx::query_as::<_, PhoneOtp>(
            r#"
            INSERT INTO phone_otps (phone_number, code_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, phone_number, code_hash, attempts, expires_at, consumed_at, created_at
            "#,
        )
        .bind(phone_number)
        .bind(code_hash)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(otp)
    }

    async fn get_active_phone_otp(
        &self,
        phone_number: &str,
    ) -> Result<Option<PhoneOtp>, sqlx::Error> {
        sqlx::query_as::<_, PhoneOtp>(
            r#"
            SELECT id, phone_number, code_hash, attempts, expires_at, consumed_at, created_at
            FROM phone_otps
            WHERE phone_number = $1 AND consumed_at IS NULL AND expires_at > NOW()
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await
    }

    async fn increment_otp_attempts(&self, otp_id: Uuid) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"UPDATE phone_otps SET attempts = attempts + 1 WHERE id = $1 RETURNING attempts"#,
        )
        .bind(otp_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn consume_phone_otp(&self, otp_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE phone_otps SET consumed_at = NOW() WHERE id = $1 AND consumed_at IS NULL"#,
        )
        .bind(otp_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn cleanup_expired_otps(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"DELETE FROM phone_otps WHERE expires_at < NOW() OR consumed_at IS NOT NULL"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
