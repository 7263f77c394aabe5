// service/phone_auth.rs
use std::sync::{Arc, OnceLock};

use chrono::{Duration, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::{
    db::{db::DBClient, userdb::UserExt, verificationdb::VerificationExt},
    models::usermodel::User,
    utils::otp_generator,
};

pub const OTP_TTL_MINUTES: i64 = 5;
pub const MAX_OTP_ATTEMPTS: i32 = 5;
pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "The free quota for this project has been exceeded. Please enable billing to continue.";

const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Debug, Error)]
pub enum PhoneAuthError {
    #[error("Enter a valid phone number in international format, e.g. +919876543210")]
    InvalidPhoneNumber,

    #[error("CAPTCHA verification failed")]
    CaptchaFailed,

    #[error("{}", QUOTA_EXCEEDED_MESSAGE)]
    QuotaExceeded,

    #[error("Failed to send verification code: {0}")]
    Delivery(String),

    #[error("Invalid or expired verification code")]
    InvalidCode,

    #[error("Too many attempts. Request a new code")]
    TooManyAttempts,

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// Phone sign-in: CAPTCHA-gated one-time codes delivered by SMS.
#[derive(Debug, Clone)]
pub struct PhoneAuthService {
    db_client: Arc<DBClient>,
    http: reqwest::Client,
    recaptcha_secret: Option<String>,
    sms_gateway_url: Option<String>,
}

impl PhoneAuthService {
    pub fn new(
        db_client: Arc<DBClient>,
        http: reqwest::Client,
        recaptcha_secret: Option<String>,
        sms_gateway_url: Option<String>,
    ) -> Self {
        Self {
            db_client,
            http,
            recaptcha_secret,
            sms_gateway_url,
        }
    }

    pub async fn start_sign_in(
        &self,
        phone_number: &str,
        captcha_token: &str,
    ) -> Result<(), PhoneAuthError> {
        let phone_number = normalize_phone(phone_number)?;
        self.verify_captcha(captcha_token).await?;

        let code = otp_generator::generate_otp();
        let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);
        self.db_client
            .create_phone_otp(&phone_number, &otp_generator::hash_otp(&code), expires_at)
            .await?;

        self.deliver(&phone_number, &code).await?;
        tracing::info!("Verification code sent to {}", mask_phone(&phone_number));
        Ok(())
    }

    /// Confirms the code and returns the phone account, creating it on first sign-in.
    pub async fn verify_sign_in(&self, phone_number: &str, code: &str) -> Result<User, PhoneAuthError> {
        let phone_number = normalize_phone(phone_number)?;

        let otp = self
            .db_client
            .get_active_phone_otp(&phone_number)
            .await?
            .ok_or(PhoneAuthError::InvalidCode)?;

        if otp.is_expired(Utc::now()) {
            return Err(PhoneAuthError::InvalidCode);
        }
        if otp.attempts >= MAX_OTP_ATTEMPTS {
            return Err(PhoneAuthError::TooManyAttempts);
        }

        if !otp_generator::verify_otp(code, &otp.code_hash) {
            let attempts = self.db_client.increment_otp_attempts(otp.id).await?;
            tracing::warn!(
                "Wrong verification code for {} (attempt {})",
                mask_phone(&phone_number),
                attempts
            );
            return Err(if attempts >= MAX_OTP_ATTEMPTS {
                PhoneAuthError::TooManyAttempts
            } else {
                PhoneAuthError::InvalidCode
            });
        }

        if !self.db_client.consume_phone_otp(otp.id).await? {
            return Err(PhoneAuthError::InvalidCode);
        }

        let user = self.db_client.get_or_create_phone_user(&phone_number).await?;
        tracing::info!("Phone sign-in for user {}", user.id);
        Ok(user)
    }

    async fn verify_captcha(&self, captcha_token: &str) -> Result<(), PhoneAuthError> {
        let Some(secret) = self.recaptcha_secret.as_deref() else {
            tracing::warn!("RECAPTCHA_SECRET is not set, skipping CAPTCHA verification");
            return Ok(());
        };

        if captcha_token.trim().is_empty() {
            return Err(PhoneAuthError::CaptchaFailed);
        }

        let response = self
            .http
            .post(RECAPTCHA_VERIFY_URL)
            .form(&[("secret", secret), ("response", captcha_token)])
            .send()
            .await?;

        let verdict: SiteVerifyResponse = response.json().await?;
        if !verdict.success {
            tracing::warn!("CAPTCHA rejected: {:?}", verdict.error_codes);
            return Err(PhoneAuthError::CaptchaFailed);
        }

        Ok(())
    }

    async fn deliver(&self, phone_number: &str, code: &str) -> Result<(), PhoneAuthError> {
        let Some(gateway) = self.sms_gateway_url.as_deref() else {
            tracing::warn!(
                "SMS_GATEWAY_URL is not set, verification code for {} was not delivered",
                mask_phone(phone_number)
            );
            return Ok(());
        };

        let response = self
            .http
            .post(gateway)
            .json(&json!({
                "to": phone_number,
                "message": format!(
                    "Your TaskBuddy verification code is {}. It expires in {} minutes.",
                    code, OTP_TTL_MINUTES
                ),
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("SMS gateway returned HTTP {}: {}", status, body);
        Err(delivery_error(status.as_u16(), body))
    }
}

fn delivery_error(status: u16, body: String) -> PhoneAuthError {
    match status {
        402 | 429 => PhoneAuthError::QuotaExceeded,
        _ if body.to_ascii_uppercase().contains("QUOTA_EXCEEDED") => PhoneAuthError::QuotaExceeded,
        _ => PhoneAuthError::Delivery(format!("HTTP {}", status)),
    }
}

fn phone_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").ok())
        .as_ref()
}

/// E.164 form with spaces, dashes and brackets removed.
pub fn normalize_phone(raw: &str) -> Result<String, PhoneAuthError> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if phone_pattern().is_some_and(|pattern| pattern.is_match(&compact)) {
        Ok(compact)
    } else {
        Err(PhoneAuthError::InvalidPhoneNumber)
    }
}

pub fn mask_phone(phone_number: &str) -> String {
    let chars: Vec<char> = phone_number.chars().collect();
    let hidden = chars.len().saturating_sub(4);
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| if i < hidden { '*' } else { *c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+91 98765-43210").unwrap(), "+919876543210");
        assert_eq!(normalize_phone("+1 (415) 555-0100").unwrap(), "+14155550100");
        assert!(matches!(
            normalize_phone("9876543210"),
            Err(PhoneAuthError::InvalidPhoneNumber)
        ));
        assert!(normalize_phone("+0123456789").is_err());
        assert!(normalize_phone("+91abc").is_err());
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+919876543210"), "*********3210");
        assert_eq!(mask_phone("123"), "123");
    }

    #[test]
    fn test_quota_errors_use_the_billing_message() {
        assert!(matches!(delivery_error(429, String::new()), PhoneAuthError::QuotaExceeded));
        assert!(matches!(
            delivery_error(400, "{\"error\":\"QUOTA_EXCEEDED\"}".to_string()),
            PhoneAuthError::QuotaExceeded
        ));
        assert!(matches!(delivery_error(500, String::new()), PhoneAuthError::Delivery(_)));
        assert_eq!(PhoneAuthError::QuotaExceeded.to_string(), QUOTA_EXCEEDED_MESSAGE);
    }
}
