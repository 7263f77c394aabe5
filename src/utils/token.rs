use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// `expires_in` is in minutes.
pub fn create_token(
    user_id: &str,
    secret: &[u8],
    expires_in: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::minutes(expires_in)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<String, HttpError> {
    let decoded = decode::<TokenClaims>(
        &token.into(),
        &DecodingKey::from_secret(secret),
        &Validation::new(Algorithm::HS256),
    );

    match decoded {
        Ok(token) => Ok(token.claims.sub),
        Err(_) => Err(HttpError::unauthorized(ErrorMessage::InvalidToken.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"my-secret-key";

    #[test]
    fn test_create_and_decode_valid_token() {
        let user_id = uuid::Uuid::new_v4().to_string();
        let token = create_token(&user_id, SECRET, 60).unwrap();
        assert_eq!(decode_token(token, SECRET).unwrap(), user_id);
    }

    #[test]
    fn test_create_token_with_empty_user_id() {
        let result = create_token("", SECRET, 60);
        assert!(matches!(
            result.unwrap_err().kind(),
            jsonwebtoken::errors::ErrorKind::InvalidSubject
        ));
    }

    #[test]
    fn test_decode_expired_token() {
        let token = create_token("user-1", SECRET, -60).unwrap();
        let err = decode_token(token, SECRET).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_decode_with_wrong_secret() {
        let token = create_token("user-1", SECRET, 60).unwrap();
        assert!(decode_token(token, b"other-secret").is_err());
    }
}
