use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::SessionConfig, error::ApiError, state::AppState};

pub const SESSION_COOKIE: &str = "fitlog_session";

/// Session token payload: who the session was issued for and until when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

/// Signing and verification keys for session tokens, derived from config.
#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
    pub cookie_secure: bool,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::new(&state.config.session)
    }
}

impl SessionKeys {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::from_secs((config.ttl_days as u64) * 24 * 60 * 60),
            cookie_secure: config.cookie_secure,
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token issued");
        Ok(token)
    }

    /// Fails on bad signature, malformed token, or elapsed expiry.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims)
    }

    /// `Set-Cookie` value carrying the session token.
    pub fn session_cookie(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let max_age = self.ttl.as_secs();
        let mut cookie =
            format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    /// `Set-Cookie` value that expires the session cookie immediately.
    pub fn clear_cookie(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }
}

/// Pull the session token from the cookie (preferred) or, for compatibility,
/// from an `Authorization: Bearer` header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = token_from_cookie(headers) {
        return Some(token);
    }
    token_from_bearer(headers)
}

fn token_from_cookie(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        // Pairs without an '=' (e.g. a bare flag) must not hide a valid
        // session cookie later in the header.
        let Some((key, val)) = pair.trim().split_once('=') else {
            continue;
        };
        if key.trim() == SESSION_COOKIE && !val.trim().is_empty() {
            return Some(val.trim().to_string());
        }
    }
    None
}

fn token_from_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(|t| t.trim().to_string())
}

/// Authenticated caller, resolved from a verified session token.
#[derive(Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?;

        let claims = keys.verify(&token).map_err(|_| {
            warn!("invalid or expired session token");
            ApiError::Unauthorized("Invalid or expired session".into())
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> SessionKeys {
        SessionKeys::new(&SessionConfig {
            secret: secret.into(),
            ttl_days: 7,
            cookie_secure: false,
        })
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, "ann@example.com").expect("issue");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "ann@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let good = make_keys("secret-a");
        let bad = make_keys("secret-b");
        let token = good.issue(Uuid::new_v4(), "a@x.com").expect("issue");
        assert!(bad.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys("dev-secret");
        assert!(keys.verify("not-a-token").is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@x.com".into(),
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn session_cookie_attributes() {
        let keys = make_keys("dev-secret");
        let cookie = keys.session_cookie("tok").expect("cookie");
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("fitlog_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn secure_flag_appends_secure_attribute() {
        let keys = SessionKeys::new(&SessionConfig {
            secret: "dev-secret".into(),
            ttl_days: 7,
            cookie_secure: true,
        });
        let cookie = keys.clear_cookie().expect("cookie");
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn token_extraction_prefers_cookie_then_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer from-header".parse().unwrap());
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-header"));

        headers.insert(
            COOKIE,
            "other=x; fitlog_session=from-cookie".parse().unwrap(),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn cookie_pair_without_equals_is_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "flag; fitlog_session=tok".parse().unwrap());
        assert_eq!(token_from_headers(&headers).as_deref(), Some("tok"));

        headers.insert(COOKIE, "a; b; fitlog_session=tok; c".parse().unwrap());
        assert_eq!(token_from_headers(&headers).as_deref(), Some("tok"));
    }

    #[test]
    fn auth_user_captures_in_debug_spans() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            email: "ann@example.com".into(),
        };
        let rendered = format!("{user:?}");
        assert!(rendered.contains("ann@example.com"));
    }

    #[test]
    fn empty_cookie_value_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "fitlog_session=".parse().unwrap());
        assert_eq!(token_from_headers(&headers), None);
    }
}
