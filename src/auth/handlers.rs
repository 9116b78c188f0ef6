use axum::{
    extract::{FromRef, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, MessageResponse, PublicUser, ResetRequest, SigninRequest, SignupRequest},
        password::{hash_password, verify_against_dummy, verify_password},
        repo::User,
        session::{AuthUser, SessionKeys},
    },
    error::ApiError,
    extract::ValidJson,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/me", get(me))
        .route("/signout", post(signout))
        .route("/reset", post(reset))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn set_cookie_headers(keys: &SessionKeys, token: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let cookie = keys
        .session_cookie(token)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;
    headers.insert(SET_COOKIE, cookie);
    Ok(headers)
}

#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    ValidJson(mut payload): ValidJson<SignupRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already exists".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.email, payload.full_name.trim(), &hash)
        .await
        .map_err(|e| {
            // A signup racing this one can still hit the unique index.
            if e.as_database_error()
                .is_some_and(|d| d.is_unique_violation())
            {
                ApiError::Conflict("Email already exists".into())
            } else {
                error!(error = %e, "create user failed");
                ApiError::Database(e)
            }
        })?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.issue(user.id, &user.email)?;
    let headers = set_cookie_headers(&keys, &token)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            message: "User registered successfully".into(),
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn signin(
    State(state): State<AppState>,
    ValidJson(mut payload): ValidJson<SigninRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password get the same response, so the
    // endpoint cannot be used to enumerate accounts.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(user) => user,
        None => {
            // Same message and same argon2 cost as the mismatch path.
            verify_against_dummy(&payload.password);
            warn!(email = %payload.email, "signin unknown email");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "signin invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = SessionKeys::from_ref(&state);
    let token = keys.issue(user.id, &user.email)?;
    let headers = set_cookie_headers(&keys, &token)?;

    info!(user_id = %user.id, email = %user.email, "user signed in");
    Ok((
        headers,
        Json(AuthResponse {
            message: "Login successful".into(),
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state))]
async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    // A token for a deleted user must not authenticate.
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %auth.user_id, "session references missing user");
            ApiError::Unauthorized("User not found".into())
        })?;
    Ok(Json(PublicUser::from(user)))
}

/// Clears the session cookie. Idempotent, always succeeds.
#[instrument(skip(state))]
async fn signout(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<MessageResponse>), ApiError> {
    let keys = SessionKeys::from_ref(&state);
    let mut headers = HeaderMap::new();
    let cookie = keys
        .clear_cookie()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;
    headers.insert(SET_COOKIE, cookie);
    Ok((
        headers,
        Json(MessageResponse {
            message: "Signed out".into(),
        }),
    ))
}

/// Always acknowledges with the same message, whether or not the email
/// exists. Actual mail delivery is an external collaborator.
#[instrument(skip(payload))]
async fn reset(ValidJson(payload): ValidJson<ResetRequest>) -> Json<MessageResponse> {
    info!(email = %payload.email, "password reset requested");
    Json(MessageResponse {
        message: "If that email is registered, a reset link has been sent".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
    }

    #[test]
    fn email_regex_rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@nodot"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn public_user_serialization_omits_hash() {
        let user = PublicUser {
            id: uuid::Uuid::new_v4(),
            email: "test@example.com".into(),
            full_name: "Ann".into(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("test@example.com"));
        assert!(!json.contains("password"));
    }
}
