//! Accounts, password hashing and bearer tokens.
//!
//! Passwords are stored as Argon2id PHC strings. A successful register or
//! login issues a random token that the client presents as
//! `Authorization: Bearer <token>` until it logs out or the token expires.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration, Utc};
use replus_core::{FieldErrors, UserId};
use replus_db::{is_unique_violation, Database, UserRecord};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::{ApiError, AppState};

pub const MAX_USERNAME_LENGTH: usize = 150;
pub const MIN_PASSWORD_LENGTH: usize = 8;

const REQUIRED: &str = "This field is required.";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,

    #[error("Invalid or expired token.")]
    InvalidToken,

    #[error("Please enter a correct username and password.")]
    BadCredentials,

    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    #[error("password hashing failed: {0}")]
    Hash(argon2::password_hash::Error),

    #[error("storage error: {0}")]
    Store(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Hash `password` with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(AuthError::Hash)?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Field checks for a registration, short of username uniqueness.
pub fn validate_registration(form: &RegisterForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    let username = form.username.trim();
    let length = username.chars().count();
    if username.is_empty() {
        errors.add("username", REQUIRED);
    } else if length > MAX_USERNAME_LENGTH {
        errors.add(
            "username",
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                MAX_USERNAME_LENGTH, length
            ),
        );
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    let password = &form.password;
    if password.is_empty() {
        errors.add("password", REQUIRED);
    } else {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    MIN_PASSWORD_LENGTH
                ),
            );
        }
        if password.chars().all(|c| c.is_ascii_digit()) {
            errors.add("password", "This password is entirely numeric.");
        }
    }

    if form.password_confirmation.is_empty() {
        errors.add("password_confirmation", REQUIRED);
    } else if !password.is_empty() && form.password_confirmation != *password {
        errors.add(
            "password_confirmation",
            "The two password fields didn't match.",
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Create an account and log it in.
pub fn register(
    db: &Database,
    form: &RegisterForm,
    now: DateTime<Utc>,
) -> Result<(UserRecord, String), AuthError> {
    validate_registration(form).map_err(AuthError::Validation)?;

    let username = form.username.trim();
    let hash = hash_password(&form.password)?;

    let user = match db.users().create(username, &hash, now) {
        Ok(user) => user,
        Err(err) if is_unique_violation(&err) => {
            debug!(username, "Rejected duplicate username");
            return Err(AuthError::Validation(FieldErrors::single(
                "username",
                "A user with that username already exists.",
            )));
        }
        Err(err) => return Err(err.into()),
    };

    let token = issue_token(db, user.id, now)?;
    info!(user = %user.id, username = %user.username, "Registered user");
    Ok((user, token))
}

/// Verify credentials and issue a new token.
pub fn login(
    db: &Database,
    form: &LoginForm,
    now: DateTime<Utc>,
) -> Result<(UserRecord, String), AuthError> {
    let mut errors = FieldErrors::new();
    if form.username.trim().is_empty() {
        errors.add("username", REQUIRED);
    }
    if form.password.is_empty() {
        errors.add("password", REQUIRED);
    }
    if !errors.is_empty() {
        return Err(AuthError::Validation(errors));
    }

    let user = db
        .users()
        .find_by_username(form.username.trim())?
        .filter(|user| verify_password(&form.password, &user.password_hash))
        .ok_or(AuthError::BadCredentials)?;

    let token = issue_token(db, user.id, now)?;
    info!(user = %user.id, "User logged in");
    Ok((user, token))
}

pub fn issue_token(db: &Database, user: UserId, now: DateTime<Utc>) -> Result<String, AuthError> {
    let token = Uuid::new_v4().simple().to_string();
    db.users().issue_token(user, &token, now)?;
    Ok(token)
}

/// Resolve a token to its account. Expired tokens are revoked on sight.
pub fn authenticate(
    db: &Database,
    token: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<UserRecord, AuthError> {
    let Some((user, issued_at)) = db.users().token_owner(token)? else {
        return Err(AuthError::InvalidToken);
    };

    if issued_at + ttl < now {
        db.users().revoke_token(token)?;
        debug!(user = %user.id, "Rejected expired token");
        return Err(AuthError::InvalidToken);
    }

    Ok(user)
}

/// The token from an `Authorization: Bearer` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// The authenticated caller of a request.
///
/// Handlers taking this extractor reject anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingCredentials)?;
        let user = authenticate(&state.db, token, state.token_ttl, Utc::now())?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn form(username: &str, password: &str, confirmation: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            password: password.to_string(),
            password_confirmation: confirmation.to_string(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("samepassword").unwrap();
        let b = hash_password("samepassword").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_registration_rules() {
        assert!(validate_registration(&form("alice", "s3cretpass", "s3cretpass")).is_ok());

        let errors = validate_registration(&form("", "", "")).unwrap_err();
        assert_eq!(errors.get("username").unwrap(), [REQUIRED]);
        assert_eq!(errors.get("password").unwrap(), [REQUIRED]);

        let errors = validate_registration(&form("bad name!", "12345", "12345")).unwrap_err();
        assert_eq!(errors.get("username").unwrap().len(), 1);
        assert_eq!(
            errors.get("password").unwrap(),
            [
                "This password is too short. It must contain at least 8 characters.",
                "This password is entirely numeric."
            ]
        );

        let errors =
            validate_registration(&form("alice", "s3cretpass", "s3cretpasx")).unwrap_err();
        assert_eq!(
            errors.get("password_confirmation").unwrap(),
            ["The two password fields didn't match."]
        );
    }

    #[test]
    fn test_username_length_limit() {
        let long = "a".repeat(151);
        let errors = validate_registration(&form(&long, "s3cretpass", "s3cretpass")).unwrap_err();
        assert_eq!(
            errors.get("username").unwrap(),
            ["Ensure this value has at most 150 characters (it has 151)."]
        );
        assert!(
            validate_registration(&form("a.b+c-d_e@f", "s3cretpass", "s3cretpass")).is_ok()
        );
    }

    #[test]
    fn test_register_then_login() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();

        let (user, token) = register(&db, &form("alice", "s3cretpass", "s3cretpass"), now).unwrap();
        assert_eq!(token.len(), 32);
        assert_eq!(
            authenticate(&db, &token, Duration::hours(1), now).unwrap().id,
            user.id
        );

        let login_form = LoginForm {
            username: "alice".to_string(),
            password: "s3cretpass".to_string(),
        };
        let (again, second) = login(&db, &login_form, now).unwrap();
        assert_eq!(again.id, user.id);
        assert_ne!(second, token);

        let wrong = LoginForm {
            username: "alice".to_string(),
            password: "nope-nope".to_string(),
        };
        assert!(matches!(
            login(&db, &wrong, now),
            Err(AuthError::BadCredentials)
        ));
    }

    #[test]
    fn test_duplicate_username() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        register(&db, &form("alice", "s3cretpass", "s3cretpass"), now).unwrap();

        match register(&db, &form("alice", "otherpass1", "otherpass1"), now) {
            Err(AuthError::Validation(errors)) => assert_eq!(
                errors.get("username").unwrap(),
                ["A user with that username already exists."]
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_expired_token_is_revoked() {
        let db = Database::open_in_memory().unwrap();
        let issued = Utc::now() - Duration::hours(48);
        let (_, token) = register(&db, &form("alice", "s3cretpass", "s3cretpass"), issued).unwrap();

        assert!(matches!(
            authenticate(&db, &token, Duration::hours(24), Utc::now()),
            Err(AuthError::InvalidToken)
        ));
        assert!(db.users().token_owner(&token).unwrap().is_none());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer  abc123 "));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
