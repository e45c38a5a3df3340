use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::auth::dto::PublicUser;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{is_unique_violation, User};
use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails are compared trimmed and lowercased everywhere: signup, login,
/// and the OAuth upsert must agree on the lookup key.
pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn clean_name(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|n| !n.is_empty())
}

/// Provider-supplied email after normalization; `None` when trimming
/// leaves nothing usable.
pub(crate) fn provider_email(raw: Option<&str>) -> Option<String> {
    let email = normalize_email(raw.unwrap_or_default());
    (!email.is_empty()).then_some(email)
}

/// Decide whether a credential sign-in may establish a session.
///
/// Every failure collapses to `None`: unknown email, an account without a
/// password (Google-only), a wrong password, and store or verifier faults.
/// Callers cannot tell these cases apart; the distinctions live in the log.
/// Success hands back the public identity only, never the stored hash.
pub async fn authorize_credentials(db: &PgPool, email: &str, password: &str) -> Option<PublicUser> {
    if email.is_empty() || password.is_empty() {
        return None;
    }

    let user = match User::find_by_email(db, email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(email = %email, "sign-in for unknown email");
            return None;
        }
        Err(e) => {
            error!(error = %e, "user lookup failed during sign-in");
            return None;
        }
    };

    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "password sign-in attempted on an OAuth-only account");
        return None;
    };

    match verify_password(password, hash) {
        Ok(true) => Some(user.into()),
        Ok(false) => {
            warn!(user_id = %user.id, "sign-in with wrong password");
            None
        }
        Err(e) => {
            error!(error = %e, user_id = %user.id, "password verification failed");
            None
        }
    }
}

/// Complete a Google sign-in for a verified email: one atomic
/// create-or-refresh of the user record, so repeated sign-ins with the
/// same address converge on a single row.
pub async fn complete_oauth_sign_in(
    db: &PgPool,
    email: &str,
    name: Option<&str>,
) -> anyhow::Result<PublicUser> {
    let email = normalize_email(email);
    let user = User::upsert_oauth(db, &email, clean_name(name)).await?;
    info!(user_id = %user.id, email = %user.email, "google sign-in completed");
    Ok(user.into())
}

/// Create a credential account; the one place passwords enter the system.
pub async fn register_account(
    db: &PgPool,
    name: Option<&str>,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Missing fields"));
    }
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email"));
    }
    if password.len() < 8 {
        return Err(ApiError::bad_request("Password too short"));
    }

    match User::find_by_email(db, &email).await {
        Ok(Some(_)) => return Err(ApiError::bad_request("User already exists")),
        Ok(None) => {}
        Err(e) => return Err(ApiError::Internal(e)),
    }

    let hash = hash_password(password).map_err(ApiError::Internal)?;

    match User::create_with_password(db, &email, clean_name(name), &hash).await {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "user registered");
            Ok(user)
        }
        // A concurrent signup can slip between the existence check and the
        // insert; the unique index reports it the same way.
        Err(e) if is_unique_violation(&e) => Err(ApiError::bad_request("User already exists")),
        Err(e) => Err(ApiError::Internal(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("spaces in@example.com"));
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn name_cleaning() {
        assert_eq!(clean_name(Some("  Ada  ")), Some("Ada"));
        assert_eq!(clean_name(Some("   ")), None);
        assert_eq!(clean_name(Some("")), None);
        assert_eq!(clean_name(None), None);
    }

    #[test]
    fn provider_email_selection() {
        assert_eq!(
            provider_email(Some("  Ada@Example.COM ")).as_deref(),
            Some("ada@example.com")
        );
        assert_eq!(provider_email(Some("   ")), None);
        assert_eq!(provider_email(Some("")), None);
        assert_eq!(provider_email(None), None);
    }

    #[tokio::test]
    async fn authorize_rejects_empty_input_before_store_access() {
        let state = AppState::fake();
        assert!(authorize_credentials(&state.db, "", "password").await.is_none());
        assert!(authorize_credentials(&state.db, "a@b.co", "").await.is_none());
    }

    #[tokio::test]
    async fn authorize_treats_store_faults_as_rejection() {
        // The fake pool points at a database that is not there; the lookup
        // error must surface as a plain sign-in rejection.
        let state = AppState::fake();
        let out: Option<PublicUser> =
            authorize_credentials(&state.db, "ada@example.com", "password").await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn register_validates_before_store_access() {
        let state = AppState::fake();

        let missing = register_account(&state.db, None, "", "password123").await;
        assert!(matches!(missing, Err(ApiError::BadRequest(m)) if m == "Missing fields"));

        let invalid = register_account(&state.db, None, "nope", "password123").await;
        assert!(matches!(invalid, Err(ApiError::BadRequest(m)) if m == "Invalid email"));

        let short = register_account(&state.db, None, "a@b.co", "short").await;
        assert!(matches!(short, Err(ApiError::BadRequest(m)) if m == "Password too short"));
    }
}
