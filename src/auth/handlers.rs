use axum::{
    extract::{rejection::JsonRejection, FromRef, Query, State},
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, SignupRequest, SignupResponse},
        oauth::{clear_state_cookie, state_cookie, STATE_COOKIE},
        services,
        session::{clear_session_cookie, session_cookie, SessionKeys, SessionUser},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/google", get(google))
        .route("/auth/google/callback", get(google_callback))
}

#[instrument(skip(state, payload))]
async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    let Ok(Json(payload)) = payload else {
        return Err(ApiError::bad_request("Invalid JSON"));
    };

    let user = services::register_account(
        &state.db,
        payload.name.as_deref(),
        payload.email.as_deref().unwrap_or_default(),
        payload.password.as_deref().unwrap_or_default(),
    )
    .await?;

    info!(user_id = %user.id, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse { user: user.into() }),
    ))
}

#[instrument(skip(state, jar, payload))]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let Ok(Json(payload)) = payload else {
        return Err(ApiError::bad_request("Invalid JSON"));
    };

    let email = services::normalize_email(payload.email.as_deref().unwrap_or_default());
    let password = payload.password.unwrap_or_default();

    let user = services::authorize_credentials(&state.db, &email, &password)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".into()))?;

    let keys = SessionKeys::from_ref(&state);
    let token = keys.mint(&user)?;
    let jar = jar.add(session_cookie(&token, keys.ttl_secs()));

    info!(user_id = %user.id, "user logged in");
    Ok((jar, Json(AuthResponse { token, user })))
}

#[instrument(skip(jar))]
async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (jar.add(clear_session_cookie()), StatusCode::NO_CONTENT)
}

#[instrument(skip(session))]
async fn me(session: SessionUser) -> Json<PublicUser> {
    Json(session.public())
}

/// Starts the Google flow: stash the CSRF state in a short-lived cookie and
/// bounce the browser to the consent screen.
#[instrument(skip(state, jar))]
async fn google(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let Some(google) = state.google.as_ref() else {
        warn!("google sign-in requested but no client is configured");
        let target = format!("{}?error=google", state.config.sign_in_path);
        return (jar, Redirect::temporary(&target));
    };

    let (url, csrf) = google.authorize();
    (
        jar.add(state_cookie(&csrf)),
        Redirect::temporary(url.as_str()),
    )
}

#[derive(Debug, Deserialize)]
struct GoogleCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Finishes the Google flow. The caller here is a browser mid-redirect, so
/// every failure lands back on the sign-in page with an `error` query
/// parameter instead of a JSON error body.
#[instrument(skip(state, jar, query))]
async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<GoogleCallback>,
) -> (CookieJar, Redirect) {
    let fail = |jar: CookieJar, code: &str| {
        let target = format!("{}?error={code}", state.config.sign_in_path);
        (jar.add(clear_state_cookie()), Redirect::temporary(&target))
    };

    if let Some(denied) = query.error {
        warn!(error = %denied, "google sign-in denied by provider");
        return fail(jar, "google");
    }

    let Some(google) = state.google.clone() else {
        warn!("google callback hit but no client is configured");
        return fail(jar, "google");
    };

    let (Some(code), Some(echoed)) = (query.code, query.state) else {
        warn!("google callback missing code or state");
        return fail(jar, "google");
    };

    let expected = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    if expected.as_deref() != Some(echoed.as_str()) {
        warn!("google callback state does not match the state cookie");
        return fail(jar, "state");
    }

    let profile = match google.exchange(code).await {
        Ok(profile) => profile,
        Err(err) => {
            error!(error = %err, "google code exchange failed");
            return fail(jar, "google");
        }
    };

    // Normalize before deciding the profile has an email at all; a
    // whitespace-only address must not become an empty upsert key.
    let Some(email) = services::provider_email(profile.email.as_deref()) else {
        warn!("google profile carried no usable email address");
        return fail(jar, "google");
    };

    let user =
        match services::complete_oauth_sign_in(&state.db, &email, profile.name.as_deref()).await {
            Ok(user) => user,
            Err(err) => {
                error!(error = %err, "google sign-in could not be recorded");
                return fail(jar, "google");
            }
        };

    let keys = SessionKeys::from_ref(&state);
    let token = match keys.mint(&user) {
        Ok(token) => token,
        Err(err) => {
            error!(error = %err, "session token could not be minted");
            return fail(jar, "google");
        }
    };

    let jar = jar
        .add(clear_state_cookie())
        .add(session_cookie(&token, keys.ttl_secs()));
    info!(user_id = %user.id, "user logged in via google");
    (jar, Redirect::temporary(&state.config.post_login_path))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::{app::build_app, state::AppState};

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn signup_rejects_malformed_json() {
        let app = build_app(AppState::fake());

        let response = app
            .oneshot(
                Request::post("/auth/signup")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid JSON");
    }

    #[tokio::test]
    async fn signup_rejects_missing_fields() {
        let app = build_app(AppState::fake());

        let response = app
            .oneshot(
                Request::post("/auth/signup")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"solo@example.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Missing fields");
    }

    #[tokio::test]
    async fn signup_rejects_invalid_email() {
        let app = build_app(AppState::fake());

        let response = app
            .oneshot(
                Request::post("/auth/signup")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"name":"A","email":"not-an-email","password":"longenough"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid email");
    }

    #[tokio::test]
    async fn me_without_session_is_unauthorized() {
        let app = build_app(AppState::fake());

        let response = app
            .oneshot(Request::get("/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn logout_clears_the_session_cookie() {
        let app = build_app(AppState::fake());

        let response = app
            .oneshot(Request::post("/auth/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with("tasklight_session="));
        assert!(set_cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn google_redirects_to_sign_in_when_unconfigured() {
        let app = build_app(AppState::fake());

        let response = app
            .oneshot(Request::get("/auth/google").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(location, "/auth/signin?error=google");
    }

    #[tokio::test]
    async fn google_callback_without_state_redirects_with_error() {
        let app = build_app(AppState::fake());

        let response = app
            .oneshot(
                Request::get("/auth/google/callback?code=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(location, "/auth/signin?error=google");
    }
}
