use anyhow::Context;
use axum_extra::extract::cookie::{Cookie, SameSite};
use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthUrl, AuthorizationCode, ClientId,
    ClientSecret, CsrfToken, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use time::Duration as TimeDuration;

use crate::config::GoogleConfig;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Cookie holding the CSRF state between the redirect and the callback.
pub const STATE_COOKIE: &str = "tasklight_oauth_state";

/// Identity Google vouches for once the handshake completes. Email can be
/// absent (no email scope grant); sign-in is rejected in that case.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Google OAuth bridge: builds the authorize redirect and completes the
/// code-for-identity exchange.
pub struct GoogleOAuth {
    client: BasicClient,
    http: reqwest::Client,
}

impl GoogleOAuth {
    pub fn new(cfg: &GoogleConfig) -> anyhow::Result<Self> {
        let client = BasicClient::new(
            ClientId::new(cfg.client_id.clone()),
            Some(ClientSecret::new(cfg.client_secret.clone())),
            AuthUrl::new(AUTH_URL.to_string()).context("invalid authorization endpoint URL")?,
            Some(TokenUrl::new(TOKEN_URL.to_string()).context("invalid token endpoint URL")?),
        )
        .set_redirect_uri(
            RedirectUrl::new(cfg.redirect_url.clone()).context("invalid GOOGLE_REDIRECT_URL")?,
        );
        Ok(Self {
            client,
            http: reqwest::Client::new(),
        })
    }

    /// Authorize URL to send the browser to, plus the state the callback
    /// must echo.
    pub fn authorize(&self) -> (oauth2::url::Url, CsrfToken) {
        self.client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".into()))
            .add_scope(Scope::new("email".into()))
            .add_scope(Scope::new("profile".into()))
            .url()
    }

    /// Exchange the callback code for tokens and fetch the profile they
    /// grant access to.
    pub async fn exchange(&self, code: String) -> anyhow::Result<GoogleProfile> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .request_async(async_http_client)
            .await
            .context("code exchange with Google failed")?;

        let profile = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .context("userinfo request failed")?
            .error_for_status()
            .context("userinfo request rejected")?
            .json::<GoogleProfile>()
            .await
            .context("userinfo response malformed")?;
        Ok(profile)
    }
}

pub fn state_cookie(state: &CsrfToken) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, state.secret().clone()))
        .http_only(true)
        .secure(false)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(TimeDuration::minutes(10))
        .build()
}

pub fn clear_state_cookie() -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, String::new()))
        .http_only(true)
        .secure(false)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}
