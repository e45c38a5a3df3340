use serde::Deserialize;

/// Settings for the signed session token and its cookie.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Google OAuth client settings. Absent as a group when the deployment
/// only offers password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub google: Option<GoogleConfig>,
    /// Where failed sign-ins are redirected; served by the frontend.
    pub sign_in_path: String,
    /// Where a completed OAuth sign-in lands.
    pub post_login_path: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "tasklight".into()),
            audience: std::env::var("SESSION_AUDIENCE").unwrap_or_else(|_| "tasklight-web".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 30),
        };
        let google = match (
            std::env::var("GOOGLE_CLIENT_ID"),
            std::env::var("GOOGLE_CLIENT_SECRET"),
        ) {
            (Ok(client_id), Ok(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_url: std::env::var("GOOGLE_REDIRECT_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/auth/google/callback".into()),
            }),
            _ => None,
        };
        Ok(Self {
            database_url,
            session,
            google,
            sign_in_path: std::env::var("SIGN_IN_PATH").unwrap_or_else(|_| "/auth/signin".into()),
            post_login_path: std::env::var("POST_LOGIN_PATH").unwrap_or_else(|_| "/".into()),
        })
    }
}
