use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL and JWT secret have defaults suitable
/// for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Connection pool size (default: `20`).
    pub db_max_connections: u32,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT signing configuration.
    pub jwt: JwtConfig,
    /// Server-side session lifetime when no session policy is active.
    pub session_expiry_days: i64,
    /// How long an invitation link stays valid.
    pub invitation_expiry_days: i64,
    /// Allow self-registration after the first account exists.
    pub allow_open_registration: bool,
    /// Base URL of the web console, used in invitation links.
    pub public_base_url: String,
    /// Period of the background housekeeping sweep.
    pub housekeeping_interval_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                  |
    /// |------------------------------|--------------------------|
    /// | `HOST`                       | `0.0.0.0`                |
    /// | `PORT`                       | `5000`                   |
    /// | `DATABASE_URL`               | **required**             |
    /// | `DB_MAX_CONNECTIONS`         | `20`                     |
    /// | `CORS_ORIGINS`               | `http://localhost:3000`  |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                     |
    /// | `JWT_SECRET`                 | **required**             |
    /// | `JWT_EXPIRY_MINS`            | `1440`                   |
    /// | `SESSION_EXPIRY_DAYS`        | `7`                      |
    /// | `INVITATION_EXPIRY_DAYS`     | `7`                      |
    /// | `ALLOW_OPEN_REGISTRATION`    | `false`                  |
    /// | `PUBLIC_BASE_URL`            | `http://localhost:3000`  |
    /// | `HOUSEKEEPING_INTERVAL_SECS` | `300`                    |
    ///
    /// # Panics
    ///
    /// Panics on a missing required variable or a malformed value, so that
    /// misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let db_max_connections: u32 = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("DB_MAX_CONNECTIONS must be a valid u32");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let session_expiry_days: i64 = std::env::var("SESSION_EXPIRY_DAYS")
            .unwrap_or_else(|_| "7".into())
            .parse()
            .expect("SESSION_EXPIRY_DAYS must be a valid i64");

        let invitation_expiry_days: i64 = std::env::var("INVITATION_EXPIRY_DAYS")
            .unwrap_or_else(|_| "7".into())
            .parse()
            .expect("INVITATION_EXPIRY_DAYS must be a valid i64");

        let allow_open_registration = std::env::var("ALLOW_OPEN_REGISTRATION")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into());

        let housekeeping_interval_secs = positive_secs(
            &std::env::var("HOUSEKEEPING_INTERVAL_SECS").unwrap_or_else(|_| "300".into()),
        )
        .expect("HOUSEKEEPING_INTERVAL_SECS must be a positive number of seconds");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            database_url,
            db_max_connections,
            cors_origins,
            request_timeout_secs,
            jwt,
            session_expiry_days,
            invitation_expiry_days,
            allow_open_registration,
            public_base_url,
            housekeeping_interval_secs,
        }
    }
}

/// A period in seconds. Zero is rejected since timers cannot tick at it.
fn positive_secs(raw: &str) -> Option<u64> {
    raw.trim().parse().ok().filter(|secs| *secs > 0)
}
