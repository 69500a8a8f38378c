use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// PostgreSQL connection URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// Maximum database connections in the pool.
    pub db_max_connections: u32,
    /// Minimum database connections in the pool.
    pub db_min_connections: u32,
    /// Session token signing secret.
    pub jwt_secret: String,
    /// Session token lifetime.
    pub session_ttl_mins: i64,
    /// Upper bound on the profile lookup that establishes a console session.
    pub session_init_timeout: Duration,
    /// Event bus channel capacity.
    pub event_bus_capacity: usize,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
    /// Built single-page app served for every non-API path.
    pub static_dir: PathBuf,
    /// CORS origins. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    pub email: Option<EmailConfig>,
    pub verify: Option<VerifyConfig>,
    pub careers: Option<CareersConfig>,
    pub contact_log: Option<ContactLogConfig>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// Transactional email API.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    /// Address that receives contact-form submissions.
    pub team_inbox: String,
}

/// Bot-verification endpoint for the contact form.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub url: String,
    pub secret: String,
}

/// Recruiting spreadsheet API behind `/api/careers`.
#[derive(Debug, Clone)]
pub struct CareersConfig {
    pub api_url: String,
    pub api_key: String,
}

/// Spreadsheet API that keeps a log of contact submissions.
#[derive(Debug, Clone)]
pub struct ContactLogConfig {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("{var} is required when {because} is set")]
    Missing {
        var: &'static str,
        because: &'static str,
    },
}

const DEV_JWT_SECRET: &str = "dev-secret-change-me-in-production";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3030,
            database_url: None,
            db_max_connections: 20,
            db_min_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            session_ttl_mins: 12 * 60,
            session_init_timeout: Duration::from_millis(5000),
            event_bus_capacity: 1024,
            log_level: "info".to_string(),
            static_dir: PathBuf::from("dist"),
            allowed_origins: Vec::new(),
            email: None,
            verify: None,
            careers: None,
            contact_log: None,
            bootstrap_admin: None,
        }
    }
}

/// Non-empty value of `var`.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var: name,
            expected,
            value: raw,
        }),
    }
}

/// Like [`parsed`], but zero is rejected. Channel capacities must be positive.
fn positive(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<NonZeroUsize>()
            .map(NonZeroUsize::get)
            .map_err(|_| ConfigError::Invalid {
                var: name,
                expected: "positive integer",
                value: raw,
            }),
    }
}

fn required_with(name: &'static str, because: &'static str) -> Result<String, ConfigError> {
    var(name).ok_or(ConfigError::Missing { var: name, because })
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Outbound integrations are optional: each one is enabled by its URL
    /// variable, and the routes that need a missing one answer with a
    /// "not configured" failure instead of preventing startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let email = match var("EMAIL_API_KEY") {
            None => None,
            Some(api_key) => Some(EmailConfig {
                api_url: var("EMAIL_API_URL")
                    .unwrap_or_else(|| "https://api.resend.com/emails".to_string()),
                api_key,
                from: required_with("EMAIL_FROM", "EMAIL_API_KEY")?,
                team_inbox: required_with("TEAM_INBOX", "EMAIL_API_KEY")?,
            }),
        };

        let verify = match var("VERIFY_SECRET") {
            None => None,
            Some(secret) => Some(VerifyConfig {
                url: var("VERIFY_URL").unwrap_or_else(|| {
                    "https://challenges.cloudflare.com/turnstile/v0/siteverify".to_string()
                }),
                secret,
            }),
        };

        let careers = match var("CAREERS_API_URL") {
            None => None,
            Some(api_url) => Some(CareersConfig {
                api_url,
                api_key: required_with("CAREERS_API_KEY", "CAREERS_API_URL")?,
            }),
        };

        let contact_log = var("CONTACT_LOG_URL").map(|url| ContactLogConfig {
            url,
            api_key: var("CONTACT_LOG_API_KEY"),
        });

        let bootstrap_admin = match var("BOOTSTRAP_ADMIN_EMAIL") {
            None => None,
            Some(email) => Some(BootstrapAdmin {
                email,
                password: required_with("BOOTSTRAP_ADMIN_PASSWORD", "BOOTSTRAP_ADMIN_EMAIL")?,
            }),
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", "u16", defaults.port)?,
            database_url: var("DATABASE_URL"),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", "u32", defaults.db_max_connections)?,
            db_min_connections: parsed("DB_MIN_CONNECTIONS", "u32", defaults.db_min_connections)?,
            jwt_secret: var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            session_ttl_mins: parsed("SESSION_TTL_MINS", "number of minutes", defaults.session_ttl_mins)?,
            session_init_timeout: Duration::from_millis(parsed(
                "SESSION_INIT_TIMEOUT_MS",
                "number of milliseconds",
                5000u64,
            )?),
            event_bus_capacity: positive("EVENT_BUS_CAPACITY", defaults.event_bus_capacity)?,
            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
            static_dir: var("STATIC_DIR").map(PathBuf::from).unwrap_or(defaults.static_dir),
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            email,
            verify,
            careers,
            contact_log,
            bootstrap_admin,
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn positive_rejects_zero() {
        env::set_var("AGENCY_TEST_CAPACITY_ZERO", "0");
        assert_matches!(
            positive("AGENCY_TEST_CAPACITY_ZERO", 16),
            Err(ConfigError::Invalid { var: "AGENCY_TEST_CAPACITY_ZERO", .. })
        );
        env::remove_var("AGENCY_TEST_CAPACITY_ZERO");
    }

    #[test]
    fn positive_parses_and_defaults() {
        env::set_var("AGENCY_TEST_CAPACITY_SET", " 64 ");
        assert_eq!(positive("AGENCY_TEST_CAPACITY_SET", 16).unwrap(), 64);
        env::remove_var("AGENCY_TEST_CAPACITY_SET");

        assert_eq!(positive("AGENCY_TEST_CAPACITY_UNSET", 16).unwrap(), 16);
        env::set_var("AGENCY_TEST_CAPACITY_BAD", "lots");
        assert_matches!(
            positive("AGENCY_TEST_CAPACITY_BAD", 16),
            Err(ConfigError::Invalid { .. })
        );
        env::remove_var("AGENCY_TEST_CAPACITY_BAD");
    }

    #[test]
    fn zero_event_bus_capacity_fails_to_load() {
        env::set_var("EVENT_BUS_CAPACITY", "0");
        let result = AppConfig::from_env();
        env::remove_var("EVENT_BUS_CAPACITY");
        assert_matches!(
            result,
            Err(ConfigError::Invalid { var: "EVENT_BUS_CAPACITY", .. })
        );
    }
}
