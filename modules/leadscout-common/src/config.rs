use std::env;

use tracing::info;

/// Per-platform login material. Cookies take precedence when present; the
/// browser gate falls back to email/password.
#[derive(Debug, Clone, Default)]
pub struct PlatformCredentials {
    pub email: Option<String>,
    pub password: Option<String>,
    pub cookies: Option<String>,
}

impl PlatformCredentials {
    pub fn is_configured(&self) -> bool {
        self.cookies.is_some() || (self.email.is_some() && self.password.is_some())
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Scheduling
    pub scrape_interval_minutes: u64,
    pub notify_interval_minutes: u64,
    pub max_posts_per_source: u32,

    // Browser gate (external browser-automation service)
    pub browser_gate_url: String,
    pub browser_gate_token: Option<String>,
    pub fetch_timeout_secs: u64,

    // Platform credentials
    pub facebook: PlatformCredentials,
    pub nextdoor: PlatformCredentials,

    // Notification defaults (seed the lazily-created NotificationSetting)
    pub slack_webhook_url: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub notification_email: Option<String>,
    pub sender_email: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            scrape_interval_minutes: parsed_env("SCRAPE_INTERVAL_MINUTES", 60),
            notify_interval_minutes: parsed_env("NOTIFY_INTERVAL_MINUTES", 5),
            max_posts_per_source: parsed_env("MAX_POSTS_PER_SOURCE", 20),
            browser_gate_url: required_env("BROWSER_GATE_URL"),
            browser_gate_token: optional_env("BROWSER_GATE_TOKEN"),
            fetch_timeout_secs: parsed_env("FETCH_TIMEOUT_SECS", 30),
            facebook: PlatformCredentials {
                email: optional_env("FACEBOOK_EMAIL"),
                password: optional_env("FACEBOOK_PASSWORD"),
                cookies: optional_env("FACEBOOK_COOKIES"),
            },
            nextdoor: PlatformCredentials {
                email: optional_env("NEXTDOOR_EMAIL"),
                password: optional_env("NEXTDOOR_PASSWORD"),
                cookies: optional_env("NEXTDOOR_COOKIES"),
            },
            slack_webhook_url: optional_env("SLACK_WEBHOOK_URL"),
            sendgrid_api_key: optional_env("SENDGRID_API_KEY"),
            notification_email: optional_env("NOTIFICATION_EMAIL"),
            sender_email: env::var("SENDER_EMAIL")
                .unwrap_or_else(|_| "alerts@leadscout.dev".to_string()),
        }
    }

    /// Log which settings are present without echoing secrets.
    pub fn log_redacted(&self) {
        info!(
            scrape_interval_minutes = self.scrape_interval_minutes,
            notify_interval_minutes = self.notify_interval_minutes,
            max_posts_per_source = self.max_posts_per_source,
            facebook_configured = self.facebook.is_configured(),
            nextdoor_configured = self.nextdoor.is_configured(),
            slack_configured = self.slack_webhook_url.is_some(),
            email_configured = self.sendgrid_api_key.is_some() && self.notification_email.is_some(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
