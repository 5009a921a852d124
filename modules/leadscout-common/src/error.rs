use thiserror::Error;

/// Authentication failure for a source platform. The two kinds drive
/// different scheduler behavior: credential failures disable the job until
/// an operator reconfigures it, captcha/rate-limit failures skip the cycle.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credentials rejected: {0}")]
    Credential(String),

    #[error("captcha or rate limit encountered: {0}")]
    CaptchaOrRateLimit(String),
}

/// Failure fetching posts for a single source. Logged and isolated — the
/// cycle continues with the next source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {seconds}s fetching {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },
}

/// Match Store failure. Callers pattern-match on the kind:
/// `ConstraintViolation` on insert is an expected concurrency outcome and
/// is swallowed as a duplicate skip, everything else escalates.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate row for dedup key {0}")]
    ConstraintViolation(String),

    #[error("keyword normalizes to an existing keyword: {0}")]
    DuplicateKeyword(String),

    #[error("row not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failure delivering through one notification channel. Never aborts the
/// sibling channel or sibling matches.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{channel} returned status {status}: {body}")]
    Api {
        channel: &'static str,
        status: u16,
        body: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no destination configured for {0}")]
    NoDestination(&'static str),

    #[error("{0} channel not configured")]
    NotConfigured(&'static str),
}
