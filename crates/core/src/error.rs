use thiserror::Error;

/// Errors reserved for genuinely unexpected conditions. Expected outcomes
/// (element not found, precondition timeout, readback mismatch, exhausted
/// retries) are plain `bool`/`Option` values and never surface here.
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("browser error: {0}")]
    Browser(String),

    #[error("timeout after {0}s")]
    Timeout(u64),

    #[error("cookie store error: {0}")]
    CookieStore(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
