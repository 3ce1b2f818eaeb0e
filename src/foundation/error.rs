/// Result type used across the crate.
pub type TimewarpResult<T> = Result<T, TimewarpError>;

/// Errors returned by pool setup, frame submission and configuration loading.
#[derive(thiserror::Error, Debug)]
pub enum TimewarpError {
    /// The worker pool could not be created or is not running.
    #[error("init error: {0}")]
    Init(String),

    /// A call that breaks the API contract, such as a sampler/source mismatch.
    #[error("misuse: {0}")]
    Misuse(String),

    /// Invalid caller-provided geometry, buffers or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TimewarpError {
    /// Build a [`TimewarpError::Init`] value.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Build a [`TimewarpError::Misuse`] value.
    pub fn misuse(msg: impl Into<String>) -> Self {
        Self::Misuse(msg.into())
    }

    /// Build a [`TimewarpError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Negative status code for callers that speak the integer return convention.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Init(_) => -1,
            Self::Misuse(_) => -2,
            Self::Validation(_) => -3,
            Self::Other(_) => -4,
        }
    }
}

/// `0` on success, the error's negative status code otherwise.
pub fn status_code<T>(result: &TimewarpResult<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.status_code(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
