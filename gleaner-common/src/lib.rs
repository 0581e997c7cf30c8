//! Common types and utilities shared across Gleaner crates.
//!
//! This crate defines the shared error type and observability helpers used
//! throughout the Gleaner workspace. It stays dependency‑light so every other
//! crate can depend on it without pulling in the browser or LLM stacks.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`GleanerError`] and [`Result`]: Shared error handling
//!
//! # Examples
//!
//! ```rust
//! use gleaner_common::GleanerError;
//!
//! let err = GleanerError::Config("LLM_PROVIDER is empty".to_string());
//! assert_eq!(err.to_string(), "Configuration error: LLM_PROVIDER is empty");
//! ```

pub mod observability;

/// Error types used across the Gleaner system.
#[derive(thiserror::Error, Debug)]
pub enum GleanerError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An LLM provider call failed or returned an unusable reply.
    #[error("LLM error: {0}")]
    Llm(String),

    /// The model's reply could not be decoded as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structured extraction for a page did not produce a result.
    #[error("Extraction error: {0}")]
    Extraction(String),
}

/// Convenient alias for results that use [`GleanerError`].
pub type Result<T> = std::result::Result<T, GleanerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_convert_with_context() {
        let err: GleanerError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(err.to_string().starts_with("JSON error:"));
    }
}
