//! Error taxonomy for page fetching.
//!
//! Only transport-level failures are errors. Parse-level oddities (missing
//! links, unrecognized table shapes, unresolvable dates) degrade to empty
//! results so a single bad page never takes down a category.

use std::fmt;

use thiserror::Error;

/// Failure while loading or driving a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Page load did not complete within the configured timeout.
    #[error("page load timed out after {attempts} attempt(s): {url}")]
    Timeout { url: String, attempts: u32 },

    /// The browser engine itself failed (launch, CDP session, evaluate).
    #[error("browser engine error: {0}")]
    Browser(String),

    /// Navigation was rejected or the target URL is unusable.
    #[error("navigation failed: {0}")]
    Navigation(String),
}

impl FetchError {
    pub fn browser(err: impl fmt::Display) -> Self {
        Self::Browser(err.to_string())
    }

    pub fn navigation(err: impl fmt::Display) -> Self {
        Self::Navigation(err.to_string())
    }

    /// Timeouts are the only failures worth retrying; everything else is
    /// a broken session.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
