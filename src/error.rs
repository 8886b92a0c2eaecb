use reqwest::{StatusCode, Url};
use std::fmt;
use thiserror::Error;

/// What kind of identifier a scoped lookup was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Project,
    Resource,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Project => f.write_str("project"),
            Scope::Resource => f.write_str("resource"),
        }
    }
}

/// Errors reported by the metering API. Client methods return these wrapped in `anyhow::Error`,
/// use `downcast_ref::<Error>()` to inspect them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown {scope} {id:?}")]
    NotFound { scope: Scope, id: String },

    #[error("Request to {url} failed with status {status}")]
    RequestFailed { url: Url, status: StatusCode },

    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: Url, reason: String },
}

impl Error {
    pub(crate) fn malformed(url: &Url, reason: impl Into<String>) -> Self {
        Error::MalformedResponse {
            url: url.clone(),
            reason: reason.into(),
        }
    }
}
