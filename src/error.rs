use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // -- Transport
    #[error("Transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: StatusCode },
    #[error("Couldn't build the HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    // -- Parse
    #[error("Couldn't parse the listing from {url}: {reason}")]
    Parse { url: String, reason: String },
    #[error("The selector you are trying to scrape for is invalid. Selector: {0}")]
    ParseMissingSelector(String),

    // -- Storage
    #[error("Storage error writing {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -- Run preconditions
    #[error("Output directory {} is not usable: {reason}", path.display())]
    OutputDir { path: PathBuf, reason: String },
    #[error("Invalid page range {start}..={end}: pages start at 1 and the range can't be empty")]
    InvalidPageRange { start: u32, end: u32 },

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
}

/// Coarse classification used to decide how far a failure propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Parse,
    Storage,
    /// Aborts the whole run.
    Fatal,
}

impl Error {
    pub(crate) fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport { .. } | Error::Status { .. } => ErrorKind::Transport,
            Error::Parse { .. } | Error::ParseMissingSelector(_) => ErrorKind::Parse,
            Error::Storage { .. } => ErrorKind::Storage,
            Error::ClientBuild(_)
            | Error::OutputDir { .. }
            | Error::InvalidPageRange { .. }
            | Error::RuntimeJoin(_) => ErrorKind::Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_classified_as_storage() {
        let err = Error::storage(
            "/tmp/out.pdf",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().contains("/tmp/out.pdf"));
    }

    #[test]
    fn status_errors_count_as_transport() {
        let err = Error::Status {
            url: "https://example.com/a.pdf".into(),
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(
            err.to_string(),
            "HTTP 404 Not Found fetching https://example.com/a.pdf"
        );
    }

    #[test]
    fn range_errors_are_fatal() {
        let err = Error::InvalidPageRange { start: 0, end: 3 };
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }
}
