//! # transport: one seam for every bundle destination
//!
//! A single trait ([`Transport`]) with one concrete implementation per sink:
//! local filesystem, GitHub contents API, Telegram documents, Drive folders.
//!
//! ## Interface & Extensibility
//! - Implement [`Transport`] to add a destination; one payload per call.
//! - Errors are typed ([`TransportError`]) and carry remote bodies verbatim.
//! - No implementation retries internally: retry policy, if any, belongs to
//!   the caller.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so orchestration tests can run
//!   against deterministic mocks.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Fixed deadline for every remote call; a call past this is a failure.
pub const REQUEST_DEADLINE: Duration = Duration::from_secs(45);

/// Hard payload ceiling of the document-upload API, enforced before any
/// network I/O.
pub const DOCUMENT_UPLOAD_LIMIT: u64 = 50 * 1024 * 1024;

/// Per-send metadata every sink receives alongside the payload.
#[derive(Debug, Clone, Default)]
pub struct SendContext {
    /// User-entered identifier, unsanitized; sinks sanitize it themselves
    /// where it becomes a path component.
    pub identifier: String,
    pub caption: Option<String>,
}

/// Successful delivery: where the payload ended up.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub location: String,
}

#[derive(Debug)]
pub enum TransportError {
    /// Credentials or endpoint configuration missing; detected before any
    /// transfer is attempted.
    Config(String),
    /// Payload exceeds a sink's hard size limit; no network call was made.
    Oversize { size: u64, limit: u64 },
    /// The remote answered outside 2xx; the body is carried verbatim.
    Remote { status: u16, body: String },
    Http(reqwest::Error),
    Io(std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Config(msg) => write!(f, "transport configuration error: {msg}"),
            TransportError::Oversize { size, limit } => {
                write!(f, "payload of {size} bytes exceeds the {limit}-byte limit")
            }
            TransportError::Remote { status, body } => {
                write!(f, "remote rejected the upload (status {status}): {body}")
            }
            TransportError::Http(e) => write!(f, "http request failed: {e}"),
            TransportError::Io(e) => write!(f, "storage write failed: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Http(e) => Some(e),
            TransportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Http(e)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e)
    }
}

/// A destination for assembled bundles.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `payload` under `target_name`, returning the remote location.
    async fn send(
        &self,
        payload: &[u8],
        target_name: &str,
        ctx: &SendContext,
    ) -> Result<Delivery, TransportError>;
}
