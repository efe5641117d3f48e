// ── Core error types ──
//
// User-facing errors from acsparam-core. Consumers never see HTTP status
// codes or reqwest errors directly; the `From<acsparam_api::Error>` impl
// translates transport-layer errors into domain variants.

use std::path::PathBuf;

use thiserror::Error;

use crate::expression::ExpressionError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Device data ──────────────────────────────────────────────────
    #[error("Device has no usable DeviceID.ID parameter")]
    MissingDeviceId,

    #[error("Invalid device document: {message}")]
    InvalidDevice { message: String },

    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Expressions ──────────────────────────────────────────────────
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    // ── Task delivery ────────────────────────────────────────────────
    #[error("Cannot connect to ACS at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Device not found on ACS: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Task rejected by ACS: {message}")]
    Rejected {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<acsparam_api::Error> for CoreError {
    fn from(err: acsparam_api::Error) -> Self {
        match err {
            acsparam_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            acsparam_api::Error::Transport(ref e) => {
                if e.is_connect() || e.is_timeout() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Rejected {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            acsparam_api::Error::InvalidUrl(e) => CoreError::InvalidUrl(e.to_string()),
            acsparam_api::Error::CannotBeABase(url) => CoreError::InvalidUrl(url),
            acsparam_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            acsparam_api::Error::DeviceNotFound { device_id } => CoreError::DeviceNotFound {
                identifier: device_id,
            },
            acsparam_api::Error::Nbi { status, message } => CoreError::Rejected {
                message,
                status: Some(status),
            },
        }
    }
}
