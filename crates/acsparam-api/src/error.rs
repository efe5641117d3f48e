use thiserror::Error;

/// Top-level error type for the `acsparam-api` crate.
///
/// Covers every failure mode of the northbound interface: authentication,
/// transport, and NBI status errors. `acsparam-core` maps these into
/// domain-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The NBI rejected the configured credentials.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot carry path segments (e.g. `mailto:`).
    #[error("Base URL cannot be used for NBI requests: {0}")]
    CannotBeABase(String),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── NBI ─────────────────────────────────────────────────────────
    /// The addressed device does not exist on the ACS.
    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    /// Any other non-success status returned by the NBI.
    #[error("NBI error (HTTP {status}): {message}")]
    Nbi { status: u16, message: String },
}
