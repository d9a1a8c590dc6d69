//! Error types for the capture pipeline

use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning, capturing, or stitching
#[derive(Error, Debug)]
pub enum Error {
    /// Page or viewport dimensions violate the planner's input constraints
    #[error("Invalid page extent: {0}")]
    InvalidExtent(String),

    /// A scroll request was rejected by the page session
    #[error("Scroll request failed: {0}")]
    ScrollFailed(String),

    /// The capture primitive failed to produce a viewport image
    #[error("Viewport capture failed: {0}")]
    CaptureFailed(String),

    /// A captured image could not be decoded into pixel data
    #[error("Capture decode failed: {0}")]
    DecodeFailed(String),

    /// The finished composite could not be encoded
    #[error("Composite encode failed: {0}")]
    EncodeFailed(String),

    /// A tile capture exceeded the configured per-tile timeout
    #[error("Tile capture timed out after {0}ms")]
    Timeout(u64),

    /// The run was cancelled between tiles
    #[error("Capture run cancelled")]
    Cancelled,

    /// Failed to load a URL
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Authentication against the Presentator server failed
    #[cfg(feature = "upload")]
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// A Presentator API request failed
    #[cfg(feature = "upload")]
    #[error("Presentator API error: {0}")]
    ApiError(String),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}

#[cfg(all(test, feature = "cdp"))]
mod tests {
    use super::*;

    #[test]
    fn anyhow_errors_map_to_cdp_errors() {
        let err: Error = anyhow::anyhow!("tab crashed").into();
        assert!(matches!(err, Error::CdpError(msg) if msg.contains("tab crashed")));
    }
}
