//! Pagestitch
//!
//! Captures a web page larger than the visible viewport by scrolling through
//! it and taking overlapping viewport screenshots, then stitches the tiles
//! into one seamless PNG. The core is backend-agnostic: any type implementing
//! [`PageSession`] (scroll, measure, capture) can drive a capture run.
//!
//! # Features
//!
//! - **CDP Backend** (default): drives headless Chrome via the Chrome
//!   DevTools Protocol, plus an async worker-backed facade
//! - **Upload** (default): REST client for publishing captured screens to a
//!   Presentator server
//!
//! # Example
//!
//! ```no_run
//! use pagestitch::{CancelToken, CaptureConfig, SessionConfig};
//! use pagestitch::cdp::CdpSession;
//!
//! # fn main() -> pagestitch::Result<()> {
//! let mut session = CdpSession::new(SessionConfig::default())?;
//! session.goto("https://example.com")?;
//! let png = session.capture_full_page(&CaptureConfig::default(), &CancelToken::new())?;
//! std::fs::write("example.png", png).ok();
//! session.close()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod compositor;
pub mod geometry;
pub mod stitcher;

#[cfg(feature = "cdp")]
pub mod cdp;

// Async-friendly capture API (simple worker-backed abstraction)
#[cfg(feature = "cdp")]
pub mod async_api;

// Presentator REST client (upload target for captured screens)
#[cfg(feature = "upload")]
pub mod client;

pub use geometry::{plan, PageExtent, ScrollOffset, Tile, TilePlan};
pub use stitcher::{capture_full_page, CancelToken, CaptureConfig, PageSession};

// Re-export the Capturer type at the crate root for ergonomic async use
#[cfg(feature = "cdp")]
pub use async_api::Capturer;

/// Viewport dimensions
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Configuration for a browser-backed capture session
///
/// Conservative defaults: a desktop-class viewport and a user agent that
/// identifies the tool. Per-run stitching knobs live in
/// [`stitcher::CaptureConfig`]; this struct only configures the session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// User agent string to send with requests
    pub user_agent: String,
    /// Viewport dimensions
    pub viewport: Viewport,
    /// Default timeout for browser calls in milliseconds
    pub timeout_ms: u64,
    /// Wait after navigation before the page is measured, in milliseconds
    pub nav_settle_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Pagestitch/0.1"
                .to_string(),
            viewport: Viewport::default(),
            timeout_ms: 30000,
            nav_settle_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_config() {
        let config = SessionConfig::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 720);
        assert!(config.user_agent.contains("Pagestitch"));
        assert_eq!(config.timeout_ms, 30000);
    }

    #[test]
    fn test_viewport() {
        let viewport = Viewport {
            width: 1920,
            height: 1080,
        };
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
    }
}
