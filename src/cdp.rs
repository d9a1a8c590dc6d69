//! Chrome DevTools Protocol page session (uses the `headless_chrome` crate)

use crate::geometry::{PageExtent, ScrollOffset};
use crate::stitcher::{CancelToken, CaptureConfig, PageSession};
use crate::{Error, Result, SessionConfig};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use std::sync::Arc;
use std::time::Duration;

// Mirrors the document/body measurement a page sees: the largest of the
// scroll, offset and client extents, since none of them alone is reliable
// across doctype modes.
const MEASURE_EXTENT: &str = r#"
    JSON.stringify({
        pageWidth: Math.max(
            document.body.scrollWidth,
            document.body.offsetWidth,
            document.documentElement.clientWidth,
            document.documentElement.scrollWidth,
            document.documentElement.offsetWidth
        ),
        pageHeight: Math.max(
            document.body.scrollHeight,
            document.body.offsetHeight,
            document.documentElement.clientHeight,
            document.documentElement.scrollHeight,
            document.documentElement.offsetHeight
        ),
        viewportWidth: window.innerWidth,
        viewportHeight: window.innerHeight
    })
"#;

const READ_SCROLL: &str =
    "JSON.stringify({x: Math.round(window.scrollX), y: Math.round(window.scrollY)})";

/// CDP-backed page session
///
/// Launches a headless Chrome instance, manages a single tab, and exposes
/// the scroll/measure/capture primitives the stitch driver needs.
pub struct CdpSession {
    browser: Browser,
    tab: Arc<Tab>,
    config: SessionConfig,
}

impl CdpSession {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .build()
            .map_err(|e| Error::CdpError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::CdpError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::CdpError(format!("Failed to create tab: {}", e)))?;

        tab.set_default_timeout(Duration::from_millis(config.timeout_ms));

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| Error::CdpError(format!("Failed to set user agent: {}", e)))?;

        Ok(Self {
            browser,
            tab,
            config,
        })
    }

    /// Navigate to a URL and wait for the page to be ready.
    pub fn goto(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;

        // Let late layout, fonts and initial lazy content land before the
        // page gets measured.
        std::thread::sleep(Duration::from_millis(self.config.nav_settle_ms));

        Ok(())
    }

    /// Run the stitch driver against this session and return the full-page PNG.
    pub fn capture_full_page(
        &mut self,
        config: &CaptureConfig,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>> {
        crate::stitcher::capture_full_page(self, config, cancel)
    }

    /// Close the session and tear down the browser process.
    pub fn close(self) -> Result<()> {
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }

    fn eval_json(&self, script: &str) -> Result<serde_json::Value> {
        let eval = self.tab.evaluate(script, false)?;

        let val = eval
            .value
            .ok_or_else(|| Error::CdpError("No value returned from evaluation".into()))?;

        // CDP hands JSON.stringify results back as a string value.
        if val.is_string() {
            let s = val.as_str().unwrap_or("");
            serde_json::from_str(s)
                .map_err(|e| Error::CdpError(format!("Malformed evaluation result: {}", e)))
        } else {
            Ok(val)
        }
    }
}

fn field_u32(value: &serde_json::Value, name: &str) -> Result<u32> {
    value
        .get(name)
        .and_then(|n| n.as_u64())
        .map(|n| n as u32)
        .ok_or_else(|| Error::CdpError(format!("Missing '{}' in page measurement", name)))
}

impl PageSession for CdpSession {
    fn extent(&mut self) -> Result<PageExtent> {
        let v = self.eval_json(MEASURE_EXTENT)?;
        Ok(PageExtent {
            page_width: field_u32(&v, "pageWidth")?,
            page_height: field_u32(&v, "pageHeight")?,
            viewport_width: field_u32(&v, "viewportWidth")?,
            viewport_height: field_u32(&v, "viewportHeight")?,
        })
    }

    fn scroll_position(&mut self) -> Result<ScrollOffset> {
        let v = self.eval_json(READ_SCROLL)?;
        Ok(ScrollOffset {
            x: field_u32(&v, "x")?,
            y: field_u32(&v, "y")?,
        })
    }

    fn scroll_to(&mut self, offset: ScrollOffset) -> Result<()> {
        let script = format!("window.scrollTo({}, {})", offset.x, offset.y);
        self.tab
            .evaluate(&script, false)
            .map_err(|e| Error::ScrollFailed(e.to_string()))?;
        Ok(())
    }

    fn capture_viewport(&mut self) -> Result<Vec<u8>> {
        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| Error::CaptureFailed(e.to_string()))
    }
}
