//! Capture-stitch driver: the sequential scroll/settle/capture/draw loop
//!
//! The driver owns the composite for the duration of one run and talks to
//! the page only through the [`PageSession`] trait, so backends (CDP, test
//! doubles) are interchangeable. Tiles are processed strictly one at a time
//! in row-major order: the capture primitive and the scrollable page are
//! both singular shared resources, so there is nothing to parallelize.
//!
//! A run either produces a complete stitched PNG or fails; partial
//! composites are never returned. The page's original scroll position is
//! restored on both the success and the failure path.

use crate::compositor::{decode_capture, Composite};
use crate::geometry::{plan, PageExtent, ScrollOffset, TilePlan};
use crate::{Error, Result};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Scroll, measurement and capture primitives the driver needs from a page.
///
/// `scroll_to` is treated as fire-and-forget: the driver does not trust the
/// page to confirm arrival and instead waits for the scroll position to
/// stabilize (see [`CaptureConfig::settle_ms`]).
pub trait PageSession {
    /// Page and viewport dimensions at this moment.
    fn extent(&mut self) -> Result<PageExtent>;

    /// Current scroll position.
    fn scroll_position(&mut self) -> Result<ScrollOffset>;

    /// Request a scroll to `offset`. The browser clamps targets past the
    /// page bounds itself.
    fn scroll_to(&mut self, offset: ScrollOffset) -> Result<()>;

    /// Capture exactly the currently visible viewport as encoded image bytes.
    fn capture_viewport(&mut self) -> Result<Vec<u8>>;
}

/// Tuning knobs for a capture run.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Upper bound on the wait after each scroll request, in milliseconds.
    ///
    /// The driver polls the scroll position and proceeds as soon as two
    /// consecutive reads agree, so this bound only applies when the page
    /// never stabilizes. Best-effort: a slow-rendering page may still be
    /// mid-layout when the capture fires.
    pub settle_ms: u64,
    /// Interval between scroll-position polls while settling, in milliseconds.
    pub settle_poll_ms: u64,
    /// Per-tile capture timeout in milliseconds; 0 disables the check.
    ///
    /// The capture primitive is a blocking call, so expiry is detected once
    /// it returns rather than by preempting it.
    pub tile_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle_ms: 150,
            settle_poll_ms: 25,
            tile_timeout_ms: 30_000,
        }
    }
}

/// Cooperative cancellation flag checked between tiles.
///
/// Cloning shares the flag, so a caller keeps one handle and hands the other
/// to the driver. A cancelled run restores the original scroll position and
/// returns [`Error::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Capture the full page as one stitched PNG.
///
/// Measures the page once, plans the tile grid, then scrolls through the
/// tiles row-major, capturing and compositing each one. A page that already
/// fits the viewport is captured directly without any scrolling. Any capture
/// or decode failure aborts the whole run; the original scroll position is
/// restored before the error is surfaced.
pub fn capture_full_page<P: PageSession>(
    page: &mut P,
    config: &CaptureConfig,
    cancel: &CancelToken,
) -> Result<Vec<u8>> {
    let extent = page.extent()?;
    let tile_plan = plan(&extent)?;
    let original = page.scroll_position()?;

    debug!(
        "capture run: page {}x{}, viewport {}x{}, grid {}x{}",
        extent.page_width,
        extent.page_height,
        extent.viewport_width,
        extent.viewport_height,
        tile_plan.columns,
        tile_plan.rows
    );

    let result = run_tiles(page, config, cancel, &extent, &tile_plan);

    // Restore on both paths; a failed restore never masks the run's outcome.
    restore_scroll(page, original);

    result
}

fn run_tiles<P: PageSession>(
    page: &mut P,
    config: &CaptureConfig,
    cancel: &CancelToken,
    extent: &PageExtent,
    tile_plan: &TilePlan,
) -> Result<Vec<u8>> {
    // Checked up front so the direct-capture path below honors cancellation
    // the same way the tile loop does.
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let mut composite = Composite::new(extent.page_width, extent.page_height)?;

    // A page that already fits the viewport needs no scrolling: one direct
    // capture, clipped to the page, goes straight to encoding.
    if extent.fits_viewport() {
        let tile = tile_plan.tiles()[0];
        let raw = capture_tile(page, config)?;
        let pixels = decode_capture(&raw)?;
        composite.blit(&pixels, &tile)?;
        return composite.into_png();
    }

    for tile in tile_plan.tiles() {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        // Mid-run scroll failures are logged, not fatal.
        if let Err(e) = page.scroll_to(tile.origin()) {
            warn!("scroll to tile ({}, {}) failed: {}", tile.col, tile.row, e);
        }
        wait_for_settle(page, config);

        let raw = capture_tile(page, config)?;
        let pixels = decode_capture(&raw)?;
        composite.blit(&pixels, tile)?;
    }

    composite.into_png()
}

fn capture_tile<P: PageSession>(page: &mut P, config: &CaptureConfig) -> Result<Vec<u8>> {
    let started = Instant::now();
    let raw = page.capture_viewport()?;
    if config.tile_timeout_ms > 0 && started.elapsed().as_millis() as u64 > config.tile_timeout_ms {
        return Err(Error::Timeout(config.tile_timeout_ms));
    }
    Ok(raw)
}

/// Wait for the scroll (and any scroll-triggered rendering) to settle.
///
/// Polls the scroll position until two consecutive reads agree, bounded by
/// `settle_ms`. Position read errors are swallowed here; the fallback bound
/// still applies.
fn wait_for_settle<P: PageSession>(page: &mut P, config: &CaptureConfig) {
    if config.settle_ms == 0 {
        return;
    }

    let deadline = Instant::now() + Duration::from_millis(config.settle_ms);
    let poll = Duration::from_millis(config.settle_poll_ms.max(1));
    let mut last: Option<ScrollOffset> = None;

    loop {
        std::thread::sleep(poll);
        match page.scroll_position() {
            Ok(pos) if last == Some(pos) => return,
            Ok(pos) => last = Some(pos),
            Err(e) => debug!("scroll position poll failed while settling: {}", e),
        }
        if Instant::now() >= deadline {
            return;
        }
    }
}

// Final restoration gets one retry; beyond that the failure is only logged,
// never surfaced over the run's own outcome.
fn restore_scroll<P: PageSession>(page: &mut P, original: ScrollOffset) {
    if page.scroll_to(original).is_ok() {
        return;
    }
    if let Err(e) = page.scroll_to(original) {
        warn!(
            "failed to restore scroll position ({}, {}): {}",
            original.x, original.y, e
        );
    }
}
