//! Tile-grid geometry for full-page capture
//!
//! Pure math: given the page and viewport extents measured at run start,
//! derive how many viewport-sized tiles cover the page and the destination
//! rectangle each tile occupies in the final composite. Nothing here touches
//! the page; the planner is recomputed fresh for every run because a page's
//! layout may change between captures.

use crate::{Error, Result};

/// Page and viewport dimensions in CSS pixels, measured once at run start.
///
/// All dimensions must be positive; the unsigned domain rules out negative
/// or non-finite values, so zero is the only invalid input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageExtent {
    pub page_width: u32,
    pub page_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl PageExtent {
    /// Whether the whole page fits inside the viewport (no scrolling needed).
    pub fn fits_viewport(&self) -> bool {
        self.page_width <= self.viewport_width && self.page_height <= self.viewport_height
    }
}

/// A scroll position in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollOffset {
    pub x: u32,
    pub y: u32,
}

impl ScrollOffset {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// One viewport-sized capture positioned within the full-page composite.
///
/// `draw_width`/`draw_height` are clipped for tiles in the last row or
/// column so no tile draws past the true page boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub col: u32,
    pub row: u32,
    /// Scroll target and destination rectangle origin in the composite
    pub origin_x: u32,
    pub origin_y: u32,
    /// Destination rectangle size, at most one viewport
    pub draw_width: u32,
    pub draw_height: u32,
}

impl Tile {
    /// The scroll target for this tile.
    pub fn origin(&self) -> ScrollOffset {
        ScrollOffset {
            x: self.origin_x,
            y: self.origin_y,
        }
    }
}

/// The tile grid derived from a `PageExtent`.
///
/// Tiles are ordered row-major (all columns of row 0, then row 1, ...); the
/// ordering matters only for determinism since destination rectangles are
/// disjoint.
#[derive(Debug, Clone)]
pub struct TilePlan {
    pub columns: u32,
    pub rows: u32,
    tiles: Vec<Tile>,
}

impl TilePlan {
    /// Tiles in row-major order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Compute the tile grid for `extent`.
///
/// `columns = ceil(page_width / viewport_width)` and likewise for rows; a
/// page that fits entirely within the viewport yields a 1x1 grid with draw
/// dimensions clamped to the page. Every tile has strictly positive draw
/// dimensions by construction.
pub fn plan(extent: &PageExtent) -> Result<TilePlan> {
    validate(extent)?;

    let columns = extent.page_width.div_ceil(extent.viewport_width);
    let rows = extent.page_height.div_ceil(extent.viewport_height);

    let mut tiles = Vec::with_capacity((columns as usize) * (rows as usize));
    for row in 0..rows {
        for col in 0..columns {
            let origin_x = col * extent.viewport_width;
            let origin_y = row * extent.viewport_height;
            tiles.push(Tile {
                col,
                row,
                origin_x,
                origin_y,
                draw_width: extent.viewport_width.min(extent.page_width - origin_x),
                draw_height: extent.viewport_height.min(extent.page_height - origin_y),
            });
        }
    }

    Ok(TilePlan {
        columns,
        rows,
        tiles,
    })
}

fn validate(extent: &PageExtent) -> Result<()> {
    if extent.viewport_width == 0 || extent.viewport_height == 0 {
        return Err(Error::InvalidExtent(format!(
            "viewport must be positive, got {}x{}",
            extent.viewport_width, extent.viewport_height
        )));
    }
    if extent.page_width == 0 || extent.page_height == 0 {
        return Err(Error::InvalidExtent(format!(
            "page must be positive, got {}x{}",
            extent.page_width, extent.page_height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(pw: u32, ph: u32, vw: u32, vh: u32) -> PageExtent {
        PageExtent {
            page_width: pw,
            page_height: ph,
            viewport_width: vw,
            viewport_height: vh,
        }
    }

    #[test]
    fn degenerate_page_smaller_than_viewport() {
        let p = plan(&extent(800, 600, 1280, 800)).unwrap();
        assert_eq!(p.columns, 1);
        assert_eq!(p.rows, 1);
        assert_eq!(p.len(), 1);
        let t = p.tiles()[0];
        assert_eq!((t.origin_x, t.origin_y), (0, 0));
        assert_eq!((t.draw_width, t.draw_height), (800, 600));
    }

    #[test]
    fn exact_multiple_grid() {
        let p = plan(&extent(2560, 1600, 1280, 800)).unwrap();
        assert_eq!((p.columns, p.rows), (2, 2));
        let origins: Vec<_> = p.tiles().iter().map(|t| (t.origin_x, t.origin_y)).collect();
        assert_eq!(origins, vec![(0, 0), (1280, 0), (0, 800), (1280, 800)]);
        for t in p.tiles() {
            assert_eq!((t.draw_width, t.draw_height), (1280, 800));
        }
    }

    #[test]
    fn remainder_grid_clips_edge_tiles() {
        let p = plan(&extent(1900, 1000, 1280, 800)).unwrap();
        assert_eq!((p.columns, p.rows), (2, 2));

        let right = p.tiles().iter().find(|t| t.col == 1 && t.row == 0).unwrap();
        assert_eq!(right.origin_x, 1280);
        assert_eq!(right.draw_width, 620);
        assert_eq!(right.draw_height, 800);

        let bottom = p.tiles().iter().find(|t| t.col == 0 && t.row == 1).unwrap();
        assert_eq!(bottom.origin_y, 800);
        assert_eq!(bottom.draw_width, 1280);
        assert_eq!(bottom.draw_height, 200);
    }

    #[test]
    fn tiles_exactly_cover_the_page() {
        let cases = [
            extent(2560, 1600, 1280, 800),
            extent(1900, 1000, 1280, 800),
            extent(3000, 7321, 1280, 720),
            extent(1281, 801, 1280, 800),
            extent(1, 1, 1280, 800),
        ];

        for e in &cases {
            let p = plan(e).unwrap();
            assert_eq!(p.len(), (p.columns * p.rows) as usize);

            // Disjoint destination rectangles summing to the page area imply
            // an exact cover as long as every rectangle stays in bounds.
            let mut area: u64 = 0;
            for t in p.tiles() {
                assert!(t.draw_width > 0 && t.draw_height > 0);
                assert!(t.draw_width <= e.viewport_width);
                assert!(t.draw_height <= e.viewport_height);
                assert!(t.origin_x + t.draw_width <= e.page_width);
                assert!(t.origin_y + t.draw_height <= e.page_height);
                area += u64::from(t.draw_width) * u64::from(t.draw_height);
            }
            assert_eq!(area, u64::from(e.page_width) * u64::from(e.page_height));

            // Row-major ordering with no repeated grid cell.
            let indices: Vec<_> = p.tiles().iter().map(|t| (t.row, t.col)).collect();
            let mut sorted = indices.clone();
            sorted.sort();
            sorted.dedup();
            assert_eq!(sorted.len(), indices.len());
            assert!(indices.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn zero_viewport_is_invalid() {
        let err = plan(&extent(1900, 1000, 0, 800)).unwrap_err();
        assert!(matches!(err, Error::InvalidExtent(_)));
    }

    #[test]
    fn zero_page_is_invalid() {
        let err = plan(&extent(1900, 0, 1280, 800)).unwrap_err();
        assert!(matches!(err, Error::InvalidExtent(_)));
    }
}
