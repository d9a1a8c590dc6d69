//! Composite surface and raster codec for stitched captures
//!
//! The composite is a page-sized RGBA surface owned by the driver for the
//! duration of one run. Each tile capture is decoded, clipped to its draw
//! rectangle, and blitted in place; the surface is encoded to PNG exactly
//! once, after the last tile.

use crate::geometry::Tile;
use crate::{Error, Result};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// Decode one raw viewport capture into an RGBA pixel buffer.
pub fn decode_capture(data: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(data).map_err(|e| Error::DecodeFailed(e.to_string()))?;
    Ok(img.to_rgba8())
}

/// The full-page raster surface tiles are drawn into.
pub struct Composite {
    surface: RgbaImage,
}

impl Composite {
    /// Allocate a surface sized to the page extent.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidExtent(format!(
                "composite must be positive, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            surface: RgbaImage::new(width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Draw a captured viewport into the tile's destination rectangle.
    ///
    /// Only the top-left `draw_width x draw_height` region of the capture is
    /// read, so a capture larger than the needed edge-tile region is clipped.
    /// A capture smaller than the draw rectangle (device-pixel-ratio
    /// surprises) is clipped to what is available rather than failing.
    pub fn blit(&mut self, capture: &RgbaImage, tile: &Tile) -> Result<()> {
        let w = tile.draw_width.min(capture.width());
        let h = tile.draw_height.min(capture.height());
        if w == 0 || h == 0 {
            return Err(Error::DecodeFailed("captured image is empty".into()));
        }
        if tile.origin_x + w > self.surface.width() || tile.origin_y + h > self.surface.height() {
            return Err(Error::Other(format!(
                "Tile blit out of bounds: {}x{} at ({}, {}) into {}x{}",
                w,
                h,
                tile.origin_x,
                tile.origin_y,
                self.surface.width(),
                self.surface.height()
            )));
        }

        for y in 0..h {
            for x in 0..w {
                let px = *capture.get_pixel(x, y);
                self.surface.put_pixel(tile.origin_x + x, tile.origin_y + y, px);
            }
        }
        Ok(())
    }

    /// Raw RGBA bytes of the surface, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.surface.as_raw()
    }

    /// Encode the finished composite as PNG, consuming the surface.
    pub fn into_png(self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.surface
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| Error::EncodeFailed(e.to_string()))?;
        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn tile(origin_x: u32, origin_y: u32, draw_width: u32, draw_height: u32) -> Tile {
        Tile {
            col: 0,
            row: 0,
            origin_x,
            origin_y,
            draw_width,
            draw_height,
        }
    }

    #[test]
    fn blit_reads_only_the_draw_region() {
        let mut composite = Composite::new(100, 100).unwrap();
        // Capture larger than the 40x30 edge rectangle it is drawn into.
        let capture = RgbaImage::from_pixel(64, 64, Rgba([200, 10, 10, 255]));
        composite.blit(&capture, &tile(60, 70, 40, 30)).unwrap();

        let raw = composite.as_raw();
        let px = |x: u32, y: u32| {
            let i = ((y * 100 + x) * 4) as usize;
            [raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]
        };
        assert_eq!(px(60, 70), [200, 10, 10, 255]);
        assert_eq!(px(99, 99), [200, 10, 10, 255]);
        // Outside the destination rectangle stays untouched.
        assert_eq!(px(59, 70), [0, 0, 0, 0]);
        assert_eq!(px(60, 69), [0, 0, 0, 0]);
    }

    #[test]
    fn blit_clips_undersized_captures() {
        let mut composite = Composite::new(100, 100).unwrap();
        let capture = RgbaImage::from_pixel(10, 10, Rgba([0, 200, 0, 255]));
        // Draw rectangle wants 40x40 but only 10x10 is available.
        composite.blit(&capture, &tile(0, 0, 40, 40)).unwrap();

        let raw = composite.as_raw();
        assert_eq!(&raw[0..4], &[0, 200, 0, 255]);
        let i = ((11 * 100) * 4) as usize;
        assert_eq!(&raw[i..i + 4], &[0, 0, 0, 0]);
    }

    #[test]
    fn png_round_trip_preserves_dimensions() {
        let mut composite = Composite::new(33, 21).unwrap();
        let capture = RgbaImage::from_pixel(33, 21, Rgba([1, 2, 3, 255]));
        composite.blit(&capture, &tile(0, 0, 33, 21)).unwrap();

        let png = composite.into_png().unwrap();
        let decoded = decode_capture(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (33, 21));
        assert_eq!(decoded.get_pixel(16, 10), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_capture(b"not a png").unwrap_err();
        assert!(matches!(err, Error::DecodeFailed(_)));
    }

    #[test]
    fn zero_sized_composite_is_invalid() {
        assert!(matches!(
            Composite::new(0, 100),
            Err(Error::InvalidExtent(_))
        ));
    }
}
