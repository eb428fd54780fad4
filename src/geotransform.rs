//! Mapping between world coordinates and pixel offsets.
//!
//! A geotransform holds the six GDAL coefficients `(x0, dx, rx, y0, ry, dy)`:
//!
//! ```text
//! worldX = x0 + col * dx + row * rx
//! worldY = y0 + col * ry + row * dy
//! ```
//!
//! The offset mapping below only handles axis-aligned rasters (`rx == ry == 0`).
//! Use [`GeoTransform::is_axis_aligned`] before mapping points onto a raster
//! whose transform came from an untrusted source.

use crate::error::{RasterError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub x0: f64,
    pub dx: f64,
    pub rx: f64,
    pub y0: f64,
    pub ry: f64,
    pub dy: f64,
}

impl GeoTransform {
    pub fn new(x0: f64, dx: f64, rx: f64, y0: f64, ry: f64, dy: f64) -> Self {
        Self { x0, dx, rx, y0, ry, dy }
    }

    /// Build from a GDAL-ordered coefficient array.
    pub fn from_gdal(gt: &[f64; 6]) -> Self {
        Self::new(gt[0], gt[1], gt[2], gt[3], gt[4], gt[5])
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [self.x0, self.dx, self.rx, self.y0, self.ry, self.dy]
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.rx == 0.0 && self.ry == 0.0
    }

    /// Fails with `RotatedGeoTransform` when either rotation term is non-zero.
    pub fn ensure_axis_aligned(&self) -> Result<()> {
        if self.is_axis_aligned() {
            Ok(())
        } else {
            Err(RasterError::RotatedGeoTransform(self.rx, self.ry))
        }
    }

    /// World coordinate of the top-left corner of pixel `(col, row)`,
    /// rotation terms included.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.x0 + col * self.dx + row * self.rx,
            self.y0 + col * self.ry + row * self.dy,
        )
    }
}

impl Default for GeoTransform {
    /// GDAL's default: unit pixels, origin at (0, 0), rows going down.
    fn default() -> Self {
        Self::new(0.0, 1.0, 0.0, 0.0, 0.0, 1.0)
    }
}

impl fmt::Display for GeoTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Top-Left corner (x,y):  {:12.4}, {:12.4}", self.x0, self.y0)?;
        writeln!(f, "Pixel resolution (x,y): {:12.4}, {:12.4}", self.dx, self.dy)?;
        write!(f, "Axis rotation (x,y):    {:12.4}, {:12.4}", self.rx, self.ry)
    }
}

/// Integer pixel position. Signed so that points left of or above the
/// raster origin produce negative offsets instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelOffset {
    pub col: i64,
    pub row: i64,
}

impl PixelOffset {
    pub fn new(col: i64, row: i64) -> Self {
        Self { col, row }
    }

    pub fn is_within(&self, cols: usize, rows: usize) -> bool {
        self.col >= 0 && self.row >= 0 && (self.col as u64) < cols as u64 && (self.row as u64) < rows as u64
    }

    /// `(col, row)` as unsigned indices, or `None` when outside `[0, cols) x [0, rows)`.
    pub fn checked_index(&self, cols: usize, rows: usize) -> Option<(usize, usize)> {
        if self.is_within(cols, rows) {
            Some((self.col as usize, self.row as usize))
        } else {
            None
        }
    }
}

impl fmt::Display for PixelOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Pixel containing world coordinate `(x, y)`. No bounds validation.
pub fn to_pixel_offset(coord: (f64, f64), gt: &GeoTransform) -> PixelOffset {
    let col = ((coord.0 - gt.x0) / gt.dx).floor();
    let row = ((coord.1 - gt.y0) / gt.dy).floor();
    PixelOffset::new(col as i64, row as i64)
}

/// World coordinate of the top-left corner of `offset`. Inverse of
/// [`to_pixel_offset`] on axis-aligned transforms.
pub fn to_world_coord(offset: PixelOffset, gt: &GeoTransform) -> (f64, f64) {
    let x = offset.col as f64 * gt.dx + gt.x0;
    let y = offset.row as f64 * gt.dy + gt.y0;
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utm_transform() -> GeoTransform {
        // 15 m ASTER-like grid, north-up
        GeoTransform::new(419_976.5, 15.0, 0.0, 4_662_422.5, 0.0, -15.0)
    }

    #[test]
    fn test_origin_maps_to_zero() {
        let gt = utm_transform();
        assert_eq!(to_pixel_offset((gt.x0, gt.y0), &gt), PixelOffset::new(0, 0));
    }

    #[test]
    fn test_point_inside_pixel() {
        let gt = utm_transform();
        // 3.5 pixels right, 7.2 pixels down
        let x = gt.x0 + 3.5 * 15.0;
        let y = gt.y0 - 7.2 * 15.0;
        assert_eq!(to_pixel_offset((x, y), &gt), PixelOffset::new(3, 7));
    }

    #[test]
    fn test_negative_offsets_floor() {
        let gt = utm_transform();
        // Half a pixel left of and above the origin
        let offset = to_pixel_offset((gt.x0 - 7.5, gt.y0 + 7.5), &gt);
        assert_eq!(offset, PixelOffset::new(-1, -1));
        assert!(!offset.is_within(10, 10));
    }

    #[test]
    fn test_round_trip() {
        let gt = utm_transform();
        for row in 0..40 {
            for col in 0..40 {
                let offset = PixelOffset::new(col, row);
                let world = to_world_coord(offset, &gt);
                assert_eq!(to_pixel_offset(world, &gt), offset);
            }
        }
    }

    #[test]
    fn test_round_trip_unit_grid() {
        let gt = GeoTransform::default();
        let offset = PixelOffset::new(123, 456);
        assert_eq!(to_world_coord(offset, &gt), (123.0, 456.0));
        assert_eq!(to_pixel_offset((123.0, 456.0), &gt), offset);
    }

    #[test]
    fn test_world_coord_matches_full_transform() {
        let gt = utm_transform();
        let offset = PixelOffset::new(12, 34);
        assert_eq!(to_world_coord(offset, &gt), gt.pixel_to_world(12.0, 34.0));
    }

    #[test]
    fn test_gdal_array_round_trip() {
        let gt = [500000.0, 10.0, 0.0, 6000000.0, 0.0, -10.0];
        assert_eq!(GeoTransform::from_gdal(&gt).to_gdal(), gt);
    }

    #[test]
    fn test_rotated_transform_rejected() {
        let gt = GeoTransform::new(0.0, 1.0, 0.25, 0.0, 0.1, -1.0);
        assert!(!gt.is_axis_aligned());
        assert!(matches!(
            gt.ensure_axis_aligned(),
            Err(RasterError::RotatedGeoTransform(_, _))
        ));
        assert!(utm_transform().ensure_axis_aligned().is_ok());
    }

    #[test]
    fn test_checked_index() {
        assert_eq!(PixelOffset::new(2, 3).checked_index(4, 4), Some((2, 3)));
        assert_eq!(PixelOffset::new(4, 0).checked_index(4, 4), None);
        assert_eq!(PixelOffset::new(0, -1).checked_index(4, 4), None);
    }
}
