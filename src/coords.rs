//! Coordinate mapping between rendered page surfaces and note anchors
//!
//! Anchors are stored as percentages of the page so they survive rendering
//! at any scale. Pointer events arrive in surface pixels.

use serde::{Deserialize, Serialize};

use crate::error::AnchorError;

/// Position on a page as percentages (0-100) of the surface size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentPoint {
    pub x_percent: f64,
    pub y_percent: f64,
}

/// Position on a rendered surface in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

/// Convert a pointer position on a surface to percentages.
///
/// Both results are clamped to `[0, 100]`: pointer events fired on the
/// surface edge can land a fraction of a pixel outside it.
pub fn to_percent(
    pixel_x: f64,
    pixel_y: f64,
    surface_width: f64,
    surface_height: f64,
) -> Result<PercentPoint, AnchorError> {
    check_surface(surface_width, surface_height)?;

    Ok(PercentPoint {
        x_percent: (100.0 * pixel_x / surface_width).clamp(0.0, 100.0),
        y_percent: (100.0 * pixel_y / surface_height).clamp(0.0, 100.0),
    })
}

/// Convert percentages back to a pixel position on a surface.
pub fn to_pixel(
    x_percent: f64,
    y_percent: f64,
    surface_width: f64,
    surface_height: f64,
) -> Result<PixelPoint, AnchorError> {
    check_surface(surface_width, surface_height)?;

    Ok(PixelPoint {
        x: x_percent * surface_width / 100.0,
        y: y_percent * surface_height / 100.0,
    })
}

fn check_surface(width: f64, height: f64) -> Result<(), AnchorError> {
    // NaN fails both comparisons
    if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
        return Err(AnchorError::InvalidSurface { width, height });
    }
    Ok(())
}
