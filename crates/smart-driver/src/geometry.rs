//! Screen geometry and density normalization.
//!
//! The classification service reports element rectangles in raw screenshot
//! pixels. Drivers work in logical units (points / CSS pixels). The ratio
//! between the two is the [`DensityMultiplier`], measured once per session.
//!
//! Normalization truncates, it never rounds: fractional pixels are dropped,
//! and the click point is derived from the already-truncated size, so
//! `click.x == location.x + size.width / 2` holds for every rectangle.

use serde::{Deserialize, Serialize};

use crate::result::{SmartError, SmartResult};

/// A point in 2D space, in whole units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
}

impl Size {
    /// Create a new size
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Rectangle: origin plus size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// X position
    pub x: i32,
    /// Y position
    pub y: i32,
    /// Width
    pub width: i32,
    /// Height
    pub height: i32,
}

impl Rect {
    /// Create a new rectangle
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from a location and a size
    #[must_use]
    pub const fn from_parts(location: Point, size: Size) -> Self {
        Self::new(location.x, location.y, size.width, size.height)
    }

    /// Top-left corner
    #[must_use]
    pub const fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Width and height
    #[must_use]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Ratio of raw screenshot pixels to logical window units. Always > 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensityMultiplier(f64);

impl DensityMultiplier {
    /// Identity multiplier (screenshot and window share units)
    pub const ONE: Self = Self(1.0);

    /// Create a multiplier, rejecting non-finite and non-positive values
    pub fn new(value: f64) -> SmartResult<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(SmartError::initialization(format!(
                "density multiplier must be a positive number, got {value}"
            )))
        }
    }

    /// Measure from screenshot pixel width and logical window width
    pub fn from_widths(screenshot_pixels: u32, window_logical: u32) -> SmartResult<Self> {
        if window_logical == 0 {
            return Err(SmartError::initialization(
                "window reports a logical width of 0",
            ));
        }
        Self::new(f64::from(screenshot_pixels) / f64::from(window_logical))
    }

    /// Raw value
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Divide a raw pixel measure and truncate toward zero.
    ///
    /// Divides by the exact multiplier, not by its integer part, so a
    /// density of 2.625 scales 2625 down to 1000 rather than 1312. Results
    /// outside the `i32` range saturate.
    #[must_use]
    pub fn scale_down(self, raw: i32) -> i32 {
        (f64::from(raw) / self.0).trunc() as i32
    }
}

impl Default for DensityMultiplier {
    fn default() -> Self {
        Self::ONE
    }
}

/// A rectangle in logical units with its tap target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalRect {
    /// Top-left corner
    pub location: Point,
    /// Width and height
    pub size: Size,
    /// Point a tap should land on
    pub click_point: Point,
}

impl LogicalRect {
    /// Location and size as one rectangle
    #[must_use]
    pub const fn rect(&self) -> Rect {
        Rect::from_parts(self.location, self.size)
    }
}

/// Convert a raw pixel rectangle into logical units.
///
/// Each component goes through [`DensityMultiplier::scale_down`], so a
/// fractional density divides by the exact multiplier instead of truncating
/// it to an integer first. The click point sums location and half size with
/// saturating arithmetic.
#[must_use]
pub fn normalize(raw: Rect, multiplier: DensityMultiplier) -> LogicalRect {
    let location = Point::new(multiplier.scale_down(raw.x), multiplier.scale_down(raw.y));
    let size = Size::new(
        multiplier.scale_down(raw.width),
        multiplier.scale_down(raw.height),
    );
    let click_point = Point::new(
        location.x.saturating_add(size.width / 2),
        location.y.saturating_add(size.height / 2),
    );
    LogicalRect {
        location,
        size,
        click_point,
    }
}
