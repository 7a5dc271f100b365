// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer value types shared by every compositor component.
//!
//! Compositing works on whole pixels: positions, clip rectangles and
//! destination rectangles are all rounded to integers before they reach the
//! backend. These types are plain `Copy` values with structural equality.
//! Conversions to [`kurbo`] types are provided for the places that need
//! floating-point geometry (rotation, hit testing).

/// Rounds to the nearest integer, halves away from zero.
#[inline]
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "compositor coordinates are far inside i32 range"
)]
pub fn round_i32(v: f64) -> i32 {
    v.round() as i32
}

/// A point in integer pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Creates a point.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<Point> for kurbo::Point {
    fn from(p: Point) -> Self {
        Self::new(f64::from(p.x), f64::from(p.y))
    }
}

/// A width/height pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Creates a size.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of bytes in a tightly packed RGBA buffer of this size.
    #[inline]
    #[must_use]
    pub const fn rgba_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// An axis-aligned rectangle in integer pixel coordinates.
///
/// Width and height are signed so that intermediate clipping arithmetic can
/// go negative; a rectangle with a non-positive extent is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Rect {
    /// Creates a rectangle.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle at the origin covering `size`.
    #[inline]
    #[must_use]
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width as i32, size.height as i32)
    }

    /// Exclusive right edge.
    #[inline]
    #[must_use]
    pub const fn right(self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.y + self.height
    }

    /// Top-left corner.
    #[inline]
    #[must_use]
    pub const fn origin(self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Returns `true` if `p` lies inside the rectangle (right/bottom exclusive).
    #[inline]
    #[must_use]
    pub const fn contains(self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.right() && p.y < self.bottom()
    }

    /// Returns the overlap of two rectangles, or `None` if they are disjoint.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        let r = Self::new(x0, y0, x1 - x0, y1 - y0);
        (!r.is_empty()).then_some(r)
    }

    /// Returns the center, rounded toward the top-left.
    #[inline]
    #[must_use]
    pub const fn center(self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}

impl From<Rect> for kurbo::Rect {
    fn from(r: Rect) -> Self {
        Self::new(
            f64::from(r.x),
            f64::from(r.y),
            f64::from(r.right()),
            f64::from(r.bottom()),
        )
    }
}

/// An 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Alpha channel.
    pub alpha: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    /// Opaque white; the identity for [`modulate`](Self::modulate).
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Creates an opaque color.
    #[inline]
    #[must_use]
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self::rgba(red, green, blue, 255)
    }

    /// Creates a color with explicit alpha.
    #[inline]
    #[must_use]
    pub const fn rgba(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Per-channel multiply, each channel normalized to `0..=1`.
    #[must_use]
    pub fn modulate(self, other: Self) -> Self {
        Self {
            red: mul_u8(self.red, other.red),
            green: mul_u8(self.green, other.green),
            blue: mul_u8(self.blue, other.blue),
            alpha: mul_u8(self.alpha, other.alpha),
        }
    }

    /// Returns the channels in `[r, g, b, a]` order.
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

/// Multiplies two normalized bytes, rounding to the nearest byte.
#[inline]
#[must_use]
pub fn mul_u8(a: u8, b: u8) -> u8 {
    let v = (u32::from(a) * u32::from(b) + 127) / 255;
    u8::try_from(v).unwrap_or(u8::MAX)
}

/// Multiplies several normalized bytes and rounds the product once.
#[must_use]
pub fn combine_alpha(factors: &[u8]) -> u8 {
    let product = factors
        .iter()
        .fold(1.0_f64, |acc, &f| acc * f64::from(f) / 255.0);
    u8::try_from(round_i32(product * 255.0).clamp(0, 255)).unwrap_or(u8::MAX)
}
