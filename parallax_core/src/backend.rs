// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for native graphics and windowing integrations.
//!
//! The compositor never rasterizes anything itself. Window creation, texture
//! upload, textured-quad copies, readback and the input event queue are
//! capabilities it calls into through the [`Backend`] trait. Platform crates
//! (or the software `parallax_headless` crate) implement it.
//!
//! # Call pattern
//!
//! A redraw of one renderer issues, in order:
//!
//! ```text
//!   set_clip(target, None) ─► clear(target)
//!        │
//!        ▼  (per visible viewport, back to front)
//!   set_clip(target, Some(viewport clip))
//!        │
//!        ▼  (per visible sprite, back to front)
//!   copy(target, texture, &CopyParams)
//!        │
//!        ▼
//!   set_clip(target, None) ─► present(window, target)
//! ```
//!
//! Off-screen capture swaps `present` for [`read_pixels`](Backend::read_pixels).

use kurbo::{Affine, Vec2};

use crate::geometry::{Color, Point, Rect, Size};
use crate::input::{Key, MouseButton};
use crate::window::WindowDesc;

/// Identifies a native window (and its rendering context) inside a backend.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NativeWindowId(pub u32);

/// Identifies a backend texture or render target.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TextureHandle(pub u64);

/// A failure reported by the backend, carrying its native error text.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    /// The backend's own description of the failure.
    pub message: String,
}

impl BackendError {
    /// Wraps a native error message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Rotation and mirroring applied by a [`copy`](Backend::copy).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    /// Clockwise angle in degrees, already reduced to `0..360`.
    pub angle: f64,
    /// Pivot relative to the destination rectangle's top-left corner.
    pub pivot: Point,
    /// Mirror horizontally before rotating.
    pub flip_h: bool,
    /// Mirror vertically before rotating.
    pub flip_v: bool,
}

/// Parameters of one textured copy onto a render target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CopyParams {
    /// Region of the source texture to read.
    pub src: Rect,
    /// Destination rectangle on the target, before rotation.
    pub dst: Rect,
    /// Rotation and mirroring, or `None` for an axis-aligned copy.
    pub rotation: Option<Rotation>,
    /// Per-channel color modulation (alpha channel ignored).
    pub color: Color,
    /// Alpha modulation.
    pub alpha: u8,
}

impl CopyParams {
    /// Returns the affine map from destination-local coordinates
    /// (`0..dst.width`, `0..dst.height`) to target coordinates.
    ///
    /// Mirroring is applied in destination-local space, then the result is
    /// rotated clockwise about the pivot and translated to `dst`'s corner.
    #[must_use]
    pub fn transform(&self) -> Affine {
        let origin = Vec2::new(f64::from(self.dst.x), f64::from(self.dst.y));
        let Some(rot) = self.rotation else {
            return Affine::translate(origin);
        };
        let w = f64::from(self.dst.width);
        let h = f64::from(self.dst.height);
        let flip = Affine::new([
            if rot.flip_h { -1.0 } else { 1.0 },
            0.0,
            0.0,
            if rot.flip_v { -1.0 } else { 1.0 },
            if rot.flip_h { w } else { 0.0 },
            if rot.flip_v { h } else { 0.0 },
        ]);
        let pivot = kurbo::Point::from(rot.pivot);
        Affine::translate(origin)
            * Affine::rotate_about(rot.angle.to_radians(), pivot)
            * flip
    }

    /// Returns the axis-aligned bounds of the transformed destination.
    #[must_use]
    pub fn bounds(&self) -> kurbo::Rect {
        let local = kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.dst.width),
            f64::from(self.dst.height),
        );
        self.transform().transform_rect_bbox(local)
    }
}

/// An input or window event polled from the backend queue.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendEvent {
    /// The user asked to close a window.
    CloseRequested {
        /// Originating window.
        window: NativeWindowId,
    },
    /// A window gained keyboard focus.
    FocusGained {
        /// Originating window.
        window: NativeWindowId,
    },
    /// A window lost keyboard focus.
    FocusLost {
        /// Originating window.
        window: NativeWindowId,
    },
    /// A window was moved.
    Moved {
        /// Originating window.
        window: NativeWindowId,
        /// New top-left position on the desktop.
        position: Point,
    },
    /// A window was resized.
    Resized {
        /// Originating window.
        window: NativeWindowId,
        /// New client size.
        size: Size,
    },
    /// A key went down.
    KeyDown {
        /// Originating window.
        window: NativeWindowId,
        /// Physical key.
        key: Key,
    },
    /// A key went up.
    KeyUp {
        /// Originating window.
        window: NativeWindowId,
        /// Physical key.
        key: Key,
    },
    /// The pointer moved.
    MouseMotion {
        /// Originating window.
        window: NativeWindowId,
        /// Pointer position in window coordinates.
        position: Point,
    },
    /// A mouse button went down.
    MouseDown {
        /// Originating window.
        window: NativeWindowId,
        /// Button.
        button: MouseButton,
        /// Pointer position in window coordinates.
        position: Point,
    },
    /// A mouse button went up.
    MouseUp {
        /// Originating window.
        window: NativeWindowId,
        /// Button.
        button: MouseButton,
        /// Pointer position in window coordinates.
        position: Point,
    },
    /// The wheel scrolled.
    MouseWheel {
        /// Originating window.
        window: NativeWindowId,
        /// Scroll amount on each axis.
        delta: Point,
    },
    /// Raw text input, NUL-terminated UTF-8 as delivered by the platform.
    TextInput {
        /// Originating window.
        window: NativeWindowId,
        /// Raw input buffer.
        raw: Vec<u8>,
    },
}

impl BackendEvent {
    /// Returns the window the event originated from.
    #[must_use]
    pub const fn window(&self) -> NativeWindowId {
        match self {
            Self::CloseRequested { window }
            | Self::FocusGained { window }
            | Self::FocusLost { window }
            | Self::Moved { window, .. }
            | Self::Resized { window, .. }
            | Self::KeyDown { window, .. }
            | Self::KeyUp { window, .. }
            | Self::MouseMotion { window, .. }
            | Self::MouseDown { window, .. }
            | Self::MouseUp { window, .. }
            | Self::MouseWheel { window, .. }
            | Self::TextInput { window, .. } => *window,
        }
    }
}

/// Native capabilities the compositor relies on.
///
/// Implementations own every native resource; the compositor only holds the
/// opaque [`NativeWindowId`] and [`TextureHandle`] values they hand out.
/// Destroy calls must tolerate handles whose window is already gone.
pub trait Backend {
    /// Creates a native window with its rendering context.
    fn create_window(&mut self, desc: &WindowDesc) -> Result<NativeWindowId, BackendError>;

    /// Destroys a native window and every texture created against it.
    fn destroy_window(&mut self, window: NativeWindowId);

    /// Updates the title bar text.
    fn set_window_title(&mut self, window: NativeWindowId, title: &str);

    /// Moves a window.
    fn set_window_position(&mut self, window: NativeWindowId, position: Point);

    /// Resizes a window's client area.
    fn set_window_size(&mut self, window: NativeWindowId, size: Size);

    /// Sets the window icon from tightly packed RGBA pixels.
    fn set_window_icon(&mut self, window: NativeWindowId, size: Size, rgba: &[u8]);

    /// Creates an off-screen render target in `window`'s context.
    fn create_target(
        &mut self,
        window: NativeWindowId,
        size: Size,
    ) -> Result<TextureHandle, BackendError>;

    /// Creates a texture in `window`'s context from tightly packed RGBA pixels.
    fn create_texture(
        &mut self,
        window: NativeWindowId,
        size: Size,
        rgba: &[u8],
    ) -> Result<TextureHandle, BackendError>;

    /// Releases a texture or render target.
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Clears a render target to transparent black.
    fn clear(&mut self, target: TextureHandle) -> Result<(), BackendError>;

    /// Restricts subsequent copies to `clip`, or lifts the restriction.
    fn set_clip(&mut self, target: TextureHandle, clip: Option<Rect>);

    /// Copies a region of `texture` onto `target`.
    fn copy(
        &mut self,
        target: TextureHandle,
        texture: TextureHandle,
        params: &CopyParams,
    ) -> Result<(), BackendError>;

    /// Shows `target` in the window's visible surface.
    fn present(&mut self, window: NativeWindowId, target: TextureHandle)
    -> Result<(), BackendError>;

    /// Reads a render target back as tightly packed RGBA pixels.
    fn read_pixels(&mut self, target: TextureHandle) -> Result<Vec<u8>, BackendError>;

    /// Pops the oldest pending event, if any.
    fn poll_event(&mut self) -> Option<BackendEvent>;

    /// Returns the bounds of every connected display.
    fn display_bounds(&self) -> Vec<Rect>;
}
