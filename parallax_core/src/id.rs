// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene object identity types.
//!
//! Every scene object is addressed by a generational handle: a slot index plus
//! a generation counter. Disposing an object bumps the slot's generation, so a
//! handle kept past disposal is detected instead of silently aliasing a
//! recycled slot.

use core::fmt;

/// Common behavior of generational handles, used by the slot arena.
pub(crate) trait Handle: Copy + fmt::Debug {
    /// Name used in stale-handle diagnostics.
    const KIND: &'static str;

    fn from_raw(idx: u32, generation: u32) -> Self;
    fn idx(self) -> u32;
    fn generation(self) -> u32;
}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            pub(crate) idx: u32,
            pub(crate) generation: u32,
        }

        impl $name {
            /// Returns the raw slot index (for diagnostics only).
            #[inline]
            #[must_use]
            pub const fn index(self) -> u32 {
                self.idx
            }

            /// Returns the generation counter.
            #[inline]
            #[must_use]
            pub const fn generation(self) -> u32 {
                self.generation
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}@gen{})", stringify!($name), self.idx, self.generation)
            }
        }

        impl Handle for $name {
            const KIND: &'static str = stringify!($name);

            #[inline]
            fn from_raw(idx: u32, generation: u32) -> Self {
                Self { idx, generation }
            }

            #[inline]
            fn idx(self) -> u32 {
                self.idx
            }

            #[inline]
            fn generation(self) -> u32 {
                self.generation
            }
        }
    };
}

handle! {
    /// A handle to a drawable surface.
    SurfaceId
}

handle! {
    /// A handle to a sprite.
    SpriteId
}

handle! {
    /// A handle to a viewport.
    ViewportId
}

handle! {
    /// A handle to a renderer.
    RendererId
}

handle! {
    /// A handle to a window.
    WindowId
}

/// Creation-order stamp used as the stable tie-break when sorting by Z.
///
/// Stamps are issued by the scene from one monotonically increasing counter,
/// so a later-created sprite or viewport always compares greater.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Stamp(pub(crate) u64);

impl Stamp {
    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stamp({})", self.0)
    }
}
