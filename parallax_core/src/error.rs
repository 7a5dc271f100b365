// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type for fallible compositor operations.
//!
//! Fatal backend failures and frame-aborting contract violations surface as
//! [`Error`]. Misuse of a disposed handle is not represented here: it panics
//! at the call site with a `stale <Kind>Id` message.

use crate::backend::BackendError;
use crate::id::{SpriteId, SurfaceId, WindowId};

/// Errors produced by the compositor.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend failed to create or use a native resource.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A sprite was composited while its surface was locked for pixel access.
    #[error("{sprite:?} composites {surface:?} while it is locked")]
    SurfaceLocked {
        /// The offending sprite.
        sprite: SpriteId,
        /// The locked surface.
        surface: SurfaceId,
    },

    /// A sprite was composited before its surface got a backend texture.
    #[error("{sprite:?} composites {surface:?}, which has no texture")]
    MissingTexture {
        /// The offending sprite.
        sprite: SpriteId,
        /// The surface without a texture.
        surface: SurfaceId,
    },

    /// Pixel access on a surface that is not locked.
    #[error("{0:?} must be locked for pixel access")]
    SurfaceUnlocked(SurfaceId),

    /// An operation needs a window that has been initialized.
    #[error("{0:?} is not initialized")]
    NotInitialized(WindowId),

    /// A `None` viewport was requested before any window was initialized.
    #[error("no default viewport: initialize a window first")]
    NoDefaultViewport,

    /// A window callback returned an error in strict dispatch mode.
    #[error("window callback failed: {0:#}")]
    Callback(anyhow::Error),

    /// Any other violated usage contract.
    #[error("contract violation: {0}")]
    Contract(&'static str),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
