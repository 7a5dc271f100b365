// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-state bookkeeping.
//!
//! Invalidation in the compositor flows strictly upward along the ownership
//! hierarchy:
//!
//! ```text
//!   Sprite property ──► Viewport ──► Renderer  (needs_redraw)
//!   Sprite Z        ──► Viewport   (needs_reorder)
//!   Viewport Z      ──► Renderer   (needs_reorder)
//! ```
//!
//! Each node carries an explicit [`DirtyState`]; setters call an upward
//! notify helper on the scene instead of relying on hidden side effects.
//! Consumption happens in [`Scene::redraw`](crate::Scene::redraw), which takes
//! the reorder flags while sorting and clears `needs_redraw` once the frame is
//! presented.

/// Explicit dirty flags for one node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyState {
    needs_redraw: bool,
    needs_reorder: bool,
    invalidations: u64,
}

impl DirtyState {
    /// A state that requests a first full redraw and sort.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            needs_redraw: true,
            needs_reorder: true,
            invalidations: 1,
        }
    }

    /// Marks the node as needing a redraw.
    ///
    /// Returns `true` on a clean-to-dirty transition; repeated marks within
    /// one batch are absorbed.
    pub fn mark_redraw(&mut self) -> bool {
        if self.needs_redraw {
            return false;
        }
        self.needs_redraw = true;
        self.invalidations += 1;
        true
    }

    /// Marks the node's children as needing a stable re-sort.
    pub fn mark_reorder(&mut self) {
        self.needs_reorder = true;
    }

    /// Returns whether a redraw is pending.
    #[must_use]
    pub const fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Returns whether a re-sort is pending.
    #[must_use]
    pub const fn needs_reorder(&self) -> bool {
        self.needs_reorder
    }

    /// Clears and returns the reorder flag.
    pub fn take_reorder(&mut self) -> bool {
        core::mem::take(&mut self.needs_reorder)
    }

    /// Clears the redraw flag after a frame was presented.
    pub fn clear_redraw(&mut self) {
        self.needs_redraw = false;
    }

    /// Number of clean-to-dirty transitions so far.
    #[must_use]
    pub const fn invalidations(&self) -> u64 {
        self.invalidations
    }
}
