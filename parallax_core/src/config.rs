// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor configuration.

use crate::geometry::Color;

/// How errors returned by window callbacks are handled during a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DispatchMode {
    /// Propagate the first callback error out of the tick.
    #[default]
    Strict,
    /// Log callback errors and keep dispatching to the remaining windows.
    Tolerant,
}

/// Configuration for a [`Compositor`](crate::Compositor).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositorConfig {
    /// Callback error policy.
    pub dispatch: DispatchMode,
    /// Z of each window's background viewport.
    pub background_z: i32,
    /// Z of each window's foreground overlay viewport.
    pub foreground_z: i32,
    /// Fill color of the foreground overlay (drawn at the overlay's opacity).
    pub foreground_color: Color,
    /// Report surfaces and sprites still alive at shutdown.
    pub leak_check: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl CompositorConfig {
    /// Strict dispatch with leak reporting.
    #[must_use]
    pub const fn development() -> Self {
        Self {
            dispatch: DispatchMode::Strict,
            background_z: i32::MIN,
            foreground_z: i32::MAX,
            foreground_color: Color::BLACK,
            leak_check: true,
        }
    }

    /// Tolerant dispatch; one failing window does not stop the others.
    #[must_use]
    pub const fn release() -> Self {
        Self {
            dispatch: DispatchMode::Tolerant,
            leak_check: false,
            ..Self::development()
        }
    }
}
