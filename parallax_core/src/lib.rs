// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained-mode 2D sprite compositor.
//!
//! `parallax_core` keeps a small scene of windows, renderers, viewports and
//! sprites, tracks what changed since the last frame, and redraws a window
//! only when something in it did. It never rasterizes: every native
//! operation goes through the [`Backend`] trait.
//!
//! # Architecture
//!
//! ```text
//!   Window ──owns──► Renderer ──owns──► Viewport* ──owns──► Sprite*
//!                                                             │
//!                                                          Surface
//!                                                   (pixels | tiles)
//!
//!   backend events ─► Compositor::tick ─► WindowHandler callbacks
//!                                              │ mutate
//!                                              ▼
//!                     Sprite/Viewport setters ─► dirty ─► Renderer
//!                                                           │
//!                     Compositor::tick ─► Scene::redraw ◄───┘
//! ```
//!
//! **[`scene`]**: the [`Scene`] context owning every object in generational
//! arenas. Operations on each object kind live in that kind's module.
//!
//! **[`surface`]**, **[`sprite`]**, **[`viewport`]**, **[`renderer`]**,
//! **[`window`]**: the ownership hierarchy. Setters notify upward; only
//! [`Scene::redraw`] does work.
//!
//! **[`compositor`]**: the [`Compositor`] tick loop, input dispatch and
//! window lifecycle.
//!
//! **[`input`]**: edge-detected keyboard and mouse state.
//!
//! **[`pending`]**: the thread-safe [`MainThreadQueue`](pending::MainThreadQueue).
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) hooks for tick
//! instrumentation.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).
//! - `testing` (disabled by default): Exports the [`testing`] module with a
//!   recording backend double.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod arena;

pub mod backend;
pub mod compositor;
pub mod config;
pub mod dirty;
pub mod error;
pub mod geometry;
pub mod id;
pub mod input;
pub mod pending;
pub mod renderer;
pub mod scene;
pub mod sprite;
pub mod surface;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod trace;
pub mod viewport;
pub mod window;

pub use backend::{Backend, BackendError, BackendEvent};
pub use compositor::Compositor;
pub use config::{CompositorConfig, DispatchMode};
pub use error::{Error, Result};
pub use geometry::{Color, Point, Rect, Size};
pub use id::{RendererId, SpriteId, SurfaceId, ViewportId, WindowId};
pub use scene::{Leak, Scene};
pub use window::{CloseResponse, WindowDesc, WindowHandler, WindowState};
