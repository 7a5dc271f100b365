// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene context that owns every compositor object.
//!
//! A [`Scene`] holds the backend, one slot arena per object kind, the global
//! input state and the live-window registry. It replaces process-wide
//! registries: everything a tick touches is reachable from this one value.
//!
//! Object operations are spread over the modules that define each kind
//! ([`surface`](crate::surface), [`sprite`](crate::sprite),
//! [`viewport`](crate::viewport), [`renderer`](crate::renderer),
//! [`window`](crate::window)) as `impl Scene<B>` blocks.

use core::fmt;

use crate::arena::Arena;
use crate::backend::Backend;
use crate::config::CompositorConfig;
use crate::geometry::{Rect, Size};
use crate::id::{RendererId, SpriteId, Stamp, SurfaceId, ViewportId, WindowId};
use crate::input::InputState;
use crate::renderer::Renderer;
use crate::sprite::Sprite;
use crate::surface::Surface;
use crate::viewport::Viewport;
use crate::window::Window;

/// An object still alive when the scene was expected to be empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leak {
    /// A surface that was never disposed.
    Surface {
        /// The surface.
        id: SurfaceId,
        /// Its size.
        size: Size,
    },
    /// A sprite that was never disposed.
    Sprite {
        /// The sprite.
        id: SpriteId,
        /// The viewport it is attached to.
        viewport: ViewportId,
    },
}

/// Owner of all compositor state.
pub struct Scene<B> {
    pub(crate) backend: B,
    pub(crate) surfaces: Arena<SurfaceId, Surface>,
    pub(crate) sprites: Arena<SpriteId, Sprite>,
    pub(crate) viewports: Arena<ViewportId, Viewport>,
    pub(crate) renderers: Arena<RendererId, Renderer>,
    pub(crate) windows: Arena<WindowId, Window>,
    /// Initialized windows in initialization order. Closing leaves a hole so
    /// indices captured during dispatch stay valid; holes are compacted at
    /// the start of the next tick.
    pub(crate) registry: Vec<Option<WindowId>>,
    pub(crate) default_viewport: Option<ViewportId>,
    pub(crate) input: InputState,
    pub(crate) config: CompositorConfig,
    next_stamp: u64,
}

impl<B> fmt::Debug for Scene<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("surfaces", &self.surfaces.len())
            .field("sprites", &self.sprites.len())
            .field("viewports", &self.viewports.len())
            .field("renderers", &self.renderers.len())
            .field("windows", &self.windows.len())
            .field("default_viewport", &self.default_viewport)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Scene<B> {
    /// Creates an empty scene with the development configuration.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, CompositorConfig::default())
    }

    /// Creates an empty scene.
    #[must_use]
    pub fn with_config(backend: B, config: CompositorConfig) -> Self {
        Self {
            backend,
            surfaces: Arena::new(),
            sprites: Arena::new(),
            viewports: Arena::new(),
            renderers: Arena::new(),
            windows: Arena::new(),
            registry: Vec::new(),
            default_viewport: None,
            input: InputState::new(),
            config,
            next_stamp: 0,
        }
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the backend mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Returns the global keyboard and mouse state.
    #[must_use]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Returns the viewport a `None` viewport argument resolves to.
    ///
    /// This is the content viewport of the first initialized window, until
    /// that viewport is disposed.
    #[must_use]
    pub fn default_viewport(&self) -> Option<ViewportId> {
        self.default_viewport
    }

    /// Returns the bounds of every connected display.
    #[must_use]
    pub fn display_bounds(&self) -> Vec<Rect> {
        self.backend.display_bounds()
    }

    /// Iterates initialized, not yet closed windows in registry order.
    pub fn live_windows(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.registry.iter().flatten().copied()
    }

    /// Number of live surfaces, tiles included.
    #[must_use]
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Number of live sprites.
    #[must_use]
    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    /// Number of live viewports.
    #[must_use]
    pub fn viewport_count(&self) -> usize {
        self.viewports.len()
    }

    /// Lists every surface and sprite that is still alive.
    ///
    /// Meant to be called once all windows are disposed: anything left was
    /// never explicitly released. Tiles are reported through their tiled
    /// parent.
    #[must_use]
    pub fn leak_report(&self) -> Vec<Leak> {
        let surfaces = self
            .surfaces
            .iter()
            .filter(|(_, s)| s.parent.is_none())
            .map(|(id, s)| Leak::Surface { id, size: s.size });
        let sprites = self.sprites.iter().map(|(id, s)| Leak::Sprite {
            id,
            viewport: s.viewport,
        });
        surfaces.chain(sprites).collect()
    }

    /// Drops the holes closed windows left in the registry. Only valid
    /// between ticks, when no dispatch holds a registry index.
    pub(crate) fn compact_registry(&mut self) {
        self.registry.retain(Option::is_some);
    }

    // -- Upward notification --

    pub(crate) fn next_stamp(&mut self) -> Stamp {
        self.next_stamp += 1;
        Stamp(self.next_stamp)
    }

    /// Marks a renderer as needing a redraw.
    pub(crate) fn notify_renderer(&mut self, renderer: RendererId) {
        if let Some(r) = self.renderers.get_mut(renderer) {
            r.dirty.mark_redraw();
        }
    }

    /// Marks a viewport changed and forwards to its renderer. A Z change
    /// also requests a viewport re-sort.
    pub(crate) fn notify_viewport(&mut self, viewport: ViewportId, z_changed: bool) {
        let Some(vp) = self.viewports.get_mut(viewport) else {
            return;
        };
        vp.dirty.mark_redraw();
        let renderer = vp.renderer;
        if z_changed && let Some(r) = self.renderers.get_mut(renderer) {
            r.dirty.mark_reorder();
        }
        self.notify_renderer(renderer);
    }

    /// Marks a sprite changed and forwards to its viewport. A Z change also
    /// requests a sprite re-sort in that viewport.
    pub(crate) fn notify_sprite(&mut self, sprite: SpriteId, z_changed: bool) {
        let Some(viewport) = self.sprites.get(sprite).map(|s| s.viewport) else {
            return;
        };
        if z_changed && let Some(vp) = self.viewports.get_mut(viewport) {
            vp.dirty.mark_reorder();
        }
        self.notify_viewport(viewport, false);
    }
}
