// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Windows: one renderer plus three built-in viewports.
//!
//! ```text
//!   Constructed ──initialize──► Initialized ──start──► Started
//!        │                           │                    │
//!        └───────────────────────────┴──────close─────────┴──► Closed
//!                                                                 │
//!                          dispose (from any state) ◄─────────────┘
//! ```
//!
//! Initializing a window creates the native window, its renderer and three
//! viewports:
//!
//! - **background**: at [`background_z`](CompositorConfig::background_z),
//!   holding a solid-fill sprite in the window's background color;
//! - **content**: at Z 0, where application sprites go;
//! - **foreground**: at [`foreground_z`](CompositorConfig::foreground_z),
//!   holding a solid-fill overlay sprite, fully transparent by default.
//!
//! Resizing recreates the render target and resizes all three viewports and
//! both fill sprites. Closing destroys the native window but leaves the
//! scene objects alive until the window is disposed.
//!
//! [`CompositorConfig`]: crate::CompositorConfig

use crate::backend::{Backend, NativeWindowId};
use crate::error::{Error, Result};
use crate::geometry::{Color, Point, Size};
use crate::id::{RendererId, SpriteId, SurfaceId, ViewportId, WindowId};
use crate::input::{Key, MouseButton, MouseButtons, TextInput};
use crate::scene::Scene;
use crate::viewport::ViewportProps;

/// Creation parameters of a window.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowDesc {
    /// Title bar text.
    pub title: String,
    /// Desktop position, or `None` to let the backend choose.
    pub position: Option<Point>,
    /// Client area size.
    pub size: Size,
    /// Whether the user may resize the window.
    pub resizable: bool,
    /// Whether the window has decorations.
    pub bordered: bool,
    /// Background fill color.
    pub background: Color,
}

impl WindowDesc {
    /// A bordered, fixed-size window with a black background.
    #[must_use]
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            position: None,
            size: Size::new(width, height),
            resizable: false,
            bordered: true,
            background: Color::BLACK,
        }
    }

    /// Sets the desktop position.
    #[must_use]
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    /// Sets whether the window is resizable.
    #[must_use]
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Sets whether the window has decorations.
    #[must_use]
    pub fn with_bordered(mut self, bordered: bool) -> Self {
        self.bordered = bordered;
        self
    }

    /// Sets the background fill color.
    #[must_use]
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }
}

/// Lifecycle state of a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WindowState {
    /// Created; no native resources yet.
    Constructed,
    /// Native window, renderer and viewports exist.
    Initialized,
    /// The loaded notification has fired; the window receives ticks.
    Started,
    /// The native window is gone; scene objects remain until disposal.
    Closed,
}

/// Answer to a close request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CloseResponse {
    /// Let the window close.
    #[default]
    Proceed,
    /// Keep the window open.
    Cancel,
}

/// Per-window notifications.
///
/// Every method defaults to a no-op, so implementors override only what they
/// need. Callbacks receive the scene so they can mutate sprites and
/// viewports; a callback returning an error is handled according to the
/// compositor's [`DispatchMode`](crate::DispatchMode).
pub trait WindowHandler<B: Backend> {
    /// The window was started.
    fn on_loaded(&mut self, scene: &mut Scene<B>, window: WindowId) -> anyhow::Result<()> {
        _ = (scene, window);
        Ok(())
    }

    /// Once per tick, before backend events are dispatched.
    fn on_tick(&mut self, scene: &mut Scene<B>, window: WindowId) -> anyhow::Result<()> {
        _ = (scene, window);
        Ok(())
    }

    /// The pointer moved to `position`.
    fn on_mouse_move(
        &mut self,
        scene: &mut Scene<B>,
        window: WindowId,
        position: Point,
    ) -> anyhow::Result<()> {
        _ = (scene, window, position);
        Ok(())
    }

    /// A button went down.
    fn on_mouse_down(
        &mut self,
        scene: &mut Scene<B>,
        window: WindowId,
        button: MouseButton,
        position: Point,
    ) -> anyhow::Result<()> {
        _ = (scene, window, button, position);
        Ok(())
    }

    /// Once per tick while the window is focused and any button is held.
    fn on_mouse_press(
        &mut self,
        scene: &mut Scene<B>,
        window: WindowId,
        previous: MouseButtons,
        current: MouseButtons,
    ) -> anyhow::Result<()> {
        _ = (scene, window, previous, current);
        Ok(())
    }

    /// A button went up.
    fn on_mouse_up(
        &mut self,
        scene: &mut Scene<B>,
        window: WindowId,
        button: MouseButton,
        position: Point,
    ) -> anyhow::Result<()> {
        _ = (scene, window, button, position);
        Ok(())
    }

    /// The wheel scrolled by `delta`.
    fn on_mouse_wheel(
        &mut self,
        scene: &mut Scene<B>,
        window: WindowId,
        delta: Point,
    ) -> anyhow::Result<()> {
        _ = (scene, window, delta);
        Ok(())
    }

    /// A key went down (repeats excluded).
    fn on_key_down(
        &mut self,
        scene: &mut Scene<B>,
        window: WindowId,
        key: Key,
    ) -> anyhow::Result<()> {
        _ = (scene, window, key);
        Ok(())
    }

    /// A key went up.
    fn on_key_up(
        &mut self,
        scene: &mut Scene<B>,
        window: WindowId,
        key: Key,
    ) -> anyhow::Result<()> {
        _ = (scene, window, key);
        Ok(())
    }

    /// Text was entered, or an editing key was pressed.
    fn on_text_input(
        &mut self,
        scene: &mut Scene<B>,
        window: WindowId,
        input: &TextInput,
    ) -> anyhow::Result<()> {
        _ = (scene, window, input);
        Ok(())
    }

    /// The window is about to close.
    fn on_closing(
        &mut self,
        scene: &mut Scene<B>,
        window: WindowId,
    ) -> anyhow::Result<CloseResponse> {
        _ = (scene, window);
        Ok(CloseResponse::Proceed)
    }

    /// The window closed.
    fn on_closed(&mut self, scene: &mut Scene<B>, window: WindowId) -> anyhow::Result<()> {
        _ = (scene, window);
        Ok(())
    }

    /// The window gained keyboard focus.
    fn on_focus_gained(&mut self, scene: &mut Scene<B>, window: WindowId) -> anyhow::Result<()> {
        _ = (scene, window);
        Ok(())
    }

    /// The window lost keyboard focus.
    fn on_focus_lost(&mut self, scene: &mut Scene<B>, window: WindowId) -> anyhow::Result<()> {
        _ = (scene, window);
        Ok(())
    }

    /// The window moved.
    fn on_position_changed(
        &mut self,
        scene: &mut Scene<B>,
        window: WindowId,
        position: Point,
    ) -> anyhow::Result<()> {
        _ = (scene, window, position);
        Ok(())
    }

    /// The window was resized.
    fn on_size_changed(
        &mut self,
        scene: &mut Scene<B>,
        window: WindowId,
        size: Size,
    ) -> anyhow::Result<()> {
        _ = (scene, window, size);
        Ok(())
    }
}

/// Scene objects created by [`Scene::initialize_window`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Realized {
    pub(crate) native: NativeWindowId,
    pub(crate) renderer: RendererId,
    pub(crate) content: ViewportId,
    pub(crate) background: ViewportId,
    pub(crate) foreground: ViewportId,
    pub(crate) background_fill: SpriteId,
    pub(crate) foreground_fill: SpriteId,
}

#[derive(Debug)]
pub(crate) struct Window {
    pub(crate) desc: WindowDesc,
    pub(crate) state: WindowState,
    pub(crate) realized: Option<Realized>,
    pub(crate) foreground_color: Color,
    pub(crate) focused: bool,
    pub(crate) close_requested: bool,
}

impl<B: Backend> Scene<B> {
    /// Creates a window in the `Constructed` state.
    pub fn create_window(&mut self, desc: WindowDesc) -> WindowId {
        let foreground_color = self.config.foreground_color;
        self.windows.insert(Window {
            desc,
            state: WindowState::Constructed,
            realized: None,
            foreground_color,
            focused: false,
            close_requested: false,
        })
    }

    /// Creates the native window, its renderer and built-in viewports.
    ///
    /// Calling this on a window that is already initialized does nothing.
    /// The first window initialized provides the default viewport.
    #[track_caller]
    pub fn initialize_window(&mut self, id: WindowId) -> Result<()> {
        let window = self.windows.expect(id);
        match window.state {
            WindowState::Constructed => {}
            WindowState::Initialized | WindowState::Started => return Ok(()),
            WindowState::Closed => return Err(Error::Contract("cannot initialize a closed window")),
        }
        let desc = window.desc.clone();
        let native = self.backend.create_window(&desc)?;
        let renderer = match self.create_renderer(id, native, desc.size) {
            Ok(r) => r,
            Err(err) => {
                self.backend.destroy_window(native);
                return Err(err);
            }
        };

        let full = |z| ViewportProps {
            z,
            width: Some(desc.size.width),
            height: Some(desc.size.height),
            ..ViewportProps::default()
        };
        let (background_z, foreground_z) = (self.config.background_z, self.config.foreground_z);
        let background = self.create_viewport_with(renderer, full(background_z));
        let content = self.create_viewport_with(renderer, full(0));
        let foreground = self.create_viewport_with(
            renderer,
            ViewportProps {
                opacity: 0,
                ..full(foreground_z)
            },
        );
        let foreground_color = self.windows.expect(id).foreground_color;
        let background_fill = self.create_fill(background, desc.size, desc.background)?;
        let foreground_fill = self.create_fill(foreground, desc.size, foreground_color)?;

        let window = self.windows.expect_mut(id);
        window.realized = Some(Realized {
            native,
            renderer,
            content,
            background,
            foreground,
            background_fill,
            foreground_fill,
        });
        window.state = WindowState::Initialized;
        self.registry.push(Some(id));
        if self.default_viewport.is_none() {
            self.default_viewport = Some(content);
        }
        log::debug!("initialized {id:?} as {native:?} ({}x{})", desc.size.width, desc.size.height);
        Ok(())
    }

    /// Returns whether `id` refers to a window that was not disposed.
    #[must_use]
    pub fn is_window_alive(&self, id: WindowId) -> bool {
        self.windows.contains(id)
    }

    /// Returns the lifecycle state.
    #[must_use]
    #[track_caller]
    pub fn window_state(&self, id: WindowId) -> WindowState {
        self.windows.expect(id).state
    }

    /// Returns the creation parameters, updated by moves and resizes.
    #[must_use]
    #[track_caller]
    pub fn window_desc(&self, id: WindowId) -> &WindowDesc {
        &self.windows.expect(id).desc
    }

    /// Returns whether the window has keyboard focus.
    #[must_use]
    #[track_caller]
    pub fn is_focused(&self, id: WindowId) -> bool {
        self.windows.expect(id).focused
    }

    /// Returns the backend's id for the window, once initialized.
    #[must_use]
    #[track_caller]
    pub fn native_window(&self, id: WindowId) -> Option<NativeWindowId> {
        self.windows.expect(id).realized.map(|r| r.native)
    }

    /// Returns the window's renderer.
    #[track_caller]
    pub fn window_renderer(&self, id: WindowId) -> Result<RendererId> {
        self.realized(id).map(|r| r.renderer)
    }

    /// Returns the viewport application sprites go into.
    #[track_caller]
    pub fn content_viewport(&self, id: WindowId) -> Result<ViewportId> {
        self.realized(id).map(|r| r.content)
    }

    /// Returns the viewport behind everything.
    #[track_caller]
    pub fn background_viewport(&self, id: WindowId) -> Result<ViewportId> {
        self.realized(id).map(|r| r.background)
    }

    /// Returns the overlay viewport in front of everything.
    #[track_caller]
    pub fn foreground_viewport(&self, id: WindowId) -> Result<ViewportId> {
        self.realized(id).map(|r| r.foreground)
    }

    /// Sets the title bar text.
    #[track_caller]
    pub fn set_window_title(&mut self, id: WindowId, title: impl Into<String>) {
        let window = self.windows.expect_mut(id);
        window.desc.title = title.into();
        if let Some(r) = window.realized {
            self.backend.set_window_title(r.native, &window.desc.title);
        }
    }

    /// Moves the window on the desktop.
    #[track_caller]
    pub fn set_window_position(&mut self, id: WindowId, position: Point) {
        let window = self.windows.expect_mut(id);
        window.desc.position = Some(position);
        if let Some(r) = window.realized {
            self.backend.set_window_position(r.native, position);
        }
    }

    /// Uses a locked pixel surface as the window icon.
    #[track_caller]
    pub fn set_window_icon(&mut self, id: WindowId, icon: SurfaceId) -> Result<()> {
        let native = self.realized(id)?.native;
        let size = self.surface_size(icon);
        let pixels = self.surface_pixels(icon)?.to_vec();
        self.backend.set_window_icon(native, size, &pixels);
        Ok(())
    }

    /// Resizes the window and everything sized after it.
    #[track_caller]
    pub fn set_window_size(&mut self, id: WindowId, size: Size) -> Result<()> {
        if let Some(r) = self.windows.expect(id).realized {
            self.backend.set_window_size(r.native, size);
        }
        self.resize_window(id, size)
    }

    /// Refills the background sprite.
    #[track_caller]
    pub fn set_background_color(&mut self, id: WindowId, color: Color) -> Result<()> {
        self.windows.expect_mut(id).desc.background = color;
        if let Ok(r) = self.realized(id) {
            self.refill(r.background_fill, color)?;
        }
        Ok(())
    }

    /// Sets the color of the foreground overlay.
    #[track_caller]
    pub fn set_foreground_color(&mut self, id: WindowId, color: Color) -> Result<()> {
        self.windows.expect_mut(id).foreground_color = color;
        if let Ok(r) = self.realized(id) {
            self.refill(r.foreground_fill, color)?;
        }
        Ok(())
    }

    /// Sets the opacity of the foreground overlay, for fades.
    #[track_caller]
    pub fn set_foreground_opacity(&mut self, id: WindowId, opacity: u8) -> Result<()> {
        let foreground = self.realized(id)?.foreground;
        self.set_viewport_opacity(foreground, opacity);
        Ok(())
    }

    /// Asks for the window to be closed after the current dispatch step.
    ///
    /// Meant for use inside window callbacks, where the compositor cannot be
    /// reached.
    #[track_caller]
    pub fn request_close(&mut self, id: WindowId) {
        self.windows.expect_mut(id).close_requested = true;
    }

    /// Disposes the window: its renderer, viewports, sprites and their
    /// surfaces, and the native window if it is still open. Disposing a stale
    /// handle does nothing.
    pub fn dispose_window(&mut self, id: WindowId) {
        let Some(window) = self.windows.get(id) else {
            return;
        };
        if let Some(r) = window.realized {
            let open = window.state != WindowState::Closed;
            self.dispose_renderer(r.renderer);
            if open {
                self.backend.destroy_window(r.native);
            }
        }
        self.unregister(id);
        self.windows.remove(id);
        log::debug!("disposed {id:?}");
    }

    /// Destroys the native window and leaves a hole in the registry.
    pub(crate) fn close_native(&mut self, id: WindowId) {
        let window = self.windows.expect_mut(id);
        window.state = WindowState::Closed;
        window.close_requested = false;
        window.focused = false;
        if let Some(r) = window.realized {
            self.backend.destroy_window(r.native);
        }
        self.unregister(id);
        log::debug!("closed {id:?}");
    }

    /// Applies a new client size to the target, viewports and fill sprites.
    pub(crate) fn resize_window(&mut self, id: WindowId, size: Size) -> Result<()> {
        let window = self.windows.expect_mut(id);
        window.desc.size = size;
        let foreground_color = window.foreground_color;
        let background_color = window.desc.background;
        let Some(r) = window.realized else {
            return Ok(());
        };
        self.resize_renderer(r.renderer, size)?;
        for viewport in [r.background, r.content, r.foreground] {
            self.set_viewport_size(viewport, Some(size.width), Some(size.height));
        }
        self.resize_fill(r.background_fill, size, background_color)?;
        self.resize_fill(r.foreground_fill, size, foreground_color)?;
        log::debug!("resized {id:?} to {}x{}", size.width, size.height);
        Ok(())
    }

    /// Looks up the live window whose native id is `native`.
    pub(crate) fn window_for_native(&self, native: NativeWindowId) -> Option<WindowId> {
        self.live_windows().find(|&w| {
            self.windows
                .get(w)
                .and_then(|w| w.realized)
                .is_some_and(|r| r.native == native)
        })
    }

    fn realized(&self, id: WindowId) -> Result<Realized> {
        self.windows
            .expect(id)
            .realized
            .ok_or(Error::NotInitialized(id))
    }

    /// Removes the window from the registry. If it provided the default
    /// viewport, the next live window's content viewport takes over.
    fn unregister(&mut self, id: WindowId) {
        for slot in &mut self.registry {
            if *slot == Some(id) {
                *slot = None;
            }
        }
        let content = self
            .windows
            .get(id)
            .and_then(|w| w.realized)
            .map(|r| r.content);
        let orphaned = match self.default_viewport {
            None => true,
            Some(v) => Some(v) == content || !self.viewports.contains(v),
        };
        if orphaned {
            let next = self
                .live_windows()
                .find_map(|w| self.windows.get(w).and_then(|w| w.realized))
                .map(|r| r.content);
            self.default_viewport = next;
            log::debug!("default viewport is now {:?}", self.default_viewport);
        }
    }

    fn create_fill(&mut self, viewport: ViewportId, size: Size, color: Color) -> Result<SpriteId> {
        let sprite = self.create_sprite(Some(viewport))?;
        let surface = self.create_surface(size);
        self.fill_surface(surface, color)?;
        self.set_sprite_surface(sprite, Some(surface))?;
        Ok(sprite)
    }

    fn refill(&mut self, sprite: SpriteId, color: Color) -> Result<()> {
        let Some(surface) = self.sprite_surface(sprite) else {
            return Ok(());
        };
        self.lock_surface(surface);
        self.fill_surface(surface, color)?;
        self.unlock_surface(surface)
    }

    fn resize_fill(&mut self, sprite: SpriteId, size: Size, color: Color) -> Result<()> {
        let old = self.sprite_surface(sprite);
        let surface = self.create_surface(size);
        self.fill_surface(surface, color)?;
        self.set_sprite_surface(sprite, Some(surface))?;
        if let Some(old) = old {
            self.dispose_surface(old);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingBackend, scene_with_window};

    #[test]
    fn initialize_is_idempotent() {
        let mut scene = Scene::new(RecordingBackend::new());
        let w = scene.create_window(WindowDesc::new("a", 32, 32));
        assert!(matches!(scene.window_renderer(w), Err(Error::NotInitialized(_))));
        scene.initialize_window(w).unwrap();
        scene.initialize_window(w).unwrap();
        let created = scene
            .backend()
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::CreateWindow(_)))
            .count();
        assert_eq!(created, 1, "second initialize is a no-op");
        assert_eq!(scene.window_state(w), WindowState::Initialized);
        assert_eq!(scene.live_windows().collect::<Vec<_>>(), [w]);
    }

    #[test]
    fn built_in_viewports_are_layered() {
        let (scene, w) = scene_with_window(32, 32);
        let renderer = scene.window_renderer(w).unwrap();
        let bg = scene.background_viewport(w).unwrap();
        let fg = scene.foreground_viewport(w).unwrap();
        assert_eq!(scene.viewport(bg).z, i32::MIN);
        assert_eq!(scene.viewport(fg).z, i32::MAX);
        assert_eq!(scene.viewport(fg).opacity, 0, "overlay starts transparent");
        assert_eq!(scene.renderer_viewports(renderer).len(), 3);
    }

    #[test]
    fn first_window_provides_default_viewport() {
        let (mut scene, first) = scene_with_window(32, 32);
        let second = scene.create_window(WindowDesc::new("b", 16, 16));
        scene.initialize_window(second).unwrap();
        assert_eq!(scene.default_viewport(), scene.content_viewport(first).ok());
    }

    #[test]
    fn resize_cascades() {
        let (mut scene, w) = scene_with_window(32, 32);
        let renderer = scene.window_renderer(w).unwrap();
        scene.set_window_size(w, Size::new(50, 40)).unwrap();
        assert_eq!(scene.renderer_size(renderer), Size::new(50, 40));
        for vp in [
            scene.background_viewport(w).unwrap(),
            scene.content_viewport(w).unwrap(),
            scene.foreground_viewport(w).unwrap(),
        ] {
            assert_eq!(scene.viewport_bounds(vp).width, 50);
            assert_eq!(scene.viewport_bounds(vp).height, 40);
        }
        let bg = scene.background_viewport(w).unwrap();
        let fill = scene.viewport_sprites(bg)[0];
        let surface = scene.sprite_surface(fill).unwrap();
        assert_eq!(scene.surface_size(surface), Size::new(50, 40), "fill resized");
        assert_eq!(scene.backend().live_targets(), 1, "old target released");
    }

    #[test]
    fn close_leaves_registry_hole() {
        let (mut scene, a) = scene_with_window(32, 32);
        let b = scene.create_window(WindowDesc::new("b", 16, 16));
        scene.initialize_window(b).unwrap();
        scene.close_native(a);
        assert_eq!(scene.registry, [None, Some(b)]);
        assert_eq!(scene.window_state(a), WindowState::Closed);
        assert!(scene.is_window_alive(a), "closing does not dispose");
    }

    #[test]
    fn closing_the_default_window_hands_the_default_on() {
        let (mut scene, a) = scene_with_window(32, 32);
        let b = scene.create_window(WindowDesc::new("b", 16, 16));
        scene.initialize_window(b).unwrap();

        scene.close_native(a);
        let b_content = scene.content_viewport(b).ok();
        assert_eq!(scene.default_viewport(), b_content, "next live window takes over");
        let s = scene.create_sprite(None).unwrap();
        assert_eq!(Some(scene.sprite_viewport(s)), b_content);

        scene.dispose_window(b);
        assert_eq!(scene.default_viewport(), None, "no live window left");
        assert!(
            matches!(scene.create_sprite(None), Err(Error::NoDefaultViewport)),
            "nothing to fall back to"
        );
    }

    #[test]
    fn disposing_a_later_window_keeps_the_default() {
        let (mut scene, a) = scene_with_window(32, 32);
        let b = scene.create_window(WindowDesc::new("b", 16, 16));
        scene.initialize_window(b).unwrap();
        scene.dispose_window(b);
        assert_eq!(scene.default_viewport(), scene.content_viewport(a).ok());
    }

    #[test]
    fn dispose_cascades_and_is_idempotent() {
        let (mut scene, w) = scene_with_window(32, 32);
        let s = scene.create_sprite(None).unwrap();
        let surface = scene.create_surface(Size::new(4, 4));
        scene.set_sprite_surface(s, Some(surface)).unwrap();
        scene.dispose_window(w);
        scene.dispose_window(w);
        assert!(!scene.is_window_alive(w));
        assert_eq!(scene.sprite_count(), 0);
        assert_eq!(scene.surface_count(), 0);
        assert_eq!(scene.viewport_count(), 0);
        assert_eq!(scene.backend().live_textures(), 0, "every texture released");
        assert!(scene.leak_report().is_empty());
    }

    #[test]
    fn background_color_refills() {
        let (mut scene, w) = scene_with_window(8, 8);
        scene.set_background_color(w, Color::rgb(1, 2, 3)).unwrap();
        let bg = scene.background_viewport(w).unwrap();
        let fill = scene.viewport_sprites(bg)[0];
        let surface = scene.sprite_surface(fill).unwrap();
        assert!(scene.surface_texture(surface).is_some(), "fill re-uploaded");
        assert_eq!(scene.window_desc(w).background, Color::rgb(1, 2, 3));
    }
}
