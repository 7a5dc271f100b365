// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewports: clipped, offset regions holding an ordered set of sprites.

use crate::backend::Backend;
use crate::dirty::DirtyState;
use crate::error::{Error, Result};
use crate::geometry::{Color, Point, Rect};
use crate::id::{RendererId, SpriteId, Stamp, ViewportId};
use crate::scene::Scene;

/// Attributes of a viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportProps {
    /// Top-left corner on the render target.
    pub position: Point,
    /// Stacking index among the renderer's viewports.
    pub z: i32,
    /// Scroll offset subtracted from the position.
    pub origin: Point,
    /// Width, or `None` to inherit the renderer's width at first render.
    pub width: Option<u32>,
    /// Height, or `None` to inherit the renderer's height at first render.
    pub height: Option<u32>,
    /// Horizontal zoom factor.
    pub zoom_x: f64,
    /// Vertical zoom factor.
    pub zoom_y: f64,
    /// Opacity applied on top of each sprite's.
    pub opacity: u8,
    /// Tint applied on top of each sprite's.
    pub color: Color,
    /// Whether the viewport is drawn at all.
    pub visible: bool,
}

impl Default for ViewportProps {
    fn default() -> Self {
        Self {
            position: Point::ZERO,
            z: 0,
            origin: Point::ZERO,
            width: None,
            height: None,
            zoom_x: 1.0,
            zoom_y: 1.0,
            opacity: 255,
            color: Color::WHITE,
            visible: true,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Viewport {
    pub(crate) props: ViewportProps,
    pub(crate) renderer: RendererId,
    pub(crate) sprites: Vec<SpriteId>,
    pub(crate) dirty: DirtyState,
    pub(crate) stamp: Stamp,
}

impl<B: Backend> Scene<B> {
    /// Creates a full-size viewport in `renderer`.
    #[track_caller]
    pub fn create_viewport(&mut self, renderer: RendererId) -> ViewportId {
        self.create_viewport_with(renderer, ViewportProps::default())
    }

    /// Creates a viewport with explicit attributes.
    #[track_caller]
    pub fn create_viewport_with(
        &mut self,
        renderer: RendererId,
        props: ViewportProps,
    ) -> ViewportId {
        let _ = self.renderers.expect(renderer);
        let stamp = self.next_stamp();
        let id = self.viewports.insert(Viewport {
            props,
            renderer,
            sprites: Vec::new(),
            dirty: DirtyState::initial(),
            stamp,
        });
        let r = self.renderers.expect_mut(renderer);
        r.viewports.push(id);
        r.dirty.mark_reorder();
        self.notify_renderer(renderer);
        id
    }

    /// Returns whether `id` refers to a live viewport.
    #[must_use]
    pub fn is_viewport_alive(&self, id: ViewportId) -> bool {
        self.viewports.contains(id)
    }

    /// Returns the viewport's attributes.
    #[must_use]
    #[track_caller]
    pub fn viewport(&self, id: ViewportId) -> &ViewportProps {
        &self.viewports.expect(id).props
    }

    /// Returns the renderer owning the viewport.
    #[must_use]
    #[track_caller]
    pub fn viewport_renderer(&self, id: ViewportId) -> RendererId {
        self.viewports.expect(id).renderer
    }

    /// Returns the viewport's sprites in their current paint order.
    ///
    /// The order reflects the last sort; a pending re-sort is applied by the
    /// next redraw.
    #[must_use]
    #[track_caller]
    pub fn viewport_sprites(&self, id: ViewportId) -> &[SpriteId] {
        &self.viewports.expect(id).sprites
    }

    /// Returns the viewport's creation stamp.
    #[must_use]
    #[track_caller]
    pub fn viewport_stamp(&self, id: ViewportId) -> Stamp {
        self.viewports.expect(id).stamp
    }

    /// Returns whether the sprites await a re-sort.
    #[must_use]
    #[track_caller]
    pub fn viewport_needs_reorder(&self, id: ViewportId) -> bool {
        self.viewports.expect(id).dirty.needs_reorder()
    }

    /// Returns the viewport's rectangle with inherited sizes resolved.
    #[must_use]
    #[track_caller]
    pub fn viewport_bounds(&self, id: ViewportId) -> Rect {
        let vp = self.viewports.expect(id);
        let size = self.renderers.expect(vp.renderer).size;
        let p = &vp.props;
        Rect::new(
            p.position.x,
            p.position.y,
            to_i32(p.width.unwrap_or(size.width)),
            to_i32(p.height.unwrap_or(size.height)),
        )
    }

    /// Hit-tests `point` against the viewport's resolved bounds.
    #[must_use]
    #[track_caller]
    pub fn viewport_contains(&self, id: ViewportId, point: Point) -> bool {
        self.viewport_bounds(id).contains(point)
    }

    /// Edits several attributes at once, notifying the renderer at most once.
    ///
    /// Returns `true` if anything changed.
    #[track_caller]
    pub fn update_viewport(&mut self, id: ViewportId, f: impl FnOnce(&mut ViewportProps)) -> bool {
        let vp = self.viewports.expect_mut(id);
        let before = vp.props;
        f(&mut vp.props);
        let after = vp.props;
        if after == before {
            return false;
        }
        self.notify_viewport(id, after.z != before.z);
        true
    }

    /// Moves the viewport.
    #[track_caller]
    pub fn set_viewport_position(&mut self, id: ViewportId, position: Point) {
        self.update_viewport(id, |p| p.position = position);
    }

    /// Sets the stacking index.
    #[track_caller]
    pub fn set_viewport_z(&mut self, id: ViewportId, z: i32) {
        self.update_viewport(id, |p| p.z = z);
    }

    /// Sets the scroll offset.
    #[track_caller]
    pub fn set_viewport_origin(&mut self, id: ViewportId, origin: Point) {
        self.update_viewport(id, |p| p.origin = origin);
    }

    /// Sets the size; `None` inherits the renderer's size.
    #[track_caller]
    pub fn set_viewport_size(&mut self, id: ViewportId, width: Option<u32>, height: Option<u32>) {
        self.update_viewport(id, |p| {
            p.width = width;
            p.height = height;
        });
    }

    /// Sets both zoom factors.
    #[track_caller]
    pub fn set_viewport_zoom(&mut self, id: ViewportId, zoom_x: f64, zoom_y: f64) {
        self.update_viewport(id, |p| {
            p.zoom_x = zoom_x;
            p.zoom_y = zoom_y;
        });
    }

    /// Sets the opacity.
    #[track_caller]
    pub fn set_viewport_opacity(&mut self, id: ViewportId, opacity: u8) {
        self.update_viewport(id, |p| p.opacity = opacity);
    }

    /// Sets the tint.
    #[track_caller]
    pub fn set_viewport_color(&mut self, id: ViewportId, color: Color) {
        self.update_viewport(id, |p| p.color = color);
    }

    /// Shows or hides the viewport.
    #[track_caller]
    pub fn set_viewport_visible(&mut self, id: ViewportId, visible: bool) {
        self.update_viewport(id, |p| p.visible = visible);
    }

    /// Requests a redraw of the viewport's renderer.
    #[track_caller]
    pub fn invalidate_viewport(&mut self, id: ViewportId) {
        let _ = self.viewports.expect(id);
        self.notify_viewport(id, false);
    }

    /// Disposes every sprite in the viewport (with their surfaces), then
    /// detaches the viewport from its renderer. Disposing a stale handle does
    /// nothing.
    pub fn dispose_viewport(&mut self, id: ViewportId) {
        let Some(vp) = self.viewports.get_mut(id) else {
            return;
        };
        let sprites = core::mem::take(&mut vp.sprites);
        let count = sprites.len();
        for sprite in sprites {
            self.remove_sprite(sprite, true, false);
        }
        let Some(vp) = self.viewports.remove(id) else {
            return;
        };
        if let Some(r) = self.renderers.get_mut(vp.renderer) {
            r.viewports.retain(|&v| v != id);
        }
        self.notify_renderer(vp.renderer);
        if self.default_viewport == Some(id) {
            self.default_viewport = None;
        }
        log::debug!("disposed {id:?} with {count} sprites");
    }

    pub(crate) fn resolve_viewport(&self, viewport: Option<ViewportId>) -> Result<ViewportId> {
        viewport
            .or(self.default_viewport)
            .ok_or(Error::NoDefaultViewport)
    }
}

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::testing::scene_with_window;

    #[test]
    fn dispose_viewport_with_three_sprites() {
        let (mut scene, window) = scene_with_window(100, 100);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.create_viewport(renderer);
        let sprites: Vec<SpriteId> = (0..3)
            .map(|_| {
                let s = scene.create_sprite(Some(vp)).unwrap();
                let surface = scene.create_surface(Size::new(2, 2));
                scene.set_sprite_surface(s, Some(surface)).unwrap();
                s
            })
            .collect();
        scene.redraw(renderer, false).unwrap();
        let before = scene.invalidations(renderer);

        scene.dispose_viewport(vp);
        assert!(!scene.is_viewport_alive(vp));
        assert!(
            sprites.iter().all(|&s| !scene.is_sprite_alive(s)),
            "every sprite disposed"
        );
        assert!(scene.needs_redraw(renderer), "renderer left dirty");
        assert_eq!(scene.invalidations(renderer), before + 1, "marked dirty once");
        assert!(!scene.renderer_viewports(renderer).contains(&vp));

        scene.dispose_viewport(vp);
    }

    #[test]
    fn inherited_size_and_hit_test() {
        let (mut scene, window) = scene_with_window(120, 80);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.create_viewport(renderer);
        scene.set_viewport_position(vp, Point::new(10, 10));
        assert_eq!(scene.viewport_bounds(vp), Rect::new(10, 10, 120, 80));
        assert!(scene.viewport_contains(vp, Point::new(10, 10)));
        assert!(!scene.viewport_contains(vp, Point::new(130, 10)), "right edge exclusive");
        scene.set_viewport_size(vp, Some(5), Some(5));
        assert!(!scene.viewport_contains(vp, Point::new(20, 20)));
    }

    #[test]
    fn viewport_z_change_flags_renderer_reorder() {
        let (mut scene, window) = scene_with_window(100, 100);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.create_viewport(renderer);
        scene.redraw(renderer, false).unwrap();
        assert!(!scene.renderer_needs_reorder(renderer));
        scene.set_viewport_z(vp, 7);
        assert!(scene.renderer_needs_reorder(renderer));
        assert!(scene.needs_redraw(renderer));
    }

    #[test]
    fn disposing_default_viewport_clears_default() {
        let (mut scene, window) = scene_with_window(100, 100);
        let content = scene.content_viewport(window).unwrap();
        assert_eq!(scene.default_viewport(), Some(content));
        scene.dispose_viewport(content);
        assert_eq!(scene.default_viewport(), None);
    }
}
