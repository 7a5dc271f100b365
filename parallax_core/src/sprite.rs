// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sprites: positioned, transformed references to a surface.
//!
//! A sprite belongs to exactly one viewport. Its rendering-relevant
//! attributes live in a plain [`SpriteProps`] value; every setter funnels
//! through [`Scene::update_sprite`], which compares the props before and
//! after and notifies the owning viewport (and from there the renderer) once
//! per call when anything changed.

use crate::backend::Backend;
use crate::error::Result;
use crate::geometry::{Color, Point, Rect, round_i32};
use crate::id::{SpriteId, Stamp, SurfaceId, ViewportId};
use crate::scene::Scene;

/// Rendering attributes of a sprite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteProps {
    /// Anchor position inside the viewport.
    pub position: Point,
    /// Stacking index; higher draws later.
    pub z: i32,
    /// Horizontal zoom factor.
    pub zoom_x: f64,
    /// Vertical zoom factor.
    pub zoom_y: f64,
    /// Rotation and zoom pivot, relative to the source rectangle.
    pub origin: Point,
    /// Clockwise rotation in degrees; reduced modulo 360 when drawn.
    pub angle: i32,
    /// Mirror horizontally.
    pub flip_h: bool,
    /// Mirror vertically.
    pub flip_v: bool,
    /// Opacity, 0 to 255.
    pub opacity: u8,
    /// Per-channel tint.
    pub color: Color,
    /// Region of the surface to draw.
    pub src_rect: Rect,
    /// Whether the sprite is drawn at all.
    pub visible: bool,
    /// Whether `origin` is scaled by the sprite's zoom.
    pub zoom_origin: bool,
}

impl Default for SpriteProps {
    fn default() -> Self {
        Self {
            position: Point::ZERO,
            z: 0,
            zoom_x: 1.0,
            zoom_y: 1.0,
            origin: Point::ZERO,
            angle: 0,
            flip_h: false,
            flip_v: false,
            opacity: 255,
            color: Color::WHITE,
            src_rect: Rect::default(),
            visible: true,
            zoom_origin: false,
        }
    }
}

impl SpriteProps {
    /// Origin offset as applied to the destination rectangle.
    #[must_use]
    pub fn effective_origin(&self) -> Point {
        if self.zoom_origin {
            Point::new(
                round_i32(f64::from(self.origin.x) * self.zoom_x),
                round_i32(f64::from(self.origin.y) * self.zoom_y),
            )
        } else {
            self.origin
        }
    }
}

#[derive(Debug)]
pub(crate) struct Sprite {
    pub(crate) props: SpriteProps,
    pub(crate) viewport: ViewportId,
    pub(crate) surface: Option<SurfaceId>,
    pub(crate) positions: Vec<Point>,
    pub(crate) stamp: Stamp,
}

impl<B: Backend> Scene<B> {
    /// Creates a sprite in `viewport`, or in the default viewport for `None`.
    pub fn create_sprite(&mut self, viewport: Option<ViewportId>) -> Result<SpriteId> {
        let viewport = self.resolve_viewport(viewport)?;
        let _ = self.viewports.expect(viewport);
        let stamp = self.next_stamp();
        let id = self.sprites.insert(Sprite {
            props: SpriteProps::default(),
            viewport,
            surface: None,
            positions: Vec::new(),
            stamp,
        });
        let vp = self.viewports.expect_mut(viewport);
        vp.sprites.push(id);
        vp.dirty.mark_reorder();
        self.notify_viewport(viewport, false);
        Ok(id)
    }

    /// Returns whether `id` refers to a live sprite.
    #[must_use]
    pub fn is_sprite_alive(&self, id: SpriteId) -> bool {
        self.sprites.contains(id)
    }

    /// Returns the sprite's rendering attributes.
    #[must_use]
    #[track_caller]
    pub fn sprite(&self, id: SpriteId) -> &SpriteProps {
        &self.sprites.expect(id).props
    }

    /// Returns the viewport the sprite belongs to.
    #[must_use]
    #[track_caller]
    pub fn sprite_viewport(&self, id: SpriteId) -> ViewportId {
        self.sprites.expect(id).viewport
    }

    /// Returns the sprite's surface.
    #[must_use]
    #[track_caller]
    pub fn sprite_surface(&self, id: SpriteId) -> Option<SurfaceId> {
        self.sprites.expect(id).surface
    }

    /// Returns the sprite's creation stamp.
    #[must_use]
    #[track_caller]
    pub fn sprite_stamp(&self, id: SpriteId) -> Stamp {
        self.sprites.expect(id).stamp
    }

    /// Returns the extra positions the sprite is instanced at.
    #[must_use]
    #[track_caller]
    pub fn render_positions(&self, id: SpriteId) -> &[Point] {
        &self.sprites.expect(id).positions
    }

    /// Edits several attributes at once, notifying the renderer at most once.
    ///
    /// Returns `true` if anything changed.
    #[track_caller]
    pub fn update_sprite(&mut self, id: SpriteId, f: impl FnOnce(&mut SpriteProps)) -> bool {
        let sprite = self.sprites.expect_mut(id);
        let before = sprite.props;
        f(&mut sprite.props);
        let after = sprite.props;
        if after == before {
            return false;
        }
        self.notify_sprite(id, after.z != before.z);
        true
    }

    /// Moves the sprite's anchor.
    #[track_caller]
    pub fn set_sprite_position(&mut self, id: SpriteId, position: Point) {
        self.update_sprite(id, |p| p.position = position);
    }

    /// Sets the stacking index.
    #[track_caller]
    pub fn set_sprite_z(&mut self, id: SpriteId, z: i32) {
        self.update_sprite(id, |p| p.z = z);
    }

    /// Sets both zoom factors.
    #[track_caller]
    pub fn set_sprite_zoom(&mut self, id: SpriteId, zoom_x: f64, zoom_y: f64) {
        self.update_sprite(id, |p| {
            p.zoom_x = zoom_x;
            p.zoom_y = zoom_y;
        });
    }

    /// Sets the rotation and zoom pivot.
    #[track_caller]
    pub fn set_sprite_origin(&mut self, id: SpriteId, origin: Point) {
        self.update_sprite(id, |p| p.origin = origin);
    }

    /// Sets the rotation in degrees.
    #[track_caller]
    pub fn set_sprite_angle(&mut self, id: SpriteId, angle: i32) {
        self.update_sprite(id, |p| p.angle = angle);
    }

    /// Sets the mirror flags.
    #[track_caller]
    pub fn set_sprite_mirror(&mut self, id: SpriteId, flip_h: bool, flip_v: bool) {
        self.update_sprite(id, |p| {
            p.flip_h = flip_h;
            p.flip_v = flip_v;
        });
    }

    /// Sets the opacity.
    #[track_caller]
    pub fn set_sprite_opacity(&mut self, id: SpriteId, opacity: u8) {
        self.update_sprite(id, |p| p.opacity = opacity);
    }

    /// Sets the tint.
    #[track_caller]
    pub fn set_sprite_color(&mut self, id: SpriteId, color: Color) {
        self.update_sprite(id, |p| p.color = color);
    }

    /// Sets the region of the surface to draw.
    #[track_caller]
    pub fn set_sprite_src_rect(&mut self, id: SpriteId, src_rect: Rect) {
        self.update_sprite(id, |p| p.src_rect = src_rect);
    }

    /// Shows or hides the sprite.
    #[track_caller]
    pub fn set_sprite_visible(&mut self, id: SpriteId, visible: bool) {
        self.update_sprite(id, |p| p.visible = visible);
    }

    /// Chooses whether the origin is scaled by the sprite's zoom.
    #[track_caller]
    pub fn set_sprite_zoom_origin(&mut self, id: SpriteId, zoom_origin: bool) {
        self.update_sprite(id, |p| p.zoom_origin = zoom_origin);
    }

    /// Adds an extra position to draw the sprite at. Once any are present the
    /// sprite is drawn only at its extra positions.
    #[track_caller]
    pub fn add_render_position(&mut self, id: SpriteId, position: Point) {
        self.sprites.expect_mut(id).positions.push(position);
        self.notify_sprite(id, false);
    }

    /// Removes every extra position.
    #[track_caller]
    pub fn clear_render_positions(&mut self, id: SpriteId) {
        let sprite = self.sprites.expect_mut(id);
        if sprite.positions.is_empty() {
            return;
        }
        sprite.positions.clear();
        self.notify_sprite(id, false);
    }

    /// Moves the sprite to another viewport (the default one for `None`).
    ///
    /// Reassigning to the current viewport does nothing. If the new
    /// viewport belongs to another renderer the sprite's surface is rebound.
    #[track_caller]
    pub fn set_sprite_viewport(
        &mut self,
        id: SpriteId,
        viewport: Option<ViewportId>,
    ) -> Result<()> {
        let target = self.resolve_viewport(viewport)?;
        let renderer = self.viewports.expect(target).renderer;
        let sprite = self.sprites.expect_mut(id);
        let old = sprite.viewport;
        if old == target {
            return Ok(());
        }
        sprite.viewport = target;
        let surface = sprite.surface;

        if let Some(vp) = self.viewports.get_mut(old) {
            vp.sprites.retain(|&s| s != id);
        }
        self.notify_viewport(old, false);

        let vp = self.viewports.expect_mut(target);
        vp.sprites.push(id);
        vp.dirty.mark_reorder();
        self.notify_viewport(target, false);

        if let Some(surface) = surface
            && self.surfaces.contains(surface)
        {
            self.bind_surface(surface, renderer)?;
        }
        Ok(())
    }

    /// Assigns the sprite's surface and binds it to the sprite's renderer.
    ///
    /// A new surface resets the source rectangle to the full surface. The
    /// surface ends up unlocked with a valid texture.
    #[track_caller]
    pub fn set_sprite_surface(&mut self, id: SpriteId, surface: Option<SurfaceId>) -> Result<()> {
        let sprite = self.sprites.expect_mut(id);
        let renderer = self.viewports.expect(sprite.viewport).renderer;
        let changed = sprite.surface != surface;
        sprite.surface = surface;
        if let Some(surface) = surface {
            let size = self.surfaces.expect(surface).size;
            if changed {
                sprite.props.src_rect = Rect::from_size(size);
            }
            self.bind_surface(surface, renderer)?;
        }
        self.notify_sprite(id, false);
        Ok(())
    }

    /// Returns the sprite's destination rectangle at viewport zoom 1,
    /// relative to the viewport.
    #[must_use]
    #[track_caller]
    pub fn sprite_bounds(&self, id: SpriteId) -> Rect {
        let p = &self.sprites.expect(id).props;
        let o = p.effective_origin();
        Rect::new(
            p.position.x - o.x,
            p.position.y - o.y,
            round_i32(f64::from(p.src_rect.width) * p.zoom_x),
            round_i32(f64::from(p.src_rect.height) * p.zoom_y),
        )
    }

    /// Disposes the sprite and its surface. Disposing a stale handle does
    /// nothing.
    pub fn dispose_sprite(&mut self, id: SpriteId) {
        self.remove_sprite(id, true, true);
    }

    /// Disposes the sprite but leaves its surface alive.
    pub fn dispose_sprite_keep_surface(&mut self, id: SpriteId) {
        self.remove_sprite(id, false, true);
    }

    pub(crate) fn remove_sprite(&mut self, id: SpriteId, dispose_surface: bool, detach: bool) {
        let Some(sprite) = self.sprites.remove(id) else {
            return;
        };
        if detach && let Some(vp) = self.viewports.get_mut(sprite.viewport) {
            vp.sprites.retain(|&s| s != id);
        }
        self.notify_viewport(sprite.viewport, false);
        if dispose_surface && let Some(surface) = sprite.surface {
            self.dispose_surface(surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::geometry::Size;
    use crate::testing::{Call, RecordingBackend, scene_with_window};
    use crate::window::WindowDesc;

    #[test]
    fn create_without_default_viewport_fails() {
        let mut scene = Scene::new(RecordingBackend::new());
        assert!(
            matches!(scene.create_sprite(None), Err(Error::NoDefaultViewport)),
            "no window was initialized"
        );
    }

    #[test]
    fn none_viewport_resolves_to_default() {
        let (mut scene, window) = scene_with_window(100, 100);
        let s = scene.create_sprite(None).unwrap();
        assert_eq!(Some(scene.sprite_viewport(s)), scene.content_viewport(window).ok());
    }

    #[test]
    fn batch_update_marks_renderer_once() {
        let (mut scene, window) = scene_with_window(100, 100);
        let renderer = scene.window_renderer(window).unwrap();
        let s = scene.create_sprite(None).unwrap();
        scene.redraw(renderer, false).unwrap();
        let before = scene.invalidations(renderer);

        scene.update_sprite(s, |p| {
            p.position = Point::new(5, 5);
            p.angle = 90;
            p.opacity = 10;
        });
        scene.set_sprite_color(s, Color::BLACK);
        assert!(scene.needs_redraw(renderer), "mutation dirties renderer");
        assert_eq!(
            scene.invalidations(renderer),
            before + 1,
            "one clean-to-dirty transition per batch"
        );
    }

    #[test]
    fn unchanged_value_does_not_dirty() {
        let (mut scene, window) = scene_with_window(100, 100);
        let renderer = scene.window_renderer(window).unwrap();
        let s = scene.create_sprite(None).unwrap();
        scene.redraw(renderer, false).unwrap();
        scene.set_sprite_opacity(s, 255);
        assert!(!scene.needs_redraw(renderer), "opacity was already 255");
    }

    #[test]
    fn z_change_requests_sprite_resort() {
        let (mut scene, window) = scene_with_window(100, 100);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let s = scene.create_sprite(Some(vp)).unwrap();
        scene.redraw(renderer, false).unwrap();
        assert!(!scene.viewport_needs_reorder(vp));
        scene.set_sprite_z(s, 3);
        assert!(scene.viewport_needs_reorder(vp), "Z change flags the viewport");
    }

    #[test]
    fn viewport_reassignment_moves_between_lists() {
        let (mut scene, window) = scene_with_window(100, 100);
        let renderer = scene.window_renderer(window).unwrap();
        let a = scene.content_viewport(window).unwrap();
        let b = scene.create_viewport(renderer);
        let s = scene.create_sprite(Some(a)).unwrap();

        scene.set_sprite_viewport(s, Some(b)).unwrap();
        assert!(!scene.viewport_sprites(a).contains(&s), "removed from old");
        assert_eq!(scene.viewport_sprites(b), [s], "added to new exactly once");

        scene.set_sprite_viewport(s, Some(b)).unwrap();
        assert_eq!(scene.viewport_sprites(b), [s], "same viewport is a no-op");
    }

    #[test]
    fn moving_to_another_renderer_rebinds_and_dirties_both() {
        let (mut scene, a) = scene_with_window(32, 32);
        let b = scene.create_window(WindowDesc::new("b", 16, 16));
        scene.initialize_window(b).unwrap();
        let ra = scene.window_renderer(a).unwrap();
        let rb = scene.window_renderer(b).unwrap();
        let sprite = scene.create_sprite(None).unwrap();
        let surface = scene.create_surface(Size::new(4, 4));
        scene.set_sprite_surface(sprite, Some(surface)).unwrap();
        let old_texture = scene.surface_texture(surface).unwrap();
        scene.redraw(ra, false).unwrap();
        scene.redraw(rb, false).unwrap();
        assert!(!scene.needs_redraw(ra) && !scene.needs_redraw(rb), "both start clean");

        let target = scene.content_viewport(b).unwrap();
        scene.set_sprite_viewport(sprite, Some(target)).unwrap();
        assert_eq!(scene.surface_renderer(surface), Some(rb), "surface follows the sprite");
        let texture = scene.surface_texture(surface).expect("texture in the new context");
        assert_ne!(texture, old_texture);
        assert!(
            scene.backend().calls().contains(&Call::DestroyTexture(old_texture)),
            "old context texture released"
        );
        assert!(scene.needs_redraw(ra), "old renderer lost the sprite");
        assert!(scene.needs_redraw(rb), "new renderer gained it");
        assert_eq!(scene.viewport_sprites(target), [sprite]);
    }

    #[test]
    fn assigning_locked_surface_yields_texture() {
        let (mut scene, _window) = scene_with_window(100, 100);
        let s = scene.create_sprite(None).unwrap();
        let surface = scene.create_surface(Size::new(8, 4));
        assert!(scene.is_surface_locked(surface));
        scene.set_sprite_surface(s, Some(surface)).unwrap();
        assert!(!scene.is_surface_locked(surface), "binding unlocks");
        assert!(scene.surface_texture(surface).is_some(), "texture ready before redraw");
        assert_eq!(scene.sprite(s).src_rect, Rect::new(0, 0, 8, 4));
    }

    #[test]
    fn effective_origin_scales_only_when_asked() {
        let mut p = SpriteProps {
            origin: Point::new(10, 4),
            zoom_x: 2.0,
            zoom_y: 0.5,
            ..SpriteProps::default()
        };
        assert_eq!(p.effective_origin(), Point::new(10, 4));
        p.zoom_origin = true;
        assert_eq!(p.effective_origin(), Point::new(20, 2));
    }

    #[test]
    fn dispose_twice_is_safe() {
        let (mut scene, window) = scene_with_window(100, 100);
        let vp = scene.content_viewport(window).unwrap();
        let s = scene.create_sprite(Some(vp)).unwrap();
        let surface = scene.create_surface(Size::new(2, 2));
        scene.set_sprite_surface(s, Some(surface)).unwrap();
        scene.dispose_sprite(s);
        scene.dispose_sprite(s);
        assert!(!scene.is_sprite_alive(s));
        assert!(!scene.is_surface_alive(surface), "surface disposed with sprite");
        assert!(scene.viewport_sprites(vp).is_empty());
    }

    #[test]
    fn keep_surface_disposal() {
        let (mut scene, _window) = scene_with_window(100, 100);
        let s = scene.create_sprite(None).unwrap();
        let surface = scene.create_surface(Size::new(2, 2));
        scene.set_sprite_surface(s, Some(surface)).unwrap();
        scene.dispose_sprite_keep_surface(s);
        assert!(scene.is_surface_alive(surface));
    }

    #[test]
    #[should_panic(expected = "stale SpriteId")]
    fn setter_on_disposed_sprite_panics() {
        let (mut scene, _window) = scene_with_window(100, 100);
        let s = scene.create_sprite(None).unwrap();
        scene.dispose_sprite(s);
        scene.set_sprite_position(s, Point::new(1, 1));
    }
}
