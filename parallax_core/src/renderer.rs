// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Renderers and the compositing pass.
//!
//! A renderer owns one window's render target and its ordered viewports.
//! [`Scene::invalidate_renderer`] only sets the dirty flag; the work happens
//! in [`Scene::redraw`], at most once per tick:
//!
//! 1. Re-sort viewports by `(z, stamp)` if flagged.
//! 2. Clear the target.
//! 3. Per visible viewport: resolve its clip rectangle, re-sort its sprites
//!    by `(z, stamp)` if flagged, and copy each visible sprite's texture.
//! 4. Present and clear the dirty flag.
//!
//! Sorting is stable, so among equal Z the older object paints first and
//! the newer one ends up on top.
//!
//! # Destination math
//!
//! For a sprite at `pos` with effective origin `o`, sprite zoom `sz` and
//! viewport zoom `vz`, each axis is computed as:
//!
//! ```text
//!   size = round(src * sz * vz)
//!   dst  = pos - o + clip_origin - round((1 - vz) * (pos + o))
//! ```
//!
//! The last term makes viewport zoom scale around the sprite's own origin
//! instead of the viewport's corner. `clip_origin` is the viewport's
//! unclamped top-left corner on the target; when that corner lies off the
//! target the clip rectangle shrinks from the overflowing edge, but sprites
//! keep aligning to the unclamped corner.

use crate::arena::Arena;
use crate::backend::{Backend, CopyParams, NativeWindowId, Rotation, TextureHandle};
use crate::dirty::DirtyState;
use crate::error::{Error, Result};
use crate::geometry::{Color, Point, Rect, Size, combine_alpha, round_i32};
use crate::id::{RendererId, SpriteId, SurfaceId, ViewportId, WindowId};
use crate::scene::Scene;
use crate::sprite::{Sprite, SpriteProps};
use crate::surface::{PixelStore, Surface, SurfaceKind};

/// Counters reported by one compositing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RedrawStats {
    /// Viewports that passed visibility and clipping.
    pub viewports_drawn: usize,
    /// Sprites that issued at least one copy.
    pub sprites_drawn: usize,
    /// Backend copy calls issued.
    pub draw_calls: usize,
}

/// Parameters of an off-screen capture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Capture {
    /// Top-left corner of the captured area, in unscaled target coordinates.
    pub origin: Point,
    /// Size of the resulting bitmap.
    pub size: Size,
    /// Horizontal scale applied to the whole scene.
    pub scale_x: f64,
    /// Vertical scale applied to the whole scene.
    pub scale_y: f64,
}

impl Capture {
    /// Captures `size` pixels starting at `origin`, unscaled.
    #[must_use]
    pub const fn new(origin: Point, size: Size) -> Self {
        Self {
            origin,
            size,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Sets the scene scale.
    #[must_use]
    pub const fn with_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }
}

#[derive(Debug)]
pub(crate) struct Renderer {
    pub(crate) window: NativeWindowId,
    pub(crate) owner: WindowId,
    pub(crate) size: Size,
    pub(crate) target: TextureHandle,
    pub(crate) viewports: Vec<ViewportId>,
    pub(crate) dirty: DirtyState,
    pub(crate) offset: Point,
    pub(crate) scale_x: f64,
    pub(crate) scale_y: f64,
    pub(crate) opacity: u8,
}

/// Target-level settings of one compositing pass.
struct Pass {
    target: TextureHandle,
    offset: Point,
    scale_x: f64,
    scale_y: f64,
    opacity: u8,
    resort: bool,
}

/// Viewport-level settings resolved for the sprite pass.
struct ViewportPass {
    origin: Point,
    zoom_x: f64,
    zoom_y: f64,
    opacity: u8,
    color: Color,
}

/// Per-sprite values shared by every copy the sprite issues.
struct SpriteCopy<'a> {
    target: TextureHandle,
    props: &'a SpriteProps,
    viewport: &'a ViewportPass,
    color: Color,
    alpha: u8,
}

impl<B: Backend> Scene<B> {
    pub(crate) fn create_renderer(
        &mut self,
        owner: WindowId,
        window: NativeWindowId,
        size: Size,
    ) -> Result<RendererId> {
        let target = self.backend.create_target(window, size)?;
        Ok(self.renderers.insert(Renderer {
            window,
            owner,
            size,
            target,
            viewports: Vec::new(),
            dirty: DirtyState::initial(),
            offset: Point::ZERO,
            scale_x: 1.0,
            scale_y: 1.0,
            opacity: 255,
        }))
    }

    /// Recreates the render target at `size`.
    pub(crate) fn resize_renderer(&mut self, id: RendererId, size: Size) -> Result<()> {
        let r = self.renderers.expect_mut(id);
        if r.size == size {
            return Ok(());
        }
        let target = self.backend.create_target(r.window, size)?;
        self.backend
            .destroy_texture(core::mem::replace(&mut r.target, target));
        r.size = size;
        r.dirty.mark_redraw();
        Ok(())
    }

    /// Disposes the renderer's viewports, forgets textures bound to it and
    /// releases the target.
    pub(crate) fn dispose_renderer(&mut self, id: RendererId) {
        let Some(viewports) = self.renderers.get(id).map(|r| r.viewports.clone()) else {
            return;
        };
        for viewport in viewports {
            self.dispose_viewport(viewport);
        }
        self.unbind_renderer_surfaces(id);
        if let Some(r) = self.renderers.remove(id) {
            self.backend.destroy_texture(r.target);
        }
    }

    /// Returns whether `id` refers to a live renderer.
    #[must_use]
    pub fn is_renderer_alive(&self, id: RendererId) -> bool {
        self.renderers.contains(id)
    }

    /// Returns the window owning the renderer.
    #[must_use]
    #[track_caller]
    pub fn renderer_window(&self, id: RendererId) -> WindowId {
        self.renderers.expect(id).owner
    }

    /// Returns the render target size.
    #[must_use]
    #[track_caller]
    pub fn renderer_size(&self, id: RendererId) -> Size {
        self.renderers.expect(id).size
    }

    /// Returns the renderer's viewports in their current paint order.
    #[must_use]
    #[track_caller]
    pub fn renderer_viewports(&self, id: RendererId) -> &[ViewportId] {
        &self.renderers.expect(id).viewports
    }

    /// Returns whether a redraw is pending.
    #[must_use]
    #[track_caller]
    pub fn needs_redraw(&self, id: RendererId) -> bool {
        self.renderers.expect(id).dirty.needs_redraw()
    }

    /// Returns whether the viewports await a re-sort.
    #[must_use]
    #[track_caller]
    pub fn renderer_needs_reorder(&self, id: RendererId) -> bool {
        self.renderers.expect(id).dirty.needs_reorder()
    }

    /// Number of clean-to-dirty transitions since the renderer was created.
    #[must_use]
    #[track_caller]
    pub fn invalidations(&self, id: RendererId) -> u64 {
        self.renderers.expect(id).dirty.invalidations()
    }

    /// Requests a redraw. No work happens until the next [`redraw`](Self::redraw).
    #[track_caller]
    pub fn invalidate_renderer(&mut self, id: RendererId) {
        self.renderers.expect_mut(id).dirty.mark_redraw();
    }

    /// Returns the global offset added to every viewport.
    #[must_use]
    #[track_caller]
    pub fn renderer_offset(&self, id: RendererId) -> Point {
        self.renderers.expect(id).offset
    }

    /// Sets the global offset added to every viewport.
    #[track_caller]
    pub fn set_renderer_offset(&mut self, id: RendererId, offset: Point) {
        let r = self.renderers.expect_mut(id);
        if r.offset != offset {
            r.offset = offset;
            r.dirty.mark_redraw();
        }
    }

    /// Sets the global scale applied to every viewport.
    #[track_caller]
    pub fn set_renderer_scale(&mut self, id: RendererId, scale_x: f64, scale_y: f64) {
        let r = self.renderers.expect_mut(id);
        if r.scale_x != scale_x || r.scale_y != scale_y {
            r.scale_x = scale_x;
            r.scale_y = scale_y;
            r.dirty.mark_redraw();
        }
    }

    /// Returns the opacity multiplier applied to every sprite.
    #[must_use]
    #[track_caller]
    pub fn renderer_opacity(&self, id: RendererId) -> u8 {
        self.renderers.expect(id).opacity
    }

    /// Sets the opacity multiplier applied to every sprite.
    #[track_caller]
    pub fn set_renderer_opacity(&mut self, id: RendererId, opacity: u8) {
        let r = self.renderers.expect_mut(id);
        if r.opacity != opacity {
            r.opacity = opacity;
            r.dirty.mark_redraw();
        }
    }

    /// Composites and presents the renderer if it is dirty or `force` is set.
    ///
    /// Returns `None` when nothing was drawn. A locked or textureless surface
    /// aborts the frame with an error and leaves the renderer dirty.
    #[track_caller]
    pub fn redraw(&mut self, id: RendererId, force: bool) -> Result<Option<RedrawStats>> {
        let r = self.renderers.expect(id);
        if !r.dirty.needs_redraw() && !force {
            return Ok(None);
        }
        let window = r.window;
        let pass = Pass {
            target: r.target,
            offset: r.offset,
            scale_x: r.scale_x,
            scale_y: r.scale_y,
            opacity: r.opacity,
            resort: false,
        };
        let stats = self.composite(id, &pass)?;
        self.backend.present(window, pass.target)?;
        self.renderers.expect_mut(id).dirty.clear_redraw();
        log::trace!("{id:?} redrawn: {stats:?}");
        Ok(Some(stats))
    }

    /// Composites the renderer's scene into a new locked surface.
    ///
    /// Viewports and sprites are always fully re-sorted. The window's own
    /// target and dirty state are left untouched.
    #[track_caller]
    pub fn render_to_bitmap(&mut self, id: RendererId, capture: &Capture) -> Result<SurfaceId> {
        if capture.size.is_empty() {
            return Err(Error::Contract("capture size must be non-zero"));
        }
        let r = self.renderers.expect(id);
        let (window, opacity) = (r.window, r.opacity);
        let target = self.backend.create_target(window, capture.size)?;
        let pass = Pass {
            target,
            offset: Point::new(-capture.origin.x, -capture.origin.y),
            scale_x: capture.scale_x,
            scale_y: capture.scale_y,
            opacity,
            resort: true,
        };
        let pixels = match self.composite(id, &pass) {
            Ok(_) => self.backend.read_pixels(target).map_err(Error::from),
            Err(err) => Err(err),
        };
        self.backend.destroy_texture(target);
        self.create_surface_from_pixels(capture.size, pixels?)
    }

    fn composite(&mut self, id: RendererId, pass: &Pass) -> Result<RedrawStats> {
        let Self {
            backend,
            surfaces,
            sprites,
            viewports,
            renderers,
            ..
        } = self;
        let renderer = renderers.expect_mut(id);
        if renderer.dirty.take_reorder() || pass.resort {
            renderer.viewports.sort_by_key(|&v| {
                let vp = viewports.expect(v);
                (vp.props.z, vp.stamp)
            });
        }

        backend.set_clip(pass.target, None);
        backend.clear(pass.target)?;

        let mut stats = RedrawStats::default();
        for &vid in &renderer.viewports {
            let vp = viewports.expect_mut(vid);
            vp.dirty.clear_redraw();
            if vp.dirty.take_reorder() || pass.resort {
                vp.sprites.sort_by_key(|&s| {
                    let sprite = sprites.expect(s);
                    (sprite.props.z, sprite.stamp)
                });
            }
            if !vp.props.visible || vp.sprites.is_empty() {
                continue;
            }

            let width = *vp.props.width.get_or_insert(renderer.size.width);
            let height = *vp.props.height.get_or_insert(renderer.size.height);
            let p = vp.props;
            let zoom_x = p.zoom_x * pass.scale_x;
            let zoom_y = p.zoom_y * pass.scale_y;
            let origin = Point::new(
                round_i32(f64::from(p.position.x - p.origin.x) * pass.scale_x) + pass.offset.x,
                round_i32(f64::from(p.position.y - p.origin.y) * pass.scale_y) + pass.offset.y,
            );
            let mut clip = Rect::new(
                origin.x,
                origin.y,
                round_i32(f64::from(width) * zoom_x),
                round_i32(f64::from(height) * zoom_y),
            );
            if clip.x < 0 {
                clip.width += clip.x;
                clip.x = 0;
            }
            if clip.y < 0 {
                clip.height += clip.y;
                clip.y = 0;
            }
            if clip.is_empty() {
                continue;
            }

            backend.set_clip(pass.target, Some(clip));
            stats.viewports_drawn += 1;
            let ctx = ViewportPass {
                origin,
                zoom_x,
                zoom_y,
                opacity: p.opacity,
                color: p.color,
            };
            for &sid in &vp.sprites {
                let calls = draw_sprite(backend, surfaces, sid, sprites.expect(sid), &ctx, pass)?;
                if calls > 0 {
                    stats.sprites_drawn += 1;
                    stats.draw_calls += calls;
                }
            }
        }

        backend.set_clip(pass.target, None);
        Ok(stats)
    }
}

/// Issues the copies for one sprite and returns how many were made.
fn draw_sprite<B: Backend>(
    backend: &mut B,
    surfaces: &Arena<SurfaceId, Surface>,
    id: SpriteId,
    sprite: &Sprite,
    viewport: &ViewportPass,
    pass: &Pass,
) -> Result<usize> {
    let p = &sprite.props;
    if !p.visible || p.opacity == 0 || p.zoom_x <= 0.0 || p.zoom_y <= 0.0 {
        return Ok(0);
    }
    let Some(surface_id) = sprite.surface else {
        return Ok(0);
    };
    let Some(surface) = surfaces.get(surface_id) else {
        return Ok(0);
    };
    let alpha = combine_alpha(&[p.opacity, viewport.opacity, pass.opacity]);
    if alpha == 0 {
        return Ok(0);
    }
    let copy = SpriteCopy {
        target: pass.target,
        props: p,
        viewport,
        color: p.color.modulate(viewport.color),
        alpha,
    };

    let primary = [p.position];
    let positions: &[Point] = if sprite.positions.is_empty() {
        &primary
    } else {
        &sprite.positions
    };

    let mut calls = 0;
    for &pos in positions {
        match &surface.kind {
            SurfaceKind::Pixels(store) => {
                let texture = ready_texture(id, surface_id, store)?;
                calls += copy.issue(backend, texture, p.src_rect, pos)?;
            }
            SurfaceKind::Tiled(tiles) => {
                for tile in tiles {
                    let Some(tile_surface) = surfaces.get(tile.surface) else {
                        continue;
                    };
                    let SurfaceKind::Pixels(store) = &tile_surface.kind else {
                        continue;
                    };
                    let texture = ready_texture(id, tile.surface, store)?;
                    let at = Point::new(
                        pos.x + round_i32(f64::from(tile.offset.x) * p.zoom_x),
                        pos.y + round_i32(f64::from(tile.offset.y) * p.zoom_y),
                    );
                    calls += copy.issue(backend, texture, Rect::from_size(tile_surface.size), at)?;
                }
            }
        }
    }
    Ok(calls)
}

fn ready_texture(
    sprite: SpriteId,
    surface: SurfaceId,
    store: &PixelStore,
) -> Result<TextureHandle> {
    if store.locked {
        return Err(Error::SurfaceLocked { sprite, surface });
    }
    store
        .texture
        .ok_or(Error::MissingTexture { sprite, surface })
}

impl SpriteCopy<'_> {
    fn issue<B: Backend>(
        &self,
        backend: &mut B,
        texture: TextureHandle,
        src: Rect,
        pos: Point,
    ) -> Result<usize> {
        let p = self.props;
        let vp = self.viewport;
        let width = round_i32(f64::from(src.width) * p.zoom_x * vp.zoom_x);
        let height = round_i32(f64::from(src.height) * p.zoom_y * vp.zoom_y);
        if width <= 0 || height <= 0 {
            return Ok(0);
        }
        let o = p.effective_origin();
        let x = pos.x - o.x + vp.origin.x - round_i32((1.0 - vp.zoom_x) * f64::from(pos.x + o.x));
        let y = pos.y - o.y + vp.origin.y - round_i32((1.0 - vp.zoom_y) * f64::from(pos.y + o.y));

        let angle = p.angle.rem_euclid(360);
        let rotation = (angle != 0 || p.origin != Point::ZERO || p.flip_h || p.flip_v).then(|| {
            Rotation {
                angle: f64::from(angle),
                pivot: Point::new(
                    round_i32(f64::from(o.x) * vp.zoom_x),
                    round_i32(f64::from(o.y) * vp.zoom_y),
                ),
                flip_h: p.flip_h,
                flip_v: p.flip_v,
            }
        });

        backend.copy(
            self.target,
            texture,
            &CopyParams {
                src,
                dst: Rect::new(x, y, width, height),
                rotation,
                color: self.color,
                alpha: self.alpha,
            },
        )?;
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingBackend, scene_with_window};

    /// Creates a sprite in `viewport` showing a fresh `w` x `h` surface and
    /// returns it with the surface's texture.
    fn textured_sprite(
        scene: &mut Scene<RecordingBackend>,
        viewport: ViewportId,
        w: u32,
        h: u32,
    ) -> (SpriteId, TextureHandle) {
        let sprite = scene.create_sprite(Some(viewport)).unwrap();
        let surface = scene.create_surface(Size::new(w, h));
        scene.set_sprite_surface(sprite, Some(surface)).unwrap();
        (sprite, scene.surface_texture(surface).unwrap())
    }

    /// Copies issued with one of `textures`, in call order.
    fn copies_of(
        scene: &Scene<RecordingBackend>,
        textures: &[TextureHandle],
    ) -> Vec<(TextureHandle, CopyParams)> {
        scene
            .backend()
            .copies()
            .into_iter()
            .filter(|(t, _)| textures.contains(t))
            .collect()
    }

    fn order(scene: &Scene<RecordingBackend>, textures: &[TextureHandle]) -> Vec<TextureHandle> {
        copies_of(scene, textures).into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn clean_renderer_issues_no_draw_calls() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        textured_sprite(&mut scene, vp, 4, 4);
        assert!(scene.redraw(renderer, false).unwrap().is_some());
        scene.backend_mut().clear_calls();

        assert_eq!(scene.redraw(renderer, false).unwrap(), None);
        assert!(scene.backend().calls().is_empty(), "no backend calls at all");
        assert!(scene.redraw(renderer, true).unwrap().is_some(), "force overrides");
    }

    #[test]
    fn equal_z_paints_in_creation_order() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let (a, ta) = textured_sprite(&mut scene, vp, 4, 4);
        let (_, tb) = textured_sprite(&mut scene, vp, 4, 4);
        let (c, tc) = textured_sprite(&mut scene, vp, 4, 4);
        let all = [ta, tb, tc];

        // Raise then lower `a` so it re-enters the sort at Z 0.
        scene.set_sprite_z(a, 5);
        scene.redraw(renderer, false).unwrap();
        assert_eq!(order(&scene, &all), [tb, tc, ta], "higher Z draws last");

        scene.backend_mut().clear_calls();
        scene.set_sprite_z(a, 0);
        scene.set_sprite_z(c, -1);
        scene.redraw(renderer, false).unwrap();
        assert_eq!(order(&scene, &all), [tc, ta, tb], "ties broken by stamp");
    }

    #[test]
    fn viewports_paint_by_z_then_stamp() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let v1 = scene.create_viewport(renderer);
        let v2 = scene.create_viewport(renderer);
        let (_, t1) = textured_sprite(&mut scene, v1, 4, 4);
        let (_, t2) = textured_sprite(&mut scene, v2, 4, 4);

        scene.redraw(renderer, false).unwrap();
        assert_eq!(order(&scene, &[t1, t2]), [t1, t2]);

        scene.backend_mut().clear_calls();
        scene.set_viewport_z(v1, 1);
        scene.redraw(renderer, false).unwrap();
        assert_eq!(order(&scene, &[t1, t2]), [t2, t1]);
    }

    #[test]
    fn zoomed_sprite_centers_on_full_size_origin() {
        for (w, h) in [(10, 10), (37, 21), (100, 4)] {
            let (mut scene, window) = scene_with_window(400, 400);
            let renderer = scene.window_renderer(window).unwrap();
            let vp = scene.content_viewport(window).unwrap();
            let (s, t) = textured_sprite(&mut scene, vp, w, h);
            scene.update_sprite(s, |p| {
                p.position = Point::new(200, 200);
                p.zoom_x = 2.0;
                p.zoom_y = 2.0;
                p.origin = Point::new(w as i32, h as i32);
            });
            scene.redraw(renderer, false).unwrap();
            let (_, params) = copies_of(&scene, &[t])[0];
            assert_eq!(params.dst.center(), Point::new(200, 200), "size {w}x{h}");
        }
    }

    #[test]
    fn tiled_surface_draws_each_tile() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let sprite = scene.create_sprite(Some(vp)).unwrap();
        let tiled = scene
            .create_tiled_surface(Size::new(8, 8), Size::new(4, 4))
            .unwrap();
        scene.set_sprite_surface(sprite, Some(tiled)).unwrap();
        scene.set_sprite_position(sprite, Point::new(10, 10));
        let textures: Vec<TextureHandle> = scene
            .surface_tiles(tiled)
            .iter()
            .map(|t| scene.surface_texture(t.surface).unwrap())
            .collect();

        let stats = scene.redraw(renderer, false).unwrap().unwrap();
        let copies = copies_of(&scene, &textures);
        assert_eq!(copies.len(), 4, "one copy per tile");
        let corners: Vec<Point> = copies.iter().map(|(_, c)| c.dst.origin()).collect();
        assert_eq!(
            corners,
            [
                Point::new(10, 10),
                Point::new(14, 10),
                Point::new(10, 14),
                Point::new(14, 14)
            ]
        );
        assert!(copies.iter().all(|(_, c)| c.src == Rect::new(0, 0, 4, 4)));
        assert_eq!(scene.sprite(sprite).position, Point::new(10, 10), "position untouched");
        assert!(stats.draw_calls >= 4);
    }

    #[test]
    fn locked_surface_aborts_frame() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let (sprite, _) = textured_sprite(&mut scene, vp, 4, 4);
        let surface = scene.sprite_surface(sprite).unwrap();
        scene.lock_surface(surface);
        let err = scene.redraw(renderer, false).unwrap_err();
        assert!(matches!(err, Error::SurfaceLocked { sprite: s, .. } if s == sprite));
        assert!(scene.needs_redraw(renderer), "failed frame stays dirty");
    }

    #[test]
    fn textureless_surface_aborts_frame() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let (sprite, _) = textured_sprite(&mut scene, vp, 4, 4);
        let surface = scene.sprite_surface(sprite).unwrap();
        if let SurfaceKind::Pixels(p) = &mut scene.surfaces.expect_mut(surface).kind {
            p.texture = None;
        }
        let err = scene.redraw(renderer, false).unwrap_err();
        assert!(matches!(err, Error::MissingTexture { .. }), "got {err:?}");
    }

    #[test]
    fn alpha_and_color_combine() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let (sprite, t) = textured_sprite(&mut scene, vp, 4, 4);
        scene.update_sprite(sprite, |p| {
            p.opacity = 128;
            p.color = Color::rgb(255, 128, 0);
        });
        scene.update_viewport(vp, |p| {
            p.opacity = 128;
            p.color = Color::rgb(128, 255, 255);
        });
        scene.redraw(renderer, false).unwrap();
        let (_, params) = copies_of(&scene, &[t])[0];
        assert_eq!(params.alpha, 64);
        assert_eq!(params.color, Color::rgb(128, 128, 0));
    }

    #[test]
    fn zero_effective_alpha_is_skipped() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let (_, t) = textured_sprite(&mut scene, vp, 4, 4);
        scene.set_renderer_opacity(renderer, 0);
        scene.redraw(renderer, false).unwrap();
        assert!(copies_of(&scene, &[t]).is_empty());
    }

    #[test]
    fn rotation_only_when_needed() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let (sprite, t) = textured_sprite(&mut scene, vp, 4, 4);

        scene.set_sprite_angle(sprite, 720);
        scene.redraw(renderer, false).unwrap();
        assert_eq!(copies_of(&scene, &[t])[0].1.rotation, None, "full turns are plain copies");

        scene.backend_mut().clear_calls();
        scene.set_sprite_angle(sprite, -270);
        scene.redraw(renderer, false).unwrap();
        let rot = copies_of(&scene, &[t])[0].1.rotation.expect("rotated");
        assert!((rot.angle - 90.0).abs() < f64::EPSILON, "reduced modulo 360");

        scene.backend_mut().clear_calls();
        scene.update_sprite(sprite, |p| {
            p.angle = 0;
            p.flip_h = true;
        });
        scene.redraw(renderer, false).unwrap();
        let rot = copies_of(&scene, &[t])[0].1.rotation.expect("mirrored");
        assert!(rot.flip_h);
    }

    #[test]
    fn render_positions_instance_the_sprite() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let (sprite, t) = textured_sprite(&mut scene, vp, 4, 4);
        scene.add_render_position(sprite, Point::new(1, 2));
        scene.add_render_position(sprite, Point::new(30, 40));
        scene.redraw(renderer, false).unwrap();
        let corners: Vec<Point> = copies_of(&scene, &[t])
            .iter()
            .map(|(_, c)| c.dst.origin())
            .collect();
        assert_eq!(corners, [Point::new(1, 2), Point::new(30, 40)]);
    }

    #[test]
    fn negative_viewport_overflow_shrinks_clip() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.create_viewport(renderer);
        scene.update_viewport(vp, |p| {
            p.position = Point::new(-10, 5);
            p.width = Some(50);
            p.height = Some(50);
        });
        let (_, t) = textured_sprite(&mut scene, vp, 4, 4);
        scene.redraw(renderer, false).unwrap();
        let clips = scene.backend().clips();
        assert!(clips.contains(&Rect::new(0, 5, 40, 50)), "clip shrunk from the left: {clips:?}");
        let (_, params) = copies_of(&scene, &[t])[0];
        assert_eq!(params.dst.origin(), Point::new(-10, 5), "sprite keeps unclamped offset");
    }

    #[test]
    fn viewport_zoom_scales_around_sprite_origin() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let (sprite, t) = textured_sprite(&mut scene, vp, 4, 4);
        scene.set_sprite_position(sprite, Point::new(10, 0));
        scene.set_viewport_zoom(vp, 2.0, 2.0);
        scene.redraw(renderer, false).unwrap();
        let (_, params) = copies_of(&scene, &[t])[0];
        assert_eq!(params.dst, Rect::new(20, 0, 8, 8));
    }

    #[test]
    fn capture_is_a_new_locked_surface() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let (sprite, t) = textured_sprite(&mut scene, vp, 4, 4);
        scene.set_sprite_position(sprite, Point::new(20, 20));
        scene.redraw(renderer, false).unwrap();
        scene.backend_mut().clear_calls();

        let bitmap = scene
            .render_to_bitmap(renderer, &Capture::new(Point::new(10, 10), Size::new(16, 16)))
            .unwrap();
        assert_eq!(scene.surface_size(bitmap), Size::new(16, 16));
        assert!(scene.is_surface_locked(bitmap));
        let (_, params) = copies_of(&scene, &[t])[0];
        assert_eq!(params.dst.origin(), Point::new(10, 10), "offset by capture origin");
        assert!(!scene.needs_redraw(renderer), "window frame untouched");
        assert_eq!(scene.backend().live_targets(), 1, "capture target released");
    }

    #[test]
    fn renderer_offset_and_scale_move_every_copy() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let (sprite, t) = textured_sprite(&mut scene, vp, 4, 3);
        scene.set_sprite_position(sprite, Point::new(10, 10));
        scene.redraw(renderer, false).unwrap();

        scene.set_renderer_offset(renderer, Point::new(5, 7));
        scene.set_renderer_scale(renderer, 2.0, 2.0);
        assert!(scene.needs_redraw(renderer), "global transform dirties");
        assert_eq!(scene.renderer_offset(renderer), Point::new(5, 7));
        scene.backend_mut().clear_calls();
        scene.redraw(renderer, false).unwrap();

        let copies = copies_of(&scene, &[t]);
        assert_eq!(copies.len(), 1);
        assert_eq!(
            copies[0].1.dst,
            Rect::new(25, 27, 8, 6),
            "position doubled, then offset; size doubled"
        );
    }

    #[test]
    fn scaled_capture_renders_at_capture_resolution() {
        let (mut scene, window) = scene_with_window(64, 64);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.content_viewport(window).unwrap();
        let (sprite, t) = textured_sprite(&mut scene, vp, 4, 3);
        scene.set_sprite_position(sprite, Point::new(10, 10));
        scene.redraw(renderer, false).unwrap();
        scene.backend_mut().clear_calls();

        let capture = Capture::new(Point::new(4, 4), Size::new(32, 32)).with_scale(2.0, 2.0);
        let bitmap = scene.render_to_bitmap(renderer, &capture).unwrap();
        assert_eq!(scene.surface_size(bitmap), Size::new(32, 32));
        let copies = copies_of(&scene, &[t]);
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].1.dst, Rect::new(16, 16, 8, 6));
        assert_eq!(
            (scene.renderer_offset(renderer), scene.needs_redraw(renderer)),
            (Point::ZERO, false),
            "window renderer settings untouched"
        );
    }

    #[test]
    fn inherited_viewport_size_resolves_once() {
        let (mut scene, window) = scene_with_window(64, 48);
        let renderer = scene.window_renderer(window).unwrap();
        let vp = scene.create_viewport(renderer);
        textured_sprite(&mut scene, vp, 4, 4);
        assert_eq!(scene.viewport(vp).width, None);
        scene.redraw(renderer, false).unwrap();
        assert_eq!(scene.viewport(vp).width, Some(64));
        assert_eq!(scene.viewport(vp).height, Some(48));
    }
}
