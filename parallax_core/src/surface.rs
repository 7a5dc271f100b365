// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawable surfaces: CPU pixel storage plus a cached backend texture.
//!
//! A surface is in exactly one of two states:
//!
//! - **locked**: the RGBA buffer is available for reading and writing, and
//!   no texture exists;
//! - **unlocked**: the buffer is frozen, and a backend texture built from it
//!   exists once the surface is bound to a renderer.
//!
//! [`Scene::unlock_surface`] uploads the buffer; [`Scene::lock_surface`]
//! releases the texture. Compositing a locked surface is an error.
//!
//! A *tiled* surface carries no pixels of its own. It owns an ordered list of
//! tile surfaces, each placed at an offset inside the tiled surface's area.
//! Locking, unlocking, filling, binding and disposal apply to every tile.

use crate::backend::{Backend, TextureHandle};
use crate::error::{Error, Result};
use crate::geometry::{Color, Point, Rect, Size};
use crate::id::{RendererId, SurfaceId};
use crate::scene::Scene;

/// One tile of a tiled surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    /// The tile's own pixel surface.
    pub surface: SurfaceId,
    /// Top-left corner of the tile inside the tiled surface.
    pub offset: Point,
}

#[derive(Debug)]
pub(crate) struct PixelStore {
    pub(crate) data: Vec<u8>,
    pub(crate) locked: bool,
    pub(crate) texture: Option<TextureHandle>,
}

#[derive(Debug)]
pub(crate) enum SurfaceKind {
    Pixels(PixelStore),
    Tiled(Vec<Tile>),
}

#[derive(Debug)]
pub(crate) struct Surface {
    pub(crate) size: Size,
    pub(crate) kind: SurfaceKind,
    /// Renderer whose context owns the texture.
    pub(crate) renderer: Option<RendererId>,
    /// Tiled surface this surface is a tile of.
    pub(crate) parent: Option<SurfaceId>,
}

impl Surface {
    fn pixels(size: Size, data: Vec<u8>) -> Self {
        Self {
            size,
            kind: SurfaceKind::Pixels(PixelStore {
                data,
                locked: true,
                texture: None,
            }),
            renderer: None,
            parent: None,
        }
    }
}

impl<B: Backend> Scene<B> {
    /// Creates a locked surface filled with transparent black.
    pub fn create_surface(&mut self, size: Size) -> SurfaceId {
        self.surfaces
            .insert(Surface::pixels(size, vec![0; size.rgba_len()]))
    }

    /// Creates a locked surface from tightly packed RGBA pixels.
    pub fn create_surface_from_pixels(&mut self, size: Size, rgba: Vec<u8>) -> Result<SurfaceId> {
        if rgba.len() != size.rgba_len() {
            return Err(Error::Contract("pixel buffer length does not match size"));
        }
        Ok(self.surfaces.insert(Surface::pixels(size, rgba)))
    }

    /// Creates a locked tiled surface of `size`, split into tiles of at most
    /// `tile` pixels each, in row-major order.
    pub fn create_tiled_surface(&mut self, size: Size, tile: Size) -> Result<SurfaceId> {
        if tile.is_empty() {
            return Err(Error::Contract("tile size must be non-zero"));
        }
        let mut tiles = Vec::new();
        let mut y = 0;
        while y < size.height {
            let h = tile.height.min(size.height - y);
            let mut x = 0;
            while x < size.width {
                let w = tile.width.min(size.width - x);
                let surface = self.create_surface(Size::new(w, h));
                tiles.push(Tile {
                    surface,
                    offset: Point::new(to_i32(x), to_i32(y)),
                });
                x += w;
            }
            y += h;
        }
        self.create_tiled_from(size, tiles)
    }

    /// Creates a tiled surface from existing pixel surfaces.
    ///
    /// The tiled surface takes ownership of the tiles: disposing it disposes
    /// them.
    pub fn create_tiled_from(&mut self, size: Size, tiles: Vec<Tile>) -> Result<SurfaceId> {
        for tile in &tiles {
            let s = self.surfaces.expect(tile.surface);
            if !matches!(s.kind, SurfaceKind::Pixels(_)) || s.parent.is_some() {
                return Err(Error::Contract("tiles must be unowned pixel surfaces"));
            }
        }
        let members: Vec<SurfaceId> = tiles.iter().map(|t| t.surface).collect();
        let id = self.surfaces.insert(Surface {
            size,
            kind: SurfaceKind::Tiled(tiles),
            renderer: None,
            parent: None,
        });
        for tile in members {
            self.surfaces.expect_mut(tile).parent = Some(id);
        }
        Ok(id)
    }

    /// Returns whether `id` refers to a live surface.
    #[must_use]
    pub fn is_surface_alive(&self, id: SurfaceId) -> bool {
        self.surfaces.contains(id)
    }

    /// Returns the surface size.
    #[must_use]
    #[track_caller]
    pub fn surface_size(&self, id: SurfaceId) -> Size {
        self.surfaces.expect(id).size
    }

    /// Returns `true` if the surface is locked. A tiled surface counts as
    /// locked while any tile is.
    #[must_use]
    #[track_caller]
    pub fn is_surface_locked(&self, id: SurfaceId) -> bool {
        match &self.surfaces.expect(id).kind {
            SurfaceKind::Pixels(p) => p.locked,
            SurfaceKind::Tiled(tiles) => tiles.iter().any(|t| self.is_surface_locked(t.surface)),
        }
    }

    /// Returns the tiles of a tiled surface, or an empty slice.
    #[must_use]
    #[track_caller]
    pub fn surface_tiles(&self, id: SurfaceId) -> &[Tile] {
        match &self.surfaces.expect(id).kind {
            SurfaceKind::Pixels(_) => &[],
            SurfaceKind::Tiled(tiles) => tiles.as_slice(),
        }
    }

    /// Returns the cached backend texture, if one exists.
    #[must_use]
    #[track_caller]
    pub fn surface_texture(&self, id: SurfaceId) -> Option<TextureHandle> {
        match &self.surfaces.expect(id).kind {
            SurfaceKind::Pixels(p) => p.texture,
            SurfaceKind::Tiled(_) => None,
        }
    }

    /// Returns the renderer the surface is bound to.
    #[must_use]
    #[track_caller]
    pub fn surface_renderer(&self, id: SurfaceId) -> Option<RendererId> {
        self.surfaces.expect(id).renderer
    }

    // -- Pixel access (locked only) --

    /// Returns the RGBA buffer of a locked pixel surface.
    #[track_caller]
    pub fn surface_pixels(&self, id: SurfaceId) -> Result<&[u8]> {
        match &self.surfaces.expect(id).kind {
            SurfaceKind::Pixels(p) if p.locked => Ok(&p.data),
            SurfaceKind::Pixels(_) => Err(Error::SurfaceUnlocked(id)),
            SurfaceKind::Tiled(_) => Err(Error::Contract("tiled surfaces have no pixel buffer")),
        }
    }

    /// Returns the RGBA buffer of a locked pixel surface for writing.
    #[track_caller]
    pub fn surface_pixels_mut(&mut self, id: SurfaceId) -> Result<&mut [u8]> {
        match &mut self.surfaces.expect_mut(id).kind {
            SurfaceKind::Pixels(p) if p.locked => Ok(&mut p.data),
            SurfaceKind::Pixels(_) => Err(Error::SurfaceUnlocked(id)),
            SurfaceKind::Tiled(_) => Err(Error::Contract("tiled surfaces have no pixel buffer")),
        }
    }

    /// Reads one pixel of a locked surface.
    #[track_caller]
    pub fn pixel(&self, id: SurfaceId, at: Point) -> Result<Color> {
        let size = self.surface_size(id);
        let i = pixel_index(size, at).ok_or(Error::Contract("pixel outside surface"))?;
        let data = self.surface_pixels(id)?;
        Ok(Color::rgba(data[i], data[i + 1], data[i + 2], data[i + 3]))
    }

    /// Writes one pixel of a locked surface.
    #[track_caller]
    pub fn set_pixel(&mut self, id: SurfaceId, at: Point, color: Color) -> Result<()> {
        let size = self.surface_size(id);
        let i = pixel_index(size, at).ok_or(Error::Contract("pixel outside surface"))?;
        self.surface_pixels_mut(id)?[i..i + 4].copy_from_slice(&color.to_array());
        Ok(())
    }

    /// Fills a locked surface (every tile of a tiled one) with `color`.
    #[track_caller]
    pub fn fill_surface(&mut self, id: SurfaceId, color: Color) -> Result<()> {
        let size = self.surface_size(id);
        self.fill_surface_rect(id, Rect::from_size(size), color)
    }

    /// Fills the part of `rect` that lies inside a locked surface.
    ///
    /// On a tiled surface `rect` is in the tiled surface's coordinates and is
    /// split across the tiles it overlaps.
    #[track_caller]
    pub fn fill_surface_rect(&mut self, id: SurfaceId, rect: Rect, color: Color) -> Result<()> {
        let surface = self.surfaces.expect(id);
        let size = surface.size;
        if let SurfaceKind::Tiled(tiles) = &surface.kind {
            for tile in tiles.clone() {
                let local = Rect::new(
                    rect.x - tile.offset.x,
                    rect.y - tile.offset.y,
                    rect.width,
                    rect.height,
                );
                self.fill_surface_rect(tile.surface, local, color)?;
            }
            return Ok(());
        }
        let Some(area) = rect.intersect(Rect::from_size(size)) else {
            return Ok(());
        };
        let data = self.surface_pixels_mut(id)?;
        let px = color.to_array();
        let stride = size.width as usize * 4;
        for y in area.y..area.bottom() {
            let row = y as usize * stride;
            for x in area.x..area.right() {
                let i = row + x as usize * 4;
                data[i..i + 4].copy_from_slice(&px);
            }
        }
        Ok(())
    }

    // -- Lock state --

    /// Locks a surface for pixel access, releasing its texture.
    #[track_caller]
    pub fn lock_surface(&mut self, id: SurfaceId) {
        let surface = self.surfaces.expect_mut(id);
        match &mut surface.kind {
            SurfaceKind::Pixels(p) => {
                if let Some(texture) = p.texture.take() {
                    self.backend.destroy_texture(texture);
                }
                p.locked = true;
            }
            SurfaceKind::Tiled(tiles) => {
                for tile in tiles.clone() {
                    self.lock_surface(tile.surface);
                }
            }
        }
    }

    /// Unlocks a surface for display.
    ///
    /// If the surface is bound to a renderer its pixels are uploaded to a new
    /// texture and the renderer is marked dirty.
    #[track_caller]
    pub fn unlock_surface(&mut self, id: SurfaceId) -> Result<()> {
        let surface = self.surfaces.expect_mut(id);
        if let SurfaceKind::Tiled(tiles) = &surface.kind {
            for tile in tiles.clone() {
                self.unlock_surface(tile.surface)?;
            }
            return Ok(());
        }
        if let SurfaceKind::Pixels(p) = &mut surface.kind {
            p.locked = false;
        }
        self.ensure_texture(id)
    }

    /// Binds a surface to `renderer` so its texture lives in that renderer's
    /// context.
    ///
    /// Afterwards the surface is unlocked and has a valid texture. Binding an
    /// already bound, unlocked surface with a texture is a no-op.
    #[track_caller]
    pub fn bind_surface(&mut self, id: SurfaceId, renderer: RendererId) -> Result<()> {
        let surface = self.surfaces.expect_mut(id);
        if let SurfaceKind::Tiled(tiles) = &surface.kind {
            surface.renderer = Some(renderer);
            for tile in tiles.clone() {
                self.bind_surface(tile.surface, renderer)?;
            }
            return Ok(());
        }
        let ready = match &surface.kind {
            SurfaceKind::Pixels(p) => !p.locked && p.texture.is_some(),
            SurfaceKind::Tiled(_) => false,
        };
        if surface.renderer == Some(renderer) && ready {
            return Ok(());
        }
        surface.renderer = Some(renderer);
        // Drops any texture from a previous context.
        self.lock_surface(id);
        self.unlock_surface(id)
    }

    /// Disposes a surface and its texture. Tiled surfaces dispose their
    /// tiles; a disposed tile is dropped from its tiled surface. Disposing a
    /// stale handle does nothing.
    pub fn dispose_surface(&mut self, id: SurfaceId) {
        let Some(surface) = self.surfaces.remove(id) else {
            return;
        };
        if let Some(parent) = surface.parent
            && let Some(owner) = self.surfaces.get_mut(parent)
        {
            if let SurfaceKind::Tiled(tiles) = &mut owner.kind {
                tiles.retain(|t| t.surface != id);
            }
            if let Some(renderer) = owner.renderer {
                self.notify_renderer(renderer);
            }
        }
        match surface.kind {
            SurfaceKind::Pixels(p) => {
                if let Some(texture) = p.texture {
                    self.backend.destroy_texture(texture);
                }
            }
            SurfaceKind::Tiled(tiles) => {
                for tile in tiles {
                    self.dispose_surface(tile.surface);
                }
            }
        }
    }

    /// Creates the texture of an unlocked, bound pixel surface if missing.
    fn ensure_texture(&mut self, id: SurfaceId) -> Result<()> {
        let surface = self.surfaces.expect_mut(id);
        let Some(renderer) = surface.renderer else {
            return Ok(());
        };
        let Some(window) = self.renderers.get(renderer).map(|r| r.window) else {
            surface.renderer = None;
            return Ok(());
        };
        let size = surface.size;
        let SurfaceKind::Pixels(p) = &mut surface.kind else {
            return Ok(());
        };
        if p.locked || p.texture.is_some() {
            return Ok(());
        }
        p.texture = Some(self.backend.create_texture(window, size, &p.data)?);
        self.notify_renderer(renderer);
        Ok(())
    }

    /// Forgets every texture created in `renderer`'s context.
    pub(crate) fn unbind_renderer_surfaces(&mut self, renderer: RendererId) {
        let bound: Vec<SurfaceId> = self
            .surfaces
            .iter()
            .filter(|(_, s)| s.renderer == Some(renderer))
            .map(|(id, _)| id)
            .collect();
        for id in bound {
            let surface = self.surfaces.expect_mut(id);
            surface.renderer = None;
            if let SurfaceKind::Pixels(p) = &mut surface.kind
                && let Some(texture) = p.texture.take()
            {
                self.backend.destroy_texture(texture);
            }
        }
    }
}

fn pixel_index(size: Size, at: Point) -> Option<usize> {
    let x = u32::try_from(at.x).ok()?;
    let y = u32::try_from(at.y).ok()?;
    (x < size.width && y < size.height)
        .then(|| (y as usize * size.width as usize + x as usize) * 4)
}

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingBackend};
    use crate::window::WindowDesc;

    fn scene_with_renderer() -> (Scene<RecordingBackend>, RendererId) {
        let mut scene = Scene::new(RecordingBackend::new());
        let window = scene.create_window(WindowDesc::new("t", 64, 64));
        scene.initialize_window(window).unwrap();
        let renderer = scene.window_renderer(window).unwrap();
        (scene, renderer)
    }

    #[test]
    fn new_surface_is_locked_and_writable() {
        let mut scene = Scene::new(RecordingBackend::new());
        let s = scene.create_surface(Size::new(2, 2));
        assert!(scene.is_surface_locked(s), "surfaces start locked");
        scene.set_pixel(s, Point::new(1, 1), Color::rgb(1, 2, 3)).unwrap();
        assert_eq!(scene.pixel(s, Point::new(1, 1)).unwrap(), Color::rgb(1, 2, 3));
        assert!(scene.pixel(s, Point::new(2, 0)).is_err(), "out of bounds");
    }

    #[test]
    fn unlocked_surface_rejects_pixel_access() {
        let mut scene = Scene::new(RecordingBackend::new());
        let s = scene.create_surface(Size::new(2, 2));
        scene.unlock_surface(s).unwrap();
        assert!(matches!(scene.surface_pixels(s), Err(Error::SurfaceUnlocked(id)) if id == s));
        assert_eq!(scene.surface_texture(s), None, "unbound surfaces have no texture");
    }

    #[test]
    fn bind_creates_texture_and_lock_releases_it() {
        let (mut scene, renderer) = scene_with_renderer();
        let s = scene.create_surface(Size::new(4, 4));
        scene.bind_surface(s, renderer).unwrap();
        assert!(!scene.is_surface_locked(s), "binding unlocks");
        let texture = scene.surface_texture(s).expect("texture after bind");

        scene.lock_surface(s);
        assert_eq!(scene.surface_texture(s), None);
        assert!(
            scene.backend().calls().contains(&Call::DestroyTexture(texture)),
            "lock destroys the texture"
        );
    }

    #[test]
    fn rebinding_a_ready_surface_is_a_no_op() {
        let (mut scene, renderer) = scene_with_renderer();
        let s = scene.create_surface(Size::new(4, 4));
        scene.bind_surface(s, renderer).unwrap();
        let before = scene.backend().textures_created();
        scene.bind_surface(s, renderer).unwrap();
        assert_eq!(scene.backend().textures_created(), before);
    }

    #[test]
    fn tiled_surface_covers_area_row_major() {
        let mut scene = Scene::new(RecordingBackend::new());
        let t = scene
            .create_tiled_surface(Size::new(10, 6), Size::new(4, 4))
            .unwrap();
        let offsets: Vec<Point> = scene.surface_tiles(t).iter().map(|t| t.offset).collect();
        assert_eq!(
            offsets,
            [
                Point::new(0, 0),
                Point::new(4, 0),
                Point::new(8, 0),
                Point::new(0, 4),
                Point::new(4, 4),
                Point::new(8, 4),
            ]
        );
        let last = scene.surface_tiles(t)[5].surface;
        assert_eq!(scene.surface_size(last), Size::new(2, 2), "edge tiles are clipped");
    }

    #[test]
    fn tiled_fill_rect_spans_tiles() {
        let mut scene = Scene::new(RecordingBackend::new());
        let t = scene
            .create_tiled_surface(Size::new(8, 4), Size::new(4, 4))
            .unwrap();
        scene
            .fill_surface_rect(t, Rect::new(3, 0, 2, 1), Color::rgb(9, 9, 9))
            .unwrap();
        let [a, b] = [scene.surface_tiles(t)[0].surface, scene.surface_tiles(t)[1].surface];
        assert_eq!(scene.pixel(a, Point::new(3, 0)).unwrap(), Color::rgb(9, 9, 9));
        assert_eq!(scene.pixel(b, Point::new(0, 0)).unwrap(), Color::rgb(9, 9, 9));
        assert_eq!(scene.pixel(b, Point::new(1, 0)).unwrap(), Color::TRANSPARENT);
    }

    #[test]
    fn disposing_a_tile_detaches_it_from_its_tiled_surface() {
        let (mut scene, renderer) = scene_with_renderer();
        let t = scene
            .create_tiled_surface(Size::new(8, 8), Size::new(4, 4))
            .unwrap();
        let first = scene.surface_tiles(t)[0].surface;
        scene.dispose_surface(first);
        assert_eq!(scene.surface_tiles(t).len(), 3, "tile removed from its parent");
        assert!(
            scene.surface_tiles(t).iter().all(|tile| tile.surface != first),
            "no stale tile left behind"
        );

        scene.bind_surface(t, renderer).unwrap();
        assert!(!scene.is_surface_locked(t), "remaining tiles bind and unlock");
        scene.lock_surface(t);
        assert!(scene.is_surface_locked(t));

        scene.dispose_surface(t);
        assert_eq!(scene.surface_count(), 0, "remaining tiles disposed with the parent");
    }

    #[test]
    fn dispose_tiled_disposes_tiles_and_is_idempotent() {
        let mut scene = Scene::new(RecordingBackend::new());
        let t = scene
            .create_tiled_surface(Size::new(8, 8), Size::new(4, 4))
            .unwrap();
        assert_eq!(scene.surface_count(), 5);
        scene.dispose_surface(t);
        scene.dispose_surface(t);
        assert_eq!(scene.surface_count(), 0);
    }

    #[test]
    fn mismatched_pixel_buffer_is_rejected() {
        let mut scene = Scene::new(RecordingBackend::new());
        assert!(
            scene
                .create_surface_from_pixels(Size::new(2, 2), vec![0; 3])
                .is_err(),
            "buffer must be width * height * 4 bytes"
        );
    }

    #[test]
    #[should_panic(expected = "stale SurfaceId")]
    fn disposed_surface_handle_panics() {
        let mut scene = Scene::new(RecordingBackend::new());
        let s = scene.create_surface(Size::new(1, 1));
        scene.dispose_surface(s);
        let _ = scene.surface_size(s);
    }
}
