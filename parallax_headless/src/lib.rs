// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software backend for parallax.
//!
//! [`HeadlessBackend`] implements [`Backend`] entirely on the CPU:
//!
//! - textures and render targets are RGBA8 buffers;
//! - copies are nearest-neighbour, with rotation, mirroring, clipping and
//!   color/alpha modulation;
//! - `present` snapshots the target as the window's visible frame;
//! - events come from a queue the caller fills with
//!   [`push_event`](HeadlessBackend::push_event).
//!
//! Every copy is also appended to a [`DrawRecord`] log, so tests can check
//! both what was drawn and how.

mod raster;

use std::collections::{HashMap, VecDeque};

use parallax_core::backend::{
    Backend, BackendError, BackendEvent, CopyParams, NativeWindowId, TextureHandle,
};
use parallax_core::geometry::{Color, Point, Rect, Size};
use parallax_core::window::WindowDesc;

use crate::raster::Image;

/// One copy issued against the backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawRecord {
    /// Render target written.
    pub target: TextureHandle,
    /// Texture read.
    pub texture: TextureHandle,
    /// Copy parameters as received.
    pub params: CopyParams,
    /// Clip rectangle in effect.
    pub clip: Option<Rect>,
}

/// State of a native window.
#[derive(Clone, Debug)]
pub struct HeadlessWindow {
    /// Title bar text.
    pub title: String,
    /// Desktop position.
    pub position: Point,
    /// Client area size.
    pub size: Size,
    /// Icon size, once one was set.
    pub icon: Option<Size>,
    frame: Option<Vec<u8>>,
    frame_size: Size,
    presents: usize,
}

impl HeadlessWindow {
    /// The last presented frame, as tightly packed RGBA.
    #[must_use]
    pub fn frame(&self) -> Option<&[u8]> {
        self.frame.as_deref()
    }

    /// Number of frames presented.
    #[must_use]
    pub fn presents(&self) -> usize {
        self.presents
    }

    /// Reads one pixel of the last presented frame.
    #[must_use]
    pub fn pixel(&self, p: Point) -> Option<Color> {
        let frame = self.frame.as_ref()?;
        let x = u32::try_from(p.x).ok().filter(|&x| x < self.frame_size.width)?;
        let y = u32::try_from(p.y).ok().filter(|&y| y < self.frame_size.height)?;
        let i = (y as usize * self.frame_size.width as usize + x as usize) * 4;
        let [red, green, blue, alpha] = frame.get(i..i + 4)?.try_into().ok()?;
        Some(Color::rgba(red, green, blue, alpha))
    }
}

#[derive(Debug)]
struct Texture {
    owner: NativeWindowId,
    size: Size,
    pixels: Vec<u8>,
    clip: Option<Rect>,
    is_target: bool,
}

/// A [`Backend`] that renders into memory.
#[derive(Debug)]
pub struct HeadlessBackend {
    windows: HashMap<NativeWindowId, HeadlessWindow>,
    textures: HashMap<TextureHandle, Texture>,
    events: VecDeque<BackendEvent>,
    draw_log: Vec<DrawRecord>,
    displays: Vec<Rect>,
    next_window: u32,
    next_texture: u64,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    /// Creates a backend with one 1920x1080 display.
    #[must_use]
    pub fn new() -> Self {
        Self::with_displays(vec![Rect::new(0, 0, 1920, 1080)])
    }

    /// Creates a backend reporting the given display bounds.
    #[must_use]
    pub fn with_displays(displays: Vec<Rect>) -> Self {
        Self {
            windows: HashMap::new(),
            textures: HashMap::new(),
            events: VecDeque::new(),
            draw_log: Vec::new(),
            displays,
            next_window: 0,
            next_texture: 0,
        }
    }

    /// Queues an event for [`poll_event`](Backend::poll_event).
    pub fn push_event(&mut self, event: BackendEvent) {
        self.events.push_back(event);
    }

    /// Returns a native window.
    #[must_use]
    pub fn window(&self, id: NativeWindowId) -> Option<&HeadlessWindow> {
        self.windows.get(&id)
    }

    /// Number of open native windows.
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Number of live textures, render targets included.
    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Copies issued since creation or the last
    /// [`clear_draw_log`](Self::clear_draw_log).
    #[must_use]
    pub fn draw_log(&self) -> &[DrawRecord] {
        &self.draw_log
    }

    /// Forgets the logged copies.
    pub fn clear_draw_log(&mut self) {
        self.draw_log.clear();
    }

    fn next_handle(&mut self) -> TextureHandle {
        self.next_texture += 1;
        TextureHandle(self.next_texture)
    }

    fn insert_texture(
        &mut self,
        window: NativeWindowId,
        size: Size,
        pixels: Vec<u8>,
        is_target: bool,
    ) -> Result<TextureHandle, BackendError> {
        if !self.windows.contains_key(&window) {
            return Err(BackendError::new(format!("no such window: {window:?}")));
        }
        let handle = self.next_handle();
        self.textures.insert(
            handle,
            Texture {
                owner: window,
                size,
                pixels,
                clip: None,
                is_target,
            },
        );
        Ok(handle)
    }

    fn target_mut(&mut self, target: TextureHandle) -> Result<&mut Texture, BackendError> {
        match self.textures.get_mut(&target) {
            Some(t) if t.is_target => Ok(t),
            _ => Err(BackendError::new(format!("not a render target: {target:?}"))),
        }
    }
}

impl Backend for HeadlessBackend {
    fn create_window(&mut self, desc: &WindowDesc) -> Result<NativeWindowId, BackendError> {
        self.next_window += 1;
        let id = NativeWindowId(self.next_window);
        self.windows.insert(
            id,
            HeadlessWindow {
                title: desc.title.clone(),
                position: desc.position.unwrap_or(Point::ZERO),
                size: desc.size,
                icon: None,
                frame: None,
                frame_size: Size::new(0, 0),
                presents: 0,
            },
        );
        log::debug!("headless window {id:?} created ({}x{})", desc.size.width, desc.size.height);
        Ok(id)
    }

    fn destroy_window(&mut self, window: NativeWindowId) {
        if self.windows.remove(&window).is_some() {
            self.textures.retain(|_, t| t.owner != window);
            log::debug!("headless window {window:?} destroyed");
        }
    }

    fn set_window_title(&mut self, window: NativeWindowId, title: &str) {
        if let Some(w) = self.windows.get_mut(&window) {
            title.clone_into(&mut w.title);
        }
    }

    fn set_window_position(&mut self, window: NativeWindowId, position: Point) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.position = position;
        }
    }

    fn set_window_size(&mut self, window: NativeWindowId, size: Size) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.size = size;
        }
    }

    fn set_window_icon(&mut self, window: NativeWindowId, size: Size, _rgba: &[u8]) {
        if let Some(w) = self.windows.get_mut(&window) {
            w.icon = Some(size);
        }
    }

    fn create_target(
        &mut self,
        window: NativeWindowId,
        size: Size,
    ) -> Result<TextureHandle, BackendError> {
        self.insert_texture(window, size, vec![0; size.rgba_len()], true)
    }

    fn create_texture(
        &mut self,
        window: NativeWindowId,
        size: Size,
        rgba: &[u8],
    ) -> Result<TextureHandle, BackendError> {
        if rgba.len() != size.rgba_len() {
            return Err(BackendError::new(format!(
                "texture data is {} bytes, {}x{} needs {}",
                rgba.len(),
                size.width,
                size.height,
                size.rgba_len()
            )));
        }
        self.insert_texture(window, size, rgba.to_vec(), false)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
    }

    fn clear(&mut self, target: TextureHandle) -> Result<(), BackendError> {
        self.target_mut(target)?.pixels.fill(0);
        Ok(())
    }

    fn set_clip(&mut self, target: TextureHandle, clip: Option<Rect>) {
        if let Ok(t) = self.target_mut(target) {
            t.clip = clip;
        }
    }

    fn copy(
        &mut self,
        target: TextureHandle,
        texture: TextureHandle,
        params: &CopyParams,
    ) -> Result<(), BackendError> {
        self.target_mut(target)?;
        let Some(mut dst) = self.textures.remove(&target) else {
            return Err(BackendError::new(format!("not a render target: {target:?}")));
        };
        let result = match self.textures.get(&texture) {
            Some(src) => {
                let image = Image {
                    size: src.size,
                    pixels: &src.pixels,
                };
                raster::copy(&mut dst.pixels, dst.size, dst.clip, image, params);
                self.draw_log.push(DrawRecord {
                    target,
                    texture,
                    params: *params,
                    clip: dst.clip,
                });
                Ok(())
            }
            None => Err(BackendError::new(format!("invalid texture: {texture:?}"))),
        };
        self.textures.insert(target, dst);
        result
    }

    fn present(
        &mut self,
        window: NativeWindowId,
        target: TextureHandle,
    ) -> Result<(), BackendError> {
        let t = self
            .textures
            .get(&target)
            .ok_or_else(|| BackendError::new(format!("invalid target: {target:?}")))?;
        let w = self
            .windows
            .get_mut(&window)
            .ok_or_else(|| BackendError::new(format!("no such window: {window:?}")))?;
        w.frame = Some(t.pixels.clone());
        w.frame_size = t.size;
        w.presents += 1;
        Ok(())
    }

    fn read_pixels(&mut self, target: TextureHandle) -> Result<Vec<u8>, BackendError> {
        Ok(self.target_mut(target)?.pixels.clone())
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        self.events.pop_front()
    }

    fn display_bounds(&self) -> Vec<Rect> {
        self.displays.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textures_die_with_their_window() {
        let mut backend = HeadlessBackend::new();
        let w = backend.create_window(&WindowDesc::new("t", 4, 4)).unwrap();
        backend.create_target(w, Size::new(4, 4)).unwrap();
        backend
            .create_texture(w, Size::new(1, 1), &[1, 2, 3, 4])
            .unwrap();
        assert_eq!(backend.texture_count(), 2);
        backend.destroy_window(w);
        assert_eq!(backend.texture_count(), 0);
        assert_eq!(backend.window_count(), 0);
    }

    #[test]
    fn upload_size_is_checked() {
        let mut backend = HeadlessBackend::new();
        let w = backend.create_window(&WindowDesc::new("t", 4, 4)).unwrap();
        let err = backend
            .create_texture(w, Size::new(2, 2), &[0; 4])
            .unwrap_err();
        assert!(err.message.contains("needs 16"), "{err}");
    }

    #[test]
    fn copy_onto_plain_texture_is_rejected() {
        let mut backend = HeadlessBackend::new();
        let w = backend.create_window(&WindowDesc::new("t", 4, 4)).unwrap();
        let tex = backend.create_texture(w, Size::new(1, 1), &[0; 4]).unwrap();
        let params = CopyParams {
            src: Rect::new(0, 0, 1, 1),
            dst: Rect::new(0, 0, 1, 1),
            rotation: None,
            color: Color::WHITE,
            alpha: 255,
        };
        assert!(backend.copy(tex, tex, &params).is_err());
        assert_eq!(backend.texture_count(), 1, "texture survives the failed copy");
    }

    #[test]
    fn present_snapshots_target() {
        let mut backend = HeadlessBackend::new();
        let w = backend.create_window(&WindowDesc::new("t", 1, 1)).unwrap();
        let target = backend.create_target(w, Size::new(1, 1)).unwrap();
        let tex = backend
            .create_texture(w, Size::new(1, 1), &[9, 8, 7, 255])
            .unwrap();
        let params = CopyParams {
            src: Rect::new(0, 0, 1, 1),
            dst: Rect::new(0, 0, 1, 1),
            rotation: None,
            color: Color::WHITE,
            alpha: 255,
        };
        backend.copy(target, tex, &params).unwrap();
        backend.present(w, target).unwrap();
        let window = backend.window(w).unwrap();
        assert_eq!(window.pixel(Point::ZERO), Some(Color::rgba(9, 8, 7, 255)));
        assert_eq!(window.presents(), 1);
        assert_eq!(backend.draw_log().len(), 1);
    }
}
