// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles.
//!
//! [`RecordingBackend`] implements [`Backend`] without touching any native
//! API: it hands out sequential handles, logs every call and serves events
//! pushed by the test. Available to other crates behind the `testing`
//! feature.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::backend::{
    Backend, BackendError, BackendEvent, CopyParams, NativeWindowId, TextureHandle,
};
use crate::geometry::{Point, Rect, Size};
use crate::id::WindowId;
use crate::scene::Scene;
use crate::window::WindowDesc;

/// One logged backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    /// `create_window` returned this id.
    CreateWindow(NativeWindowId),
    /// `destroy_window`.
    DestroyWindow(NativeWindowId),
    /// `set_window_title`.
    SetTitle(NativeWindowId, String),
    /// `set_window_position`.
    SetPosition(NativeWindowId, Point),
    /// `set_window_size`.
    SetSize(NativeWindowId, Size),
    /// `set_window_icon`.
    SetIcon(NativeWindowId, Size),
    /// `create_target` returned this handle.
    CreateTarget(TextureHandle, Size),
    /// `create_texture` returned this handle.
    CreateTexture(TextureHandle, Size),
    /// `destroy_texture`.
    DestroyTexture(TextureHandle),
    /// `clear`.
    Clear(TextureHandle),
    /// `set_clip`.
    SetClip(TextureHandle, Option<Rect>),
    /// `copy` of a texture onto a target.
    Copy {
        /// Render target.
        target: TextureHandle,
        /// Source texture.
        texture: TextureHandle,
        /// Copy parameters.
        params: CopyParams,
    },
    /// `present`.
    Present(NativeWindowId, TextureHandle),
    /// `read_pixels`.
    ReadPixels(TextureHandle),
}

/// A [`Backend`] that records calls instead of drawing.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<Call>,
    events: VecDeque<BackendEvent>,
    next_window: u32,
    next_texture: u64,
    windows: HashSet<NativeWindowId>,
    targets: HashMap<TextureHandle, Size>,
    textures: HashSet<TextureHandle>,
    owners: HashMap<TextureHandle, NativeWindowId>,
    textures_created: usize,
    fail_next_target: Option<String>,
}

impl RecordingBackend {
    /// Creates a backend with nothing logged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call since creation or the last [`clear_calls`](Self::clear_calls).
    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Forgets the logged calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Logged copies as `(texture, params)`, in call order.
    #[must_use]
    pub fn copies(&self) -> Vec<(TextureHandle, CopyParams)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Copy {
                    texture, params, ..
                } => Some((*texture, *params)),
                _ => None,
            })
            .collect()
    }

    /// Logged clip rectangles, skipping clip resets.
    #[must_use]
    pub fn clips(&self) -> Vec<Rect> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::SetClip(_, clip) => *clip,
                _ => None,
            })
            .collect()
    }

    /// Textures created so far, targets excluded.
    #[must_use]
    pub fn textures_created(&self) -> usize {
        self.textures_created
    }

    /// Textures created and not yet destroyed.
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Render targets created and not yet destroyed.
    #[must_use]
    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }

    /// Native windows created and not yet destroyed.
    #[must_use]
    pub fn live_windows(&self) -> usize {
        self.windows.len()
    }

    /// Queues an event for [`poll_event`](Backend::poll_event).
    pub fn push_event(&mut self, event: BackendEvent) {
        self.events.push_back(event);
    }

    /// Makes the next `create_target` fail with `message`.
    pub fn fail_next_target(&mut self, message: impl Into<String>) {
        self.fail_next_target = Some(message.into());
    }

    fn next_handle(&mut self) -> TextureHandle {
        self.next_texture += 1;
        TextureHandle(self.next_texture)
    }
}

impl Backend for RecordingBackend {
    fn create_window(&mut self, _desc: &WindowDesc) -> Result<NativeWindowId, BackendError> {
        self.next_window += 1;
        let id = NativeWindowId(self.next_window);
        self.windows.insert(id);
        self.calls.push(Call::CreateWindow(id));
        Ok(id)
    }

    fn destroy_window(&mut self, window: NativeWindowId) {
        self.windows.remove(&window);
        let owned: Vec<TextureHandle> = self
            .owners
            .iter()
            .filter(|&(_, &w)| w == window)
            .map(|(&t, _)| t)
            .collect();
        for texture in owned {
            self.owners.remove(&texture);
            self.textures.remove(&texture);
            self.targets.remove(&texture);
        }
        self.calls.push(Call::DestroyWindow(window));
    }

    fn set_window_title(&mut self, window: NativeWindowId, title: &str) {
        self.calls.push(Call::SetTitle(window, title.to_owned()));
    }

    fn set_window_position(&mut self, window: NativeWindowId, position: Point) {
        self.calls.push(Call::SetPosition(window, position));
    }

    fn set_window_size(&mut self, window: NativeWindowId, size: Size) {
        self.calls.push(Call::SetSize(window, size));
    }

    fn set_window_icon(&mut self, window: NativeWindowId, size: Size, _rgba: &[u8]) {
        self.calls.push(Call::SetIcon(window, size));
    }

    fn create_target(
        &mut self,
        window: NativeWindowId,
        size: Size,
    ) -> Result<TextureHandle, BackendError> {
        if let Some(message) = self.fail_next_target.take() {
            return Err(BackendError::new(message));
        }
        let handle = self.next_handle();
        self.targets.insert(handle, size);
        self.owners.insert(handle, window);
        self.calls.push(Call::CreateTarget(handle, size));
        Ok(handle)
    }

    fn create_texture(
        &mut self,
        window: NativeWindowId,
        size: Size,
        rgba: &[u8],
    ) -> Result<TextureHandle, BackendError> {
        assert_eq!(rgba.len(), size.rgba_len(), "texture upload size mismatch");
        let handle = self.next_handle();
        self.textures.insert(handle);
        self.owners.insert(handle, window);
        self.textures_created += 1;
        self.calls.push(Call::CreateTexture(handle, size));
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
        self.targets.remove(&texture);
        self.owners.remove(&texture);
        self.calls.push(Call::DestroyTexture(texture));
    }

    fn clear(&mut self, target: TextureHandle) -> Result<(), BackendError> {
        self.calls.push(Call::Clear(target));
        Ok(())
    }

    fn set_clip(&mut self, target: TextureHandle, clip: Option<Rect>) {
        self.calls.push(Call::SetClip(target, clip));
    }

    fn copy(
        &mut self,
        target: TextureHandle,
        texture: TextureHandle,
        params: &CopyParams,
    ) -> Result<(), BackendError> {
        if !self.textures.contains(&texture) {
            return Err(BackendError::new(format!("unknown texture {texture:?}")));
        }
        self.calls.push(Call::Copy {
            target,
            texture,
            params: *params,
        });
        Ok(())
    }

    fn present(
        &mut self,
        window: NativeWindowId,
        target: TextureHandle,
    ) -> Result<(), BackendError> {
        self.calls.push(Call::Present(window, target));
        Ok(())
    }

    fn read_pixels(&mut self, target: TextureHandle) -> Result<Vec<u8>, BackendError> {
        let size = self
            .targets
            .get(&target)
            .copied()
            .ok_or_else(|| BackendError::new(format!("unknown target {target:?}")))?;
        self.calls.push(Call::ReadPixels(target));
        Ok(vec![0; size.rgba_len()])
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        self.events.pop_front()
    }

    fn display_bounds(&self) -> Vec<Rect> {
        vec![Rect::new(0, 0, 1920, 1080)]
    }
}

/// A scene over a [`RecordingBackend`] with one initialized window.
#[must_use]
pub fn scene_with_window(width: u32, height: u32) -> (Scene<RecordingBackend>, WindowId) {
    let mut scene = Scene::new(RecordingBackend::new());
    let window = scene.create_window(WindowDesc::new("test", width, height));
    if let Err(err) = scene.initialize_window(window) {
        panic!("recording backend cannot fail to initialize: {err}");
    }
    (scene, window)
}
