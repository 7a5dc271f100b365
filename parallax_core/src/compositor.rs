// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame driver.
//!
//! A [`Compositor`] owns the [`Scene`], one [`WindowHandler`] per window and
//! the [`MainThreadQueue`]. Each call to [`tick`](Compositor::tick) runs:
//!
//! ```text
//!   snapshot input ─► per live window: on_tick, then on_mouse_press
//!        │                                (focused and a button held)
//!        ▼
//!   drain backend events ─► update global input ─► window callbacks
//!        │
//!        ▼
//!   commit input ─► drain main-thread queue ─► redraw dirty renderers
//! ```
//!
//! Close requests made from inside callbacks are honored at the end of the
//! dispatch step that made them.

use std::collections::HashMap;
use std::time::Instant;

use core::fmt;

use crate::backend::{Backend, BackendEvent};
use crate::config::{CompositorConfig, DispatchMode};
use crate::error::{Error, Result};
use crate::id::{RendererId, WindowId};
use crate::input::TextInput;
use crate::pending::MainThreadQueue;
use crate::scene::{Leak, Scene};
use crate::trace::{
    EventDroppedEvent, FrameSummary, FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, RedrawEvent, TickEvent, Tracer,
};
use crate::window::{CloseResponse, WindowDesc, WindowHandler, WindowState};

/// Drives windows, input dispatch and redraws, one tick at a time.
pub struct Compositor<B: Backend> {
    scene: Scene<B>,
    handlers: HashMap<WindowId, Box<dyn WindowHandler<B>>>,
    queue: MainThreadQueue<B>,
    frame_index: u64,
    shut_down: bool,
}

impl<B: Backend> fmt::Debug for Compositor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compositor")
            .field("scene", &self.scene)
            .field("handlers", &self.handlers.len())
            .field("queue", &self.queue)
            .field("frame_index", &self.frame_index)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}

impl<B: Backend> Compositor<B> {
    /// Creates a compositor with the development configuration.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, CompositorConfig::default())
    }

    /// Creates a compositor.
    #[must_use]
    pub fn with_config(backend: B, config: CompositorConfig) -> Self {
        Self {
            scene: Scene::with_config(backend, config),
            handlers: HashMap::new(),
            queue: MainThreadQueue::new(),
            frame_index: 0,
            shut_down: false,
        }
    }

    /// Returns the scene.
    #[must_use]
    pub fn scene(&self) -> &Scene<B> {
        &self.scene
    }

    /// Returns the scene mutably.
    pub fn scene_mut(&mut self) -> &mut Scene<B> {
        &mut self.scene
    }

    /// Returns a handle to the main-thread queue, for posting from other
    /// threads.
    #[must_use]
    pub fn queue(&self) -> MainThreadQueue<B> {
        self.queue.clone()
    }

    /// Index of the next tick.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Creates a window in the `Constructed` state with its handler.
    pub fn add_window(
        &mut self,
        desc: WindowDesc,
        handler: impl WindowHandler<B> + 'static,
    ) -> WindowId {
        let id = self.scene.create_window(desc);
        self.handlers.insert(id, Box::new(handler));
        id
    }

    /// Creates, initializes and starts a window.
    pub fn open_window(
        &mut self,
        desc: WindowDesc,
        handler: impl WindowHandler<B> + 'static,
    ) -> Result<WindowId> {
        let id = self.add_window(desc, handler);
        self.start_window(id)?;
        Ok(id)
    }

    /// Replaces the handler of a window.
    #[track_caller]
    pub fn set_handler(&mut self, id: WindowId, handler: impl WindowHandler<B> + 'static) {
        assert!(self.scene.is_window_alive(id), "stale WindowId: {id:?}");
        self.handlers.insert(id, Box::new(handler));
    }

    /// Initializes the window if needed, then fires its loaded notification.
    ///
    /// Starting a window that is already started does nothing.
    #[track_caller]
    pub fn start_window(&mut self, id: WindowId) -> Result<()> {
        self.scene.initialize_window(id)?;
        if self.scene.window_state(id) != WindowState::Initialized {
            return Ok(());
        }
        self.scene.windows.expect_mut(id).state = WindowState::Started;
        self.dispatch(id, "loaded", |h, s, w| h.on_loaded(s, w))?;
        self.process_close_requests()
    }

    /// Asks the window to close.
    ///
    /// Fires the cancelable closing notification; unless it is canceled the
    /// native window is destroyed, the window leaves the live registry and
    /// the closed notification fires. Scene objects stay alive until
    /// [`dispose_window`](Self::dispose_window). Returns whether the window
    /// closed.
    #[track_caller]
    pub fn close_window(&mut self, id: WindowId) -> Result<bool> {
        let state = self.scene.window_state(id);
        self.scene.windows.expect_mut(id).close_requested = false;
        if !matches!(state, WindowState::Initialized | WindowState::Started) {
            return Ok(false);
        }
        let mut response = CloseResponse::Proceed;
        self.dispatch(id, "closing", |h, s, w| {
            response = h.on_closing(s, w)?;
            Ok(())
        })?;
        if response == CloseResponse::Cancel || !self.scene.is_window_alive(id) {
            return Ok(false);
        }
        self.scene.close_native(id);
        self.dispatch(id, "closed", |h, s, w| h.on_closed(s, w))?;
        Ok(true)
    }

    /// Disposes the window and drops its handler. Disposing a stale handle
    /// does nothing.
    pub fn dispose_window(&mut self, id: WindowId) {
        self.handlers.remove(&id);
        self.scene.dispose_window(id);
    }

    /// Returns `true` while at least one window is initialized and not
    /// closed.
    #[must_use]
    pub fn has_open_windows(&self) -> bool {
        self.scene.live_windows().next().is_some()
    }

    /// Ticks until every window has closed.
    pub fn run(&mut self) -> Result<()> {
        while self.has_open_windows() {
            self.tick()?;
        }
        Ok(())
    }

    /// Runs one tick without tracing.
    pub fn tick(&mut self) -> Result<FrameSummary> {
        self.tick_traced(&mut Tracer::none())
    }

    /// Runs one tick, reporting each phase to `tracer`.
    ///
    /// Callback errors abort the tick in [`DispatchMode::Strict`]; backend
    /// and contract errors always do.
    pub fn tick_traced(&mut self, tracer: &mut Tracer<'_>) -> Result<FrameSummary> {
        let frame_index = self.frame_index;
        self.frame_index += 1;
        let mut summary = FrameSummaryBuilder::new(frame_index);
        self.scene.compact_registry();
        tracer.tick(&TickEvent {
            frame_index,
            live_windows: self.scene.live_windows().count(),
        });

        phase_begin(&mut summary, tracer, frame_index, PhaseKind::Input);
        self.scene.input.begin_tick();
        self.dispatch_ticks()?;
        while let Some(event) = self.scene.backend.poll_event() {
            let target = self.scene.window_for_native(event.window());
            summary.record_event(target.is_none());
            if target.is_none() {
                tracer.event_dropped(&EventDroppedEvent {
                    frame_index,
                    window: event.window(),
                });
            }
            self.handle_event(target, event)?;
        }
        self.scene.input.end_tick();
        phase_end(&mut summary, tracer, frame_index, PhaseKind::Input);

        phase_begin(&mut summary, tracer, frame_index, PhaseKind::Pending);
        let jobs = self.queue.drain(&mut self.scene);
        summary.record_jobs(jobs);
        self.process_close_requests()?;
        phase_end(&mut summary, tracer, frame_index, PhaseKind::Pending);

        phase_begin(&mut summary, tracer, frame_index, PhaseKind::Redraw);
        let renderers: Vec<RendererId> = self
            .scene
            .live_windows()
            .filter_map(|w| self.scene.window_renderer(w).ok())
            .collect();
        for renderer in renderers {
            if let Some(stats) = self.scene.redraw(renderer, false)? {
                summary.record_redraw(&stats);
                tracer.redraw(&RedrawEvent {
                    frame_index,
                    renderer,
                    stats,
                });
            }
        }
        phase_end(&mut summary, tracer, frame_index, PhaseKind::Redraw);

        let summary = summary.finish();
        log::trace!(
            "tick {frame_index}: {} events ({} dropped), {} jobs, {} redraws, {} copies",
            summary.events,
            summary.events_dropped,
            summary.jobs_run,
            summary.renderers_redrawn,
            summary.draw_calls,
        );
        tracer.frame_summary(&summary);
        Ok(summary)
    }

    /// Disposes every window and returns the objects still alive afterwards.
    ///
    /// With [`leak_check`](CompositorConfig::leak_check) on, each leak is
    /// logged as a warning. Runs at most once; later calls return nothing.
    pub fn shutdown(&mut self) -> Vec<Leak> {
        if self.shut_down {
            return Vec::new();
        }
        self.shut_down = true;
        for id in self.scene.windows.ids() {
            self.dispose_window(id);
        }
        self.handlers.clear();
        let leaks = self.scene.leak_report();
        if self.scene.config.leak_check {
            for leak in &leaks {
                log::warn!("leaked at shutdown: {leak:?}");
            }
        }
        leaks
    }

    // -- Dispatch --

    /// Fires the per-tick notifications, in registry order.
    fn dispatch_ticks(&mut self) -> Result<()> {
        // Indexing keeps slots stable while callbacks close windows.
        let mut index = 0;
        while index < self.scene.registry.len() {
            let slot = self.scene.registry[index];
            index += 1;
            let Some(window) = slot else {
                continue;
            };
            if self.scene.window_state(window) != WindowState::Started {
                continue;
            }
            self.dispatch(window, "tick", |h, s, w| h.on_tick(s, w))?;
            let input = &self.scene.input;
            let (previous, current) = (input.previous_buttons(), input.buttons());
            if self.scene.is_window_alive(window)
                && self.scene.is_focused(window)
                && current.any()
            {
                self.dispatch(window, "mouse press", |h, s, w| {
                    h.on_mouse_press(s, w, previous, current)
                })?;
            }
            self.process_close_requests()?;
        }
        Ok(())
    }

    /// Applies one backend event to the global input state, then notifies
    /// the window it belongs to, if any.
    fn handle_event(&mut self, window: Option<WindowId>, event: BackendEvent) -> Result<()> {
        match event {
            BackendEvent::KeyDown { key, .. } => {
                let fresh = self.scene.input.key_down(key);
                if let Some(w) = window {
                    if fresh {
                        self.dispatch(w, "key down", |h, s, w| h.on_key_down(s, w, key))?;
                    }
                    if let Some(text) = TextInput::from_key(key) {
                        self.dispatch(w, "text input", |h, s, w| h.on_text_input(s, w, &text))?;
                    }
                }
            }
            BackendEvent::KeyUp { key, .. } => {
                if self.scene.input.key_up(key)
                    && let Some(w) = window
                {
                    self.dispatch(w, "key up", |h, s, w| h.on_key_up(s, w, key))?;
                }
            }
            BackendEvent::MouseMotion { position, .. } => {
                if self.scene.input.move_mouse(position)
                    && let Some(w) = window
                {
                    self.dispatch(w, "mouse move", |h, s, w| h.on_mouse_move(s, w, position))?;
                }
            }
            BackendEvent::MouseDown {
                button, position, ..
            } => {
                self.scene.input.set_button(button, true, position);
                if let Some(w) = window {
                    self.dispatch(w, "mouse down", |h, s, w| {
                        h.on_mouse_down(s, w, button, position)
                    })?;
                }
            }
            BackendEvent::MouseUp {
                button, position, ..
            } => {
                self.scene.input.set_button(button, false, position);
                if let Some(w) = window {
                    self.dispatch(w, "mouse up", |h, s, w| {
                        h.on_mouse_up(s, w, button, position)
                    })?;
                }
            }
            BackendEvent::MouseWheel { delta, .. } => {
                self.scene.input.scroll(delta);
                if let Some(w) = window {
                    self.dispatch(w, "mouse wheel", |h, s, w| h.on_mouse_wheel(s, w, delta))?;
                }
            }
            BackendEvent::TextInput { raw, .. } => {
                let text = TextInput::from_raw(&raw);
                if let Some(w) = window
                    && !text.is_empty()
                {
                    self.dispatch(w, "text input", |h, s, w| h.on_text_input(s, w, &text))?;
                }
            }
            BackendEvent::FocusGained { .. } => {
                if let Some(w) = window {
                    self.scene.windows.expect_mut(w).focused = true;
                    self.dispatch(w, "focus gained", |h, s, w| h.on_focus_gained(s, w))?;
                }
            }
            BackendEvent::FocusLost { .. } => {
                if let Some(w) = window {
                    self.scene.windows.expect_mut(w).focused = false;
                    self.dispatch(w, "focus lost", |h, s, w| h.on_focus_lost(s, w))?;
                }
            }
            BackendEvent::Moved { position, .. } => {
                if let Some(w) = window {
                    self.scene.windows.expect_mut(w).desc.position = Some(position);
                    self.dispatch(w, "position changed", |h, s, w| {
                        h.on_position_changed(s, w, position)
                    })?;
                }
            }
            BackendEvent::Resized { size, .. } => {
                if let Some(w) = window {
                    self.scene.resize_window(w, size)?;
                    self.dispatch(w, "size changed", |h, s, w| h.on_size_changed(s, w, size))?;
                }
            }
            BackendEvent::CloseRequested { .. } => {
                if let Some(w) = window {
                    self.close_window(w)?;
                }
            }
        }
        self.process_close_requests()
    }

    /// Runs `f` against the window's handler.
    ///
    /// The handler is taken out of the map for the duration of the call so
    /// the callback can borrow the scene mutably. A handler whose window was
    /// disposed by its own callback is dropped.
    fn dispatch(
        &mut self,
        window: WindowId,
        what: &'static str,
        f: impl FnOnce(&mut dyn WindowHandler<B>, &mut Scene<B>, WindowId) -> anyhow::Result<()>,
    ) -> Result<()> {
        let Some(mut handler) = self.handlers.remove(&window) else {
            return Ok(());
        };
        let result = f(handler.as_mut(), &mut self.scene, window);
        if self.scene.is_window_alive(window) {
            self.handlers.entry(window).or_insert(handler);
        }
        match result {
            Ok(()) => Ok(()),
            Err(err) => match self.scene.config.dispatch {
                DispatchMode::Strict => Err(Error::Callback(
                    err.context(format!("{what} handler of {window:?}")),
                )),
                DispatchMode::Tolerant => {
                    log::warn!("{what} handler of {window:?} failed: {err:#}");
                    Ok(())
                }
            },
        }
    }

    /// Closes every window that asked to be closed from inside a callback.
    fn process_close_requests(&mut self) -> Result<()> {
        let requested: Vec<WindowId> = self
            .scene
            .windows
            .iter()
            .filter(|(_, w)| w.close_requested)
            .map(|(id, _)| id)
            .collect();
        for id in requested {
            if self.scene.is_window_alive(id) {
                self.close_window(id)?;
            }
        }
        Ok(())
    }
}

impl<B: Backend> Drop for Compositor<B> {
    fn drop(&mut self) {
        if self.scene.config.leak_check {
            self.shutdown();
        }
    }
}

fn phase_begin(
    summary: &mut FrameSummaryBuilder,
    tracer: &mut Tracer<'_>,
    frame_index: u64,
    phase: PhaseKind,
) {
    let timestamp = Instant::now();
    summary.phase_begin(phase, timestamp);
    tracer.phase_begin(&PhaseBeginEvent {
        frame_index,
        phase,
        timestamp,
    });
}

fn phase_end(
    summary: &mut FrameSummaryBuilder,
    tracer: &mut Tracer<'_>,
    frame_index: u64,
    phase: PhaseKind,
) {
    let timestamp = Instant::now();
    summary.phase_end(phase, timestamp);
    tracer.phase_end(&PhaseEndEvent {
        frame_index,
        phase,
        timestamp,
    });
}
