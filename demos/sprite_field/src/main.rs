// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drifting sprites on the headless backend.
//!
//! Opens one window, scatters a field of tinted sprites over it, and drives
//! 90 ticks through the compositor while a
//! [`PrettyPrintSink`](parallax_debug::pretty::PrettyPrintSink) and a
//! [`StatsSink`](parallax_debug::stats::StatsSink) watch. Space pauses the
//! drift, Escape closes the window. Both keys are injected as backend events
//! partway through. Totals are printed as JSON on exit.
//!
//! Set `PARALLAX_PRETTY=1` for the per-phase trace lines.

use parallax_core::backend::{BackendEvent, NativeWindowId};
use parallax_core::input::Key;
use parallax_core::trace::{
    EventDroppedEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, RedrawEvent, TickEvent,
    TraceSink, Tracer,
};
use parallax_core::{
    Color, Compositor, Point, Scene, Size, SpriteId, SurfaceId, WindowDesc, WindowHandler,
    WindowId,
};
use parallax_debug::pretty::PrettyPrintSink;
use parallax_debug::stats::StatsSink;
use parallax_headless::HeadlessBackend;

const WIDTH: u32 = 96;
const HEIGHT: u32 = 64;
const SPRITES: i32 = 12;
const PAUSE_AT: u64 = 30;
const RESUME_AT: u64 = 45;
const CLOSE_AT: u64 = 90;

/// A field of sprites that drift diagonally and wrap at the window edges.
#[derive(Debug, Default)]
struct Field {
    dot: Option<SurfaceId>,
    sprites: Vec<(SpriteId, Point)>,
    paused: bool,
}

impl WindowHandler<HeadlessBackend> for Field {
    fn on_loaded(
        &mut self,
        scene: &mut Scene<HeadlessBackend>,
        window: WindowId,
    ) -> anyhow::Result<()> {
        let dot = scene.create_surface(Size::new(4, 4));
        scene.fill_surface(dot, Color::WHITE)?;
        let content = scene.content_viewport(window)?;
        for i in 0..SPRITES {
            let sprite = scene.create_sprite(Some(content))?;
            scene.set_sprite_surface(sprite, Some(dot))?;
            scene.set_sprite_position(sprite, Point::new(i * 8, (i * 13) % 64));
            scene.set_sprite_z(sprite, i);
            scene.set_sprite_color(sprite, palette(i));
            let velocity = Point::new(1 + i % 3, 1 + i % 2);
            self.sprites.push((sprite, velocity));
        }
        self.dot = Some(dot);
        log::info!("field loaded with {} sprites", self.sprites.len());
        Ok(())
    }

    fn on_tick(&mut self, scene: &mut Scene<HeadlessBackend>, _: WindowId) -> anyhow::Result<()> {
        if scene.input().is_triggered(Key::Space) {
            self.paused = !self.paused;
            log::info!("drift {}", if self.paused { "paused" } else { "resumed" });
        }
        if self.paused {
            return Ok(());
        }
        let (w, h) = (i32::try_from(WIDTH)?, i32::try_from(HEIGHT)?);
        for &(sprite, v) in &self.sprites {
            let p = scene.sprite(sprite).position;
            scene.set_sprite_position(sprite, Point::new((p.x + v.x) % w, (p.y + v.y) % h));
        }
        Ok(())
    }

    fn on_key_down(
        &mut self,
        scene: &mut Scene<HeadlessBackend>,
        window: WindowId,
        key: Key,
    ) -> anyhow::Result<()> {
        if key == Key::Escape {
            scene.request_close(window);
        }
        Ok(())
    }

    fn on_closed(&mut self, scene: &mut Scene<HeadlessBackend>, _: WindowId) -> anyhow::Result<()> {
        // The sprites share one surface.
        for (sprite, _) in self.sprites.drain(..) {
            scene.dispose_sprite_keep_surface(sprite);
        }
        if let Some(dot) = self.dot.take() {
            scene.dispose_surface(dot);
        }
        Ok(())
    }
}

fn palette(i: i32) -> Color {
    match i % 4 {
        0 => Color::rgb(255, 96, 96),
        1 => Color::rgb(96, 255, 96),
        2 => Color::rgb(96, 96, 255),
        _ => Color::rgb(255, 255, 96),
    }
}

/// Forwards every event to the stats collector and, optionally, the printer.
struct Sinks {
    pretty: Option<PrettyPrintSink>,
    stats: StatsSink,
}

impl Sinks {
    fn each(&mut self, mut f: impl FnMut(&mut dyn TraceSink)) {
        if let Some(pretty) = &mut self.pretty {
            f(pretty);
        }
        f(&mut self.stats);
    }
}

impl TraceSink for Sinks {
    fn on_tick(&mut self, e: &TickEvent) {
        self.each(|s| s.on_tick(e));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.each(|s| s.on_phase_begin(e));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.each(|s| s.on_phase_end(e));
    }

    fn on_redraw(&mut self, e: &RedrawEvent) {
        self.each(|s| s.on_redraw(e));
    }

    fn on_event_dropped(&mut self, e: &EventDroppedEvent) {
        self.each(|s| s.on_event_dropped(e));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.each(|sink| sink.on_frame_summary(s));
    }
}

fn press(compositor: &mut Compositor<HeadlessBackend>, window: NativeWindowId, key: Key) {
    let backend = compositor.scene_mut().backend_mut();
    backend.push_event(BackendEvent::KeyDown { window, key });
    backend.push_event(BackendEvent::KeyUp { window, key });
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut sinks = Sinks {
        pretty: std::env::var_os("PARALLAX_PRETTY").map(|_| PrettyPrintSink::stderr()),
        stats: StatsSink::new(),
    };

    let mut compositor = Compositor::new(HeadlessBackend::new());
    let desc =
        WindowDesc::new("sprite field", WIDTH, HEIGHT).with_background(Color::rgb(16, 16, 32));
    let window = compositor.open_window(desc, Field::default())?;
    let native = compositor
        .scene()
        .native_window(window)
        .ok_or_else(|| anyhow::anyhow!("window did not initialize"))?;

    while compositor.has_open_windows() {
        match compositor.frame_index() {
            PAUSE_AT | RESUME_AT => press(&mut compositor, native, Key::Space),
            CLOSE_AT => press(&mut compositor, native, Key::Escape),
            _ => {}
        }
        compositor.tick_traced(&mut Tracer::new(&mut sinks))?;
    }

    let leaks = compositor.shutdown();
    if !leaks.is_empty() {
        log::warn!("{} objects outlived the run", leaks.len());
    }
    println!("{}", serde_json::to_string_pretty(&sinks.stats.to_json())?);
    Ok(())
}
