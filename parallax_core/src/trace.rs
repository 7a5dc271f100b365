// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the tick loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! [`Compositor::tick_traced`](crate::Compositor::tick_traced) calls at each
//! stage. All method bodies default to no-ops, so implementing only the
//! events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps and counters during a
//! tick and produces a [`FrameSummary`] at the end. Summaries are built
//! regardless of the feature; `tick` returns one.

use std::time::{Duration, Instant};

use crate::backend::NativeWindowId;
use crate::id::RendererId;
use crate::renderer::RedrawStats;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a tick is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Tick notifications and backend event dispatch.
    Input,
    /// Draining the main-thread queue.
    Pending,
    /// Dirty-triggered redraw of every live window.
    Redraw,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a tick starts.
#[derive(Clone, Copy, Debug)]
pub struct TickEvent {
    /// Monotonic tick counter.
    pub frame_index: u64,
    /// Windows in the live registry.
    pub live_windows: usize,
}

/// Marks the beginning of a tick phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Time at the start of the phase.
    pub timestamp: Instant,
}

/// Marks the end of a tick phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Time at the end of the phase.
    pub timestamp: Instant,
}

/// Emitted after a renderer was redrawn.
#[derive(Clone, Copy, Debug)]
pub struct RedrawEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// The renderer.
    pub renderer: RendererId,
    /// What the pass drew.
    pub stats: RedrawStats,
}

/// Emitted when a backend event names a window that is not live.
#[derive(Clone, Copy, Debug)]
pub struct EventDroppedEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// The unknown native window.
    pub window: NativeWindowId,
}

/// Per-tick summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameSummary {
    /// Tick counter.
    pub frame_index: u64,
    /// Backend events polled.
    pub events: usize,
    /// Events dropped because their window was unknown.
    pub events_dropped: usize,
    /// Main-thread jobs run.
    pub jobs_run: usize,
    /// Renderers that redrew.
    pub renderers_redrawn: usize,
    /// Backend copies issued across all redraws.
    pub draw_calls: usize,
    /// Input phase duration (zero if not measured).
    pub input_time: Duration,
    /// Pending phase duration (zero if not measured).
    pub pending_time: Duration,
    /// Redraw phase duration (zero if not measured).
    pub redraw_time: Duration,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the tick loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a tick starts.
    fn on_tick(&mut self, e: &TickEvent) {
        _ = e;
    }

    /// Called at the beginning of a tick phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a tick phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after each renderer redraw.
    fn on_redraw(&mut self, e: &RedrawEvent) {
        _ = e;
    }

    /// Called when an event for an unknown window is dropped.
    fn on_event_dropped(&mut self, e: &EventDroppedEvent) {
        _ = e;
    }

    /// Called with the per-tick summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`TickEvent`].
    #[inline]
    pub fn tick(&mut self, e: &TickEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_tick(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RedrawEvent`].
    #[inline]
    pub fn redraw(&mut self, e: &RedrawEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_redraw(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`EventDroppedEvent`].
    #[inline]
    pub fn event_dropped(&mut self, e: &EventDroppedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_event_dropped(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps and counters during a tick and produces a
/// [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    summary: FrameSummary,
    phase_starts: [Option<Instant>; 3],
    phase_ends: [Option<Instant>; 3],
}

impl FrameSummaryBuilder {
    /// Starts building a summary for tick `frame_index`.
    #[must_use]
    pub fn new(frame_index: u64) -> Self {
        Self {
            summary: FrameSummary {
                frame_index,
                ..FrameSummary::default()
            },
            phase_starts: [None; 3],
            phase_ends: [None; 3],
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: Instant) {
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: Instant) {
        self.phase_ends[phase_index(phase)] = Some(t);
    }

    /// Counts one polled backend event.
    pub fn record_event(&mut self, dropped: bool) {
        self.summary.events += 1;
        if dropped {
            self.summary.events_dropped += 1;
        }
    }

    /// Adds drained main-thread jobs.
    pub fn record_jobs(&mut self, count: usize) {
        self.summary.jobs_run += count;
    }

    /// Adds one renderer redraw.
    pub fn record_redraw(&mut self, stats: &RedrawStats) {
        self.summary.renderers_redrawn += 1;
        self.summary.draw_calls += stats.draw_calls;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            input_time: self.phase_duration(PhaseKind::Input),
            pending_time: self.phase_duration(PhaseKind::Pending),
            redraw_time: self.phase_duration(PhaseKind::Redraw),
            ..self.summary
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> Duration {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Input => 0,
        PhaseKind::Pending => 1,
        PhaseKind::Redraw => 2,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_tick(&TickEvent {
            frame_index: 0,
            live_windows: 1,
        });
        sink.on_frame_summary(&FrameSummary::default());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.tick(&TickEvent {
            frame_index: 3,
            live_windows: 0,
        });
        tracer.event_dropped(&EventDroppedEvent {
            frame_index: 3,
            window: NativeWindowId(9),
        });
    }

    #[test]
    fn summary_builder_computes_durations_and_counts() {
        let t0 = Instant::now();
        let mut builder = FrameSummaryBuilder::new(42);
        builder.phase_begin(PhaseKind::Input, t0);
        builder.phase_end(PhaseKind::Input, t0 + Duration::from_micros(100));
        builder.phase_begin(PhaseKind::Redraw, t0 + Duration::from_micros(100));
        builder.phase_end(PhaseKind::Redraw, t0 + Duration::from_micros(600));
        builder.record_event(false);
        builder.record_event(true);
        builder.record_jobs(2);
        builder.record_redraw(&RedrawStats {
            viewports_drawn: 2,
            sprites_drawn: 3,
            draw_calls: 5,
        });

        let summary = builder.finish();
        assert_eq!(summary.frame_index, 42);
        assert_eq!(summary.input_time, Duration::from_micros(100));
        assert_eq!(summary.pending_time, Duration::ZERO, "phase never measured");
        assert_eq!(summary.redraw_time, Duration::from_micros(500));
        assert_eq!((summary.events, summary.events_dropped), (2, 1));
        assert_eq!(summary.jobs_run, 2);
        assert_eq!((summary.renderers_redrawn, summary.draw_calls), (1, 5));
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        struct RecordingSink {
            ticks: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_tick(&mut self, e: &TickEvent) {
                self.ticks.push(e.frame_index);
            }
        }

        let mut sink = RecordingSink { ticks: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.tick(&TickEvent {
            frame_index: 42,
            live_windows: 1,
        });
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.ticks, &[42]);
    }
}
