// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in microseconds since the sink was created.

use std::io::Write;
use std::time::{Duration, Instant};

use parallax_core::trace::{
    EventDroppedEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind, RedrawEvent,
    TickEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    origin: Instant,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            origin: Instant::now(),
        }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn since_origin_us(&self, t: Instant) -> f64 {
        micros(t.saturating_duration_since(self.origin))
    }
}

fn micros(d: Duration) -> f64 {
    d.as_secs_f64() * 1e6
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Input => "input",
        PhaseKind::Pending => "pending",
        PhaseKind::Redraw => "redraw",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_tick(&mut self, e: &TickEvent) {
        let _ = writeln!(
            self.writer,
            "[tick] frame={} windows={}",
            e.frame_index, e.live_windows,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            phase_name(e.phase),
            self.since_origin_us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs",
            e.frame_index,
            phase_name(e.phase),
            self.since_origin_us(e.timestamp),
        );
    }

    fn on_redraw(&mut self, e: &RedrawEvent) {
        let _ = writeln!(
            self.writer,
            "[redraw] frame={} {:?} viewports={} sprites={} copies={}",
            e.frame_index,
            e.renderer,
            e.stats.viewports_drawn,
            e.stats.sprites_drawn,
            e.stats.draw_calls,
        );
    }

    fn on_event_dropped(&mut self, e: &EventDroppedEvent) {
        let _ = writeln!(
            self.writer,
            "[dropped] frame={} native={}",
            e.frame_index, e.window.0,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] frame={} events={} dropped={} jobs={} redraws={} copies={} \
             input={:.1}µs pending={:.1}µs redraw={:.1}µs",
            s.frame_index,
            s.events,
            s.events_dropped,
            s.jobs_run,
            s.renderers_redrawn,
            s.draw_calls,
            micros(s.input_time),
            micros(s.pending_time),
            micros(s.redraw_time),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parallax_core::backend::NativeWindowId;

    #[test]
    fn pretty_print_tick() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_tick(&TickEvent {
            frame_index: 1,
            live_windows: 2,
        });
        let output = String::from_utf8(sink.into_writer()).unwrap();
        assert!(output.contains("[tick]"), "got: {output}");
        assert!(output.contains("frame=1"), "got: {output}");
        assert!(output.contains("windows=2"), "got: {output}");
    }

    #[test]
    fn pretty_print_dropped_and_summary() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_event_dropped(&EventDroppedEvent {
            frame_index: 4,
            window: NativeWindowId(7),
        });
        sink.on_frame_summary(&FrameSummary {
            frame_index: 4,
            events: 3,
            events_dropped: 1,
            ..FrameSummary::default()
        });
        let output = String::from_utf8(sink.into_writer()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2, "got: {output}");
        assert!(lines[0].starts_with("[dropped] frame=4 native=7"), "got: {output}");
        assert!(lines[1].contains("events=3 dropped=1"), "got: {output}");
    }
}
