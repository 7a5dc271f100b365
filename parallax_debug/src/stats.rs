// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Aggregate statistics over many ticks.
//!
//! [`StatsSink`] folds every [`FrameSummary`] and [`RedrawEvent`] into
//! running totals and can export them as JSON with
//! [`to_json`](StatsSink::to_json).

use std::collections::BTreeMap;
use std::time::Duration;

use parallax_core::trace::{FrameSummary, RedrawEvent, TraceSink};
use serde_json::{Value, json};

/// Totals and peaks of one tick phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseStats {
    /// Sum over all ticks.
    pub total: Duration,
    /// Longest single tick.
    pub max: Duration,
}

impl PhaseStats {
    fn record(&mut self, d: Duration) {
        self.total += d;
        self.max = self.max.max(d);
    }

    /// Mean duration over `frames` ticks.
    #[must_use]
    pub fn mean(&self, frames: u64) -> Duration {
        match u32::try_from(frames) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => self.total / u32::MAX,
        }
    }
}

/// A [`TraceSink`] collecting running totals.
#[derive(Clone, Debug, Default)]
pub struct StatsSink {
    /// Ticks summarized.
    pub frames: u64,
    /// Ticks in which at least one renderer redrew.
    pub frames_drawn: u64,
    /// Backend events polled.
    pub events: u64,
    /// Events dropped for unknown windows.
    pub events_dropped: u64,
    /// Main-thread jobs run.
    pub jobs_run: u64,
    /// Backend copies issued.
    pub draw_calls: u64,
    /// Input phase timings.
    pub input: PhaseStats,
    /// Pending phase timings.
    pub pending: PhaseStats,
    /// Redraw phase timings.
    pub redraw: PhaseStats,
    /// Redraws per renderer, keyed by the renderer's debug name.
    pub redraws: BTreeMap<String, u64>,
}

impl StatsSink {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports the totals as a JSON object. Durations are in microseconds.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let phase = |p: &PhaseStats| {
            json!({
                "total_us": micros(p.total),
                "max_us": micros(p.max),
                "mean_us": micros(p.mean(self.frames)),
            })
        };
        json!({
            "frames": self.frames,
            "frames_drawn": self.frames_drawn,
            "events": self.events,
            "events_dropped": self.events_dropped,
            "jobs_run": self.jobs_run,
            "draw_calls": self.draw_calls,
            "phases": {
                "input": phase(&self.input),
                "pending": phase(&self.pending),
                "redraw": phase(&self.redraw),
            },
            "redraws": self.redraws,
        })
    }
}

fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

fn widen(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl TraceSink for StatsSink {
    fn on_redraw(&mut self, e: &RedrawEvent) {
        *self.redraws.entry(format!("{:?}", e.renderer)).or_default() += 1;
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.frames += 1;
        if s.renderers_redrawn > 0 {
            self.frames_drawn += 1;
        }
        self.events += widen(s.events);
        self.events_dropped += widen(s.events_dropped);
        self.jobs_run += widen(s.jobs_run);
        self.draw_calls += widen(s.draw_calls);
        self.input.record(s.input_time);
        self.pending.record(s.pending_time);
        self.redraw.record(s.redraw_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parallax_core::backend::{BackendEvent, NativeWindowId};
    use parallax_core::testing::RecordingBackend;
    use parallax_core::trace::Tracer;
    use parallax_core::{Compositor, WindowDesc, WindowHandler};

    struct Idle;

    impl WindowHandler<RecordingBackend> for Idle {}

    #[test]
    fn totals_follow_the_tick_loop() {
        let mut compositor = Compositor::new(RecordingBackend::new());
        compositor
            .open_window(WindowDesc::new("stats", 16, 16), Idle)
            .unwrap();
        compositor
            .scene_mut()
            .backend_mut()
            .push_event(BackendEvent::FocusGained {
                window: NativeWindowId(99),
            });
        compositor.queue().post(|_| {});

        let mut stats = StatsSink::new();
        for _ in 0..3 {
            compositor.tick_traced(&mut Tracer::new(&mut stats)).unwrap();
        }

        assert_eq!(stats.frames, 3);
        assert_eq!(stats.frames_drawn, 1, "only the first tick draws");
        assert_eq!((stats.events, stats.events_dropped), (1, 1));
        assert_eq!(stats.jobs_run, 1);
        assert_eq!(stats.redraws.values().sum::<u64>(), 1);
        assert!(stats.redraw.max >= stats.redraw.mean(stats.frames));

        let json = stats.to_json();
        assert_eq!(json["frames"], 3);
        assert_eq!(json["events_dropped"], 1);
        assert!(json["phases"]["redraw"]["total_us"].is_u64());
    }

    #[test]
    fn mean_of_nothing_is_zero() {
        assert_eq!(PhaseStats::default().mean(0), Duration::ZERO);
    }
}
