// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and statistics for parallax diagnostics.
//!
//! This crate provides [`TraceSink`](parallax_core::trace::TraceSink)
//! implementations for development:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`stats::StatsSink`]: running totals across ticks, exportable as JSON.

pub mod pretty;
pub mod stats;
