// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handing work back to the main thread.
//!
//! All scene mutation happens on the thread driving
//! [`Compositor::tick`](crate::Compositor::tick). Other threads post closures
//! to a [`MainThreadQueue`]; the tick drains it after input dispatch and
//! before the redraw pass.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use core::fmt;

use crate::scene::Scene;

type Job<B> = Box<dyn FnOnce(&mut Scene<B>) + Send>;

/// A `Send + Sync` queue of closures to run on the main thread.
///
/// Cloning is cheap (Arc bump); every clone feeds the same queue.
pub struct MainThreadQueue<B> {
    jobs: Arc<Mutex<VecDeque<Job<B>>>>,
}

impl<B> Clone for MainThreadQueue<B> {
    fn clone(&self) -> Self {
        Self {
            jobs: Arc::clone(&self.jobs),
        }
    }
}

impl<B> Default for MainThreadQueue<B> {
    fn default() -> Self {
        Self {
            jobs: Arc::new(Mutex::new(VecDeque::new())),
        }
    }
}

impl<B> fmt::Debug for MainThreadQueue<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainThreadQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl<B> MainThreadQueue<B> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `job` to run on the main thread during the next drain.
    pub fn post(&self, job: impl FnOnce(&mut Scene<B>) + Send + 'static) {
        self.lock().push_back(Box::new(job));
    }

    /// Number of jobs waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no job is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the jobs queued when the drain starts, oldest first.
    ///
    /// Each job is popped before it runs, with the lock released, so a job
    /// may post more work. That work runs on the next drain. Returns the
    /// number of jobs run.
    pub(crate) fn drain(&self, scene: &mut Scene<B>) -> usize {
        let count = self.len();
        let mut ran = 0;
        while ran < count {
            let Some(job) = self.lock().pop_front() else {
                break;
            };
            job(scene);
            ran += 1;
        }
        ran
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Job<B>>> {
        // A panicking job never holds the lock, so the data is intact.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
