// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational slot storage for scene objects.

use core::marker::PhantomData;

use crate::id::Handle;

/// Slot storage addressed by generational handles.
///
/// Removed slots are recycled via a free list; each removal bumps the slot's
/// generation so old handles immediately fail validation.
pub(crate) struct Arena<H, T> {
    values: Vec<Option<T>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    live: usize,
    _handle: PhantomData<H>,
}

impl<H, T: core::fmt::Debug> core::fmt::Debug for Arena<H, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arena")
            .field("live", &self.live)
            .field("slots", &self.values.len())
            .finish_non_exhaustive()
    }
}

impl<H: Handle, T> Default for Arena<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle, T> Arena<H, T> {
    pub(crate) const fn new() -> Self {
        Self {
            values: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            live: 0,
            _handle: PhantomData,
        }
    }

    /// Stores `value` and returns its handle.
    pub(crate) fn insert(&mut self, value: T) -> H {
        self.live += 1;
        if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; its generation was bumped on removal.
            self.values[idx as usize] = Some(value);
            H::from_raw(idx, self.generation[idx as usize])
        } else {
            let idx = u32::try_from(self.values.len()).expect("arena slot count exceeds u32");
            self.values.push(Some(value));
            self.generation.push(0);
            H::from_raw(idx, 0)
        }
    }

    /// Removes the value behind `id`, returning `None` for stale handles.
    pub(crate) fn remove(&mut self, id: H) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        let idx = id.idx() as usize;
        self.generation[idx] = self.generation[idx].wrapping_add(1);
        self.free_list.push(id.idx());
        self.live -= 1;
        self.values[idx].take()
    }

    /// Returns whether `id` refers to a live value.
    pub(crate) fn contains(&self, id: H) -> bool {
        let idx = id.idx() as usize;
        idx < self.values.len()
            && self.generation[idx] == id.generation()
            && self.values[idx].is_some()
    }

    pub(crate) fn get(&self, id: H) -> Option<&T> {
        if self.contains(id) {
            self.values[id.idx() as usize].as_ref()
        } else {
            None
        }
    }

    pub(crate) fn get_mut(&mut self, id: H) -> Option<&mut T> {
        if self.contains(id) {
            self.values[id.idx() as usize].as_mut()
        } else {
            None
        }
    }

    /// Like [`get`](Self::get), but panics on a stale handle.
    #[track_caller]
    pub(crate) fn expect(&self, id: H) -> &T {
        match self.get(id) {
            Some(v) => v,
            None => self.stale(id),
        }
    }

    /// Like [`get_mut`](Self::get_mut), but panics on a stale handle.
    #[track_caller]
    pub(crate) fn expect_mut(&mut self, id: H) -> &mut T {
        if !self.contains(id) {
            self.stale(id);
        }
        self.values[id.idx() as usize]
            .as_mut()
            .expect("slot checked live above")
    }

    /// Number of live values.
    pub(crate) const fn len(&self) -> usize {
        self.live
    }

    /// Iterates live values in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.values.iter().enumerate().filter_map(|(idx, v)| {
            let idx = u32::try_from(idx).ok()?;
            v.as_ref()
                .map(|v| (H::from_raw(idx, self.generation[idx as usize]), v))
        })
    }

    /// Handles of all live values in slot order.
    pub(crate) fn ids(&self) -> Vec<H> {
        self.iter().map(|(id, _)| id).collect()
    }

    #[track_caller]
    fn stale(&self, id: H) -> ! {
        let idx = id.idx() as usize;
        panic!(
            "stale {}: {id:?} (current gen: {})",
            H::KIND,
            if idx < self.generation.len() {
                self.generation[idx]
            } else {
                u32::MAX
            }
        );
    }
}
