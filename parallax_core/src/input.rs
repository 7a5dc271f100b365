// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyboard and mouse state with edge detection.
//!
//! [`InputState`] keeps two generations of state: the set of keys (and mouse
//! buttons) down right now, and the set that was down when the current tick
//! began. Queries compare the two:
//!
//! | Query | Meaning |
//! |---|---|
//! | [`is_pressed`](InputState::is_pressed) | down now (level-triggered) |
//! | [`is_triggered`](InputState::is_triggered) | down now, up at tick start |
//! | [`is_released`](InputState::is_released) | up now, down at tick start |
//!
//! A key that goes down during tick N and stays down therefore reports
//! `triggered` only during (and right after) tick N, and `pressed` on every
//! tick until it is released.

use std::collections::HashSet;

use crate::geometry::Point;

/// A physical key, or a logical key covering both left and right variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[expect(missing_docs, reason = "key names are self-describing")]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,

    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,

    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    Up,
    Down,
    Left,
    Right,

    Enter,
    Escape,
    Backspace,
    Delete,
    Tab,
    Space,

    Insert,
    Home,
    End,
    PageUp,
    PageDown,

    LeftCtrl,
    RightCtrl,
    LeftShift,
    RightShift,
    LeftAlt,
    RightAlt,

    /// Either Ctrl key. Never reported by a backend.
    Ctrl,
    /// Either Shift key. Never reported by a backend.
    Shift,
    /// Either Alt key. Never reported by a backend.
    Alt,
    /// A platform scancode with no named variant.
    Other(u32),
}

impl Key {
    /// Returns the physical keys a query for `self` is satisfied by.
    #[must_use]
    pub const fn physical(self) -> Physical {
        match self {
            Self::Ctrl => Physical::Pair(Self::LeftCtrl, Self::RightCtrl),
            Self::Shift => Physical::Pair(Self::LeftShift, Self::RightShift),
            Self::Alt => Physical::Pair(Self::LeftAlt, Self::RightAlt),
            key => Physical::One(key),
        }
    }

    /// Returns `true` for the logical `Ctrl`, `Shift` and `Alt` keys.
    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::Ctrl | Self::Shift | Self::Alt)
    }
}

/// The physical keys backing a [`Key`] query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Physical {
    /// A single physical key.
    One(Key),
    /// Left and right variants of a modifier.
    Pair(Key, Key),
}

impl Physical {
    fn any(self, mut f: impl FnMut(Key) -> bool) -> bool {
        match self {
            Self::One(k) => f(k),
            Self::Pair(l, r) => f(l) || f(r),
        }
    }
}

/// A mouse button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Wheel button.
    Middle,
    /// Secondary button.
    Right,
}

/// Down state of the three mouse buttons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MouseButtons {
    /// Left button down.
    pub left: bool,
    /// Middle button down.
    pub middle: bool,
    /// Right button down.
    pub right: bool,
}

impl MouseButtons {
    /// Returns `true` if any button is down.
    #[must_use]
    pub const fn any(self) -> bool {
        self.left || self.middle || self.right
    }

    /// Returns whether `button` is down.
    #[must_use]
    pub const fn get(self, button: MouseButton) -> bool {
        match button {
            MouseButton::Left => self.left,
            MouseButton::Middle => self.middle,
            MouseButton::Right => self.right,
        }
    }

    fn set(&mut self, button: MouseButton, down: bool) {
        match button {
            MouseButton::Left => self.left = down,
            MouseButton::Middle => self.middle = down,
            MouseButton::Right => self.right = down,
        }
    }
}

/// A text-input notification.
///
/// Editing keys are reported as flags rather than control characters; Enter
/// is reported as a `"\n"` text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextInput {
    /// Printable text (or `"\n"` for Enter).
    pub text: String,
    /// Backspace was pressed.
    pub backspace: bool,
    /// Delete was pressed.
    pub delete: bool,
    /// Tab was pressed.
    pub tab: bool,
}

impl TextInput {
    /// Synthesizes the text input produced by an editing key, if any.
    #[must_use]
    pub fn from_key(key: Key) -> Option<Self> {
        let mut input = Self::default();
        match key {
            Key::Enter => input.text.push('\n'),
            Key::Backspace => input.backspace = true,
            Key::Delete => input.delete = true,
            Key::Tab => input.tab = true,
            _ => return None,
        }
        Some(input)
    }

    /// Decodes a raw platform text buffer.
    ///
    /// The buffer is read up to the first NUL byte, decoded as UTF-8 (invalid
    /// sequences become U+FFFD), and stripped of control characters.
    #[must_use]
    pub fn from_raw(raw: &[u8]) -> Self {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let text = String::from_utf8_lossy(&raw[..end])
            .chars()
            .filter(|c| !c.is_control())
            .collect();
        Self {
            text,
            ..Self::default()
        }
    }

    /// Returns `true` if there is nothing to report.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && !self.backspace && !self.delete && !self.tab
    }
}

/// Global keyboard and mouse state.
#[derive(Clone, Debug, Default)]
pub struct InputState {
    keys: HashSet<Key>,
    previous_keys: HashSet<Key>,
    buttons: MouseButtons,
    previous_buttons: MouseButtons,
    mouse: Point,
    committed_mouse: Point,
    wheel: Point,
}

impl InputState {
    /// Creates an empty state with nothing held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Queries --

    /// Returns whether `key` is down.
    #[must_use]
    pub fn is_pressed(&self, key: Key) -> bool {
        key.physical().any(|k| self.keys.contains(&k))
    }

    /// Returns whether `key` went down since the current tick began.
    #[must_use]
    pub fn is_triggered(&self, key: Key) -> bool {
        key.physical()
            .any(|k| self.keys.contains(&k) && !self.previous_keys.contains(&k))
    }

    /// Returns whether `key` went up since the current tick began.
    #[must_use]
    pub fn is_released(&self, key: Key) -> bool {
        key.physical()
            .any(|k| !self.keys.contains(&k) && self.previous_keys.contains(&k))
    }

    /// Returns the current pointer position in window coordinates.
    #[must_use]
    pub const fn mouse_position(&self) -> Point {
        self.mouse
    }

    /// Returns the accumulated wheel delta of the current tick.
    #[must_use]
    pub const fn wheel(&self) -> Point {
        self.wheel
    }

    /// Returns the current button state.
    #[must_use]
    pub const fn buttons(&self) -> MouseButtons {
        self.buttons
    }

    /// Returns the button state at the start of the current tick.
    #[must_use]
    pub const fn previous_buttons(&self) -> MouseButtons {
        self.previous_buttons
    }

    /// Returns whether `button` is down.
    #[must_use]
    pub const fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons.get(button)
    }

    /// Returns whether `button` went down since the current tick began.
    #[must_use]
    pub const fn is_button_triggered(&self, button: MouseButton) -> bool {
        self.buttons.get(button) && !self.previous_buttons.get(button)
    }

    // -- Tick protocol (driven by the compositor) --

    /// Snapshots the current state as the edge-detection baseline.
    pub(crate) fn begin_tick(&mut self) {
        self.previous_keys.clone_from(&self.keys);
        self.previous_buttons = self.buttons;
        self.wheel = Point::ZERO;
    }

    /// Commits the pointer position used for move detection.
    pub(crate) fn end_tick(&mut self) {
        self.committed_mouse = self.mouse;
    }

    /// Records a key going down. Returns `false` for key repeats.
    pub(crate) fn key_down(&mut self, key: Key) -> bool {
        self.keys.insert(key)
    }

    /// Records a key going up. Returns `false` if it was not down.
    pub(crate) fn key_up(&mut self, key: Key) -> bool {
        self.keys.remove(&key)
    }

    /// Records a button transition.
    pub(crate) fn set_button(&mut self, button: MouseButton, down: bool, position: Point) {
        self.buttons.set(button, down);
        self.mouse = position;
    }

    /// Records pointer motion. Returns `true` if the position differs from
    /// the last recorded one, which may be from earlier in the same tick.
    pub(crate) fn move_mouse(&mut self, position: Point) -> bool {
        let changed = position != self.mouse;
        self.mouse = position;
        changed
    }

    /// Accumulates a wheel delta.
    pub(crate) fn scroll(&mut self, delta: Point) {
        self.wheel.x += delta.x;
        self.wheel.y += delta.y;
    }

    /// Pointer position at the end of the previous tick. Move detection does
    /// not use it; it is the baseline for per-tick pointer deltas.
    #[must_use]
    pub const fn committed_mouse_position(&self) -> Point {
        self.committed_mouse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_key_triggers_once_and_presses_every_tick() {
        let mut input = InputState::new();

        // Tick N: key goes down.
        input.begin_tick();
        input.key_down(Key::Z);
        assert!(input.is_triggered(Key::Z));
        assert!(input.is_pressed(Key::Z));
        input.end_tick();
        assert!(input.is_triggered(Key::Z), "still triggered between ticks");

        // Tick N+1: key stays down.
        input.begin_tick();
        assert!(!input.is_triggered(Key::Z));
        assert!(input.is_pressed(Key::Z));
        input.end_tick();

        // Tick N+2: key goes up.
        input.begin_tick();
        input.key_up(Key::Z);
        assert!(!input.is_pressed(Key::Z));
        assert!(input.is_released(Key::Z));
    }

    #[test]
    fn logical_ctrl_matches_either_side() {
        let mut input = InputState::new();
        input.begin_tick();
        assert!(!input.is_pressed(Key::Ctrl));
        input.key_down(Key::RightCtrl);
        assert!(input.is_pressed(Key::Ctrl));
        assert!(input.is_triggered(Key::Ctrl));
        assert!(!input.is_pressed(Key::LeftCtrl));

        input.begin_tick();
        input.key_down(Key::LeftCtrl);
        input.key_up(Key::RightCtrl);
        assert!(input.is_pressed(Key::Ctrl));
        assert!(input.is_triggered(Key::Ctrl), "left side went down this tick");
        assert!(input.is_released(Key::Ctrl), "right side went up this tick");
    }

    #[test]
    fn key_repeat_is_not_a_new_transition() {
        let mut input = InputState::new();
        assert!(input.key_down(Key::A));
        assert!(!input.key_down(Key::A));
        assert!(input.key_up(Key::A));
        assert!(!input.key_up(Key::A));
    }

    #[test]
    fn button_edges() {
        let mut input = InputState::new();
        input.begin_tick();
        input.set_button(MouseButton::Left, true, Point::new(3, 4));
        assert!(input.is_button_triggered(MouseButton::Left));
        assert_eq!(input.mouse_position(), Point::new(3, 4));
        input.begin_tick();
        assert!(input.is_button_down(MouseButton::Left));
        assert!(!input.is_button_triggered(MouseButton::Left));
        assert!(input.previous_buttons().left);
    }

    #[test]
    fn mouse_move_reports_only_changes() {
        let mut input = InputState::new();
        assert!(input.move_mouse(Point::new(1, 1)));
        assert!(!input.move_mouse(Point::new(1, 1)));
    }

    #[test]
    fn mouse_moves_compare_within_the_tick_and_commit_at_its_end() {
        let mut input = InputState::new();
        input.begin_tick();
        assert!(input.move_mouse(Point::new(3, 3)));
        assert!(input.move_mouse(Point::new(0, 0)), "back to the committed spot still moves");
        assert!(!input.move_mouse(Point::new(0, 0)));
        assert_eq!(input.committed_mouse_position(), Point::ZERO, "not yet committed");
        input.move_mouse(Point::new(6, 2));
        input.end_tick();
        assert_eq!(input.committed_mouse_position(), Point::new(6, 2));
    }

    #[test]
    fn text_input_synthesis() {
        assert_eq!(TextInput::from_key(Key::Enter).map(|t| t.text), Some("\n".into()));
        assert!(TextInput::from_key(Key::Backspace).is_some_and(|t| t.backspace));
        assert!(TextInput::from_key(Key::Delete).is_some_and(|t| t.delete));
        assert!(TextInput::from_key(Key::Tab).is_some_and(|t| t.tab));
        assert!(TextInput::from_key(Key::A).is_none());
    }

    #[test]
    fn raw_text_stops_at_nul_and_drops_controls() {
        let mut raw = b"h\x07\xC3\xA9".to_vec();
        raw.extend_from_slice(&[0, b'x', b'y']);
        assert_eq!(TextInput::from_raw(&raw).text, "h\u{e9}");
        assert!(TextInput::from_raw(&[0; 8]).is_empty());
    }
}
