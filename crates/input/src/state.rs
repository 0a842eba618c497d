use std::collections::HashSet;

use glam::{Vec2, Vec3};

use crate::action::{Action, Key};

/// Current input, fed by the host and read by actors each tick.
///
/// Held actions stay active until their key is released. One-shot fire
/// requests queue up until an actor takes them.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    keys: HashSet<Key>,
    held: HashSet<Action>,
    fire_requests: u32,
    /// Pointer in normalized device coordinates, `[-1, 1]` on both axes, +Y up.
    pointer: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press. Returns the bound action, if any.
    pub fn key_down(&mut self, key: Key) -> Option<Action> {
        self.keys.insert(key);
        let action = Action::for_key(key)?;
        if action.is_held() {
            self.held.insert(action);
        } else if action == Action::Fire {
            self.fire_requests += 1;
        }
        Some(action)
    }

    pub fn key_up(&mut self, key: Key) {
        self.keys.remove(&key);
        let Some(action) = Action::for_key(key) else {
            return;
        };
        // Another key bound to the same action may still be down.
        let still_held = self
            .keys
            .iter()
            .any(|k| Action::for_key(*k) == Some(action));
        if !still_held {
            self.held.remove(&action);
        }
    }

    /// Record pointer movement in window pixels.
    pub fn pointer_moved(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.pointer = Vec2::new((x / width) * 2.0 - 1.0, -(y / height) * 2.0 + 1.0);
    }

    pub fn click(&mut self) {
        self.fire_requests += 1;
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    /// Movement direction on the XZ plane from held actions.
    ///
    /// Components are -1, 0 or 1; opposite actions cancel out.
    pub fn movement(&self) -> Vec3 {
        let axis = |neg: Action, pos: Action| {
            (self.is_held(pos) as i8 - self.is_held(neg) as i8) as f32
        };
        Vec3::new(
            axis(Action::Left, Action::Right),
            0.0,
            axis(Action::Forward, Action::Back),
        )
    }

    /// Consume all pending fire requests. True if there was at least one.
    pub fn take_fire(&mut self) -> bool {
        let requested = self.fire_requests > 0;
        self.fire_requests = 0;
        requested
    }

    /// Forget everything: keys, held actions, queued requests.
    pub fn clear(&mut self) {
        if !self.keys.is_empty() {
            tracing::debug!(keys = self.keys.len(), "clearing held input");
        }
        *self = Self::default();
    }
}
