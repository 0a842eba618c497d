/// Platform key codes the game listens for, named after their physical
/// position (a `KeyW` is the W key on any layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    KeyW,
    KeyA,
    KeyS,
    KeyD,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Space,
    Escape,
    Enter,
}

/// A high-level action produced from raw input.
///
/// Actors consume actions, never raw key codes, so remapping keys does not
/// touch gameplay code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Move towards -Z.
    Forward,
    /// Move towards +Z.
    Back,
    /// Move towards -X.
    Left,
    /// Move towards +X.
    Right,
    Fire,
    TogglePause,
    Confirm,
}

impl Action {
    /// Default binding for a key, if it has one.
    pub fn for_key(key: Key) -> Option<Self> {
        match key {
            Key::KeyW | Key::ArrowUp => Some(Self::Forward),
            Key::KeyS | Key::ArrowDown => Some(Self::Back),
            Key::KeyA | Key::ArrowLeft => Some(Self::Left),
            Key::KeyD | Key::ArrowRight => Some(Self::Right),
            Key::Space => Some(Self::Fire),
            Key::Escape => Some(Self::TogglePause),
            Key::Enter => Some(Self::Confirm),
        }
    }

    /// Whether the action is continuous (held) rather than a one-shot.
    pub fn is_held(self) -> bool {
        matches!(self, Self::Forward | Self::Back | Self::Left | Self::Right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasd_and_arrows_share_movement() {
        assert_eq!(Action::for_key(Key::KeyW), Action::for_key(Key::ArrowUp));
        assert_eq!(Action::for_key(Key::KeyS), Action::for_key(Key::ArrowDown));
        assert_eq!(Action::for_key(Key::KeyA), Action::for_key(Key::ArrowLeft));
        assert_eq!(Action::for_key(Key::KeyD), Action::for_key(Key::ArrowRight));
    }

    #[test]
    fn space_fires_escape_pauses() {
        assert_eq!(Action::for_key(Key::Space), Some(Action::Fire));
        assert_eq!(Action::for_key(Key::Escape), Some(Action::TogglePause));
    }

    #[test]
    fn only_movement_is_held() {
        assert!(Action::Forward.is_held());
        assert!(!Action::Fire.is_held());
        assert!(!Action::TogglePause.is_held());
    }
}
