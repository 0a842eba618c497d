use std::collections::HashMap;
use std::fmt;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Unique identifier for a game object registered with the engine.
///
/// Ids are plain strings so fixed, well-known objects (the player) can be
/// looked up by name. Dynamic objects get their ids from an [`IdAllocator`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Issues `"<prefix>-<n>"` ids from a monotonic counter per prefix.
///
/// Counters never rewind, so an id is never reissued for the lifetime of
/// the allocator, even after the object holding it has been removed.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    counters: HashMap<String, u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, prefix: &str) -> ObjectId {
        let counter = self.counters.entry(prefix.to_owned()).or_insert(0);
        *counter += 1;
        ObjectId(format!("{prefix}-{counter}"))
    }
}

/// The fixed set of object categories the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Player,
    Enemy,
    PlayerProjectile,
    EnemyProjectile,
    /// Non-visual driver objects such as the enemy spawner.
    Controller,
}

impl ObjectKind {
    pub fn is_projectile(self) -> bool {
        matches!(self, Self::PlayerProjectile | Self::EnemyProjectile)
    }
}

/// Spatial transform: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_ids_are_unique_per_prefix() {
        let mut ids = IdAllocator::new();
        let a = ids.next("projectile");
        let b = ids.next("projectile");
        let c = ids.next("enemy");
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "projectile-1");
        assert_eq!(b.as_str(), "projectile-2");
        assert_eq!(c.as_str(), "enemy-1");
    }

    #[test]
    fn object_id_display_matches_inner() {
        let id = ObjectId::new("player");
        assert_eq!(id.to_string(), "player");
        assert_eq!(ObjectId::from("player"), id);
    }

    #[test]
    fn transform_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn projectile_kinds() {
        assert!(ObjectKind::PlayerProjectile.is_projectile());
        assert!(ObjectKind::EnemyProjectile.is_projectile());
        assert!(!ObjectKind::Enemy.is_projectile());
    }
}
