//! Gameplay actors built on the engine boundary: the player ship and its
//! weapon, the enemy spawner, enemies and their projectiles.
//!
//! Actors only touch the world through registry operations, the camera,
//! input and contact queries. Tunable numbers come from [`GameConfig`].
//!
//! # Invariants
//! - Ids come from one allocator per session and are never reused.
//! - The spawner never keeps more than `spawner.max_enemies` enemies alive.
//! - A projectile is removed exactly once: by its owner or by itself.

mod config;
mod enemy;
mod player;
mod session;

pub use config::{
    ConfigError, EnemyConfig, EnemyWeaponConfig, GameConfig, PlayerConfig, SpawnerConfig,
    WeaponConfig,
};
pub use enemy::{EnemyProjectile, EnemySpawner, EnemyState};
pub use player::{PLAYER_ID, Player, Weapon};
pub use session::{SPAWNER_ID, Session, SessionStats};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
