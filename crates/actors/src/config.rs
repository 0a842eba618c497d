use std::path::Path;

use glam::Vec3;
use nebula_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Errors from loading or validating a [`GameConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Every tunable number of a game session.
///
/// Loaded from YAML; any field left out keeps its default, so an empty
/// document is a valid config.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub engine: EngineConfig,
    pub player: PlayerConfig,
    pub weapon: WeaponConfig,
    pub enemy: EnemyConfig,
    pub enemy_weapon: EnemyWeaponConfig,
    pub spawner: SpawnerConfig,
    /// Seed for spawn positions.
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub speed: f32,
    /// Half width of the square play area on X and Z.
    pub bounds: f32,
    pub health: f32,
    pub lives: u32,
    pub mass: f32,
    pub half_extents: Vec3,
    /// Where the camera settles relative to the ship.
    pub camera_offset: Vec3,
    /// How far ahead of the ship (towards -Z) the camera looks.
    pub camera_look_ahead: f32,
    pub camera_follow_rate: f32,
    /// Bank angle in radians per unit of sideways speed.
    pub roll_per_speed: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 15.0,
            bounds: 25.0,
            health: 100.0,
            lives: 3,
            mass: 1.0,
            half_extents: Vec3::new(1.0, 1.0, 1.5),
            camera_offset: Vec3::new(0.0, 8.0, 12.0),
            camera_look_ahead: 5.0,
            camera_follow_rate: 2.0,
            roll_per_speed: 0.1,
        }
    }
}

/// The player's laser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    /// Seconds between shots.
    pub fire_rate: f32,
    pub projectile_speed: f32,
    pub projectile_radius: f32,
    pub projectile_mass: f32,
    pub projectile_lifetime: f32,
    /// Distance ahead of the ship where projectiles appear.
    pub muzzle_offset: f32,
    /// Health an enemy loses per hit.
    pub damage: f32,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            fire_rate: 0.2,
            projectile_speed: 50.0,
            projectile_radius: 0.1,
            projectile_mass: 0.1,
            projectile_lifetime: 3.0,
            muzzle_offset: 1.0,
            damage: 25.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub health: f32,
    pub speed: f32,
    /// Fraction of `speed` used on the Y axis.
    pub vertical_factor: f32,
    pub lifetime: f32,
    pub radius: f32,
    pub mass: f32,
    /// Enemies only shoot at a player closer than this.
    pub fire_range: f32,
    /// Seconds an enemy flashes white after a hit.
    pub flash_duration: f32,
    pub score: u64,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            health: 50.0,
            speed: 8.0,
            vertical_factor: 0.5,
            lifetime: 30.0,
            radius: 0.8,
            mass: 1.0,
            fire_range: 15.0,
            flash_duration: 0.1,
            score: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyWeaponConfig {
    /// Seconds between shots.
    pub fire_rate: f32,
    pub projectile_speed: f32,
    pub projectile_radius: f32,
    pub projectile_mass: f32,
    pub projectile_lifetime: f32,
    /// Health the player loses per hit.
    pub damage: f32,
}

impl Default for EnemyWeaponConfig {
    fn default() -> Self {
        Self {
            fire_rate: 1.5,
            projectile_speed: 25.0,
            projectile_radius: 0.08,
            projectile_mass: 0.05,
            projectile_lifetime: 5.0,
            damage: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Seconds between spawns.
    pub interval: f32,
    pub max_enemies: usize,
    /// Distance from the origin at which enemies appear.
    pub ring_radius: f32,
    /// Spawn heights are spread evenly over this range around y = 0.
    pub height_spread: f32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            interval: 2.0,
            max_enemies: 10,
            ring_radius: 30.0,
            height_spread: 10.0,
        }
    }
}

impl GameConfig {
    /// Read and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded game config");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("engine.fixed_step", self.engine.fixed_step),
            ("engine.max_frame_delta", self.engine.max_frame_delta),
            ("player.speed", self.player.speed),
            ("player.bounds", self.player.bounds),
            ("player.health", self.player.health),
            ("weapon.fire_rate", self.weapon.fire_rate),
            ("weapon.projectile_speed", self.weapon.projectile_speed),
            ("weapon.projectile_lifetime", self.weapon.projectile_lifetime),
            ("enemy.health", self.enemy.health),
            ("enemy.speed", self.enemy.speed),
            ("enemy.lifetime", self.enemy.lifetime),
            ("enemy_weapon.fire_rate", self.enemy_weapon.fire_rate),
            ("enemy_weapon.projectile_speed", self.enemy_weapon.projectile_speed),
            (
                "enemy_weapon.projectile_lifetime",
                self.enemy_weapon.projectile_lifetime,
            ),
            ("spawner.interval", self.spawner.interval),
            ("spawner.ring_radius", self.spawner.ring_radius),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !v.is_finite() || *v <= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{name} must be positive, got {value}"
            )));
        }
        if self.engine.max_substeps == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_substeps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = GameConfig::from_yaml("{}").unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.spawner.max_enemies, 10);
        assert_eq!(config.weapon.fire_rate, 0.2);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = GameConfig::from_yaml("spawner:\n  max_enemies: 3\nseed: 7\n").unwrap();
        assert_eq!(config.spawner.max_enemies, 3);
        assert_eq!(config.spawner.interval, 2.0);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn non_positive_speed_rejected() {
        let err = GameConfig::from_yaml("enemy:\n  speed: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("enemy.speed")));
    }

    #[test]
    fn zero_substeps_rejected() {
        let err = GameConfig::from_yaml("engine:\n  max_substeps: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_yaml_is_yaml_error() {
        let err = GameConfig::from_yaml("player: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn yaml_output_loads_back() {
        let mut config = GameConfig::default();
        config.player.speed = 20.0;
        let text = config.to_yaml().unwrap();
        assert_eq!(GameConfig::from_yaml(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = GameConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
