use glam::Vec3;
use nebula_common::SplitMix64;

use crate::node::{Color, hex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    Directional { position: Vec3 },
    Point { position: Vec3, range: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
}

/// Static surroundings: lights, star field, background haze.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    pub lights: Vec<Light>,
    pub stars: Vec<Vec3>,
    pub star_color: Color,
    pub background: Color,
}

impl Environment {
    pub const STAR_COUNT: usize = 10_000;
    pub const STAR_EXTENT: f32 = 1000.0;

    /// Deep-space lighting rig with a seeded star field.
    pub fn space(seed: u64) -> Self {
        let mut rng = SplitMix64::new(seed);
        let stars = (0..Self::STAR_COUNT)
            .map(|_| {
                Vec3::new(
                    rng.range(-Self::STAR_EXTENT, Self::STAR_EXTENT),
                    rng.range(-Self::STAR_EXTENT, Self::STAR_EXTENT),
                    rng.range(-Self::STAR_EXTENT, Self::STAR_EXTENT),
                )
            })
            .collect();

        Self {
            lights: vec![
                Light {
                    kind: LightKind::Ambient,
                    color: hex(0x404040),
                    intensity: 0.3,
                },
                Light {
                    kind: LightKind::Directional {
                        position: Vec3::new(50.0, 50.0, 50.0),
                    },
                    color: hex(0xffffff),
                    intensity: 1.0,
                },
                Light {
                    kind: LightKind::Point {
                        position: Vec3::new(-20.0, 10.0, -20.0),
                        range: 100.0,
                    },
                    color: hex(0x00ff88),
                    intensity: 0.5,
                },
                Light {
                    kind: LightKind::Point {
                        position: Vec3::new(20.0, -10.0, 20.0),
                        range: 100.0,
                    },
                    color: hex(0x8800ff),
                    intensity: 0.5,
                },
            ],
            stars,
            star_color: [1.0, 1.0, 1.0, 0.8],
            // Nebula haze over black.
            background: [0.03, 0.01, 0.08, 1.0],
        }
    }

    /// Direction towards the first directional light, if any.
    pub fn sun_direction(&self) -> Option<Vec3> {
        self.lights.iter().find_map(|l| match l.kind {
            LightKind::Directional { position } => Some(position.normalize_or_zero()),
            _ => None,
        })
    }

    /// Summed ambient contribution.
    pub fn ambient(&self) -> f32 {
        self.lights
            .iter()
            .filter(|l| l.kind == LightKind::Ambient)
            .map(|l| l.intensity)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_field_is_seeded_and_bounded() {
        let a = Environment::space(3);
        let b = Environment::space(3);
        assert_eq!(a.stars.len(), Environment::STAR_COUNT);
        assert_eq!(a.stars, b.stars);
        assert!(
            a.stars
                .iter()
                .all(|s| s.abs().max_element() <= Environment::STAR_EXTENT)
        );
    }

    #[test]
    fn space_rig_has_sun_and_ambient() {
        let env = Environment::space(0);
        assert!(env.sun_direction().is_some());
        assert!((env.ambient() - 0.3).abs() < 1e-6);
    }
}
