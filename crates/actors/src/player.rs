use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};
use nebula_common::{ObjectId, ObjectKind};
use nebula_engine::{Behavior, EngineError, GameObject, Inert, UpdateContext, World};
use nebula_physics::{Collider, RigidBody};
use nebula_scene::{Mesh, Part, SceneNode, Trail, hex};

use crate::config::{GameConfig, PlayerConfig, WeaponConfig};
use crate::session::{SharedIds, SharedStats};

/// Fixed id of the player ship.
pub const PLAYER_ID: &str = "player";

/// Per-tick decay of the bank angle once the ship stops strafing.
const ROLL_DECAY: f32 = 0.9;

/// Engine trail: points kept, color, and where it leaves the hull.
const TRAIL_POINTS: usize = 50;
const TRAIL_COLOR: [f32; 4] = [0.0, 1.0, 1.0, 0.6];
const TRAIL_OFFSET: Vec3 = Vec3::new(0.0, 0.0, 2.0);

/// The player ship: WASD/arrow movement inside a square arena, a chase
/// camera and a laser.
pub struct Player {
    config: PlayerConfig,
    weapon: Weapon,
    /// Seconds until the weapon may fire again.
    cooldown: f32,
    roll: f32,
    enemy_damage: f32,
    stats: SharedStats,
}

impl Player {
    pub(crate) fn spawn(config: &GameConfig, stats: SharedStats, ids: SharedIds) -> GameObject {
        let player = Self {
            config: config.player.clone(),
            weapon: Weapon::new(config.weapon.clone(), ids, stats.clone()),
            cooldown: 0.0,
            roll: 0.0,
            enemy_damage: config.enemy_weapon.damage,
            stats,
        };
        let body = RigidBody::new(
            config.player.mass,
            Collider::Box {
                half_extents: config.player.half_extents,
            },
        );
        GameObject::new(PLAYER_ID, ObjectKind::Player, ship_visual(), player).with_body(body)
    }

    fn take_damage(&mut self, amount: f32) {
        let mut stats = self.stats.borrow_mut();
        stats.health = (stats.health - amount).max(0.0);
        tracing::debug!(amount, health = stats.health, "player hit");
    }
}

impl Behavior for Player {
    fn update(&mut self, ctx: &mut UpdateContext<'_>, dt: f32) {
        let velocity = ctx.input().movement() * self.config.speed;
        if velocity.x != 0.0 {
            self.roll = -velocity.x * self.config.roll_per_speed;
        } else {
            self.roll *= ROLL_DECAY;
        }

        let bounds = self.config.bounds;
        let roll = self.roll;
        let (position, rotation) = {
            let Some(mut body) = ctx.body_mut() else {
                return;
            };
            body.velocity = velocity;
            body.position.x = body.position.x.clamp(-bounds, bounds);
            body.position.z = body.position.z.clamp(-bounds, bounds);
            body.rotation = Quat::from_rotation_z(roll);
            (body.position, body.rotation)
        };
        if let Some(trail) = ctx.visual_mut().and_then(|node| node.trail.as_mut()) {
            trail.push(position + rotation * TRAIL_OFFSET);
        }

        let follow = dt * self.config.camera_follow_rate;
        let camera = ctx.camera_mut();
        camera.lerp_towards(position + self.config.camera_offset, follow);
        camera.look_at(position - Vec3::Z * self.config.camera_look_ahead);

        let hits = ctx
            .contacts()
            .iter()
            .filter(|(_, kind)| *kind == ObjectKind::EnemyProjectile)
            .count();
        for _ in 0..hits {
            self.take_damage(self.enemy_damage);
        }

        self.cooldown = (self.cooldown - dt).max(0.0);
        if ctx.input_mut().take_fire() && self.cooldown <= 0.0 {
            match self.weapon.fire(ctx, position, rotation) {
                Ok(_) => self.cooldown = self.weapon.config.fire_rate,
                Err(err) => tracing::warn!(%err, "weapon failed to fire"),
            }
        }
        self.weapon.update(ctx, dt);
    }
}

struct Shot {
    id: ObjectId,
    lifetime: f32,
}

/// The player's laser. Owns the projectiles it fired and retires them when
/// they expire or hit an enemy.
pub struct Weapon {
    config: WeaponConfig,
    ids: SharedIds,
    stats: SharedStats,
    projectiles: Vec<Shot>,
}

impl Weapon {
    fn new(config: WeaponConfig, ids: SharedIds, stats: SharedStats) -> Self {
        Self {
            config,
            ids,
            stats,
            projectiles: Vec::new(),
        }
    }

    /// Spawn a projectile just ahead of `origin`, flying along the ship's
    /// nose.
    pub fn fire(
        &mut self,
        world: &mut World,
        origin: Vec3,
        rotation: Quat,
    ) -> Result<ObjectId, EngineError> {
        let id = self.ids.borrow_mut().next("projectile");
        let cfg = &self.config;
        let body = RigidBody::new(
            cfg.projectile_mass,
            Collider::Sphere {
                radius: cfg.projectile_radius,
            },
        )
        .with_position(origin + Vec3::NEG_Z * cfg.muzzle_offset)
        .with_velocity(rotation * Vec3::NEG_Z * cfg.projectile_speed);
        let visual = SceneNode::new(vec![
            Part::new(Mesh::Sphere, hex(0x00ff00))
                .scaled(Vec3::splat(cfg.projectile_radius * 2.0))
                .glowing(hex(0x004400)),
        ]);

        world.add_game_object(
            GameObject::new(id.clone(), ObjectKind::PlayerProjectile, visual, Inert).with_body(body),
        )?;
        self.projectiles.push(Shot {
            id: id.clone(),
            lifetime: cfg.projectile_lifetime,
        });
        self.stats.borrow_mut().shots_fired += 1;
        Ok(id)
    }

    pub fn update(&mut self, world: &mut World, dt: f32) {
        self.projectiles.retain_mut(|shot| {
            shot.lifetime -= dt;
            if !world.contains(&shot.id) {
                return false;
            }
            let hit = world
                .contacts_of(&shot.id)
                .iter()
                .any(|(_, kind)| *kind == ObjectKind::Enemy);
            if shot.lifetime <= 0.0 || hit {
                world.remove_game_object(&shot.id);
                return false;
            }
            true
        });
    }
}

/// Cone fuselage along -Z, two flat wings, two glowing engines and a
/// cyan exhaust trail.
fn ship_visual() -> SceneNode {
    let nose_forward = Quat::from_rotation_x(-FRAC_PI_2);
    let wing = Part::new(Mesh::Cube, hex(0x357abd)).scaled(Vec3::new(2.5, 0.1, 1.0));
    let engine = Part::new(Mesh::Cylinder, hex(0x00ffff))
        .scaled(Vec3::new(0.5, 0.8, 0.5))
        .rotated(Quat::from_rotation_x(FRAC_PI_2))
        .glowing(hex(0x004444));
    SceneNode::new(vec![
        Part::new(Mesh::Cone, hex(0x4a90e2))
            .scaled(Vec3::new(1.0, 3.0, 1.0))
            .rotated(nose_forward),
        wing.at(Vec3::new(0.0, -0.5, 0.5)),
        wing.at(Vec3::new(0.0, 0.5, 0.5)),
        engine.at(Vec3::new(-0.8, 0.0, 1.5)),
        engine.at(Vec3::new(0.8, 0.0, 1.5)),
    ])
    .with_trail(Trail::new(TRAIL_POINTS, TRAIL_COLOR))
}
