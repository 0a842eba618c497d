use std::cell::RefCell;
use std::f32::consts::{FRAC_PI_2, TAU};
use std::rc::Rc;

use glam::{Quat, Vec3};
use nebula_common::{ObjectId, ObjectKind, SplitMix64};
use nebula_engine::{Behavior, EngineError, GameObject, UpdateContext, World};
use nebula_physics::{Collider, RigidBody};
use nebula_scene::{Color, Mesh, Part, SceneNode, hex};

use crate::config::{EnemyConfig, EnemyWeaponConfig, GameConfig, SpawnerConfig};
use crate::player::PLAYER_ID;
use crate::session::{SPAWNER_ID, SharedIds, SharedStats};

const FLASH: Color = [1.0, 1.0, 1.0, 1.0];

/// Health and remaining lifetime of one enemy, shared between the enemy's
/// behaviour and the spawner that reaps it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyState {
    pub health: f32,
    pub lifetime: f32,
}

impl EnemyState {
    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }

    pub fn should_remove(&self) -> bool {
        self.is_destroyed() || self.lifetime <= 0.0
    }
}

struct Tracked {
    id: ObjectId,
    state: Rc<RefCell<EnemyState>>,
}

/// Spawns enemies on a ring around the arena and removes the ones that
/// were destroyed or outlived their lifetime.
pub struct EnemySpawner {
    spawner: SpawnerConfig,
    enemy: EnemyConfig,
    enemy_weapon: EnemyWeaponConfig,
    player_damage: f32,
    rng: SplitMix64,
    ids: SharedIds,
    stats: SharedStats,
    timer: f32,
    enemies: Vec<Tracked>,
}

impl EnemySpawner {
    pub(crate) fn spawn(config: &GameConfig, stats: SharedStats, ids: SharedIds) -> GameObject {
        let spawner = Self {
            spawner: config.spawner.clone(),
            enemy: config.enemy.clone(),
            enemy_weapon: config.enemy_weapon.clone(),
            player_damage: config.weapon.damage,
            rng: SplitMix64::new(config.seed),
            ids,
            stats,
            timer: 0.0,
            enemies: Vec::new(),
        };
        GameObject::new(SPAWNER_ID, ObjectKind::Controller, SceneNode::empty(), spawner)
    }

    /// A random point on the spawn ring.
    fn spawn_point(&mut self) -> Vec3 {
        let angle = self.rng.next_f32() * TAU;
        let height = (self.rng.next_f32() - 0.5) * self.spawner.height_spread;
        let r = self.spawner.ring_radius;
        Vec3::new(angle.cos() * r, height, angle.sin() * r)
    }

    fn spawn_enemy(&mut self, world: &mut World) -> Result<(), EngineError> {
        let position = self.spawn_point();
        let id = self.ids.borrow_mut().next("enemy");
        let state = Rc::new(RefCell::new(EnemyState {
            health: self.enemy.health,
            lifetime: self.enemy.lifetime,
        }));
        let enemy = Enemy {
            state: state.clone(),
            config: self.enemy.clone(),
            weapon: self.enemy_weapon.clone(),
            damage_per_hit: self.player_damage,
            ids: self.ids.clone(),
            target: Vec3::ZERO,
            since_shot: self.enemy_weapon.fire_rate,
            flash: 0.0,
        };
        let body = RigidBody::new(
            self.enemy.mass,
            Collider::Sphere {
                radius: self.enemy.radius,
            },
        )
        .with_position(position);

        world.add_game_object(
            GameObject::new(id.clone(), ObjectKind::Enemy, enemy_visual(), enemy).with_body(body),
        )?;
        tracing::debug!(%id, ?position, "enemy spawned");
        self.enemies.push(Tracked { id, state });
        Ok(())
    }

    fn reap(&mut self, world: &mut World) {
        let score = self.enemy.score;
        let stats = &self.stats;
        self.enemies.retain(|enemy| {
            if !world.contains(&enemy.id) {
                return false;
            }
            let state = *enemy.state.borrow();
            if !state.should_remove() {
                return true;
            }
            world.remove_game_object(&enemy.id);
            if state.is_destroyed() {
                let mut stats = stats.borrow_mut();
                stats.kills += 1;
                stats.score += score;
                tracing::debug!(id = %enemy.id, score = stats.score, "enemy destroyed");
            }
            false
        });
    }
}

impl Behavior for EnemySpawner {
    fn update(&mut self, ctx: &mut UpdateContext<'_>, dt: f32) {
        self.timer += dt;
        if self.timer >= self.spawner.interval && self.enemies.len() < self.spawner.max_enemies {
            if let Err(err) = self.spawn_enemy(ctx) {
                tracing::warn!(%err, "enemy spawn failed");
            }
            self.timer = 0.0;
        }
        self.reap(ctx);
    }

    fn dispose(self: Box<Self>) {
        tracing::debug!(live = self.enemies.len(), "spawner disposed");
    }
}

/// One hostile ship: homes in on the player, turns to face it and shoots
/// when close enough.
struct Enemy {
    state: Rc<RefCell<EnemyState>>,
    config: EnemyConfig,
    weapon: EnemyWeaponConfig,
    damage_per_hit: f32,
    ids: SharedIds,
    /// Last known player position.
    target: Vec3,
    since_shot: f32,
    /// Seconds of white flash left.
    flash: f32,
}

impl Enemy {
    fn shoot(&self, world: &mut World, from: Vec3) -> Result<(), EngineError> {
        let id = self.ids.borrow_mut().next("enemy-projectile");
        world.add_game_object(EnemyProjectile::spawn(id, &self.weapon, from, self.target))
    }

    fn update_flash(&mut self, ctx: &mut UpdateContext<'_>, hits: usize, dt: f32) {
        if self.flash > 0.0 {
            self.flash -= dt;
            if self.flash <= 0.0 {
                if let Some(visual) = ctx.visual_mut() {
                    visual.tint = None;
                }
            }
        }
        if hits > 0 {
            self.flash = self.config.flash_duration;
            if let Some(visual) = ctx.visual_mut() {
                visual.tint = Some(FLASH);
            }
        }
    }
}

impl Behavior for Enemy {
    fn update(&mut self, ctx: &mut UpdateContext<'_>, dt: f32) {
        let hits = ctx
            .contacts()
            .iter()
            .filter(|(_, kind)| *kind == ObjectKind::PlayerProjectile)
            .count();
        {
            let mut state = self.state.borrow_mut();
            state.lifetime -= dt;
            state.health -= hits as f32 * self.damage_per_hit;
        }
        self.update_flash(ctx, hits, dt);

        if let Some(player) = ctx.get_game_object(&PLAYER_ID.into()) {
            self.target = player.position();
        }

        let target = self.target;
        let speed = self.config.speed;
        let vertical = self.config.vertical_factor;
        let position = {
            let Some(mut body) = ctx.body_mut() else {
                return;
            };
            let heading = (target - body.position).normalize_or_zero();
            body.velocity = Vec3::new(heading.x, heading.y * vertical, heading.z) * speed;
            if heading != Vec3::ZERO {
                body.rotation = Quat::from_rotation_arc(Vec3::Z, heading);
            }
            body.position
        };

        self.since_shot += dt;
        if position.distance(target) < self.config.fire_range
            && self.since_shot >= self.weapon.fire_rate
        {
            match self.shoot(ctx, position) {
                Ok(()) => self.since_shot = 0.0,
                Err(err) => tracing::warn!(%err, "enemy failed to fire"),
            }
        }
    }
}

/// Octahedron hull, two weapon pods, a red engine glow at the back.
fn enemy_visual() -> SceneNode {
    let pod = Part::new(Mesh::Cylinder, hex(0x664444))
        .scaled(Vec3::new(0.3, 0.8, 0.3))
        .rotated(Quat::from_rotation_x(FRAC_PI_2));
    SceneNode::new(vec![
        Part::new(Mesh::Octahedron, hex(0xff4444)).scaled(Vec3::splat(1.2)),
        pod.at(Vec3::new(-0.5, 0.0, 0.5)),
        pod.at(Vec3::new(0.5, 0.0, 0.5)),
        Part::new(Mesh::Sphere, hex(0xff0000))
            .scaled(Vec3::splat(0.4))
            .at(Vec3::new(0.0, 0.0, -0.8))
            .glowing(hex(0x440000)),
    ])
}

/// A shot fired by an enemy. Flies straight at where the player was and
/// removes itself when it expires or hits the player.
pub struct EnemyProjectile {
    lifetime: f32,
}

impl EnemyProjectile {
    fn spawn(id: ObjectId, cfg: &EnemyWeaponConfig, from: Vec3, target: Vec3) -> GameObject {
        let direction = (target - from).normalize_or_zero();
        let body = RigidBody::new(
            cfg.projectile_mass,
            Collider::Sphere {
                radius: cfg.projectile_radius,
            },
        )
        .with_position(from)
        .with_velocity(direction * cfg.projectile_speed);
        let visual = SceneNode::new(vec![
            Part::new(Mesh::Sphere, hex(0xff0000))
                .scaled(Vec3::splat(cfg.projectile_radius * 2.0))
                .glowing(hex(0x220000)),
        ]);
        let projectile = Self {
            lifetime: cfg.projectile_lifetime,
        };
        GameObject::new(id, ObjectKind::EnemyProjectile, visual, projectile).with_body(body)
    }
}

impl Behavior for EnemyProjectile {
    fn update(&mut self, ctx: &mut UpdateContext<'_>, dt: f32) {
        self.lifetime -= dt;
        let hit_player = ctx
            .contacts()
            .iter()
            .any(|(_, kind)| *kind == ObjectKind::Player);
        if self.lifetime <= 0.0 || hit_player {
            ctx.remove_self();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStats;
    use nebula_common::IdAllocator;
    use nebula_engine::{GameEngine, Inert, ManualTime};
    use nebula_scene::DebugTextRenderer;

    struct Rig {
        engine: GameEngine<DebugTextRenderer>,
        time: ManualTime,
        stats: SharedStats,
        ids: SharedIds,
    }

    impl Rig {
        fn new(config: &GameConfig) -> Self {
            let time = ManualTime::new();
            let mut engine = GameEngine::new(DebugTextRenderer::new()).time_source(time.clone());
            let stats = Rc::new(RefCell::new(SessionStats::default()));
            let ids = Rc::new(RefCell::new(IdAllocator::new()));
            engine
                .add_game_object(EnemySpawner::spawn(config, stats.clone(), ids.clone()))
                .unwrap();
            engine.start();
            Self {
                engine,
                time,
                stats,
                ids,
            }
        }

        fn tick(&mut self, dt: f32) {
            self.time.advance_secs(dt);
            self.engine.frame().unwrap();
        }

        fn count(&self, kind: ObjectKind) -> usize {
            self.engine.world().objects_of_kind(kind).count()
        }
    }

    fn far_away(config: &mut GameConfig) {
        // Keeps new enemies out of firing range for the first few seconds.
        config.spawner.ring_radius = 100.0;
        config.spawner.height_spread = 0.0;
    }

    #[test]
    fn spawns_on_interval_up_to_cap() {
        let mut config = GameConfig::default();
        far_away(&mut config);
        config.spawner.max_enemies = 3;
        let mut rig = Rig::new(&config);

        rig.tick(0.1);
        assert_eq!(rig.count(ObjectKind::Enemy), 0);
        for _ in 0..20 {
            rig.tick(0.1);
        }
        assert_eq!(rig.count(ObjectKind::Enemy), 1);
        for _ in 0..200 {
            rig.tick(0.1);
        }
        assert_eq!(rig.count(ObjectKind::Enemy), 3);
    }

    #[test]
    fn spawn_points_lie_on_ring() {
        let mut config = GameConfig::default();
        config.spawner.interval = 0.01;
        let mut rig = Rig::new(&config);
        for _ in 0..5 {
            rig.tick(0.05);
        }
        let first = rig.engine.get_game_object(&"enemy-1".into()).unwrap();
        let body = first.body.unwrap();
        // Spawned this many ticks ago at speed 8; allow for that drift.
        let flat = Vec3::new(body.position.x, 0.0, body.position.z).length();
        assert!((flat - 30.0).abs() < 3.0, "flat = {flat}");
        assert!(body.position.y.abs() <= 5.0);
    }

    #[test]
    fn enemies_home_in_and_face_player() {
        let mut config = GameConfig::default();
        config.spawner.interval = 0.01;
        let mut rig = Rig::new(&config);
        rig.engine
            .add_game_object(
                GameObject::new(PLAYER_ID, ObjectKind::Player, SceneNode::empty(), Inert)
                    .with_body(RigidBody::default()),
            )
            .unwrap();
        rig.tick(0.05);
        rig.tick(0.05);
        rig.tick(0.05);

        let enemy = rig.engine.get_game_object(&"enemy-1".into()).unwrap();
        let body = enemy.body.unwrap();
        let to_player = (-body.position).normalize();
        assert!(body.velocity.normalize().dot(to_player) > 0.9);
        let facing = body.rotation * Vec3::Z;
        assert!(facing.dot(to_player) > 0.9);
    }

    #[test]
    fn hits_damage_flash_and_destroy() {
        let mut config = GameConfig::default();
        far_away(&mut config);
        config.spawner.interval = 0.01;
        config.spawner.max_enemies = 1;
        let mut rig = Rig::new(&config);
        rig.tick(0.05);
        let enemy_id: ObjectId = "enemy-1".into();
        let at = rig.engine.get_game_object(&enemy_id).unwrap().position();

        let bullet = |n: u32, at: Vec3| {
            GameObject::new(
                format!("projectile-{n}"),
                ObjectKind::PlayerProjectile,
                SceneNode::empty(),
                Inert,
            )
            .with_body(RigidBody::new(0.1, Collider::Sphere { radius: 0.1 }).with_position(at))
        };

        rig.engine.add_game_object(bullet(1, at)).unwrap();
        rig.tick(0.02);
        let enemy = rig.engine.get_game_object(&enemy_id).unwrap();
        assert_eq!(enemy.visual.tint, Some(FLASH));
        rig.engine.remove_game_object(&"projectile-1".into());

        for _ in 0..10 {
            rig.tick(0.02);
        }
        assert_eq!(rig.engine.get_game_object(&enemy_id).unwrap().visual.tint, None);

        let at = rig.engine.get_game_object(&enemy_id).unwrap().position();
        rig.engine.add_game_object(bullet(2, at)).unwrap();
        rig.tick(0.02);
        rig.tick(0.02);

        assert!(rig.engine.get_game_object(&enemy_id).is_none());
        let stats = rig.stats.borrow();
        assert_eq!(stats.kills, 1);
        assert_eq!(stats.score, 100);
    }

    #[test]
    fn expired_enemies_removed_without_score() {
        let mut config = GameConfig::default();
        far_away(&mut config);
        config.spawner.interval = 0.01;
        config.spawner.max_enemies = 1;
        config.enemy.lifetime = 0.5;
        let mut rig = Rig::new(&config);
        rig.tick(0.05);
        assert_eq!(rig.count(ObjectKind::Enemy), 1);
        for _ in 0..8 {
            rig.tick(0.1);
        }
        assert!(rig.engine.get_game_object(&"enemy-1".into()).is_none());
        assert_eq!(rig.stats.borrow().score, 0);
    }

    #[test]
    fn enemies_fire_at_player_in_range() {
        let mut config = GameConfig::default();
        config.spawner.ring_radius = 10.0;
        config.spawner.height_spread = 0.0;
        config.spawner.interval = 0.01;
        config.spawner.max_enemies = 1;
        let mut rig = Rig::new(&config);
        rig.engine
            .add_game_object(
                GameObject::new(PLAYER_ID, ObjectKind::Player, SceneNode::empty(), Inert)
                    .with_body(RigidBody::new(0.0, Collider::Sphere { radius: 0.5 })),
            )
            .unwrap();
        rig.tick(0.05);
        rig.tick(0.05);
        assert_eq!(rig.count(ObjectKind::EnemyProjectile), 1);
        rig.tick(0.05);
        assert_eq!(rig.count(ObjectKind::EnemyProjectile), 1);
    }

    #[test]
    fn enemy_projectile_expires_by_itself() {
        let mut rig = Rig::new(&GameConfig::default());
        let id = rig.ids.borrow_mut().next("enemy-projectile");
        let shot = EnemyProjectile::spawn(
            id.clone(),
            &EnemyWeaponConfig::default(),
            Vec3::new(0.0, 50.0, 0.0),
            Vec3::new(0.0, 100.0, 0.0),
        );
        rig.engine.add_game_object(shot).unwrap();
        for _ in 0..49 {
            rig.tick(0.1);
        }
        assert!(rig.engine.get_game_object(&id).is_some());
        rig.tick(0.1);
        rig.tick(0.1);
        assert!(rig.engine.get_game_object(&id).is_none());
    }

    #[test]
    fn enemy_projectile_removed_on_player_hit() {
        let mut rig = Rig::new(&GameConfig::default());
        rig.engine
            .add_game_object(
                GameObject::new(PLAYER_ID, ObjectKind::Player, SceneNode::empty(), Inert)
                    .with_body(RigidBody::new(0.0, Collider::Sphere { radius: 1.0 })),
            )
            .unwrap();
        let shot = EnemyProjectile::spawn(
            "enemy-projectile-1".into(),
            &EnemyWeaponConfig::default(),
            Vec3::new(0.0, 0.0, 1.2),
            Vec3::ZERO,
        );
        rig.engine.add_game_object(shot).unwrap();
        rig.tick(0.05);
        assert_eq!(rig.count(ObjectKind::EnemyProjectile), 0);
    }
}
