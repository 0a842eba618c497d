use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use glam::Vec3;
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::body::{BodyHandle, RigidBody, to_vector};

/// World-wide physics settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        // Space: no gravity.
        Self { gravity: Vec3::ZERO }
    }
}

/// An overlapping pair of bodies observed during a [`PhysicsWorld::step`].
///
/// `a < b` always holds, so each pair is reported once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Contact {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl Contact {
    fn new(x: BodyHandle, y: BodyHandle) -> Self {
        if x < y { Self { a: x, b: y } } else { Self { a: y, b: x } }
    }

    pub fn involves(&self, handle: BodyHandle) -> bool {
        self.a == handle || self.b == handle
    }

    /// The other body of the pair, if `handle` is one of them.
    pub fn other(&self, handle: BodyHandle) -> Option<BodyHandle> {
        if self.a == handle {
            Some(self.b)
        } else if self.b == handle {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Write access to one body. Edits reach the simulation when the guard
/// drops; mass and collider stay as inserted.
pub struct BodyMut<'a> {
    body: &'a mut rapier3d::dynamics::RigidBody,
    state: RigidBody,
}

impl Deref for BodyMut<'_> {
    type Target = RigidBody;

    fn deref(&self) -> &RigidBody {
        &self.state
    }
}

impl DerefMut for BodyMut<'_> {
    fn deref_mut(&mut self) -> &mut RigidBody {
        &mut self.state
    }
}

impl Drop for BodyMut<'_> {
    fn drop(&mut self) {
        self.state.write(self.body);
    }
}

/// Zero-gravity rigid-body world backed by rapier.
///
/// Every collider is a sensor: bodies pass through each other and overlaps
/// are only reported. Advances with a fixed step and a carry-over
/// accumulator so simulation behaviour does not depend on the caller's
/// frame rate.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    /// Descriptions as inserted; rapier does not keep mass or shape in
    /// the form callers gave them.
    inserted: HashMap<RigidBodyHandle, RigidBody>,
    accumulator: f32,
    steps_taken: u64,
    contacts: Vec<Contact>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("config", &self.config)
            .field("bodies", &self.bodies.len())
            .field("accumulator", &self.accumulator)
            .field("steps_taken", &self.steps_taken)
            .field("contacts", &self.contacts.len())
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            inserted: HashMap::new(),
            accumulator: 0.0,
            steps_taken: 0,
            contacts: Vec::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Number of bodies currently in the world.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Total fixed sub-steps simulated since creation.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Unconsumed time carried into the next [`step`](Self::step).
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        let handle = self.bodies.insert(body.build());
        self.colliders.insert_with_parent(
            body.collider.build(body.mass),
            handle,
            &mut self.bodies,
        );
        self.inserted.insert(handle, body);
        tracing::trace!(?handle, "body added");
        BodyHandle(handle)
    }

    /// Remove a body and its collider, handing back its last state. Stale
    /// handles return `None`.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let last = self.get(handle)?;
        self.bodies.remove(
            handle.0,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.inserted.remove(&handle.0);
        self.contacts.retain(|c| !c.involves(handle));
        tracing::trace!(handle = ?handle.0, "body removed");
        Some(last)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle.0)
    }

    /// Current state of a body.
    pub fn get(&self, handle: BodyHandle) -> Option<RigidBody> {
        let body = self.bodies.get(handle.0)?;
        let inserted = self.inserted.get(&handle.0)?;
        Some(RigidBody::read(body, inserted))
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<BodyMut<'_>> {
        let inserted = self.inserted.get(&handle.0)?;
        let body = self.bodies.get_mut(handle.0)?;
        let state = RigidBody::read(body, inserted);
        Some(BodyMut { body, state })
    }

    /// Contacts observed during the most recent [`step`](Self::step).
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Advance by `elapsed` seconds of real time in `fixed_step` increments.
    ///
    /// At most `max_substeps` steps run per call; time beyond that is
    /// dropped rather than carried, so a long stall (a backgrounded window)
    /// cannot snowball into ever larger catch-up work. Returns the number
    /// of sub-steps taken.
    pub fn step(&mut self, fixed_step: f32, elapsed: f32, max_substeps: u32) -> u32 {
        self.contacts.clear();
        self.accumulator += elapsed.max(0.0);
        self.params.dt = fixed_step;

        let mut substeps = 0;
        while self.accumulator >= fixed_step && substeps < max_substeps {
            self.internal_step();
            self.accumulator -= fixed_step;
            substeps += 1;
        }
        if self.accumulator >= fixed_step {
            tracing::debug!(
                dropped = self.accumulator - self.accumulator % fixed_step,
                "physics catch-up capped at {max_substeps} sub-steps"
            );
        }
        self.accumulator %= fixed_step;
        substeps
    }

    fn internal_step(&mut self) {
        self.pipeline.step(
            &to_vector(self.config.gravity),
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &(),
        );
        self.steps_taken += 1;
        self.collect_contacts();
    }

    /// Union of this sub-step's sensor overlaps into the tick's list.
    fn collect_contacts(&mut self) {
        for (c1, c2, intersecting) in self.narrow_phase.intersection_pairs() {
            if !intersecting {
                continue;
            }
            let parent = |c| self.colliders.get(c).and_then(|c| c.parent());
            let (Some(a), Some(b)) = (parent(c1), parent(c2)) else {
                continue;
            };
            let contact = Contact::new(BodyHandle(a), BodyHandle(b));
            if !self.contacts.contains(&contact) {
                self.contacts.push(contact);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Collider;

    const STEP: f32 = 1.0 / 60.0;

    fn ball(at: Vec3) -> RigidBody {
        RigidBody::new(1.0, Collider::Sphere { radius: 0.5 }).with_position(at)
    }

    #[test]
    fn add_and_remove_bodies() {
        let mut world = PhysicsWorld::default();
        let a = world.add_body(ball(Vec3::ZERO));
        let b = world.add_body(ball(Vec3::X * 5.0));
        assert_eq!(world.len(), 2);

        assert_eq!(world.remove_body(a).map(|b| b.position), Some(Vec3::ZERO));
        assert_eq!(world.len(), 1);
        assert!(world.remove_body(a).is_none());
        assert!(world.contains(b));
    }

    #[test]
    fn stale_handle_misses_after_slot_reuse() {
        let mut world = PhysicsWorld::default();
        let a = world.add_body(ball(Vec3::ZERO));
        world.remove_body(a);
        let b = world.add_body(ball(Vec3::Y));
        assert_ne!(a, b);
        assert!(world.get(a).is_none());
        assert_eq!(world.get(b).map(|b| b.position), Some(Vec3::Y));
    }

    #[test]
    fn edits_through_guard_reach_the_simulation() {
        let mut world = PhysicsWorld::default();
        let h = world.add_body(ball(Vec3::ZERO));
        if let Some(mut body) = world.get_mut(h) {
            body.velocity = Vec3::new(0.0, 0.0, -6.0);
            body.position.x = 2.0;
        }
        world.step(STEP, STEP, 3);
        let body = world.get(h).unwrap();
        assert!((body.position.x - 2.0).abs() < 1e-5);
        assert!((body.position.z + 0.1).abs() < 1e-3, "z = {}", body.position.z);
    }

    #[test]
    fn one_frame_at_fixed_rate_takes_one_substep() {
        let mut world = PhysicsWorld::default();
        let h = world.add_body(ball(Vec3::ZERO).with_velocity(Vec3::X));
        assert_eq!(world.step(STEP, STEP, 3), 1);
        let x = world.get(h).map(|b| b.position.x).unwrap_or_default();
        assert!((x - STEP).abs() < 1e-4, "x = {x}");
    }

    #[test]
    fn short_frames_accumulate() {
        let mut world = PhysicsWorld::default();
        assert_eq!(world.step(STEP, STEP * 0.4, 3), 0);
        assert_eq!(world.step(STEP, STEP * 0.4, 3), 0);
        assert_eq!(world.step(STEP, STEP * 0.4, 3), 1);
        assert!(world.accumulator() < STEP);
    }

    #[test]
    fn catch_up_is_bounded() {
        let mut world = PhysicsWorld::default();
        let taken = world.step(STEP, 2.0, 3);
        assert_eq!(taken, 3);
        assert_eq!(world.steps_taken(), 3);
        assert!(world.accumulator() < STEP);
    }

    #[test]
    fn zero_gravity_by_default() {
        let mut world = PhysicsWorld::default();
        let h = world.add_body(ball(Vec3::ZERO));
        world.step(STEP, 1.0, 60);
        assert_eq!(world.get(h).map(|b| b.position), Some(Vec3::ZERO));
    }

    #[test]
    fn overlapping_bodies_pass_through_each_other() {
        let mut world = PhysicsWorld::default();
        let a = world.add_body(ball(Vec3::ZERO).with_velocity(Vec3::X));
        world.add_body(ball(Vec3::new(0.5, 0.0, 0.0)));
        world.step(STEP, STEP * 3.0, 3);
        let v = world.get(a).map(|b| b.velocity).unwrap_or_default();
        assert!((v - Vec3::X).length() < 1e-3, "v = {v}");
    }

    #[test]
    fn contacts_reported_once_per_pair() {
        let mut world = PhysicsWorld::default();
        let a = world.add_body(ball(Vec3::ZERO));
        let b = world.add_body(ball(Vec3::new(0.8, 0.0, 0.0)));
        let far = world.add_body(ball(Vec3::new(10.0, 0.0, 0.0)));

        world.step(STEP, STEP * 3.0, 3);
        assert_eq!(world.contacts().len(), 1);
        let c = world.contacts()[0];
        assert_eq!(c.other(a), Some(b));
        assert_eq!(c.other(b), Some(a));
        assert!(!c.involves(far));
    }

    #[test]
    fn fast_body_contact_seen_on_intermediate_substep() {
        let mut world = PhysicsWorld::default();
        // Crosses the target on the second sub-step and is past it by the last.
        let bullet = world.add_body(
            RigidBody::new(0.1, Collider::Sphere { radius: 0.1 })
                .with_position(Vec3::new(-1.0, 0.0, 0.0))
                .with_velocity(Vec3::new(60.0, 0.0, 0.0)),
        );
        let target = world.add_body(ball(Vec3::ZERO));
        world.step(STEP, STEP * 3.0, 3);
        assert!(world.contacts().iter().any(|c| c.involves(bullet) && c.involves(target)));
        let x = world.get(bullet).map(|b| b.position.x).unwrap_or_default();
        assert!(x > 1.0, "x = {x}");
    }

    #[test]
    fn fixed_bodies_still_report_moving_visitors() {
        let mut world = PhysicsWorld::default();
        let wall = world.add_body(RigidBody::new(0.0, Collider::default()));
        let visitor = world.add_body(ball(Vec3::new(0.9, 0.0, 0.0)));
        world.step(STEP, STEP, 3);
        assert!(world.contacts().iter().any(|c| c.involves(wall) && c.involves(visitor)));
    }

    #[test]
    fn removing_body_drops_its_contacts() {
        let mut world = PhysicsWorld::default();
        let a = world.add_body(ball(Vec3::ZERO));
        world.add_body(ball(Vec3::new(0.5, 0.0, 0.0)));
        world.step(STEP, STEP, 3);
        assert_eq!(world.contacts().len(), 1);
        world.remove_body(a);
        assert!(world.contacts().is_empty());
    }
}
