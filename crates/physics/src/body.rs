use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

/// Handle to a body in a [`PhysicsWorld`](crate::PhysicsWorld).
///
/// Wraps rapier's generational handle: once the body is removed and its
/// slot reused, the old handle misses instead of aliasing the new body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) RigidBodyHandle);

impl BodyHandle {
    fn key(&self) -> (u32, u32) {
        self.0.into_raw_parts()
    }
}

impl PartialOrd for BodyHandle {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BodyHandle {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

/// Primitive collision shape, centred on the body position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Collider {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
}

impl Default for Collider {
    fn default() -> Self {
        Self::Box {
            half_extents: Vec3::splat(0.5),
        }
    }
}

impl Collider {
    /// Radius of the smallest sphere enclosing the shape.
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            Self::Box { half_extents } => half_extents.length(),
            Self::Sphere { radius } => radius,
        }
    }

    /// A sensor collider: overlaps are reported, never resolved.
    pub(crate) fn build(&self, mass: f32) -> rapier3d::geometry::Collider {
        let builder = match *self {
            Self::Box { half_extents: h } => ColliderBuilder::cuboid(h.x, h.y, h.z),
            Self::Sphere { radius } => ColliderBuilder::ball(radius),
        };
        builder.sensor(true).mass(mass.max(0.0)).build()
    }
}

/// A rigid body's pose, velocity and collider, as plain data.
///
/// Used both to insert a body and to read or edit one that is already in
/// the world. Bodies with `mass <= 0` are fixed and never move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub collider: Collider,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 1.0,
            linear_damping: 0.01,
            angular_damping: 0.01,
            collider: Collider::default(),
        }
    }
}

impl RigidBody {
    pub fn new(mass: f32, collider: Collider) -> Self {
        Self {
            mass,
            collider,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }

    /// The rapier body for this description. Sleeping is off: ships and
    /// shots coast at constant speed and must never freeze.
    pub(crate) fn build(&self) -> rapier3d::dynamics::RigidBody {
        let builder = if self.is_static() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        builder
            .position(isometry(self.position, self.rotation))
            .linvel(to_vector(self.velocity))
            .angvel(to_vector(self.angular_velocity))
            .linear_damping(self.linear_damping)
            .angular_damping(self.angular_damping)
            .can_sleep(false)
            .build()
    }

    /// Read back the state of a body already in the world. Mass and
    /// collider are fixed at insertion, so they come from `inserted`.
    pub(crate) fn read(body: &rapier3d::dynamics::RigidBody, inserted: &RigidBody) -> Self {
        Self {
            position: from_vector(body.translation()),
            rotation: from_rotation(body.rotation()),
            velocity: from_vector(body.linvel()),
            angular_velocity: from_vector(body.angvel()),
            linear_damping: body.linear_damping(),
            angular_damping: body.angular_damping(),
            ..*inserted
        }
    }

    pub(crate) fn write(&self, body: &mut rapier3d::dynamics::RigidBody) {
        body.set_position(isometry(self.position, self.rotation), true);
        body.set_linvel(to_vector(self.velocity), true);
        body.set_angvel(to_vector(self.angular_velocity), true);
        body.set_linear_damping(self.linear_damping);
        body.set_angular_damping(self.angular_damping);
    }
}

pub(crate) fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn isometry(position: Vec3, rotation: Quat) -> Isometry<Real> {
    let q = rotation.normalize();
    let rotation = Rotation::from_quaternion(rapier3d::na::Quaternion::new(q.w, q.x, q.y, q.z));
    Isometry::from_parts(to_vector(position).into(), rotation)
}

fn from_rotation(q: &Rotation<Real>) -> Quat {
    let c = q.coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}
