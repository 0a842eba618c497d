//! Physics: zero-gravity rigid bodies with sensor colliders, on rapier.
//!
//! # Invariants
//! - The world only moves bodies inside `step`, in fixed-size sub-steps.
//! - A handle never aliases a different body after its own was removed.
//! - Bodies never push each other; overlaps are reported as contacts.
//! - Contacts describe the latest `step` only.

mod body;
mod world;

pub use body::{BodyHandle, Collider, RigidBody};
pub use world::{BodyMut, Contact, PhysicsConfig, PhysicsWorld};

pub fn crate_info() -> &'static str {
    concat!(env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"))
}
