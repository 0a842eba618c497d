//! Shared types for the nebula engine.

mod rng;
mod types;

pub use rng::SplitMix64;
pub use types::{IdAllocator, ObjectId, ObjectKind, Transform};
