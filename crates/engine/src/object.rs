use nebula_common::{ObjectId, ObjectKind};
use nebula_physics::RigidBody;
use nebula_scene::SceneNode;

use crate::world::UpdateContext;

/// Per-object behaviour driven by the engine.
///
/// `update` runs once per tick while the object is registered. `dispose`
/// consumes the behaviour, so the engine can call it at most once; it runs
/// when the object is removed or the engine is disposed.
pub trait Behavior {
    fn update(&mut self, ctx: &mut UpdateContext<'_>, dt: f32);

    fn dispose(self: Box<Self>) {}
}

/// A behaviour that does nothing. Useful for inert props.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inert;

impl Behavior for Inert {
    fn update(&mut self, _ctx: &mut UpdateContext<'_>, _dt: f32) {}
}

/// Behaviour built from a closure.
pub struct FnBehavior<F>(F);

impl<F> Behavior for FnBehavior<F>
where
    F: FnMut(&mut UpdateContext<'_>, f32),
{
    fn update(&mut self, ctx: &mut UpdateContext<'_>, dt: f32) {
        (self.0)(ctx, dt)
    }
}

/// Wrap a closure as a [`Behavior`].
pub fn from_fn<F>(f: F) -> FnBehavior<F>
where
    F: FnMut(&mut UpdateContext<'_>, f32),
{
    FnBehavior(f)
}

/// An entity handed to the engine: a visual node, an optional physics body
/// and the behaviour that drives them.
///
/// Registration moves the node into the scene and the body into the
/// physics world. From then on the engine copies the body pose into the
/// node after every physics step.
pub struct GameObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub visual: SceneNode,
    pub body: Option<RigidBody>,
    pub behavior: Box<dyn Behavior>,
}

impl GameObject {
    pub fn new(
        id: impl Into<ObjectId>,
        kind: ObjectKind,
        visual: SceneNode,
        behavior: impl Behavior + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            visual,
            body: None,
            behavior: Box::new(behavior),
        }
    }

    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.body = Some(body);
        self
    }
}

impl std::fmt::Debug for GameObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameObject")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("has_body", &self.body.is_some())
            .finish_non_exhaustive()
    }
}

/// Read-only view of a registered object.
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef<'a> {
    pub id: &'a ObjectId,
    pub kind: ObjectKind,
    pub visual: &'a SceneNode,
    pub body: Option<RigidBody>,
}

impl ObjectRef<'_> {
    /// Where the object is drawn.
    pub fn position(&self) -> glam::Vec3 {
        self.visual.transform.position
    }
}
