use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::{Deref, DerefMut};

use nebula_common::{ObjectId, ObjectKind, Transform};
use nebula_input::InputState;
use nebula_physics::{BodyHandle, BodyMut, PhysicsConfig, PhysicsWorld, RigidBody};
use nebula_scene::{Camera, Environment, NodeId, Scene, SceneNode};
use serde::Serialize;

use crate::error::EngineError;
use crate::object::{Behavior, GameObject, ObjectRef};

/// Events kept before the oldest are dropped. A host that drains every
/// frame never reaches it.
pub const EVENT_LOG_CAPACITY: usize = 4096;

/// An event record produced by registry changes and ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WorldEvent {
    Added { id: ObjectId, kind: ObjectKind },
    Removed { id: ObjectId, kind: ObjectKind },
    Ticked { tick: u64, dt: f32, substeps: u32 },
}

struct Entry {
    kind: ObjectKind,
    node: NodeId,
    body: Option<BodyHandle>,
    /// `None` while the behaviour is checked out for its own update.
    behavior: Option<Box<dyn Behavior>>,
    /// Distinguishes this registration from a later one reusing the id.
    serial: u64,
}

/// Everything the tick loop mutates: the registry, the scene graph, the
/// physics world, the camera and the input resource.
///
/// Behaviours receive it (through [`UpdateContext`]) during their update,
/// so spawning and despawning from inside a tick goes through the same
/// operations as from outside.
pub struct World {
    scene: Scene,
    physics: PhysicsWorld,
    camera: Camera,
    input: InputState,
    objects: BTreeMap<ObjectId, Entry>,
    by_body: HashMap<BodyHandle, ObjectId>,
    /// Contacts of the last physics step, resolved to objects.
    touching: Vec<[(ObjectId, ObjectKind); 2]>,
    events: VecDeque<WorldEvent>,
    dropped_events: u64,
    next_serial: u64,
    tick: u64,
    closed: bool,
}

impl Default for World {
    fn default() -> Self {
        Self::new(Scene::default(), PhysicsConfig::default())
    }
}

impl World {
    pub fn new(scene: Scene, physics: PhysicsConfig) -> Self {
        Self {
            scene,
            physics: PhysicsWorld::new(physics),
            camera: Camera::default(),
            input: InputState::new(),
            objects: BTreeMap::new(),
            by_body: HashMap::new(),
            touching: Vec::new(),
            events: VecDeque::new(),
            dropped_events: 0,
            next_serial: 0,
            tick: 0,
            closed: false,
        }
    }

    /// Ticks completed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of registered objects.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Registered ids in registry order.
    pub fn object_ids(&self) -> impl Iterator<Item = &ObjectId> {
        self.objects.keys()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Replace the lights and starfield the scene is drawn in.
    pub fn set_environment(&mut self, environment: Environment) {
        self.scene.environment = environment;
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// The event log, oldest first.
    pub fn events(&self) -> impl ExactSizeIterator<Item = &WorldEvent> {
        self.events.iter()
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        self.events.drain(..).collect()
    }

    /// Events discarded because the log was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    fn record(&mut self, event: WorldEvent) {
        if self.events.len() == EVENT_LOG_CAPACITY {
            self.events.pop_front();
            if self.dropped_events == 0 {
                tracing::warn!(
                    capacity = EVENT_LOG_CAPACITY,
                    "event log full, dropping oldest events"
                );
            }
            self.dropped_events += 1;
        }
        self.events.push_back(event);
    }

    /// Register an object: attach its node to the scene and its body to
    /// the physics world.
    ///
    /// Objects with a body start with their node at the body pose.
    pub fn add_game_object(&mut self, object: GameObject) -> Result<(), EngineError> {
        if self.closed {
            return Err(EngineError::Disposed);
        }
        if self.objects.contains_key(&object.id) {
            tracing::warn!(id = %object.id, "rejected duplicate object id");
            return Err(EngineError::DuplicateId(object.id));
        }

        let GameObject {
            id,
            kind,
            mut visual,
            body,
            behavior,
        } = object;

        if let Some(body) = &body {
            visual.transform.position = body.position;
            visual.transform.rotation = body.rotation;
        }
        let node = self.scene.add(visual);
        let body = body.map(|b| self.physics.add_body(b));
        if let Some(handle) = body {
            self.by_body.insert(handle, id.clone());
        }

        self.next_serial += 1;
        tracing::debug!(%id, ?kind, has_body = body.is_some(), "object added");
        self.record(WorldEvent::Added {
            id: id.clone(),
            kind,
        });
        self.objects.insert(
            id,
            Entry {
                kind,
                node,
                body,
                behavior: Some(behavior),
                serial: self.next_serial,
            },
        );
        Ok(())
    }

    /// Unregister an object: detach its node and body, then dispose it.
    ///
    /// Returns `false` if no object has that id. An object removing itself
    /// from inside its own update is disposed as soon as that update
    /// returns.
    pub fn remove_game_object(&mut self, id: &ObjectId) -> bool {
        let Some(entry) = self.objects.remove(id) else {
            return false;
        };
        let Some((kind, behavior)) = self.detach(id, entry) else {
            return true;
        };
        behavior.dispose();
        tracing::debug!(%id, ?kind, "object removed");
        true
    }

    fn detach(&mut self, id: &ObjectId, entry: Entry) -> Option<(ObjectKind, Box<dyn Behavior>)> {
        self.scene.remove(entry.node);
        if let Some(handle) = entry.body {
            self.physics.remove_body(handle);
            self.by_body.remove(&handle);
        }
        self.record(WorldEvent::Removed {
            id: id.clone(),
            kind: entry.kind,
        });
        entry.behavior.map(|b| (entry.kind, b))
    }

    pub fn get_game_object(&self, id: &ObjectId) -> Option<ObjectRef<'_>> {
        let (id, entry) = self.objects.get_key_value(id)?;
        let visual = self.scene.get(entry.node)?;
        Some(ObjectRef {
            id,
            kind: entry.kind,
            visual,
            body: entry.body.and_then(|h| self.physics.get(h)),
        })
    }

    /// Registered objects of one kind.
    pub fn objects_of_kind(&self, kind: ObjectKind) -> impl Iterator<Item = ObjectRef<'_>> {
        self.objects
            .iter()
            .filter(move |(_, e)| e.kind == kind)
            .filter_map(move |(id, _)| self.get_game_object(id))
    }

    /// Edit an object's body. Changes apply when the guard drops.
    pub fn body_mut(&mut self, id: &ObjectId) -> Option<BodyMut<'_>> {
        let handle = self.objects.get(id)?.body?;
        self.physics.get_mut(handle)
    }

    /// Objects whose bodies touched `id`'s body during the last physics
    /// step.
    ///
    /// The list is fixed when the step ends, so it does not depend on
    /// which of the two objects updates first or whether the other one
    /// has since been removed.
    pub fn contacts_of(&self, id: &ObjectId) -> Vec<(ObjectId, ObjectKind)> {
        self.touching
            .iter()
            .filter_map(|[a, b]| {
                if &a.0 == id {
                    Some(b.clone())
                } else if &b.0 == id {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    pub(crate) fn step_physics(&mut self, fixed_step: f32, dt: f32, max_substeps: u32) -> u32 {
        let substeps = self.physics.step(fixed_step, dt, max_substeps);
        self.touching.clear();
        for contact in self.physics.contacts() {
            let (Some(a), Some(b)) = (self.resolve(contact.a), self.resolve(contact.b)) else {
                continue;
            };
            self.touching.push([a, b]);
        }
        substeps
    }

    fn resolve(&self, handle: BodyHandle) -> Option<(ObjectId, ObjectKind)> {
        let id = self.by_body.get(&handle)?;
        let entry = self.objects.get(id)?;
        Some((id.clone(), entry.kind))
    }

    /// One update pass over the registry as it stood when the pass began.
    ///
    /// Objects added during the pass wait for the next tick. Objects
    /// removed during the pass are skipped when their turn comes.
    pub(crate) fn run_updates(&mut self, dt: f32) {
        let snapshot: Vec<(ObjectId, u64)> = self
            .objects
            .iter()
            .map(|(id, e)| (id.clone(), e.serial))
            .collect();

        for (id, serial) in snapshot {
            let Some(entry) = self.objects.get_mut(&id) else {
                continue;
            };
            if entry.serial != serial {
                continue;
            }
            let Some(mut behavior) = entry.behavior.take() else {
                continue;
            };
            let (kind, node, body) = (entry.kind, entry.node, entry.body);

            let mut ctx = UpdateContext {
                world: self,
                id: &id,
                kind,
                node,
                body,
            };
            behavior.update(&mut ctx, dt);

            match self.objects.get_mut(&id) {
                Some(entry) if entry.serial == serial => entry.behavior = Some(behavior),
                _ => {
                    behavior.dispose();
                    tracing::debug!(%id, ?kind, "object removed during its own update");
                }
            }
        }
    }

    /// Copy each body's pose into its node. Scale stays with the node.
    pub(crate) fn sync_visuals(&mut self) {
        for entry in self.objects.values() {
            let Some(handle) = entry.body else {
                continue;
            };
            let (Some(body), Some(node)) = (self.physics.get(handle), self.scene.get_mut(entry.node))
            else {
                continue;
            };
            node.transform.position = body.position;
            node.transform.rotation = body.rotation;
        }
    }

    pub(crate) fn finish_tick(&mut self, dt: f32, substeps: u32) {
        self.tick += 1;
        self.record(WorldEvent::Ticked {
            tick: self.tick,
            dt,
            substeps,
        });
    }

    /// Remove and dispose every object, then refuse further additions.
    pub(crate) fn close(&mut self) {
        let ids: Vec<ObjectId> = self.objects.keys().cloned().collect();
        for id in &ids {
            self.remove_game_object(id);
        }
        self.input.clear();
        self.touching.clear();
        self.closed = true;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }
}

/// The world as seen from one object's update.
///
/// Dereferences to [`World`] for engine operations (spawn, despawn, lookup,
/// camera, input) and adds accessors for the object being updated.
pub struct UpdateContext<'a> {
    world: &'a mut World,
    id: &'a ObjectId,
    kind: ObjectKind,
    node: NodeId,
    body: Option<BodyHandle>,
}

impl UpdateContext<'_> {
    pub fn id(&self) -> &ObjectId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// This object's body, unless it has none.
    pub fn body(&self) -> Option<RigidBody> {
        self.body.and_then(|h| self.world.physics.get(h))
    }

    pub fn body_mut(&mut self) -> Option<BodyMut<'_>> {
        self.body.and_then(|h| self.world.physics.get_mut(h))
    }

    /// This object's node. Transform writes are overwritten by the pose
    /// sync when the object has a body; use [`set_transform`] instead.
    ///
    /// [`set_transform`]: Self::set_transform
    pub fn visual(&self) -> Option<&SceneNode> {
        self.world.scene.get(self.node)
    }

    pub fn visual_mut(&mut self) -> Option<&mut SceneNode> {
        self.world.scene.get_mut(self.node)
    }

    /// Move a body-less object's node. Returns `false` and leaves the node
    /// alone when a body owns the pose.
    pub fn set_transform(&mut self, transform: Transform) -> bool {
        if self.body.is_some() {
            tracing::debug!(id = %self.id, "visual transform is driven by physics");
            return false;
        }
        match self.world.scene.get_mut(self.node) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    /// Objects this object touched during the last physics step.
    pub fn contacts(&self) -> Vec<(ObjectId, ObjectKind)> {
        self.world.contacts_of(self.id)
    }

    /// Unregister this object. Its update will not run again.
    pub fn remove_self(&mut self) -> bool {
        let id = self.id.clone();
        self.world.remove_game_object(&id)
    }
}

impl Deref for UpdateContext<'_> {
    type Target = World;

    fn deref(&self) -> &World {
        self.world
    }
}

impl DerefMut for UpdateContext<'_> {
    fn deref_mut(&mut self) -> &mut World {
        self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Inert, from_fn};
    use glam::Vec3;
    use nebula_physics::Collider;
    use nebula_scene::{Mesh, Part, hex};
    use std::cell::Cell;
    use std::rc::Rc;

    fn node() -> SceneNode {
        SceneNode::new(vec![Part::new(Mesh::Sphere, hex(0xffffff))])
    }

    fn prop(id: &str) -> GameObject {
        GameObject::new(id, ObjectKind::Enemy, node(), Inert)
    }

    struct CountDispose(Rc<Cell<u32>>);

    impl Behavior for CountDispose {
        fn update(&mut self, _ctx: &mut UpdateContext<'_>, _dt: f32) {}

        fn dispose(self: Box<Self>) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn add_attaches_node_and_body() {
        let mut world = World::default();
        let obj = prop("a").with_body(
            RigidBody::new(1.0, Collider::Sphere { radius: 1.0 }).with_position(Vec3::X),
        );
        world.add_game_object(obj).unwrap();

        assert_eq!(world.object_count(), 1);
        assert_eq!(world.scene().len(), 1);
        assert_eq!(world.physics().len(), 1);
        let view = world.get_game_object(&"a".into()).unwrap();
        assert_eq!(view.position(), Vec3::X);
    }

    #[test]
    fn duplicate_id_rejected_without_side_effects() {
        let mut world = World::default();
        world.add_game_object(prop("a")).unwrap();
        let err = world.add_game_object(prop("a")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateId(id) if id.as_str() == "a"));
        assert_eq!(world.scene().len(), 1);
        assert_eq!(world.object_count(), 1);
    }

    #[test]
    fn remove_detaches_and_disposes_once() {
        let disposed = Rc::new(Cell::new(0));
        let mut world = World::default();
        let obj = GameObject::new("a", ObjectKind::Enemy, node(), CountDispose(disposed.clone()))
            .with_body(RigidBody::default());
        world.add_game_object(obj).unwrap();

        assert!(world.remove_game_object(&"a".into()));
        assert!(!world.remove_game_object(&"a".into()));
        assert_eq!(disposed.get(), 1);
        assert!(world.scene().is_empty());
        assert!(world.physics().is_empty());
    }

    #[test]
    fn lookup_miss_is_empty() {
        let world = World::default();
        assert!(world.get_game_object(&"nobody".into()).is_none());
        assert!(world.contacts_of(&"nobody".into()).is_empty());
    }

    #[test]
    fn registry_size_tracks_matched_removes() {
        let mut world = World::default();
        let mut adds = 0;
        let mut matched = 0;
        for i in 0..20 {
            world.add_game_object(prop(&format!("o{i}"))).unwrap();
            adds += 1;
            if i % 3 == 0 && world.remove_game_object(&format!("o{}", i / 2).into()) {
                matched += 1;
            }
            if world.remove_game_object(&"missing".into()) {
                matched += 1;
            }
        }
        assert_eq!(world.object_count(), adds - matched);
        assert_eq!(world.scene().len(), world.object_count());
    }

    #[test]
    fn set_transform_refused_when_body_present() {
        let mut world = World::default();
        let moved = Rc::new(Cell::new(None));
        let seen = moved.clone();
        world
            .add_game_object(
                GameObject::new(
                    "b",
                    ObjectKind::Enemy,
                    node(),
                    from_fn(move |ctx, _| {
                        seen.set(Some(ctx.set_transform(Transform::from_position(Vec3::Y))));
                    }),
                )
                .with_body(RigidBody::default()),
            )
            .unwrap();
        world.run_updates(0.016);
        assert_eq!(moved.get(), Some(false));
    }

    #[test]
    fn close_disposes_everything_and_rejects_adds() {
        let disposed = Rc::new(Cell::new(0));
        let mut world = World::default();
        for i in 0..3 {
            world
                .add_game_object(GameObject::new(
                    format!("o{i}"),
                    ObjectKind::Enemy,
                    node(),
                    CountDispose(disposed.clone()),
                ))
                .unwrap();
        }
        world.close();
        assert_eq!(disposed.get(), 3);
        assert_eq!(world.object_count(), 0);
        assert!(matches!(
            world.add_game_object(prop("late")),
            Err(EngineError::Disposed)
        ));
    }

    #[test]
    fn contacts_survive_removal_of_either_side() {
        let mut world = World::default();
        let sphere = |at: Vec3| RigidBody::new(1.0, Collider::Sphere { radius: 0.5 }).with_position(at);
        world
            .add_game_object(prop("a").with_body(sphere(Vec3::ZERO)))
            .unwrap();
        world
            .add_game_object(
                GameObject::new("shot", ObjectKind::EnemyProjectile, node(), Inert)
                    .with_body(sphere(Vec3::new(0.5, 0.0, 0.0))),
            )
            .unwrap();
        world
            .add_game_object(prop("far").with_body(sphere(Vec3::new(10.0, 0.0, 0.0))))
            .unwrap();
        world.step_physics(1.0 / 60.0, 1.0 / 30.0, 3);

        world.remove_game_object(&"shot".into());
        let contacts = world.contacts_of(&"a".into());
        assert_eq!(contacts, vec![("shot".into(), ObjectKind::EnemyProjectile)]);
        assert!(world.contacts_of(&"far".into()).is_empty());
    }

    #[test]
    fn events_record_lifecycle() {
        let mut world = World::default();
        world.add_game_object(prop("a")).unwrap();
        world.remove_game_object(&"a".into());
        let events = world.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], WorldEvent::Added { .. }));
        assert!(matches!(events[1], WorldEvent::Removed { .. }));
        assert_eq!(world.events().len(), 0);
    }

    #[test]
    fn undrained_event_log_stays_bounded() {
        let mut world = World::default();
        for i in 0..EVENT_LOG_CAPACITY {
            world.add_game_object(prop(&format!("o{i}"))).unwrap();
            world.remove_game_object(&format!("o{i}").into());
        }
        assert_eq!(world.events().len(), EVENT_LOG_CAPACITY);
        assert_eq!(world.dropped_events(), EVENT_LOG_CAPACITY as u64);

        // The newest events survive.
        let last = world.events().last().cloned();
        let expected = format!("o{}", EVENT_LOG_CAPACITY - 1);
        assert!(matches!(last, Some(WorldEvent::Removed { id, .. }) if id.as_str() == expected));

        world.drain_events();
        world.add_game_object(prop("fresh")).unwrap();
        assert_eq!(world.events().len(), 1);
    }
}
