use nebula_common::{ObjectId, ObjectKind};
use serde::Serialize;

use crate::engine::EngineState;
use crate::world::World;

/// Snapshot of engine state for HUDs, logs and the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSummary {
    pub state: EngineState,
    pub tick: u64,
    /// Simulated seconds since the first start.
    pub elapsed: f64,
    pub objects: usize,
    pub bodies: usize,
    pub nodes: usize,
    pub contacts: usize,
}

impl EngineSummary {
    pub(crate) fn of(state: EngineState, elapsed: f64, world: &World) -> Self {
        Self {
            state,
            tick: world.tick(),
            elapsed,
            objects: world.object_count(),
            bodies: world.physics().len(),
            nodes: world.scene().len(),
            contacts: world.physics().contacts().len(),
        }
    }
}

impl std::fmt::Display for EngineSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Engine: {:?} tick={} t={:.2}s objects={} bodies={} nodes={} contacts={}",
            self.state,
            self.tick,
            self.elapsed,
            self.objects,
            self.bodies,
            self.nodes,
            self.contacts
        )
    }
}

/// One registered object, flattened for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub position: [f32; 3],
    pub velocity: Option<[f32; 3]>,
}

impl std::fmt::Display for ObjectInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [x, y, z] = self.position;
        write!(f, "{:<14} {:?} pos=({x:.2}, {y:.2}, {z:.2})", self.id, self.kind)?;
        if let Some([vx, vy, vz]) = self.velocity {
            write!(f, " vel=({vx:.2}, {vy:.2}, {vz:.2})")?;
        }
        Ok(())
    }
}

/// Every registered object, in registry order.
pub fn list_objects(world: &World) -> Vec<ObjectInfo> {
    world
        .object_ids()
        .filter_map(|id| world.get_game_object(id))
        .map(|obj| ObjectInfo {
            id: obj.id.clone(),
            kind: obj.kind,
            position: obj.position().to_array(),
            velocity: obj.body.map(|b| b.velocity.to_array()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{GameObject, Inert};
    use glam::Vec3;
    use nebula_physics::RigidBody;
    use nebula_scene::SceneNode;

    #[test]
    fn summary_counts_world_parts() {
        let mut world = World::default();
        world
            .add_game_object(
                GameObject::new("p", ObjectKind::Player, SceneNode::empty(), Inert)
                    .with_body(RigidBody::default()),
            )
            .unwrap();
        world
            .add_game_object(GameObject::new("s", ObjectKind::Controller, SceneNode::empty(), Inert))
            .unwrap();

        let summary = EngineSummary::of(EngineState::Idle, 0.0, &world);
        assert_eq!(summary.objects, 2);
        assert_eq!(summary.bodies, 1);
        assert_eq!(summary.nodes, 2);
        assert!(summary.to_string().contains("objects=2"));
    }

    #[test]
    fn list_objects_in_id_order() {
        let mut world = World::default();
        for id in ["b", "a"] {
            world
                .add_game_object(
                    GameObject::new(id, ObjectKind::Enemy, SceneNode::empty(), Inert).with_body(
                        RigidBody::default().with_velocity(Vec3::Z),
                    ),
                )
                .unwrap();
        }
        let infos = list_objects(&world);
        assert_eq!(infos[0].id.as_str(), "a");
        assert_eq!(infos[1].velocity, Some([0.0, 0.0, 1.0]));
        assert!(infos[0].to_string().contains("vel="));
    }
}
