use std::hint::black_box;
use std::time::Instant;

use glam::Vec3;
use nebula_common::ObjectKind;
use nebula_engine::{GameEngine, GameObject, Inert, ManualTime};
use nebula_physics::{Collider, RigidBody};
use nebula_scene::{DebugTextRenderer, Mesh, Part, SceneNode, hex};

fn make_engine(object_count: usize) -> (GameEngine<DebugTextRenderer>, ManualTime) {
    let time = ManualTime::new();
    let mut engine = GameEngine::new(DebugTextRenderer::new()).time_source(time.clone());
    let side = (object_count as f32).sqrt().ceil() as usize;
    for i in 0..object_count {
        let x = (i % side) as f32 * 2.0;
        let z = (i / side) as f32 * 2.0;
        let body = RigidBody::new(1.0, Collider::Sphere { radius: 0.8 })
            .with_position(Vec3::new(x, 0.0, z))
            .with_velocity(Vec3::new(0.0, 0.0, 1.0));
        let visual = SceneNode::new(vec![Part::new(Mesh::Sphere, hex(0xff4444))]);
        engine
            .add_game_object(
                GameObject::new(format!("enemy-{i}"), ObjectKind::Enemy, visual, Inert)
                    .with_body(body),
            )
            .unwrap();
    }
    (engine, time)
}

fn bench_tick(object_count: usize, iterations: usize) {
    let (mut engine, time) = make_engine(object_count);
    engine.start();

    let start = Instant::now();
    for _ in 0..iterations {
        time.advance_secs(1.0 / 60.0);
        let _ = black_box(engine.frame().unwrap());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!(
        "  tick ({object_count} objects, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}"
    );
}

fn bench_add_remove(object_count: usize) {
    let (mut engine, _) = make_engine(0);
    let start = Instant::now();
    for i in 0..object_count {
        engine
            .add_game_object(GameObject::new(
                format!("p-{i}"),
                ObjectKind::PlayerProjectile,
                SceneNode::empty(),
                Inert,
            ))
            .unwrap();
    }
    for i in 0..object_count {
        black_box(engine.remove_game_object(&format!("p-{i}").into()));
    }
    let elapsed = start.elapsed();
    println!("  add+remove ({object_count} objects): total {elapsed:?}");
}

fn main() {
    println!("=== Engine Tick Benchmarks ===\n");

    println!("[tick]");
    bench_tick(10, 1000);
    bench_tick(100, 500);
    bench_tick(500, 100);

    println!("\n[registry]");
    bench_add_remove(1_000);
    bench_add_remove(10_000);
}
