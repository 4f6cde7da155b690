//! Performance benchmarks for critical game systems

use glam::Vec3;
use shared::{Message, Player, PlayerSnapshot, World};
use std::time::Instant;

/// Benchmarks the point-in-sphere contact test
#[test]
fn benchmark_hit_sphere_tests() {
    let player = Player::new("p-1", "", Vec3::new(1.0, 2.0, 3.0));
    let probe = Vec3::new(1.5, 2.0, 3.0);

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = player.hit_sphere_contains(probe);
    }

    let duration = start.elapsed();
    println!(
        "Hit-sphere test: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 100ms for 100k iterations
    assert!(duration.as_millis() < 100);
}

/// Benchmarks a full world tick with a crowded arena
#[test]
fn benchmark_world_update() {
    let mut world = World::new();
    for i in 0..100 {
        let id = format!("p-{}", i);
        let mut player = Player::new(&id, "", Vec3::new((i as f32) * 0.5 - 25.0, 0.0, 5.0));
        player.move_forward(true);
        world.add_player(player);
    }

    let dt = 1.0 / 60.0;
    let iterations = 1000;
    let start = Instant::now();

    for _ in 0..iterations {
        world.update(dt);
    }

    let duration = start.elapsed();
    println!(
        "World update: {} players × {} ticks in {:?} ({:.2} μs/tick)",
        world.players().count(),
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks ticking a world saturated with projectiles
#[test]
fn benchmark_bullet_pass() {
    let mut world = World::new();
    for i in 0..50 {
        let id = format!("p-{}", i);
        world.add_player(Player::new(&id, "", Vec3::new((i as f32) * 0.1, 0.0, 0.0)));
    }
    let ids: Vec<String> = world.players().map(|p| p.id().to_string()).collect();
    for id in &ids {
        world.fire(id);
    }

    let iterations = 100;
    let start = Instant::now();

    for _ in 0..iterations {
        world.update(1.0 / 60.0);
    }

    let duration = start.elapsed();
    println!(
        "Bullet pass: 50 shooters × {} ticks in {:?} ({:.2} μs/tick)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 1000);
}

/// Benchmarks frame encode and decode throughput
#[test]
fn benchmark_frame_codec() {
    let snapshot = PlayerSnapshot {
        id: "p-1".to_string(),
        name: "bench".to_string(),
        position: Some(Vec3::new(1.0, 2.0, -3.0).into()),
        direction: Vec3::NEG_Z.into(),
        velocity: Vec3::ZERO.into(),
        up: Vec3::Y.into(),
        vertical_angle: 0.1,
        horizontal_angle: -0.1,
    };
    let message = Message::RefreshPlayer(snapshot);

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let encoded = message.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(decoded.kind(), "refresh_player");
    }

    let duration = start.elapsed();
    println!(
        "Frame codec: {} round trips in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}
