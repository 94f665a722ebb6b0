//! Performance benchmarks for the hot paths: physics, serialization, the
//! delay queues, and the client-side prediction/interpolation machinery.

use shared::physics::{circles_overlap, step_position};
use shared::{COIN_RADIUS, PLAYER_RADIUS, PLAYER_SPEED};
use std::time::Instant;

/// Benchmarks movement integration performance
#[test]
fn benchmark_movement_integration() {
    let dt = 1.0 / 60.0;
    let iterations = 100_000;
    let start = Instant::now();

    let mut x = 100.0f32;
    let mut y = 100.0f32;
    for i in 0..iterations {
        let dx = if i % 2 == 0 { 1 } else { -1 };
        let (nx, ny) = step_position(x, y, dx, 1, PLAYER_SPEED, dt);
        x = nx;
        y = ny;
    }

    let duration = start.elapsed();
    println!(
        "Movement integration: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 100ms for 100k iterations
    assert!(duration.as_millis() < 100);
}

/// Benchmarks collision checking performance
#[test]
fn benchmark_collision_checks() {
    let iterations = 100_000;
    let start = Instant::now();

    let mut hits = 0u32;
    for i in 0..iterations {
        let offset = (i % 40) as f32;
        if circles_overlap(
            100.0,
            100.0,
            PLAYER_RADIUS,
            100.0 + offset,
            100.0,
            COIN_RADIUS,
        ) {
            hits += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Collision checks: {} iterations ({} hits) in {:?} ({:.2} ns/iter)",
        iterations,
        hits,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 100);
}

/// Benchmarks a full simulation tick with both players moving
#[test]
fn benchmark_full_simulation_tick() {
    use server::game::GameState;

    let mut game = GameState::with_seed(42);
    game.add_player(1);
    game.add_player(2);
    game.start();
    game.set_input(1, 1, 1);
    game.set_input(2, -1, 1);

    let dt = 1.0 / 600.0; // tiny steps so the game cannot end mid-benchmark
    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = game.tick(dt);
    }

    let duration = start.elapsed();
    println!(
        "Simulation: {} ticks in {:?} ({:.2} μs/tick)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks state snapshot serialization performance
#[test]
fn benchmark_snapshot_serialization() {
    use bincode::{deserialize, serialize};
    use server::game::GameState;
    use shared::protocol::Message;

    let mut game = GameState::with_seed(7);
    game.add_player(1);
    game.add_player(2);
    game.start();
    let snapshot = game.snapshot(12345.678);

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let serialized = serialize(&snapshot).unwrap();
        let _deserialized: Message = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot serialization: {} roundtrips in {:?} ({:.2} μs/roundtrip)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Stress tests the delay queue with a large backlog
#[test]
fn stress_test_delay_queue_backlog() {
    use shared::delay::DelayQueue;
    use std::time::Duration;

    let queue = DelayQueue::new(Duration::from_millis(200));
    let items = 10_000usize;

    let start = Instant::now();
    for i in 0..items {
        queue.enqueue(i, 1000.0 + i as f64 * 0.001);
    }
    let drained = queue.drain_ready(2000.0);
    let duration = start.elapsed();

    assert_eq!(drained.len(), items);
    // Release order follows enqueue order for monotonic timestamps.
    for window in drained.windows(2) {
        assert!(window[0] < window[1]);
    }

    println!(
        "Delay queue: {} enqueue+drain in {:?} ({:.2} μs/item)",
        items,
        duration,
        duration.as_micros() as f64 / items as f64
    );

    // Should handle 10k items in under 100ms
    assert!(duration.as_millis() < 100);
}

/// Benchmarks client-side prediction performance
#[test]
fn benchmark_client_prediction() {
    use client::prediction::LocalPredictor;

    let mut predictor = LocalPredictor::new();
    predictor.set_position(400.0, 300.0);

    let dt = 1.0 / 60.0;
    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let dx = if i % 2 == 0 { 1 } else { -1 };
        predictor.set_input(dx, 0);
        predictor.update(dt);
        if i % 3 == 0 {
            predictor.apply_server_correction(400.0, 300.0);
        }
    }

    let duration = start.elapsed();
    println!(
        "Prediction: {} updates in {:?} ({:.2} ns/update)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should handle 100k updates in under 500ms
    assert!(duration.as_millis() < 500);
}

/// Benchmarks interpolation buffer updates and queries under churn
#[test]
fn benchmark_interpolation_updates() {
    use client::interpolation::EntityManager;
    use shared::protocol::PlayerColor;

    let mut manager = EntityManager::new();
    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        let t = i as f64 * 0.05;
        manager.update_entity(2, t, (i % 800) as f32, 300.0, 0, PlayerColor::Red);
        let _ = manager.interpolated_positions(t);
    }

    let duration = start.elapsed();
    println!(
        "Interpolation: {} update+query cycles in {:?} ({:.2} μs/cycle)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should handle 10k cycles in under 500ms
    assert!(duration.as_millis() < 500);
}
