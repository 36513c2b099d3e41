//! Headless demonstration of the flocking simulation.
//!
//! Run with: cargo run --example basic_demo [-- path/to/config.json]
//! Set `RUST_LOG=flock_sim=debug` to see predation and reset events.

use flock_sim::{FlockParams, FlockWorld, KindTag, SimConfig};

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let config = match std::env::args().nth(1) {
        Some(path) => match SimConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("could not load {path}: {err}");
                std::process::exit(1);
            }
        },
        None => SimConfig {
            rng_seed: Some(2024),
            ..Default::default()
        },
    };

    println!("=== Flock Sim - Headless Demo ===\n");
    let mut sim = FlockWorld::with_config(config);
    sim.set_params(FlockParams {
        use_obstacles: true,
        use_leaders: true,
        use_predators: true,
        show_global_vector: true,
        ..Default::default()
    });

    print_counts(&mut sim);

    // 10 seconds at 60 frames per second.
    let dt = 1.0 / 60.0;
    let mut signals = 0;
    for _ in 0..600 {
        let report = sim.frame(dt);
        signals += report.signal_broadcasts;
        if report.eaten > 0 {
            println!("tick {:>4}: predators ate {}", report.tick, report.eaten);
        }
        if report.plot_due {
            let metrics = sim.metrics();
            println!(
                "tick {:>4}: extension={:.1} alive={}",
                report.tick,
                metrics.extension.last().unwrap_or(0.0),
                metrics.alive.last().unwrap_or(0),
            );
        }
    }

    println!("\n{} signal broadcasts, {} eaten in total", signals, sim.total_eaten());
    print_counts(&mut sim);

    if let Some(gv) = sim.global_vector() {
        println!(
            "global vector: center=({:.1}, {:.1}) heading=({:.2}, {:.2})",
            gv.x, gv.y, gv.vx, gv.vy
        );
    }

    println!("\n=== Final State (JSON, first 400 bytes) ===\n");
    let json = sim.snapshot_json();
    println!("{}", &json[..json.len().min(400)]);
}

fn print_counts(sim: &mut FlockWorld) {
    println!(
        "normals={} predators={} leaders={}",
        sim.agent_count(KindTag::Normal),
        sim.agent_count(KindTag::Predator),
        sim.agent_count(KindTag::Leader),
    );
}
