// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::time::Duration;

use anyhow::Context as _;
use manifold_engine::config::load_topology;
use manifold_engine::workers::{stub_manifold, EventLog};
use manifold_engine::Engine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_RUN_SECONDS: u64 = 10;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "manifold_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <topology.yaml|toml> [run_seconds]", args[0]);
        eprintln!("Example: {} configs/demo.yaml 10", args[0]);
        std::process::exit(1);
    }

    let run_for = match args.get(2) {
        Some(seconds) => Duration::from_secs(
            seconds
                .parse()
                .with_context(|| format!("run_seconds must be a whole number, got '{}'", seconds))?,
        ),
        None => Duration::from_secs(DEFAULT_RUN_SECONDS),
    };

    let topology = load_topology(&args[1])
        .with_context(|| format!("loading topology from {}", args[1]))?;

    println!("⚙️  Manifold Engine");
    println!("══════════════════");
    println!("Topology: {} ({} manifolds)", args[1], topology.manifolds.len());
    println!("Running for {:?} (ctrl-c stops early)", run_for);
    println!();

    let engine = Engine::new(topology.engine.clone())?;
    let log = EventLog::new();
    for manifold in &topology.manifolds {
        engine
            .install(
                manifold.name.as_str(),
                stub_manifold(manifold.inputs.clone(), manifold.behavior.clone(), log.clone()),
            )
            .await?;
    }

    tokio::select! {
        _ = tokio::time::sleep(run_for) => {}
        _ = tokio::signal::ctrl_c() => println!("\nInterrupted"),
    }

    let report = engine.report().await?;
    println!("\n📊 Engine report:");
    println!("{}", serde_json::to_string_pretty(&report)?);

    engine.kill();
    let result = engine.wait().await;

    println!("\n📜 Lifecycle events:");
    for (i, entry) in log.entries().iter().enumerate() {
        println!("  {:>3}. {}", i + 1, entry);
    }

    match result {
        Ok(()) => {
            println!("\n✅ Engine stopped cleanly");
            Ok(())
        }
        Err(error) => Err(anyhow::Error::new(error).context("engine stopped with an error")),
    }
}
