//! Replay-on-subscribe example
//!
//! Run with: cargo run --example late_subscriber
//!
//! A configuration loader publishes its result as a delayed payload before
//! any consumer exists. Consumers that come up later still receive the most
//! recent configuration, both through a plain listener and through an async
//! receiver.

use std::time::Duration;

use hermes_bus::{Bus, Listener};

#[derive(Debug, Clone)]
struct Config {
    revision: u32,
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hermes_bus=debug".parse()?),
        )
        .init();

    let bus = Bus::<Config>::new();

    bus.publish_delayed(
        "config/loaded",
        Config {
            revision: 1,
            log_level: "info".into(),
        },
    )?;
    bus.publish_delayed(
        "config/loaded",
        Config {
            revision: 2,
            log_level: "debug".into(),
        },
    )?;

    // Receives revision 2 during this call
    let printer = Listener::infallible(|c: &Config| {
        println!("[listener] revision {} ({})", c.revision, c.log_level);
    });
    bus.subscribe_delayed("config/loaded", &printer)?;

    let mut rx = bus.listen_delayed("config/loaded")?;

    let reloader = bus.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let result = reloader.publish_delayed(
            "config/loaded",
            Config {
                revision: 3,
                log_level: "warn".into(),
            },
        );
        if let Err(e) = result {
            eprintln!("Reload failed: {}", e);
        }
    });

    for _ in 0..2 {
        match rx.recv().await {
            Some(c) => println!("[receiver] revision {} ({})", c.revision, c.log_level),
            None => break,
        }
    }

    Ok(())
}
