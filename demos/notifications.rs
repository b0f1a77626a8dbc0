//! Notification fan-out example
//!
//! Run with: cargo run --example notifications
//!
//! Set RUST_LOG=hermes_bus=trace to see every delivery.
//!
//! Shows:
//! - Lazy channel/topic creation on first use
//! - Duplicate subscriptions being ignored unless forced
//! - A listener error halting delivery and reaching the publisher

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hermes_bus::{Bus, Listener, ListenerError};

#[derive(Debug, Clone)]
enum Notification {
    Email { to: String, subject: String },
    Sms { to: String, body: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hermes_bus=debug".parse()?),
        )
        .init();

    let bus = Bus::<Notification>::new();
    let sent = Arc::new(AtomicU64::new(0));

    let counter = Arc::clone(&sent);
    let audit = Listener::infallible(move |n: &Notification| {
        counter.fetch_add(1, Ordering::Relaxed);
        println!("[audit] {:?}", n);
    });

    let sms_gateway = Listener::new(|n: &Notification| match n {
        Notification::Sms { to, .. } if to.is_empty() => {
            Err(ListenerError::msg("sms without recipient"))
        }
        Notification::Sms { to, body } => {
            println!("[sms] {} <- {}", to, body);
            Ok(())
        }
        Notification::Email { .. } => Ok(()),
    });

    bus.subscribe("outbox/email", &audit)?;
    bus.subscribe("outbox/email", &audit)?; // ignored
    bus.subscribe("outbox/sms", &sms_gateway)?;
    bus.subscribe("outbox/sms", &audit)?;

    bus.publish(
        "outbox/email",
        Notification::Email {
            to: "ops@example.com".into(),
            subject: "Nightly report".into(),
        },
    )?;

    bus.publish(
        "outbox/sms",
        Notification::Sms {
            to: "+15550100".into(),
            body: "Deploy finished".into(),
        },
    )?;

    // The gateway rejects this one, so the audit listener never sees it
    if let Err(e) = bus.publish(
        "outbox/sms",
        Notification::Sms {
            to: String::new(),
            body: "lost".into(),
        },
    ) {
        println!("publish failed: {}", e);
    }

    println!("channels: {:?}", bus.channel_names());
    if let Some(stats) = bus.topic_stats("outbox/sms")? {
        println!("outbox/sms: {:?}", stats);
    }
    println!("audited: {}", sent.load(Ordering::Relaxed));

    Ok(())
}
