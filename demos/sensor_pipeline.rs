//! A small sensor pipeline showing how to wire and run nodes with Relay.
//!
//! This example demonstrates:
//! - Declaring message types with `relay::message!`
//! - A producer node that broadcasts on its default service
//! - A bounded channel edge (backpressure) into a consumer node
//! - A converter edge and a callback edge on the same service
//! - Halting on ctrl-c, or when the sensor runs out of samples
//!
//! Run with `RUST_LOG=info cargo run --example sensor_pipeline`.

use relay::prelude::*;
use relay::{message_to_json, LogTelemetry};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Messages
// ============================================================================

relay::message! {
    /// A raw temperature sample in degrees Celsius.
    pub struct Temperature {
        pub sensor: String,
        pub celsius: f64,
    }
}

relay::message! {
    pub struct Fahrenheit {
        pub degrees: f64,
    }
}

// ============================================================================
// Step 1: The sensor
// ============================================================================

/// Emits a fixed number of samples, one every `period`.
struct Thermometer {
    core: NodeCore,
    samples: usize,
    period: Duration,
}

#[async_trait::async_trait]
impl Node for Thermometer {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    async fn setup(&mut self) -> Result<(), NodeError> {
        log::info!("{} warming up", self.core.name());
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }

    async fn run(&mut self) -> Result<(), NodeError> {
        let mut ticker = tokio::time::interval(self.period);
        for i in 0..self.samples {
            ticker.tick().await;
            let sample = Temperature {
                sensor: self.core.name().to_string(),
                celsius: 20.0 + (i as f64 * 0.7).sin() * 3.0,
                ..Default::default()
            };
            // Suspends while the averaging node's channel is full.
            self.core.broadcast(&sample, DEFAULT_SERVICE).await?;
        }
        log::info!("{} out of samples", self.core.name());
        Ok(())
    }
}

// ============================================================================
// Step 2: The consumer
// ============================================================================

/// Keeps a running mean of what it reads.
struct Averager {
    core: NodeCore,
    inbox: Option<Inbox>,
    total: f64,
    count: usize,
}

#[async_trait::async_trait]
impl Node for Averager {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn take(&mut self) {
        self.inbox = self.core.take_inbox("samples");
    }

    async fn run(&mut self) -> Result<(), NodeError> {
        let Some(inbox) = self.inbox.as_mut() else {
            return Err(NodeError::msg("samples were never wired"));
        };
        while let Some(sample) = inbox.recv_as::<Temperature>().await {
            self.total += sample.celsius;
            self.count += 1;
            // A slow consumer, so the sensor feels the backpressure.
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        Ok(())
    }

    async fn teardown(&mut self) -> Result<(), NodeError> {
        if self.count > 0 {
            log::info!(
                "{} averaged {:.2} C over {} samples",
                self.core.name(),
                self.total / self.count as f64,
                self.count
            );
        }
        Ok(())
    }
}

// ============================================================================
// Step 3: A display fed through a converter and a callback
// ============================================================================

struct Display {
    core: NodeCore,
}

impl Node for Display {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut averager = Averager {
        core: NodeCore::new("averager"),
        inbox: None,
        total: 0.0,
        count: 0,
    };
    averager.core.declare_subscription(
        Subscription::new("samples")
            .capacity(2)
            .message_type::<Temperature>()
            .producer_type::<Thermometer>(),
    )?;

    let mut display = Display {
        core: NodeCore::new("display"),
    };
    display.core.declare_subscription(
        Subscription::new("fahrenheit")
            .message_type::<Fahrenheit>()
            .callback(|message| {
                log::info!("display: {}", message_to_json(&*message));
                Ok(())
            }),
    )?;

    let mut thermometer = Thermometer {
        core: NodeCore::new("thermometer"),
        samples: 20,
        period: Duration::from_millis(10),
    };
    thermometer
        .core
        .declare_service(DEFAULT_SERVICE, Some(relay::TypeTag::of::<Temperature>()));

    let config = CoordinatorConfig::new()
        .with_name("pipeline")
        .with_interrupt_handling(true);
    let mut coordinator = Coordinator::new(config).with_telemetry(Arc::new(LogTelemetry));
    let sensor = coordinator.add_node(thermometer);
    let averager = coordinator.add_node(averager);
    let display = coordinator.add_node(display);

    coordinator.subscribe(sensor, averager, "samples")?;
    coordinator.subscribe_with(
        sensor,
        display,
        "fahrenheit",
        None,
        Some(converter(|t: &Temperature| Fahrenheit {
            degrees: t.celsius * 9.0 / 5.0 + 32.0,
            ..Default::default()
        })),
    )?;

    let report = coordinator.run().await?;
    println!("run {} ended: {}", report.run_id, report.halt_reason);
    for (node, outcome) in &report.outcomes {
        println!("  {node}: {outcome}");
    }
    Ok(())
}
