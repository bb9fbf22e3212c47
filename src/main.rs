//! Entry point for `telemetry-over-udp`.
//!
//! Parses CLI arguments and dispatches into either **producer** or
//! **consumer** mode.  All protocol work is delegated to library modules;
//! `main.rs` owns only process setup (logging, argument parsing) and the
//! per-role outer loops.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

use telemetry_over_udp::config::LinkConfig;
use telemetry_over_udp::consumer::{Consumer, LogSink};
use telemetry_over_udp::producer::{DeliveryOutcome, Producer};
use telemetry_over_udp::sampler::Sampler;
use telemetry_over_udp::transport::UdpTransport;

/// Reliable stop-and-wait telemetry over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand)]
enum Role {
    /// Emit a telemetry sample every 2 seconds and deliver it reliably.
    Producer {
        /// Local address to bind.
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
        /// Consumer address to deliver to.
        #[arg(short, long, default_value = "127.0.0.1:8081")]
        peer: SocketAddr,
    },
    /// Receive, validate, and acknowledge telemetry samples.
    Consumer {
        /// Local address to bind.
        #[arg(short, long, default_value = "127.0.0.1:8081")]
        bind: SocketAddr,
        /// Producer address to acknowledge to.
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        peer: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    match cli.role {
        Role::Producer { bind, peer } => {
            let cfg = LinkConfig {
                bind_addr: bind,
                peer_addr: peer,
                ..LinkConfig::producer()
            };
            run_producer(cfg).await
        }
        Role::Consumer { bind, peer } => {
            let cfg = LinkConfig {
                bind_addr: bind,
                peer_addr: peer,
                ..LinkConfig::consumer()
            };
            run_consumer(cfg).await
        }
    }
}

/// Producer loop: one sample per period, delivered end-to-end before the
/// next one starts.  The sequence counter advances even when delivery fails,
/// matching the consumer's gap-tolerant cursor.
async fn run_producer(cfg: LinkConfig) -> anyhow::Result<()> {
    let transport = UdpTransport::bind(cfg.bind_addr).await?;
    transport.connect(cfg.peer_addr).await?;
    log::info!(
        "producer on {} delivering to {}",
        transport.local_addr,
        cfg.peer_addr
    );

    let producer = Producer::with_policy(transport, cfg.response_timeout, cfg.max_attempts);
    let mut sampler = Sampler::new();
    let mut sequence: u16 = 0;

    loop {
        let sample = sampler.next_sample();
        match producer.deliver(&sample, sequence).await {
            DeliveryOutcome::Delivered => log::info!("delivered seq={sequence}"),
            DeliveryOutcome::Failed => log::warn!(
                "seq={sequence} undelivered after {} transmissions",
                cfg.max_attempts
            ),
        }
        sequence = sequence.wrapping_add(1);
        tokio::time::sleep(cfg.sample_period).await;
    }
}

/// Consumer loop: block for datagrams forever, logging each accepted sample.
async fn run_consumer(cfg: LinkConfig) -> anyhow::Result<()> {
    let transport = UdpTransport::bind(cfg.bind_addr).await?;
    transport.connect(cfg.peer_addr).await?;
    log::info!(
        "consumer on {} acknowledging to {}",
        transport.local_addr,
        cfg.peer_addr
    );

    let mut consumer = Consumer::new(transport, LogSink);
    consumer.run().await;
    Ok(())
}
