mod game;
mod network;
mod registry;

use clap::Parser;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8765")]
    port: u16,

    /// Tick rate (simulation updates per second)
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Artificial network delay in milliseconds, applied in each direction
    #[arg(short = 'd', long, default_value_t = shared::NETWORK_DELAY_MS)]
    delay: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    info!("Starting coin collector server on {}", addr);
    info!("Simulated network latency: {}ms each way", args.delay);

    let tick_duration = Duration::from_secs_f64(1.0 / args.tick_rate as f64);
    let mut server = network::Server::new(
        &addr,
        tick_duration,
        Duration::from_millis(args.delay),
    )
    .await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
