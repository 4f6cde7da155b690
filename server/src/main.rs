use clap::Parser;
use log::info;
use server::network::{Server, ServerConfig};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "1234")]
    port: u16,

    /// Simulation tick interval in milliseconds
    #[arg(short, long, default_value = "16")]
    tick_ms: u64,

    /// State broadcast interval in milliseconds
    #[arg(short, long, default_value = "50")]
    broadcast_ms: u64,

    /// Seconds of silence before a session is dropped
    #[arg(long, default_value = "30")]
    session_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        tick_interval: Duration::from_millis(args.tick_ms),
        broadcast_interval: Duration::from_millis(args.broadcast_ms),
        session_timeout: Duration::from_secs(args.session_timeout),
    };

    info!("starting server on {}:{}", config.host, config.port);
    let server = Server::bind(config).await?;
    server.run().await
}
