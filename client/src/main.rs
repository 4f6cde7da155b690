use clap::Parser;
use client::events::ConsoleListener;
use client::network::Client;
use log::{info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:1234")]
    server: String,

    /// Display name announced to the server
    #[arg(short, long, default_value = "anonymous")]
    name: String,

    /// Seconds to stay connected; 0 runs until interrupted
    #[arg(short, long, default_value = "0")]
    duration: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("connecting to {} as {}", args.server, args.name);
    let mut client = Client::connect(&args.server, &args.name).await?;
    client.subscribe(Arc::new(ConsoleListener));

    tokio::select! {
        result = run_session(&mut client, args.duration) => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    client.send_exit().await?;
    Ok(())
}

/// Drives the mirror world: applies whatever the server sends, keeps the
/// local frame ticking, and walks forward once an identity arrives.
async fn run_session(
    client: &mut Client,
    duration: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();
    let frame = Duration::from_millis(16);
    let mut announced = false;

    loop {
        if duration > 0 && started.elapsed() >= Duration::from_secs(duration) {
            return Ok(());
        }

        match timeout(frame, client.poll()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("receive failed: {}", err),
            Err(_) => {} // no datagram this frame
        }

        if !announced && client.player_id().is_some() {
            if let Some(player) = client.local_player_mut() {
                player.move_forward(true);
            }
            client.send_refresh().await?;
            client.send_moves().await?;
            announced = true;
        }

        client.tick(frame.as_secs_f32());
    }
}
