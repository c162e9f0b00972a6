use clap::Parser;
use log::{error, info};
use server::config::{HubConfig, OrphanPolicy, OverflowPolicy};
use server::demo::spawn_demo_state;
use server::hub::Hub;
use server::network::Server;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[arg(short, long, default_value = "4444")]
    port: u16,
    /// Frames buffered per connection
    #[arg(long, default_value = "256")]
    outbox_capacity: usize,
    /// What to do when a connection's buffer is full: drop-oldest or disconnect
    #[arg(long, default_value = "drop-oldest")]
    overflow: OverflowPolicy,
    /// Leave connections open when another connection claims their session
    #[arg(long)]
    keep_orphans: bool,
    /// Disconnect clients silent for this many seconds (0 = never)
    #[arg(long, default_value = "0")]
    read_timeout: u64,
    /// Disconnect clients whose socket write takes longer than this many seconds (0 = never)
    #[arg(long, default_value = "10")]
    write_timeout: u64,
    /// Disconnect clients that have not handshaken within this many seconds (0 = never)
    #[arg(long, default_value = "0")]
    handshake_timeout: u64,
    /// Inject a demo game state every this many seconds (0 = off)
    #[arg(long, default_value = "0")]
    demo_state_interval: u64,
}

fn seconds(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

impl Args {
    fn hub_config(&self) -> HubConfig {
        HubConfig {
            outbox_capacity: self.outbox_capacity,
            overflow: self.overflow,
            orphans: if self.keep_orphans {
                OrphanPolicy::Keep
            } else {
                OrphanPolicy::Close
            },
            read_timeout: seconds(self.read_timeout),
            write_timeout: seconds(self.write_timeout),
            handshake_timeout: seconds(self.handshake_timeout),
            ..HubConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let handle = Hub::start(args.hub_config());
    info!("Hub started: {:?}", handle.hub().config());

    let demo = seconds(args.demo_state_interval)
        .map(|period| spawn_demo_state(handle.hub(), period));

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::new(&address, handle.hub()).await?;
    let server_handle = tokio::spawn(server.run());

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Err(e)) => error!("Server stopped: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    if let Some(demo) = demo {
        demo.abort();
    }
    handle.shutdown().await;

    Ok(())
}
