//! mudgate: a telnet front-end for MUD-style game servers.
//!
//! The server accepts telnet connections and runs a configurable session
//! handler per connection:
//! - `telnet`: baseline handler with stock opening negotiation
//! - `server-echo`: baseline plus a forced IAC WILL ECHO on connect,
//!   with server-side character echo for the rest of the session
//!
//! Configuration via CLI arguments or TOML file.

mod config;
mod server;
mod session;
mod telnet;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        protocol = ?config.protocol,
        workers = ?config.workers,
        "Starting mudgate server"
    );

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = config.workers {
        builder.worker_threads(workers);
    }
    let runtime = builder.build()?;

    runtime.block_on(async {
        let server = Server::bind(config).await?;
        server.run().await
    })
}
