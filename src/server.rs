//! TCP server for telnet sessions.
//!
//! Accepts connections and hands each one to the session handler
//! selected by configuration. The handlers own everything after accept;
//! transport errors propagate back here and are logged per connection.

use crate::config::Config;
use crate::session::{self, SessionParams};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Maximum number of concurrent connections
const MAX_CONNECTIONS: usize = 1024;

/// Server instance
pub struct Server {
    listener: TcpListener,
    config: Config,
    connection_limit: Arc<Semaphore>,
}

impl Server {
    /// Bind the listener. Bind failures surface at startup.
    pub async fn bind(config: Config) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.listen).await?;
        info!(
            address = %config.listen,
            protocol = ?config.protocol,
            "Server listening"
        );

        Ok(Server {
            listener,
            config,
            connection_limit: Arc::new(Semaphore::new(MAX_CONNECTIONS)),
        })
    }

    /// The address the listener actually bound to, for tests on port 0.
    #[cfg(test)]
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one task per connection.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            // Wait for a connection slot
            let permit = self.connection_limit.clone().acquire_owned().await?;

            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(peer = %addr, "New connection");

                    let protocol = self.config.protocol;
                    let params = SessionParams::from_config(&self.config);

                    tokio::spawn(async move {
                        if let Err(e) = session::dispatch(protocol, stream, params).await {
                            debug!(error = %e, "Connection error");
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
