//! Per-connection session handlers.
//!
//! The server instantiates one handler per connection, selected by the
//! `protocol` configuration setting:
//!
//! - `telnet`: baseline handler, sends the stock opening negotiation and
//!   runs the line loop.
//! - `server_echo`: baseline behavior plus one forced IAC WILL ECHO at
//!   connection open; the server then echoes input back itself.

pub mod server_echo;
pub mod telnet;

use crate::config::{Config, SessionProtocol};
use tokio::net::TcpStream;

/// Session settings shared by all handlers, extracted from [`Config`].
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub banner: String,
    pub max_line_length: usize,
    pub idle_timeout: u64,
}

impl SessionParams {
    pub fn from_config(config: &Config) -> Self {
        SessionParams {
            banner: config.banner.clone(),
            max_line_length: config.max_line_length,
            idle_timeout: config.idle_timeout,
        }
    }
}

/// Run the configured handler for one connection.
pub async fn dispatch(
    protocol: SessionProtocol,
    stream: TcpStream,
    params: SessionParams,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match protocol {
        SessionProtocol::Telnet => telnet::handle_connection(stream, params).await,
        SessionProtocol::ServerEcho => server_echo::handle_connection(stream, params).await,
    }
}
