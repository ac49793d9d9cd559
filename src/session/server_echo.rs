//! Server-echo session handler.
//!
//! Identical to the baseline telnet handler except for one thing: right
//! after the stock opening negotiation, it writes IAC WILL ECHO to the
//! client, exactly once per connection, telling the client this server
//! will echo typed characters and local echo should stop. The directive
//! is best-effort: nothing waits for a client acknowledgment, and a
//! client that ignores it simply keeps echoing locally. The session loop
//! then runs with server-side echo enabled so honoring clients still see
//! their own typing.

use crate::session::{telnet as baseline, SessionParams};
use crate::telnet::{self, option, TelnetFilter};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::trace;

/// Handle a connection with forced server-side echo.
pub async fn handle_connection(
    stream: TcpStream,
    params: SessionParams,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (reader, mut writer) = stream.into_split();

    // Baseline opening negotiation first, unchanged
    let mut advertised = baseline::open_negotiation(&mut writer).await?;

    // The override: one forced IAC WILL ECHO, no reply awaited
    writer.write_all(&telnet::WILL_ECHO).await?;
    advertised.push(option::ECHO);
    trace!("Sent forced IAC WILL ECHO");

    baseline::send_banner(&mut writer, &params.banner).await?;

    // ECHO is in the advertised set, so a client DO ECHO is treated as
    // already granted rather than answered with a second directive
    let filter = TelnetFilter::new(&advertised);
    baseline::session_loop(reader, writer, params, filter, true).await
}
