//! Baseline telnet session handler.
//!
//! Sends the stock opening negotiation and banner, then runs a
//! line-oriented loop: inbound bytes pass through [`TelnetFilter`] so IAC
//! sequences never reach line assembly, complete lines are dispatched,
//! and negotiation replies go straight back out. Game command dispatch is
//! not this crate's job; the loop answers each line itself so the session
//! is observable end to end.

use crate::session::SessionParams;
use crate::telnet::{self, option, TelnetFilter};
use bytes::{Buf, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

/// Read buffer size
const BUFFER_SIZE: usize = 4 * 1024;

/// Prompt written after the banner and after each dispatched line
const PROMPT: &[u8] = b"> ";

/// Handle a baseline telnet connection.
pub async fn handle_connection(
    stream: TcpStream,
    params: SessionParams,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (reader, mut writer) = stream.into_split();

    let advertised = open_negotiation(&mut writer).await?;
    send_banner(&mut writer, &params.banner).await?;

    let filter = TelnetFilter::new(&advertised);
    session_loop(reader, writer, params, filter, false).await
}

/// Send the stock opening negotiation for a new connection and return
/// the options advertised. Every handler delegates to this; overrides
/// add their own directives after it, never in place of it.
pub(crate) async fn open_negotiation<W>(writer: &mut W) -> std::io::Result<Vec<u8>>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&telnet::will(option::SUPPRESS_GO_AHEAD))
        .await?;
    Ok(vec![option::SUPPRESS_GO_AHEAD])
}

/// Send the banner line and the first prompt.
pub(crate) async fn send_banner<W>(writer: &mut W, banner: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(banner.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.write_all(PROMPT).await?;
    Ok(())
}

/// The shared line loop.
///
/// With `server_echo` set, filtered input bytes are echoed back to the
/// client as they arrive (line breaks rendered as CR LF), for clients
/// that suspended local echo after IAC WILL ECHO.
pub(crate) async fn session_loop<R, W>(
    mut reader: R,
    mut writer: W,
    params: SessionParams,
    mut filter: TelnetFilter,
    server_echo: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut read_buf = BytesMut::with_capacity(BUFFER_SIZE);
    let mut line_buf = BytesMut::with_capacity(BUFFER_SIZE);
    let mut replies = BytesMut::new();
    let mut discarding = false;

    loop {
        read_buf.clear();
        let n = if params.idle_timeout > 0 {
            let deadline = Duration::from_secs(params.idle_timeout);
            match tokio::time::timeout(deadline, reader.read_buf(&mut read_buf)).await {
                Ok(result) => result?,
                Err(_) => {
                    writer.write_all(b"Idle timeout, disconnecting.\r\n").await?;
                    return Ok(());
                }
            }
        } else {
            reader.read_buf(&mut read_buf).await?
        };

        if n == 0 {
            trace!("Connection closed by client");
            return Ok(());
        }

        let before = line_buf.len();
        filter.filter(&read_buf, &mut line_buf, &mut replies);

        if !replies.is_empty() {
            writer.write_all(&replies).await?;
            replies.clear();
        }

        if server_echo {
            echo_back(&mut writer, &line_buf[before..]).await?;
        }

        // Dispatch complete lines
        while let Some(pos) = line_buf.iter().position(|&b| b == b'\n') {
            let overlong = pos > params.max_line_length;
            let line = String::from_utf8_lossy(&line_buf[..pos]).into_owned();
            line_buf.advance(pos + 1);

            if discarding {
                // Tail of an over-long line; swallow it
                discarding = false;
                continue;
            }

            if overlong {
                writer.write_all(b"ERROR line too long\r\n").await?;
                writer.write_all(PROMPT).await?;
                continue;
            }

            let trimmed = line.trim();
            trace!(line = %trimmed, "Dispatching input line");

            if trimmed.eq_ignore_ascii_case("quit") {
                writer.write_all(b"Goodbye.\r\n").await?;
                return Ok(());
            }

            if !trimmed.is_empty() {
                writer.write_all(trimmed.as_bytes()).await?;
                writer.write_all(b"\r\n").await?;
            }
            writer.write_all(PROMPT).await?;
        }

        // Reject lines that outgrow the limit before a break arrives.
        // While discarding, anything left in the buffer is still the
        // tail of the rejected line (no break reached it), so it is
        // dropped too and the buffer stays bounded.
        if discarding {
            line_buf.clear();
        } else if line_buf.len() > params.max_line_length {
            writer.write_all(b"ERROR line too long\r\n").await?;
            writer.write_all(PROMPT).await?;
            line_buf.clear();
            discarding = true;
        }
    }
}

/// Echo filtered input back to the client, rendering `\n` as CR LF.
/// Literal 0xFF data bytes are re-escaped as IAC IAC so the client does
/// not read them as the start of a command sequence.
async fn echo_back<W>(writer: &mut W, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if data.is_empty() {
        return Ok(());
    }

    let mut out = BytesMut::with_capacity(data.len() + 2);
    for &byte in data {
        match byte {
            b'\n' => out.extend_from_slice(b"\r\n"),
            telnet::IAC => out.extend_from_slice(&[telnet::IAC, telnet::IAC]),
            _ => out.extend_from_slice(&[byte]),
        }
    }
    writer.write_all(&out).await
}
