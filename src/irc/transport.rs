//! The duplex connection to the IRC server: connect, line framing, and
//! paced writes. Generic over the stream type so tests can substitute an
//! in-memory duplex pipe instead of a real socket.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::BotError;
use crate::irc::pacing::PaceGate;
use crate::outbound::OutboundCommand;

const READ_CHUNK: usize = 4096;

/// One duplex IRC connection: a read buffer that accumulates bytes and
/// splits them into lines, plus a paced writer.
pub struct Transport<S> {
    stream: S,
    read_buf: Vec<u8>,
    pace: PaceGate,
}

impl Transport<TcpStream> {
    /// Connect to `addr`, bounded by `connect_timeout`, then send `PASS`
    /// and `NICK` to begin IRC registration.
    pub async fn connect(
        addr: &str,
        username: &str,
        password: &str,
        connect_timeout: Duration,
    ) -> Result<Self, BotError> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| BotError::ConnectTimeout {
                addr: addr.to_string(),
            })?
            .map_err(|source| BotError::Transport {
                action: "connect",
                source,
            })?;

        let mut transport = Transport::new(stream);
        transport.send(&OutboundCommand::raw(format!("PASS {password}"))).await?;
        transport.send(&OutboundCommand::raw(format!("NICK {username}"))).await?;
        Ok(transport)
    }
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_buf: Vec::new(),
            pace: PaceGate::new(),
        }
    }

    /// Write one command to the wire, respecting the inter-send pace gate.
    pub async fn send(&mut self, command: &OutboundCommand) -> Result<(), BotError> {
        self.pace.wait().await;
        let mut line = command.to_wire_line();
        line.push_str("\r\n");
        self.stream
            .write_all(line.as_bytes())
            .await
            .map_err(|source| BotError::Transport {
                action: "send",
                source,
            })
    }

    /// Return the next complete line already buffered, if any, without
    /// touching the socket.
    fn take_buffered_line(&mut self) -> Option<String> {
        let newline_at = self.read_buf.iter().position(|&b| b == b'\n')?;
        let mut line_bytes: Vec<u8> = self.read_buf.drain(..=newline_at).collect();
        line_bytes.pop(); // '\n'
        if line_bytes.last() == Some(&b'\r') {
            line_bytes.pop();
        }
        Some(String::from_utf8_lossy(&line_bytes).into_owned())
    }

    /// Read the next complete line, pulling more bytes from the socket as
    /// needed. Returns `Ok(None)` on a clean EOF (the peer closed the
    /// connection); that is treated as a disconnect by the caller.
    pub async fn read_line(&mut self) -> Result<Option<String>, BotError> {
        if let Some(line) = self.take_buffered_line() {
            return Ok(Some(line));
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(|source| BotError::Transport {
                    action: "recv",
                    source,
                })?;
            if n == 0 {
                return Ok(None);
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
            if let Some(line) = self.take_buffered_line() {
                return Ok(Some(line));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn reads_one_line_split_across_two_receives() {
        let (mut client, server) = duplex(64);
        let mut transport = Transport::new(server);

        client.write_all(b"hello wo").await.unwrap();
        client.write_all(b"rld\r\n").await.unwrap();

        let line = transport.read_line().await.unwrap().unwrap();
        assert_eq!(line, "hello world");
    }

    #[tokio::test]
    async fn buffers_a_second_line_past_the_first_newline() {
        let (mut client, server) = duplex(64);
        let mut transport = Transport::new(server);

        client.write_all(b"one\r\ntwo\r\n").await.unwrap();

        assert_eq!(transport.read_line().await.unwrap().unwrap(), "one");
        assert_eq!(transport.read_line().await.unwrap().unwrap(), "two");
    }

    #[tokio::test]
    async fn clean_close_yields_none() {
        let (client, server) = duplex(64);
        let mut transport = Transport::new(server);
        drop(client);

        assert_eq!(transport.read_line().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn send_paces_two_writes() {
        let (mut client, server) = duplex(256);
        let mut transport = Transport::new(server);

        let start = tokio::time::Instant::now();
        transport
            .send(&OutboundCommand::raw("JOIN #mp_1"))
            .await
            .unwrap();
        transport
            .send(&OutboundCommand::raw("JOIN #mp_2"))
            .await
            .unwrap();
        assert!(tokio::time::Instant::now() >= start + Duration::from_millis(500));

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).starts_with("JOIN #mp_1"));
    }
}
