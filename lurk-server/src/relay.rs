//! Outbound relays.
//!
//! The relays are ordinary bus handlers. They render socket events and chat
//! messages into lines and hand them to a channel; a writer task owns stdout
//! and prints whatever arrives.

use crate::config::file::OutputFormat;
use async_trait::async_trait;
use lurk_core::events::{Event, EventBus, EventHandler};
use lurk_core::{RaceError, RaceResult};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Buffer size for the outbound channel.
pub const OUTBOUND_BUFFER: usize = 256;

pub type OutboundSender = mpsc::Sender<String>;
pub type OutboundReceiver = mpsc::Receiver<String>;

pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    mpsc::channel(OUTBOUND_BUFFER)
}

/// Forwards socket events as packets.
pub struct SocketRelay {
    format: OutputFormat,
    tx: OutboundSender,
}

impl SocketRelay {
    pub fn new(format: OutputFormat, tx: OutboundSender) -> Self {
        Self { format, tx }
    }

    fn render(&self, event: &Event) -> RaceResult<Option<String>> {
        let Event::Socket(socket) = event else {
            return Ok(None);
        };
        let packet = socket.packet();
        let line = match self.format {
            OutputFormat::Line => packet.to_line(),
            OutputFormat::Json => {
                serde_json::to_string(&packet).map_err(|e| RaceError::Handler {
                    handler: self.name(),
                    kind: event.kind(),
                    reason: e.to_string(),
                })?
            }
        };
        Ok(Some(line))
    }
}

#[async_trait]
impl EventHandler for SocketRelay {
    fn name(&self) -> &'static str {
        "socket_relay"
    }

    async fn handle(&self, _bus: &EventBus, event: &Event) -> RaceResult<()> {
        let Some(line) = self.render(event)? else {
            return Ok(());
        };
        send(&self.tx, event, line).await
    }
}

/// Forwards chat messages as `chat <message>` lines.
pub struct ChatRelay {
    tx: OutboundSender,
}

impl ChatRelay {
    pub fn new(tx: OutboundSender) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventHandler for ChatRelay {
    fn name(&self) -> &'static str {
        "chat_relay"
    }

    async fn handle(&self, _bus: &EventBus, event: &Event) -> RaceResult<()> {
        let Event::Chat(chat) = event else {
            return Ok(());
        };
        send(&self.tx, event, format!("chat {}", chat.message)).await
    }
}

async fn send(tx: &OutboundSender, event: &Event, line: String) -> RaceResult<()> {
    tx.send(line)
        .await
        .map_err(|_| RaceError::OutboundClosed { kind: event.kind() })
}

/// Write every outbound line to `out` until all senders are dropped.
pub async fn run_writer<W>(mut rx: OutboundReceiver, mut out: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    tracing::debug!("Outbound channel closed, writer stopping");
    Ok(())
}
