//! Relay transport.
//!
//! The session talks to the relay through two small traits so it stays
//! synchronous and testable. The WebSocket implementation runs the socket in
//! a background tokio task: outbound frames go in through an mpsc channel,
//! socket events come back through another, tagged with the connection
//! generation that opened them so events from a torn-down socket can be
//! told apart from the live one.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use lanchat_shared::ChatError;

/// Socket lifecycle events delivered to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Frame(String),
    Closed,
    Error(String),
}

/// Write half of an open connection.
pub trait FrameSink {
    fn send_text(&mut self, frame: String) -> Result<(), ChatError>;
    /// Begin closing. Never fails; a sink that is already gone is ignored.
    fn close(&mut self);
}

/// Opens connections to the relay.
pub trait Connector {
    /// Start connecting to `url`. Events for this connection must be reported
    /// with `generation`.
    fn open(&mut self, url: &str, generation: u64) -> Result<Box<dyn FrameSink>, ChatError>;
}

pub type TransportEventSender = mpsc::UnboundedSender<(u64, TransportEvent)>;
pub type TransportEventReceiver = mpsc::UnboundedReceiver<(u64, TransportEvent)>;

#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

/// [`Connector`] backed by `tokio-tungstenite`. Must be used from within a
/// tokio runtime.
pub struct WsConnector {
    events_tx: TransportEventSender,
}

impl WsConnector {
    pub fn new(events_tx: TransportEventSender) -> Self {
        Self { events_tx }
    }

    /// Connector plus the receiver the caller should feed back into the
    /// session.
    pub fn channel() -> (Self, TransportEventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Connector for WsConnector {
    fn open(&mut self, url: &str, generation: u64) -> Result<Box<dyn FrameSink>, ChatError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ChatError::Transport(format!("No async runtime: {e}")))?;

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let url = url.to_string();
        let events_tx = self.events_tx.clone();

        runtime.spawn(async move {
            run_socket(url, generation, out_rx, events_tx).await;
        });

        Ok(Box::new(WsSink { tx: out_tx }))
    }
}

struct WsSink {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl FrameSink for WsSink {
    fn send_text(&mut self, frame: String) -> Result<(), ChatError> {
        self.tx
            .send(Outbound::Text(frame))
            .map_err(|_| ChatError::Transport("Socket task has stopped".into()))
    }

    fn close(&mut self) {
        let _ = self.tx.send(Outbound::Close);
    }
}

async fn run_socket(
    url: String,
    generation: u64,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: TransportEventSender,
) {
    let report = |event: TransportEvent| {
        if events.send((generation, event)).is_err() {
            debug!(generation, "Session gone, dropping transport event");
        }
    };

    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!(url = %url, error = %e, "WebSocket connect failed");
            report(TransportEvent::Error(e.to_string()));
            return;
        }
    };

    info!(url = %url, generation, "WebSocket connected");
    report(TransportEvent::Opened);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = write.send(WsMessage::Text(text)).await {
                        warn!(error = %e, "WebSocket send failed");
                        report(TransportEvent::Error(e.to_string()));
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    let _ = write.close().await;
                    info!(generation, "WebSocket closed locally");
                    report(TransportEvent::Closed);
                    return;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => report(TransportEvent::Frame(text)),
                Some(Ok(WsMessage::Ping(data))) => {
                    let _ = write.send(WsMessage::Pong(data)).await;
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    info!(generation, "WebSocket closed by relay");
                    report(TransportEvent::Closed);
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket read failed");
                    report(TransportEvent::Error(e.to_string()));
                    return;
                }
            },
        }
    }
}
