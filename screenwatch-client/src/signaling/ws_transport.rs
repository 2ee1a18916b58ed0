use crate::error::SignalingError;
use crate::signaling::listeners::{Listener, ListenerId, Listeners};
use crate::signaling::signaling_transport::{SignalingOptions, SignalingTransport, TransportStatus};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use screenwatch_core::{EventName, RelayEvent};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum PumpExit {
    /// The relay closed the socket or it errored; worth reconnecting.
    SocketLost,
    /// The owning transport was dropped.
    Shutdown,
}

/// Websocket client channel to the relay.
///
/// `connect` never fails: reachability problems are reported through
/// [`SignalingTransport::status`] once the reconnection budget is spent.
pub struct WsTransport {
    outbound: mpsc::UnboundedSender<RelayEvent>,
    listeners: Arc<Listeners>,
    status_rx: watch::Receiver<TransportStatus>,
    driver: JoinHandle<()>,
}

impl WsTransport {
    pub fn connect(url: impl Into<String>, options: SignalingOptions) -> Self {
        let url = url.into();
        let listeners = Arc::new(Listeners::new());
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(TransportStatus::Connecting);

        let driver = tokio::spawn(drive(
            url,
            options,
            outbound_rx,
            listeners.clone(),
            status_tx,
        ));

        Self {
            outbound,
            listeners,
            status_rx,
            driver,
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[async_trait]
impl SignalingTransport for WsTransport {
    async fn emit(&self, event: RelayEvent) {
        if *self.status_rx.borrow() != TransportStatus::Connected {
            warn!("Relay not connected, dropping '{}'", event.name());
            return;
        }
        if self.outbound.send(event).is_err() {
            warn!("Relay driver is gone, event dropped");
        }
    }

    fn on(&self, name: EventName, listener: Listener) -> ListenerId {
        self.listeners.on(name, listener)
    }

    fn off(&self, name: EventName, id: ListenerId) {
        self.listeners.off(name, id);
    }

    fn status(&self) -> watch::Receiver<TransportStatus> {
        self.status_rx.clone()
    }
}

async fn drive(
    url: String,
    options: SignalingOptions,
    mut outbound_rx: mpsc::UnboundedReceiver<RelayEvent>,
    listeners: Arc<Listeners>,
    status_tx: watch::Sender<TransportStatus>,
) {
    loop {
        let Some(ws) = connect_with_retries(&url, &options, &status_tx).await else {
            status_tx.send_replace(TransportStatus::Disconnected);
            return;
        };

        info!("Connected to relay {}", url);
        status_tx.send_replace(TransportStatus::Connected);

        match pump(ws, &mut outbound_rx, &listeners).await {
            PumpExit::SocketLost => {
                warn!("Relay connection lost, reconnecting");
                status_tx.send_replace(TransportStatus::Disconnected);
            }
            PumpExit::Shutdown => {
                status_tx.send_replace(TransportStatus::Disconnected);
                return;
            }
        }
    }
}

async fn connect_with_retries(
    url: &str,
    options: &SignalingOptions,
    status_tx: &watch::Sender<TransportStatus>,
) -> Option<WsStream> {
    for attempt in 1..=options.reconnection_attempts {
        status_tx.send_replace(TransportStatus::Connecting);

        match tokio::time::timeout(options.connect_timeout, connect_async(url)).await {
            Ok(Ok((ws, _))) => return Some(ws),
            Ok(Err(e)) => warn!("Relay connect attempt {} failed: {}", attempt, e),
            Err(_) => warn!(
                "Relay connect attempt {} timed out after {:?}",
                attempt, options.connect_timeout
            ),
        }

        if attempt < options.reconnection_attempts {
            tokio::time::sleep(options.reconnection_delay).await;
        }
    }

    let e = SignalingError::ConnectionError(format!(
        "{url} unreachable after {} attempts",
        options.reconnection_attempts
    ));
    error!("Giving up: {}", e);
    None
}

async fn pump(
    ws: WsStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<RelayEvent>,
    listeners: &Listeners,
) -> PumpExit {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            out = outbound_rx.recv() => {
                let Some(event) = out else {
                    let _ = sink.close().await;
                    return PumpExit::Shutdown;
                };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize '{}': {}", event.name(), e);
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text.into())).await {
                    warn!("Relay send failed: {}", e);
                    return PumpExit::SocketLost;
                }
            }

            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<RelayEvent>(text.as_str()) {
                        Ok(event) => {
                            debug!("Relay -> '{}'", event.name());
                            listeners.dispatch(event);
                        }
                        Err(e) => warn!("Dropping relay frame: {}", SignalingError::from(e)),
                    }
                }
                Some(Ok(Message::Close(_))) | None => return PumpExit::SocketLost,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Relay socket error: {}", e);
                    return PumpExit::SocketLost;
                }
            }
        }
    }
}
