use async_trait::async_trait;
use screenwatch_client::signaling::{Listener, ListenerId, Listeners};
use screenwatch_client::{SignalingTransport, TransportStatus};
use screenwatch_core::{EventName, RelayEvent};
use screenwatch_relay::{ConnectionId, RelayHub};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// In-process signaling transport wired straight into a [`RelayHub`].
///
/// Records everything it emits so tests can assert on the wire traffic.
pub struct HubTransport {
    id: ConnectionId,
    hub: RelayHub,
    inbound_tx: mpsc::UnboundedSender<RelayEvent>,
    listeners: Arc<Listeners>,
    status_tx: watch::Sender<TransportStatus>,
    sent: Arc<Mutex<Vec<RelayEvent>>>,
    pump: JoinHandle<()>,
}

impl HubTransport {
    /// Registers a new connection with the hub; the transport starts `Connected`.
    pub fn connect(hub: &RelayHub) -> Arc<Self> {
        let id = Uuid::new_v4();
        let listeners = Arc::new(Listeners::new());
        let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(TransportStatus::Connected);

        hub.add_connection(id, inbound_tx.clone());

        let pump = tokio::spawn({
            let listeners = listeners.clone();
            async move {
                while let Some(event) = inbound_rx.recv().await {
                    listeners.dispatch(event);
                }
            }
        });

        Arc::new(Self {
            id,
            hub: hub.clone(),
            inbound_tx,
            listeners,
            status_tx,
            sent: Arc::new(Mutex::new(Vec::new())),
            pump,
        })
    }

    /// Simulates the relay channel dropping or coming back.
    pub fn set_status(&self, status: TransportStatus) {
        match status {
            TransportStatus::Connected => self.hub.add_connection(self.id, self.inbound_tx.clone()),
            _ => self.hub.remove_connection(&self.id),
        }
        self.status_tx.send_replace(status);
    }

    /// Delivers an event to local listeners as if the relay had sent it.
    pub fn inject(&self, event: RelayEvent) {
        let _ = self.inbound_tx.send(event);
    }

    /// Subscribes a plain channel to one event name.
    pub fn listen(&self, name: EventName) -> mpsc::UnboundedReceiver<RelayEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.on(name, tx);
        rx
    }

    pub async fn sent(&self) -> Vec<RelayEvent> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_names(&self) -> Vec<&'static str> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|e| e.name().as_str())
            .collect()
    }

    pub async fn count_sent(&self, name: EventName) -> usize {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|e| e.name() == name)
            .count()
    }

    pub fn listener_count(&self, name: EventName) -> usize {
        self.listeners.count(name)
    }
}

impl Drop for HubTransport {
    fn drop(&mut self) {
        self.pump.abort();
        self.hub.remove_connection(&self.id);
    }
}

#[async_trait]
impl SignalingTransport for HubTransport {
    async fn emit(&self, event: RelayEvent) {
        if *self.status_tx.borrow() != TransportStatus::Connected {
            tracing::debug!("[HubTransport] offline, dropping '{}'", event.name());
            return;
        }
        self.sent.lock().await.push(event.clone());
        self.hub.route(self.id, event);
    }

    fn on(&self, name: EventName, listener: Listener) -> ListenerId {
        self.listeners.on(name, listener)
    }

    fn off(&self, name: EventName, id: ListenerId) {
        self.listeners.off(name, id);
    }

    fn status(&self) -> watch::Receiver<TransportStatus> {
        self.status_tx.subscribe()
    }
}
