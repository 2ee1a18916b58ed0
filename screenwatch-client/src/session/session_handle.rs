use crate::error::{Result, SignalingError};
use crate::session::session_command::SessionCommand;
use crate::session::session_event::{SessionEvent, SessionState};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

/// Cloneable control surface of a running [`Session`](crate::session::Session).
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        state: watch::Receiver<SessionState>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            commands,
            state,
            events,
        }
    }

    pub async fn start_broadcast(&self) -> Result<()> {
        self.send(SessionCommand::StartBroadcast).await
    }

    pub async fn stop_broadcast(&self) -> Result<()> {
        self.send(SessionCommand::StopBroadcast).await
    }

    pub async fn request_screen(&self) -> Result<()> {
        self.send(SessionCommand::RequestScreen).await
    }

    pub async fn request_offer(&self) -> Result<()> {
        self.send(SessionCommand::RequestOffer).await
    }

    pub async fn leave(&self) -> Result<()> {
        self.send(SessionCommand::Leave).await
    }

    /// Ends the session loop after leaving the room and closing every link.
    pub async fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown).await
    }

    pub async fn send(&self, cmd: SessionCommand) -> Result<()> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| SignalingError::SessionClosed)
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Waits until the published state satisfies `predicate`.
    ///
    /// Returns `None` on timeout or when the session ended first.
    pub async fn wait_for<F>(&self, predicate: F, timeout: Duration) -> Option<SessionState>
    where
        F: FnMut(&SessionState) -> bool,
    {
        let mut state = self.state.clone();
        match tokio::time::timeout(timeout, state.wait_for(predicate)).await {
            Ok(Ok(snapshot)) => Some(snapshot.clone()),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
