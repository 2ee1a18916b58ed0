/// Broadcaster (admin) side of the negotiation state machine.
///
/// `StoppedByUser`, `StoppedByRemote` and `Failed` are transient: the session
/// reports them and settles back to `Idle` in the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastPhase {
    Idle,
    Starting,
    Broadcasting,
    StoppedByUser,
    StoppedByRemote,
    Failed,
}

impl BroadcastPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Broadcasting)
    }
}

/// Observer side: entered on an offer, left on stop or disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    Idle,
    Connecting,
    Connected,
}
