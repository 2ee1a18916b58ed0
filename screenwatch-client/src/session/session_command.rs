/// User-triggered operations sent to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Admin: capture the screen and offer it to the room.
    StartBroadcast,

    /// Admin: stop sharing (also cancels a start still in progress).
    StopBroadcast,

    /// Observer: ask the admin to start sharing.
    RequestScreen,

    /// Observer: ask the admin to (re)send its offer.
    RequestOffer,

    /// Observer: announce departure and drop the stream. Admin: stop sharing.
    Leave,

    /// Leave, tear everything down and end the session loop.
    Shutdown,
}
