pub mod hub;
pub mod ws_handler;

pub use hub::{Channel, ConnectionId, RelayHub};
pub use ws_handler::ws_handler;

use axum::Router;
use axum::routing::get;

/// The relay's HTTP surface: a single websocket endpoint at `/ws`.
pub fn router(hub: RelayHub) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(hub)
}
