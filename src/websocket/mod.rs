//! WebSocket transport: handshake, message framing, and event routing.

mod handler;
mod message;
mod router;

pub use handler::ws_handler;
pub use message::{ClientEvent, MessageIn, MessageOut, OutboundMessage, ServerEvent};
pub use router::EventRouter;
