//! The Stream Endpoint: a transport-agnostic duplex session per job that
//! replays the Event Log then tails the Event Bus. The actual socket
//! transport (WebSocket, SSE, whatever the HTTP layer picks) is outside
//! this crate's concern; `run_session` talks only in channels so it can
//! be driven by any transport adapter the embedding binary wires up.

pub mod client_message;
pub mod roster;
pub mod session;

pub use client_message::ClientMessage;
pub use roster::{ConnectionId, ConnectionRegistry};
pub use session::run_session;
