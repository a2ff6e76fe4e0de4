//! The event plane: topic pub/sub (Event Bus), append-only storage
//! (Event Log), and the dual-write Emitter that ties them together.

pub mod bus;
pub mod emitter;
pub mod log;
pub mod message;

pub use bus::EventBus;
pub use emitter::Emitter;
pub use log::{EventLog, InMemoryEventLog};
pub use message::{StreamMessage, topic_for_job};
