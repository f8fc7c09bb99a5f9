//! Payment engine events.
//!
//! Interested parties register hooks in [`EventHooks`]. Each hook runs on its own [`EventHandler`] task, and the
//! payment flow publishes through the matching [`EventProducers`]. Handlers only ever see the event itself.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
