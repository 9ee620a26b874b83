//! In-process broker and transports
//!
//! Lets the publish and consume lifecycles run without an external broker,
//! including scripted faults via [`Fault`].

mod adapters;
mod broker;

pub use adapters::{BatchMemoryConsumer, MemoryConsumer, MemoryProducer};
pub use broker::{Fault, InMemoryBroker};
