//! # herald-messaging
//!
//! Event lifecycle engine for the Herald test harness:
//! - Producer running prepare → authenticate → send → post-process → observe
//! - Consumer state machine with the poll-until-predicate loop
//! - Transport traits plus an in-memory broker with scripted faults
//! - Per-task/per-thread record of the last publish, for failure reports
//! - Event predicates and fluent assertions

pub mod assertions;
pub mod consumer;
pub mod error;
pub mod event;
pub mod handlers;
pub mod memory;
pub mod observe;
pub mod predicates;
pub mod producer;

pub use assertions::{assert_event, assert_published, EventAssertions, PublishAssertions};
pub use consumer::{Consumer, ConsumerState, PollTransport};
pub use error::{ConsumerError, ProducerError, TransportError};
pub use event::{ConsumedEvent, Delivery, OutboundEvent, PublishResult, RawMessage};
pub use handlers::DeliveryCheckHandler;
pub use memory::{BatchMemoryConsumer, Fault, InMemoryBroker, MemoryConsumer, MemoryProducer};
pub use observe::{attach_last_publish, clear_last_publish, last_event, last_publish_result};
pub use producer::{
    publish_retry_executor, Producer, ProducerBuilder, PublishRetryExecutor, PublishTransport,
};
