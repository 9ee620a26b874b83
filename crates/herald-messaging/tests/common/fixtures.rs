//! Brokers and consumers pre-loaded with events

use crate::common::constants::*;
use herald_messaging::{
    Consumer, InMemoryBroker, MemoryConsumer, MemoryProducer, OutboundEvent, PublishTransport,
};
use serde_json::Value;
use std::sync::Arc;

/// Single-partition broker, so consumption order equals publish order
pub fn ordered_broker() -> Arc<InMemoryBroker> {
    InMemoryBroker::with_partitions(1)
}

/// Publish raw bodies straight through the transport, bypassing the lifecycle
pub fn seed(broker: &Arc<InMemoryBroker>, topic: &str, bodies: &[Value]) {
    let producer = MemoryProducer::new(broker.clone());
    for body in bodies {
        producer
            .send(&OutboundEvent::new(topic).body(body.clone()), TEST_TIMEOUT)
            .unwrap();
    }
}

/// Connected consumer on `topic` with a short poll slice
pub fn connected_consumer(broker: &Arc<InMemoryBroker>, topic: &str) -> Consumer<MemoryConsumer> {
    let consumer = Consumer::new(MemoryConsumer::new(broker.clone(), TEST_GROUP, [topic]))
        .with_poll_slice(FAST_SLICE);
    consumer.connect().unwrap();
    consumer
}
