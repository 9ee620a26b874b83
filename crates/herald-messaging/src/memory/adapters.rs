//! Producer and consumer transports backed by [`InMemoryBroker`]

use super::broker::{Fault, InMemoryBroker};
use crate::consumer::PollTransport;
use crate::error::TransportError;
use crate::event::{Delivery, OutboundEvent, RawMessage};
use crate::producer::PublishTransport;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Publishes into an [`InMemoryBroker`]
#[derive(Debug)]
pub struct MemoryProducer {
    broker: Arc<InMemoryBroker>,
    flushes: AtomicU32,
}

impl MemoryProducer {
    pub fn new(broker: Arc<InMemoryBroker>) -> Self {
        Self {
            broker,
            flushes: AtomicU32::new(0),
        }
    }

    pub fn flushes(&self) -> u32 {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl PublishTransport for MemoryProducer {
    fn send(&self, event: &OutboundEvent, timeout: Duration) -> Result<Delivery, TransportError> {
        match self.broker.take_send_fault() {
            Some(Fault::RejectSend(reason)) => return Ok(Delivery::Rejected { reason }),
            Some(Fault::SendTimeout) => return Err(TransportError::Timeout(timeout)),
            _ => {}
        }
        self.broker.check_connection()?;

        let payload =
            serde_json::to_vec(&event.body).map_err(|e| TransportError::Send(e.to_string()))?;
        let appended = self.broker.append(
            &event.topic,
            event.routing_key(),
            event.key.clone(),
            payload,
            event.headers.clone(),
        );

        Ok(Delivery::Accepted {
            partition: Some(appended.partition),
            offset: Some(appended.offset),
        })
    }

    fn flush(&self, _timeout: Duration) -> Result<(), TransportError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Reads one message per poll for a consumer group
#[derive(Debug)]
pub struct MemoryConsumer {
    broker: Arc<InMemoryBroker>,
    group: String,
    topics: Vec<String>,
    connects: AtomicU32,
    closes: AtomicU32,
}

impl MemoryConsumer {
    pub fn new<I, S>(broker: Arc<InMemoryBroker>, group: impl Into<String>, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            broker,
            group: group.into(),
            topics: topics.into_iter().map(Into::into).collect(),
            connects: AtomicU32::new(0),
            closes: AtomicU32::new(0),
        }
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }

    fn fetch(&self, max: usize, timeout: Duration) -> Result<Vec<RawMessage>, TransportError> {
        self.broker.fetch(&self.group, &self.topics, max, timeout)
    }
}

impl PollTransport for MemoryConsumer {
    fn connect(&self) -> Result<(), TransportError> {
        self.broker.check_connection()?;
        for topic in &self.topics {
            self.broker.create_topic(topic);
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn poll(&self, timeout: Duration) -> Result<Option<RawMessage>, TransportError> {
        Ok(self.fetch(1, timeout)?.into_iter().next())
    }

    fn close(&self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fetches messages in batches and hands them out one per poll
///
/// Batch members not yet handed out stay buffered and are served, in order,
/// before the broker is asked again.
#[derive(Debug)]
pub struct BatchMemoryConsumer {
    inner: MemoryConsumer,
    batch_size: usize,
    buffered: Mutex<VecDeque<RawMessage>>,
}

impl BatchMemoryConsumer {
    pub fn new(inner: MemoryConsumer, batch_size: usize) -> Self {
        Self {
            inner,
            batch_size: batch_size.max(1),
            buffered: Mutex::new(VecDeque::new()),
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn inner(&self) -> &MemoryConsumer {
        &self.inner
    }
}

impl PollTransport for BatchMemoryConsumer {
    fn connect(&self) -> Result<(), TransportError> {
        self.inner.connect()
    }

    fn poll(&self, timeout: Duration) -> Result<Option<RawMessage>, TransportError> {
        let mut buffered = self.buffered.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(message) = buffered.pop_front() {
            return Ok(Some(message));
        }

        let mut batch = VecDeque::from(self.inner.fetch(self.batch_size, timeout)?);
        let first = batch.pop_front();
        buffered.extend(batch);
        Ok(first)
    }

    fn close(&self) -> Result<(), TransportError> {
        self.buffered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.inner.close()
    }
}
