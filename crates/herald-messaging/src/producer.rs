//! Publish lifecycle
//!
//! prepare → authenticate → send → post-process → observe, the same stage
//! order the HTTP clients use. Only send blocks.

use crate::error::{ProducerError, TransportError};
use crate::event::{
    Delivery, OutboundEvent, PublishResult, CONTENT_TYPE_HEADER, TIMESTAMP_HEADER,
};
use crate::observe;
use herald_core::retry::{
    NeverRetry, OutcomePredicate, RetryError, RetryExecutor, RetryExecutorBuilder, RetryObserver,
    RetryPredicate, TracingObserver, TransientOnly,
};
use herald_core::types::MessagingConfig;
use herald_core::{Authenticator, HandlerChain, RetryPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Executor type returned by [`publish_retry_executor`]
pub type PublishRetryExecutor = RetryExecutor<TransientOnly, NeverRetry, TracingObserver>;

/// Retries transient send and auth faults; broker rejections are results, not retried
pub fn publish_retry_executor(policy: RetryPolicy, operation: impl Into<String>) -> PublishRetryExecutor {
    RetryExecutorBuilder::new()
        .with_policy(policy)
        .with_predicate(TransientOnly)
        .with_observer(TracingObserver::new(operation))
        .build()
}

/// Broker-side publish capability
pub trait PublishTransport: Send + Sync {
    fn send(&self, event: &OutboundEvent, timeout: Duration) -> Result<Delivery, TransportError>;

    /// Deliver anything still buffered
    fn flush(&self, _timeout: Duration) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<T: PublishTransport + ?Sized> PublishTransport for Arc<T> {
    fn send(&self, event: &OutboundEvent, timeout: Duration) -> Result<Delivery, TransportError> {
        (**self).send(event, timeout)
    }

    fn flush(&self, timeout: Duration) -> Result<(), TransportError> {
        (**self).flush(timeout)
    }
}

/// Builder for [`Producer`]
pub struct ProducerBuilder {
    default_topic: Option<String>,
    timeout: Duration,
    auth: Option<Arc<dyn Authenticator>>,
    chain: Option<HandlerChain<PublishResult>>,
}

impl Default for ProducerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProducerBuilder {
    pub fn new() -> Self {
        Self {
            default_topic: None,
            timeout: DEFAULT_SEND_TIMEOUT,
            auth: None,
            chain: None,
        }
    }

    pub fn from_config(config: &MessagingConfig) -> Self {
        Self::new().default_topic(config.default_topic.clone())
    }

    /// Topic used when an event leaves its topic empty
    pub fn default_topic(mut self, topic: impl Into<String>) -> Self {
        let topic = topic.into();
        self.default_topic = (!topic.is_empty()).then_some(topic);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn auth(mut self, auth: Arc<dyn Authenticator>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn chain(mut self, chain: HandlerChain<PublishResult>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn build<T: PublishTransport>(self, transport: T) -> Producer<T> {
        Producer {
            transport,
            default_topic: self.default_topic,
            timeout: self.timeout,
            auth: self.auth,
            chain: self.chain.unwrap_or_else(HandlerChain::standard),
            closed: AtomicBool::new(false),
        }
    }
}

/// Publishes events through a [`PublishTransport`]
///
/// `close` flushes the transport exactly once, no matter how many times it
/// is called or whether the producer is dropped afterwards.
pub struct Producer<T: PublishTransport> {
    transport: T,
    default_topic: Option<String>,
    timeout: Duration,
    auth: Option<Arc<dyn Authenticator>>,
    chain: HandlerChain<PublishResult>,
    closed: AtomicBool,
}

impl<T: PublishTransport> Producer<T> {
    pub fn builder() -> ProducerBuilder {
        ProducerBuilder::new()
    }

    fn prepare(&self, mut event: OutboundEvent) -> Result<OutboundEvent, ProducerError> {
        if event.topic.is_empty() {
            event.topic = self
                .default_topic
                .clone()
                .ok_or(ProducerError::MissingTopic)?;
        }

        event
            .headers
            .entry(TIMESTAMP_HEADER.to_string())
            .or_insert_with(|| chrono::Utc::now().timestamp_millis().to_string());
        event
            .headers
            .entry(CONTENT_TYPE_HEADER.to_string())
            .or_insert_with(|| event.content_type.clone());

        Ok(event)
    }

    /// Run the full publish lifecycle for one event
    ///
    /// A broker rejection comes back as an unsuccessful [`PublishResult`];
    /// only transport faults and chain rejections are errors.
    pub fn publish(&self, event: OutboundEvent) -> Result<PublishResult, ProducerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProducerError::Closed);
        }

        let mut event = self.prepare(event)?;

        if let Some(auth) = &self.auth {
            auth.apply(&mut event.headers)?;
        }

        let start = Instant::now();
        let delivery = self.transport.send(&event, self.timeout)?;
        let elapsed = start.elapsed();

        let result = PublishResult::from_delivery(event.topic.clone(), delivery, elapsed);
        if let Some(reason) = &result.error {
            tracing::warn!(topic = %result.topic, reason = %reason, "event rejected by broker");
        }

        let result = self.chain.run(result)?;
        observe::record(event, result.clone());
        Ok(result)
    }

    /// Publish under a retry executor; each attempt re-runs the whole lifecycle
    pub fn publish_with_retry<P, R, O>(
        &self,
        executor: &RetryExecutor<P, R, O>,
        event: OutboundEvent,
    ) -> Result<PublishResult, RetryError<ProducerError>>
    where
        P: RetryPredicate<ProducerError>,
        R: OutcomePredicate<PublishResult>,
        O: RetryObserver,
    {
        executor.execute_blocking(move || self.publish(event.clone()))
    }

    /// Flush and stop accepting events; later calls are no-ops
    pub fn close(&self) -> Result<(), ProducerError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::debug!("flushing producer");
        self.transport.flush(self.timeout)?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: PublishTransport> Drop for Producer<T> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(error = %err, "flush on drop failed");
        }
    }
}
