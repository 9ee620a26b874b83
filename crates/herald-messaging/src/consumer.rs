//! Consume lifecycle and the poll-until-predicate loop
//!
//! ```text
//! Disconnected ──connect──▶ Connected ──poll──▶ Polling ──▶ Matched | Exhausted
//!      ▲                                                          │
//!      └──────────── connection fault (surfaced later) ◀─────────┘
//! ```
//!
//! Poll errors cost one cycle and the loop keeps going. A connection fault
//! ends the loop with no result; the fault is held and returned by the next
//! `connect()` or by `close()`. Once opened, the transport is closed exactly
//! once: by `close()`, or on drop.

use crate::error::{ConsumerError, TransportError};
use crate::event::{ConsumedEvent, RawMessage};
use herald_core::HarnessConfig;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POLL_SLICE: Duration = Duration::from_secs(1);
const DEFAULT_MAX_MESSAGES: usize = 100;

/// Broker-side poll capability
pub trait PollTransport: Send + Sync {
    /// Open the connection and subscribe
    fn connect(&self) -> Result<(), TransportError>;

    /// Wait up to `timeout` for one message
    fn poll(&self, timeout: Duration) -> Result<Option<RawMessage>, TransportError>;

    fn deserialize(&self, raw: RawMessage) -> Result<ConsumedEvent, TransportError> {
        Ok(ConsumedEvent::from_raw(raw))
    }

    fn close(&self) -> Result<(), TransportError>;
}

impl<T: PollTransport + ?Sized> PollTransport for Arc<T> {
    fn connect(&self) -> Result<(), TransportError> {
        (**self).connect()
    }

    fn poll(&self, timeout: Duration) -> Result<Option<RawMessage>, TransportError> {
        (**self).poll(timeout)
    }

    fn deserialize(&self, raw: RawMessage) -> Result<ConsumedEvent, TransportError> {
        (**self).deserialize(raw)
    }

    fn close(&self) -> Result<(), TransportError> {
        (**self).close()
    }
}

/// Where a consumer is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connected,
    Polling,
    Matched,
    Exhausted,
    Closed,
}

impl ConsumerState {
    fn is_connected(self) -> bool {
        matches!(
            self,
            ConsumerState::Connected
                | ConsumerState::Polling
                | ConsumerState::Matched
                | ConsumerState::Exhausted
        )
    }
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsumerState::Disconnected => "disconnected",
            ConsumerState::Connected => "connected",
            ConsumerState::Polling => "polling",
            ConsumerState::Matched => "matched",
            ConsumerState::Exhausted => "exhausted",
            ConsumerState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Result of one poll cycle
enum Cycle {
    Event(ConsumedEvent),
    Empty,
    /// The transport reported a per-cycle poll error
    Failed,
    Fault,
}

#[derive(Debug)]
struct Inner {
    state: ConsumerState,
    pending_fault: Option<TransportError>,
    /// `transport.connect()` succeeded and `transport.close()` has not run
    opened: bool,
}

/// Consumes events through a [`PollTransport`]
pub struct Consumer<T: PollTransport> {
    transport: T,
    inner: Mutex<Inner>,
    default_timeout: Duration,
    poll_slice: Duration,
    max_messages: usize,
}

impl<T: PollTransport> Consumer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            inner: Mutex::new(Inner {
                state: ConsumerState::Disconnected,
                pending_fault: None,
                opened: false,
            }),
            default_timeout: DEFAULT_TIMEOUT,
            poll_slice: DEFAULT_POLL_SLICE,
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }

    /// Poll timeout, poll slice and message budget from the harness config
    pub fn from_config(transport: T, config: &HarnessConfig) -> Self {
        Self::new(transport)
            .with_timeout(config.network.poll_timeout())
            .with_poll_slice(config.network.poll_slice())
            .with_max_messages(config.messaging.max_messages)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Upper bound on a single poll wait inside `consume_until`
    pub fn with_poll_slice(mut self, slice: Duration) -> Self {
        self.poll_slice = slice;
        self
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> ConsumerState {
        self.inner().state
    }

    fn set_state(&self, state: ConsumerState) {
        self.inner().state = state;
    }

    /// Connect and subscribe; a no-op when already connected
    ///
    /// A connection fault recorded by an earlier poll is returned here
    /// first, leaving the consumer disconnected so the next call reconnects.
    pub fn connect(&self) -> Result<(), ConsumerError> {
        let mut inner = self.inner();
        if let Some(fault) = inner.pending_fault.take() {
            inner.state = ConsumerState::Disconnected;
            return Err(ConsumerError::Connection(fault));
        }
        if inner.state.is_connected() {
            return Ok(());
        }

        self.transport.connect().map_err(ConsumerError::Connection)?;
        inner.state = ConsumerState::Connected;
        inner.opened = true;
        tracing::debug!("consumer connected");
        Ok(())
    }

    fn ensure_connected(&self) -> Result<(), ConsumerError> {
        match self.state() {
            ConsumerState::Closed => Err(ConsumerError::Closed),
            state if state.is_connected() => Ok(()),
            _ => Err(ConsumerError::NotConnected),
        }
    }

    fn poll_once(&self, timeout: Duration) -> Cycle {
        let raw = match self.transport.poll(timeout) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Cycle::Empty,
            Err(err) if err.is_connection_fault() => {
                tracing::warn!(error = %err, "connection fault while polling");
                let mut inner = self.inner();
                inner.state = ConsumerState::Disconnected;
                inner.pending_fault = Some(err);
                return Cycle::Fault;
            }
            Err(err) => {
                tracing::debug!(error = %err, "poll cycle failed");
                return Cycle::Failed;
            }
        };

        match self.transport.deserialize(raw) {
            Ok(event) => Cycle::Event(event),
            Err(err) => {
                tracing::debug!(error = %err, "dropping undecodable message");
                Cycle::Empty
            }
        }
    }

    /// One poll-and-deserialize; `None` when nothing arrived in time
    pub fn consume_one(&self, timeout: Option<Duration>) -> Result<Option<ConsumedEvent>, ConsumerError> {
        self.ensure_connected()?;
        self.set_state(ConsumerState::Polling);

        match self.poll_once(timeout.unwrap_or(self.default_timeout)) {
            Cycle::Event(event) => {
                self.set_state(ConsumerState::Matched);
                Ok(Some(event))
            }
            Cycle::Empty | Cycle::Failed => {
                self.set_state(ConsumerState::Exhausted);
                Ok(None)
            }
            Cycle::Fault => Ok(None),
        }
    }

    /// Poll until `predicate` matches, the deadline passes or `max_messages`
    /// events have been examined
    ///
    /// Returns the first matching event. Events that do not match are
    /// discarded. Each poll waits at most the poll slice, so the deadline is
    /// honoured to within one slice. A cycle that ends in a poll error waits
    /// out the rest of its slice before polling again. A timeout too large to
    /// form a deadline leaves the message budget as the only bound.
    pub fn consume_until<F>(
        &self,
        mut predicate: F,
        timeout: Option<Duration>,
        max_messages: Option<usize>,
    ) -> Result<Option<ConsumedEvent>, ConsumerError>
    where
        F: FnMut(&ConsumedEvent) -> bool,
    {
        self.ensure_connected()?;
        self.set_state(ConsumerState::Polling);

        let deadline = Instant::now().checked_add(timeout.unwrap_or(self.default_timeout));
        let budget = max_messages.unwrap_or(self.max_messages);
        let mut examined = 0;

        while examined < budget {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => self.poll_slice,
            };
            if remaining.is_zero() {
                break;
            }

            let slice = remaining.min(self.poll_slice);
            let started = Instant::now();
            match self.poll_once(slice) {
                Cycle::Event(event) => {
                    examined += 1;
                    if predicate(&event) {
                        tracing::debug!(examined, topic = %event.topic, "predicate matched");
                        self.set_state(ConsumerState::Matched);
                        return Ok(Some(event));
                    }
                }
                Cycle::Empty => {}
                Cycle::Failed => thread::sleep(slice.saturating_sub(started.elapsed())),
                Cycle::Fault => return Ok(None),
            }
        }

        tracing::debug!(examined, "no matching event");
        self.set_state(ConsumerState::Exhausted);
        Ok(None)
    }

    /// Release the transport; repeated calls are no-ops
    ///
    /// The transport is closed even after a connection fault. Returns that
    /// fault if one is pending, otherwise the transport's close error.
    pub fn close(&self) -> Result<(), ConsumerError> {
        let mut inner = self.inner();
        let pending = inner.pending_fault.take();
        let opened = std::mem::replace(&mut inner.opened, false);
        inner.state = ConsumerState::Closed;
        drop(inner);

        let closed = if opened {
            self.transport.close()
        } else {
            Ok(())
        };

        if let Some(fault) = pending {
            return Err(ConsumerError::Connection(fault));
        }
        closed.map_err(ConsumerError::Connection)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: PollTransport> Drop for Consumer<T> {
    fn drop(&mut self) {
        let opened = std::mem::replace(&mut self.inner().opened, false);
        if opened {
            if let Err(err) = self.transport.close() {
                tracing::warn!(error = %err, "closing consumer transport on drop failed");
            }
        }
    }
}
