//! In-process broker with partitions, offsets and per-group cursors

use crate::error::TransportError;
use crate::event::RawMessage;
use herald_core::Headers;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

const DEFAULT_PARTITIONS: u32 = 3;

/// A scripted failure for the next operations of a kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Next send is refused by the broker (not a transport fault)
    RejectSend(String),
    /// Next send times out
    SendTimeout,
    /// Next poll fails for one cycle
    PollError(String),
    /// Connections drop: polls and connects fail until `restore`
    ConnectionLost,
}

#[derive(Debug, Clone)]
struct Stored {
    key: Option<String>,
    payload: Vec<u8>,
    headers: Headers,
    timestamp_ms: i64,
}

#[derive(Debug, Default)]
struct State {
    /// topic -> partitions -> log
    topics: HashMap<String, Vec<Vec<Stored>>>,
    /// (group, topic, partition) -> next offset
    cursors: HashMap<(String, String, u32), u64>,
    send_faults: VecDeque<Fault>,
    poll_faults: VecDeque<Fault>,
    connection_lost: bool,
}

/// Outcome of appending one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Appended {
    pub partition: u32,
    pub offset: u64,
}

/// Thread-safe in-memory broker
///
/// Messages with the same key always land in the same partition; keyless
/// messages are spread round-robin. Each consumer group reads every
/// partition independently from offset 0.
#[derive(Debug)]
pub struct InMemoryBroker {
    partitions: u32,
    state: Mutex<State>,
    arrived: Condvar,
    round_robin: AtomicUsize,
}

impl InMemoryBroker {
    pub fn new() -> Arc<Self> {
        Self::with_partitions(DEFAULT_PARTITIONS)
    }

    pub fn with_partitions(partitions: u32) -> Arc<Self> {
        Arc::new(Self {
            partitions: partitions.max(1),
            state: Mutex::new(State::default()),
            arrived: Condvar::new(),
            round_robin: AtomicUsize::new(0),
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    pub fn create_topic(&self, topic: &str) {
        let partitions = self.partitions as usize;
        self.state()
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| vec![Vec::new(); partitions]);
    }

    fn partition_for(&self, key: Option<&str>) -> u32 {
        match key {
            Some(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                (hasher.finish() % self.partitions as u64) as u32
            }
            None => (self.round_robin.fetch_add(1, Ordering::Relaxed) % self.partitions as usize) as u32,
        }
    }

    /// Script a failure; send faults and poll faults queue separately
    pub fn inject(&self, fault: Fault) {
        let mut state = self.state();
        match fault {
            Fault::RejectSend(_) | Fault::SendTimeout => state.send_faults.push_back(fault),
            Fault::PollError(_) => state.poll_faults.push_back(fault),
            Fault::ConnectionLost => state.connection_lost = true,
        }
        drop(state);
        self.arrived.notify_all();
    }

    /// Bring connections back after `Fault::ConnectionLost`
    pub fn restore(&self) {
        self.state().connection_lost = false;
    }

    pub(crate) fn take_send_fault(&self) -> Option<Fault> {
        self.state().send_faults.pop_front()
    }

    pub(crate) fn check_connection(&self) -> Result<(), TransportError> {
        if self.state().connection_lost {
            Err(TransportError::Connection("broker unreachable".into()))
        } else {
            Ok(())
        }
    }

    pub(crate) fn append(
        &self,
        topic: &str,
        routing_key: Option<&str>,
        key: Option<String>,
        payload: Vec<u8>,
        headers: Headers,
    ) -> Appended {
        let partition = self.partition_for(routing_key);
        let partitions = self.partitions as usize;

        let mut state = self.state();
        let log = &mut state
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| vec![Vec::new(); partitions])[partition as usize];
        log.push(Stored {
            key,
            payload,
            headers,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        });
        let offset = (log.len() - 1) as u64;
        drop(state);

        self.arrived.notify_all();
        Appended { partition, offset }
    }

    /// Take up to `max` unread messages for `group`, waiting up to `timeout`
    /// for at least one
    pub(crate) fn fetch(
        &self,
        group: &str,
        topics: &[String],
        max: usize,
        timeout: Duration,
    ) -> Result<Vec<RawMessage>, TransportError> {
        // None: the timeout is past any representable instant
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state();

        loop {
            if state.connection_lost {
                return Err(TransportError::Connection("broker unreachable".into()));
            }
            if let Some(Fault::PollError(message)) = state.poll_faults.pop_front() {
                return Err(TransportError::Poll(message));
            }

            let batch = Self::take_unread(&mut state, group, topics, max);
            if !batch.is_empty() {
                return Ok(batch);
            }

            let remaining = deadline.map_or(timeout, |d| d.saturating_duration_since(Instant::now()));
            if remaining.is_zero() {
                return Ok(Vec::new());
            }
            state = self
                .arrived
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn take_unread(state: &mut State, group: &str, topics: &[String], max: usize) -> Vec<RawMessage> {
        let mut batch = Vec::new();
        for topic in topics {
            let Some(partitions) = state.topics.get(topic) else {
                continue;
            };
            for (partition, log) in partitions.iter().enumerate() {
                let partition = partition as u32;
                let cursor = state
                    .cursors
                    .entry((group.to_string(), topic.clone(), partition))
                    .or_insert(0);
                while batch.len() < max && (*cursor as usize) < log.len() {
                    let stored = &log[*cursor as usize];
                    batch.push(RawMessage {
                        topic: topic.clone(),
                        key: stored.key.clone(),
                        payload: stored.payload.clone(),
                        headers: stored.headers.clone(),
                        partition: Some(partition),
                        offset: Some(*cursor),
                        timestamp_ms: Some(stored.timestamp_ms),
                    });
                    *cursor += 1;
                }
                if batch.len() >= max {
                    return batch;
                }
            }
        }
        batch
    }

    /// Messages stored for a topic across all partitions
    pub fn message_count(&self, topic: &str) -> usize {
        self.state()
            .topics
            .get(topic)
            .map(|partitions| partitions.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Messages of `topic` the group has read so far
    pub fn consumed(&self, group: &str, topic: &str) -> u64 {
        self.state()
            .cursors
            .iter()
            .filter(|((g, t, _), _)| g == group && t == topic)
            .map(|(_, offset)| *offset)
            .sum()
    }
}
