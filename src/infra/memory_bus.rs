//! In-memory publish/subscribe bus with at-least-once delivery

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::Error;
use crate::error::bus_error;
use crate::message::RowsPayload;
use crate::ports::{Message, MessageConsumer, MessageProducer};

/// Counters describing what happened on the bus so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub published: usize,
    pub delivered: usize,
    pub committed: usize,
    pub redelivered: usize,
    pub dead_lettered: usize,
}

/// Cheaply cloneable handle to a shared bus.
///
/// A consumed message that is dropped without `commit` goes back to the end of its topic queue. After
/// `max_deliveries` failed deliveries it is moved to the dead letters instead.
#[derive(Clone)]
pub struct InMemoryBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    state: Mutex<BusState>,
    changed: Condvar,
    max_deliveries: u32,
}

#[derive(Default)]
struct BusState {
    topics: HashMap<String, VecDeque<Envelope>>,
    subscriptions: HashSet<String>,
    in_flight: usize,
    dead_letters: Vec<Envelope>,
    stats: BusStats,
}

#[derive(Debug, Clone)]
struct Envelope {
    key: Uuid,
    topic: String,
    value: Vec<u8>,
    deliveries: u32,
}

impl InMemoryBus {
    pub fn new(max_deliveries: u32) -> Self {
        Self {
            inner: Arc::new(BusInner {
                state: Mutex::new(BusState::default()),
                changed: Condvar::new(),
                max_deliveries: max_deliveries.max(1),
            }),
        }
    }

    /// Publishes raw bytes, bypassing payload encoding.
    pub fn publish_raw(&self, topic: &str, value: Vec<u8>) {
        let envelope = Envelope {
            key: Uuid::new_v4(),
            topic: topic.to_string(),
            value,
            deliveries: 0,
        };
        let mut state = self.inner.lock();
        debug!(key = %envelope.key, topic, "message published");
        state
            .topics
            .entry(topic.to_string())
            .or_default()
            .push_back(envelope);
        state.stats.published += 1;
        drop(state);
        self.inner.changed.notify_all();
    }

    /// Blocks until no message is queued or in flight, or until `timeout` elapses. Returns whether the bus is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.lock();
        loop {
            if state.is_idle() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .inner
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    pub fn stats(&self) -> BusStats {
        self.inner.lock().stats
    }

    /// Number of messages waiting in `topic`.
    pub fn pending(&self, topic: &str) -> usize {
        self.inner.lock().topics.get(topic).map_or(0, VecDeque::len)
    }

    pub fn dead_letters(&self) -> usize {
        self.inner.lock().dead_letters.len()
    }
}

impl BusInner {
    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, envelope: Envelope, committed: bool) {
        let mut state = self.lock();
        state.in_flight -= 1;
        if committed {
            state.stats.committed += 1;
        } else if envelope.deliveries >= self.max_deliveries {
            warn!(
                key = %envelope.key,
                topic = %envelope.topic,
                deliveries = envelope.deliveries,
                "message dead-lettered"
            );
            state.stats.dead_lettered += 1;
            state.dead_letters.push(envelope);
        } else {
            state.stats.redelivered += 1;
            state
                .topics
                .entry(envelope.topic.clone())
                .or_default()
                .push_back(envelope);
        }
        drop(state);
        self.changed.notify_all();
    }
}

impl BusState {
    fn is_idle(&self) -> bool {
        self.in_flight == 0 && self.topics.values().all(VecDeque::is_empty)
    }
}

impl MessageProducer for InMemoryBus {
    fn publish(&self, topic: &str, payload: &RowsPayload) -> Result<(), Error> {
        self.publish_raw(topic, payload.to_bytes()?);
        Ok(())
    }
}

impl MessageConsumer for InMemoryBus {
    fn subscribe_in_topic(&self, topic: &str) -> Result<(), Error> {
        let mut state = self.inner.lock();
        state.topics.entry(topic.to_string()).or_default();
        state.subscriptions.insert(topic.to_string());
        Ok(())
    }

    fn consume(&self, topic: &str, timeout: Duration) -> Result<Option<Box<dyn Message>>, Error> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.lock();
        if !state.subscriptions.contains(topic) {
            return Err(bus_error(format!("not subscribed to topic {topic}")));
        }

        loop {
            if let Some(mut envelope) = state.topics.get_mut(topic).and_then(VecDeque::pop_front) {
                envelope.deliveries += 1;
                state.in_flight += 1;
                state.stats.delivered += 1;
                return Ok(Some(Box::new(InMemoryMessage {
                    envelope: Some(envelope),
                    committed: AtomicBool::new(false),
                    bus: Arc::clone(&self.inner),
                })));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            state = self
                .inner
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

struct InMemoryMessage {
    envelope: Option<Envelope>,
    committed: AtomicBool,
    bus: Arc<BusInner>,
}

impl fmt::Debug for InMemoryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("InMemoryMessage");
        if let Some(envelope) = &self.envelope {
            debug
                .field("key", &envelope.key)
                .field("topic", &envelope.topic)
                .field("deliveries", &envelope.deliveries);
        }
        debug.field("committed", &self.committed).finish()
    }
}

impl Message for InMemoryMessage {
    fn data(&self) -> Result<RowsPayload, Error> {
        let envelope = self
            .envelope
            .as_ref()
            .ok_or_else(|| bus_error("message already settled"))?;
        RowsPayload::from_bytes(&envelope.value)
    }

    fn commit(&self) {
        self.committed.store(true, Ordering::SeqCst);
    }
}

impl Drop for InMemoryMessage {
    fn drop(&mut self) {
        if let Some(envelope) = self.envelope.take() {
            self.bus
                .settle(envelope, self.committed.load(Ordering::SeqCst));
        }
    }
}
