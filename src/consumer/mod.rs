//! Module consuming chunk messages from the bus and fanning them out to a pool of processor threads

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{Scope, ScopedJoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, bounded};
use tracing::{info, warn};

use crate::Error;
use crate::message::ROWS_TOPIC;
use crate::ports::{Message, MessageConsumer};

mod processor;

pub use processor::{ProcessOutcome, RowBatchProcessor};


/// Cooperative cancellation signal shared between the caller and a running pool.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    Idle = 0,
    Running = 1,
    /// Cancelled: nothing new is consumed, processors finish the inbox
    Draining = 2,
    Stopped = 3,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PoolState::Running,
            2 => PoolState::Draining,
            3 => PoolState::Stopped,
            _ => PoolState::Idle,
        }
    }
}

/// Totals of one `execute` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub received: usize,
    pub committed: usize,
    pub consume_errors: usize,
}

pub struct ConsumerPool {
    consumer: Arc<dyn MessageConsumer>,
    processor: RowBatchProcessor,
    processors: usize,
    inbox_capacity: usize,
    poll_interval: Duration,
    state: AtomicU8,
}

impl ConsumerPool {
    pub fn new(
        consumer: Arc<dyn MessageConsumer>,
        processor: RowBatchProcessor,
        processors: usize,
        inbox_capacity: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            consumer,
            processor,
            processors: processors.max(1),
            inbox_capacity: inbox_capacity.max(1),
            poll_interval,
            state: AtomicU8::new(PoolState::Idle as u8),
        }
    }

    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Consumes the rows topic until `cancel` fires, then lets the processors drain the inbox and joins them.
    ///
    /// The inbox is owned by the pool: a bounded channel of `inbox_capacity` messages created for each run, so
    /// callers only pass the cancellation token.
    ///
    /// Fails only if the subscription cannot be established. Consume errors are logged and retried right away.
    pub fn execute(&self, cancel: &CancellationToken) -> Result<PoolSummary, Error> {
        self.consumer.subscribe_in_topic(ROWS_TOPIC)?;

        let summary = std::thread::scope(|s| {
            let (inbox_tx, inbox_rx) = bounded::<Box<dyn Message>>(self.inbox_capacity);
            let handles = self.spawn_processors(s, inbox_rx);
            self.set_state(PoolState::Running);
            info!(processors = self.processors, topic = ROWS_TOPIC, "consumer pool running");

            let mut consume_errors = 0;
            while !cancel.is_cancelled() {
                match self.consumer.consume(ROWS_TOPIC, self.poll_interval) {
                    Ok(Some(message)) => {
                        // Send fails only if every processor is gone (panicked); the join surfaces that panic.
                        if inbox_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        consume_errors += 1;
                        warn!("consuming from {ROWS_TOPIC} failed: {e}");
                    }
                }
            }

            self.set_state(PoolState::Draining);
            info!("consumer pool draining");
            drop(inbox_tx);

            let mut summary = PoolSummary {
                consume_errors,
                ..PoolSummary::default()
            };
            for handle in handles {
                let (received, committed) = handle.join().expect("processor thread does not panic");
                summary.received += received;
                summary.committed += committed;
            }
            summary
        });

        self.set_state(PoolState::Stopped);
        info!(
            received = summary.received,
            committed = summary.committed,
            consume_errors = summary.consume_errors,
            "consumer pool stopped"
        );
        Ok(summary)
    }

    fn spawn_processors<'s, 'e>(
        &'e self,
        s: &'s Scope<'s, 'e>,
        inbox_rx: Receiver<Box<dyn Message>>,
    ) -> Vec<ScopedJoinHandle<'s, (usize, usize)>> {
        (0..self.processors)
            .map(|_| {
                let rx = inbox_rx.clone();
                s.spawn(move || {
                    let mut received = 0;
                    let mut committed = 0;
                    for message in rx {
                        received += 1;
                        if self.processor.process(message.as_ref()).is_committed() {
                            committed += 1;
                        }
                    }
                    (received, committed)
                })
            })
            .collect()
    }

    fn set_state(&self, state: PoolState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}
