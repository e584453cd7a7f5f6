//! Reply correlation.
//!
//! # Responsibilities
//! - Keep a registry of requests waiting on one inbound channel
//! - Run the pump that reads the channel and resolves exactly one waiter per
//!   reply
//! - Remove a waiter as soon as its request finishes or is dropped
//!
//! # Matching rules
//! - Reply with a known correlation id: resolves that waiter
//! - Reply without a (UUID) correlation id: resolves the oldest waiter, which
//!   keeps backends that do not echo ids working one request at a time
//! - Reply with an unknown id: late answer to a finished request, dropped
//! - Consume error: every current waiter fails with that error

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio::sync::{broadcast, oneshot};
use uuid::Uuid;

use crate::broker::{BrokerError, InboundMessage, ReplySource};
use crate::observability::metrics;
use crate::resilience::backoff::pump_backoff;

type Completion = oneshot::Sender<Result<InboundMessage, BrokerError>>;

/// Waiters of one channel.
struct PendingReplies {
    channel: String,
    waiters: DashMap<Uuid, Completion>,
    /// Registration order, used for replies without a correlation id.
    order: Mutex<VecDeque<Uuid>>,
    /// Set once the pump has stopped.
    closed: AtomicBool,
}

impl PendingReplies {
    fn new(channel: String) -> Self {
        Self {
            channel,
            waiters: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn insert(&self, id: Uuid, completion: Completion) {
        self.waiters.insert(id, completion);
        if let Ok(mut order) = self.order.lock() {
            order.push_back(id);
        }
        // Checked after inserting: either this sees the flag or the pump's
        // final fail_all sees the waiter.
        if self.closed.load(Ordering::SeqCst) {
            if let Some(completion) = self.take(&id) {
                let _ = completion.send(Err(BrokerError::Closed(self.channel.clone())));
            }
        }
        metrics::record_pending(&self.channel, self.waiters.len());
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.fail_all(&BrokerError::Closed(self.channel.clone()));
    }

    fn remove(&self, id: &Uuid) {
        self.waiters.remove(id);
        if let Ok(mut order) = self.order.lock() {
            order.retain(|queued| queued != id);
        }
        metrics::record_pending(&self.channel, self.waiters.len());
    }

    fn pop_oldest(&self) -> Option<(Uuid, Completion)> {
        let mut order = self.order.lock().ok()?;
        while let Some(id) = order.pop_front() {
            if let Some(entry) = self.waiters.remove(&id) {
                return Some(entry);
            }
        }
        None
    }

    fn take(&self, id: &Uuid) -> Option<Completion> {
        let (_, completion) = self.waiters.remove(id)?;
        if let Ok(mut order) = self.order.lock() {
            order.retain(|queued| queued != id);
        }
        Some(completion)
    }

    /// Hand `message` to the waiter it belongs to.
    fn resolve(&self, message: InboundMessage) {
        let correlation = message
            .correlation_id()
            .and_then(|raw| Uuid::parse_str(raw).ok());

        match correlation {
            Some(id) => match self.take(&id) {
                Some(completion) => {
                    if completion.send(Ok(message)).is_err() {
                        tracing::debug!(channel = %self.channel, correlation_id = %id, "Waiter left before its reply arrived");
                    }
                }
                None => {
                    tracing::warn!(channel = %self.channel, correlation_id = %id, "Dropping reply with no waiting request");
                    metrics::record_unmatched_reply(&self.channel);
                }
            },
            None => {
                let mut message = message;
                loop {
                    let Some((id, completion)) = self.pop_oldest() else {
                        tracing::warn!(channel = %self.channel, "Dropping uncorrelated reply, nobody is waiting");
                        metrics::record_unmatched_reply(&self.channel);
                        break;
                    };
                    match completion.send(Ok(message)) {
                        Ok(()) => {
                            tracing::trace!(channel = %self.channel, correlation_id = %id, "Uncorrelated reply given to oldest waiter");
                            break;
                        }
                        // That waiter just went away; try the next one.
                        Err(returned) => match returned {
                            Ok(m) => message = m,
                            Err(_) => break,
                        },
                    }
                }
            }
        }
        metrics::record_pending(&self.channel, self.waiters.len());
    }

    /// Fail every current waiter with `error`.
    fn fail_all(&self, error: &BrokerError) {
        let ids: Vec<Uuid> = self.waiters.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some(completion) = self.take(&id) {
                let _ = completion.send(Err(error.clone()));
            }
        }
        metrics::record_pending(&self.channel, self.waiters.len());
    }

    fn len(&self) -> usize {
        self.waiters.len()
    }
}

/// A registered request waiting for its reply.
///
/// Dropping it unregisters the request.
pub struct PendingReply {
    id: Uuid,
    rx: oneshot::Receiver<Result<InboundMessage, BrokerError>>,
    pending: Arc<PendingReplies>,
}

impl PendingReply {
    pub fn correlation_id(&self) -> Uuid {
        self.id
    }

    /// Wait for the reply. Not bounded by time; callers apply the deadline.
    pub async fn wait(&mut self) -> Result<InboundMessage, BrokerError> {
        match (&mut self.rx).await {
            Ok(result) => result,
            Err(_) => Err(BrokerError::Closed(self.pending.channel.clone())),
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

/// One inbound channel plus the pump draining it.
pub struct ReplyChannel {
    pending: Arc<PendingReplies>,
}

impl ReplyChannel {
    /// Start pumping `source` until `shutdown` fires or the source closes.
    pub fn spawn(source: Arc<dyn ReplySource>, shutdown: broadcast::Receiver<()>) -> Arc<Self> {
        let pending = Arc::new(PendingReplies::new(source.name().to_string()));
        tokio::spawn(run_pump(source, pending.clone(), shutdown));
        Arc::new(Self { pending })
    }

    pub fn name(&self) -> &str {
        &self.pending.channel
    }

    /// Register a new waiter. Must happen before the command is published.
    pub fn register(&self) -> PendingReply {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        PendingReply {
            id,
            rx,
            pending: self.pending.clone(),
        }
    }

    /// Requests currently waiting on this channel.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

async fn run_pump(
    source: Arc<dyn ReplySource>,
    pending: Arc<PendingReplies>,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::debug!(channel = %pending.channel, "Reply pump started");
    let mut failures: u32 = 0;

    loop {
        let received = tokio::select! {
            _ = shutdown.recv() => break,
            received = source.receive_next() => received,
        };

        match received {
            Ok(message) => {
                failures = 0;
                pending.resolve(message);
            }
            Err(BrokerError::Closed(name)) => {
                tracing::warn!(channel = %name, "Reply source closed");
                break;
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let delay = pump_backoff(failures);
                tracing::error!(channel = %pending.channel, error = %e, failures, ?delay, "Reply consume failed");
                pending.fail_all(&e);
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    // Nothing will resolve the remaining or future waiters any more.
    pending.close();
    tracing::debug!(channel = %pending.channel, "Reply pump stopped");
}
