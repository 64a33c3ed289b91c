//! Update queue and dispatcher.
//!
//! The webhook side pushes raw updates into an unbounded FIFO queue and
//! returns immediately. A single consumer loop, [`UpdateDispatcher::run`],
//! pops them one at a time, validates their shape, looks the type tag up in
//! the [`UpdateTypeRegistry`] and awaits the matching handler before taking
//! the next item.
//!
//! ```text
//! webhook ─┐
//! webhook ─┼─► UpdateQueue ──► run() ──► resolve ──► handler task
//! webhook ─┘       ▲                         │
//!                  └── Shutdown ◄────────────┘ (loop exits)
//! ```
//!
//! Failures of a single update are logged and counted; they never end the
//! loop. Only the [`QueueItem::Shutdown`] sentinel does, after everything
//! queued before it was handled. The loop can be started again afterwards.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tracing::{Instrument, debug, debug_span, error, info, warn};

use crate::error::{UpdateError, UpdateResult};
use crate::registry::UpdateTypeRegistry;
use crate::update::{UPDATE_ID_KEY, Update};

/// An item travelling through the update queue.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueItem {
    /// A raw update as received over the webhook.
    Update(Value),
    /// Stops the consumer loop once reached.
    Shutdown,
}

/// Producer side of the update queue.
///
/// Cheap to clone; every clone feeds the same dispatcher. Pushing never
/// waits.
#[derive(Debug, Clone)]
pub struct UpdateQueue {
    tx: mpsc::UnboundedSender<QueueItem>,
}

impl UpdateQueue {
    /// Enqueues a raw update.
    pub fn push(&self, update: Value) {
        self.send(QueueItem::Update(update));
    }

    /// Enqueues the shutdown sentinel.
    pub fn shutdown(&self) {
        self.send(QueueItem::Shutdown);
    }

    fn send(&self, item: QueueItem) {
        // The receiver lives inside the dispatcher, which owns a sender too,
        // so this only fails once the dispatcher itself is gone.
        if self.tx.send(item).is_err() {
            warn!("Update dispatcher is gone, dropping queue item");
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Single-consumer dispatcher for inbound updates.
pub struct UpdateDispatcher {
    registry: Arc<UpdateTypeRegistry>,
    queue: UpdateQueue,
    receiver: Mutex<mpsc::UnboundedReceiver<QueueItem>>,
    running: AtomicBool,
    processed: AtomicU64,
    failed: AtomicU64,
}

impl UpdateDispatcher {
    /// Creates a stopped dispatcher with its own empty queue.
    pub fn new(registry: impl Into<Arc<UpdateTypeRegistry>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            registry: registry.into(),
            queue: UpdateQueue { tx },
            receiver: Mutex::new(rx),
            running: AtomicBool::new(false),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Returns a producer handle for the queue.
    pub fn queue(&self) -> UpdateQueue {
        self.queue.clone()
    }

    /// Returns the registry updates are routed through.
    pub fn registry(&self) -> &UpdateTypeRegistry {
        &self.registry
    }

    /// Enqueues a raw update without waiting for it to be processed.
    pub fn intake(&self, update: Value) {
        self.queue.push(update);
    }

    /// Enqueues the shutdown sentinel.
    ///
    /// Updates already in the queue are still handled before the loop stops.
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }

    /// Returns whether the consumer loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns processing counters.
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Runs the consumer loop until the shutdown sentinel is reached.
    ///
    /// Returns immediately if the loop is already running elsewhere.
    pub async fn run(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Update dispatcher is already running");
            return;
        }
        let _running = RunningGuard(&self.running);

        info!(update_types = ?self.registry.update_types(), "Update dispatcher started");

        let mut receiver = self.receiver.lock().await;
        while let Some(item) = receiver.recv().await {
            let update = match item {
                QueueItem::Update(update) => update,
                QueueItem::Shutdown => break,
            };

            match self.dispatch(update).await {
                Ok(()) => {
                    self.processed.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    error!(error = %err, "Failed to process update");
                }
            }
        }

        info!(stats = %self.stats(), "Update dispatcher stopped");
    }

    /// Validates a raw update and runs its handler to completion.
    ///
    /// The handler runs on its own task so that a panic is reported as
    /// [`UpdateError::HandlerPanicked`] instead of unwinding into the loop.
    pub async fn dispatch(&self, update: Value) -> UpdateResult<()> {
        let Update {
            update_id,
            update_type,
            body,
        } = self.resolve(update)?;

        let handler = self
            .registry
            .get(&update_type)
            .cloned()
            .ok_or_else(|| UpdateError::UnsupportedType {
                update_type: update_type.clone(),
            })?;

        let span = debug_span!("update", update_id = %update_id, update_type = %update_type);
        debug!(parent: &span, "Dispatching update");

        let task = tokio::spawn(
            async move { handler.handle(&update_id, &body).await }.instrument(span),
        );

        match task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(UpdateError::Handler {
                update_type,
                source,
            }),
            Err(err) if err.is_panic() => Err(UpdateError::HandlerPanicked { update_type }),
            Err(_) => Err(UpdateError::HandlerCancelled { update_type }),
        }
    }

    /// Checks the shape of a raw update and splits it into its parts.
    ///
    /// A valid update is an object with `update_id` and exactly one other
    /// key, which must be a registered type tag.
    pub fn resolve(&self, update: Value) -> UpdateResult<Update> {
        let Value::Object(mut fields) = update else {
            return Err(UpdateError::NotAnObject);
        };

        let Some(update_id) = fields.remove(UPDATE_ID_KEY) else {
            return Err(UpdateError::MissingUpdateId {
                keys: fields.keys().cloned().collect(),
            });
        };

        if fields.len() != 1 {
            return Err(UpdateError::InvalidShape {
                keys: fields.keys().cloned().collect(),
            });
        }

        let Some((update_type, body)) = fields.into_iter().next() else {
            return Err(UpdateError::InvalidShape { keys: Vec::new() });
        };

        if !self.registry.contains(&update_type) {
            return Err(UpdateError::UnsupportedType { update_type });
        }

        Ok(Update {
            update_id,
            update_type,
            body,
        })
    }
}

impl fmt::Debug for UpdateDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateDispatcher")
            .field("registry", &self.registry)
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Clears the running flag when the loop exits, however it exits.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Counters describing what the dispatcher has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Updates whose handler finished successfully.
    pub processed: u64,
    /// Updates rejected during validation or failed in their handler.
    pub failed: u64,
}

impl fmt::Display for DispatcherStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Updates: {} processed, {} failed",
            self.processed, self.failed
        )
    }
}
