//! Callback-driven subscriptions
//!
//! [`sink`] drives a publisher on the current tokio runtime and hands every
//! value and the final [`ExitCase`] to callbacks. The returned
//! [`Subscription`] cancels delivery when cancelled or dropped.

use futures_util::stream::StreamExt;
use log::{debug, trace};
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::SinkConfig;
use crate::error::StreamResult;
use crate::rx::{ExitCase, Publisher};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

thread_local! {
    /// Number of subscription callbacks running on this thread
    static DELIVERY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as running a subscription callback
struct DeliveryScope;

impl DeliveryScope {
    fn enter() -> Self {
        DELIVERY_DEPTH.with(|depth| depth.set(depth.get() + 1));
        DeliveryScope
    }

    fn is_active() -> bool {
        DELIVERY_DEPTH.with(|depth| depth.get() > 0)
    }
}

impl Drop for DeliveryScope {
    fn drop(&mut self) {
        DELIVERY_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

/// Serializes callback delivery against cancellation.
///
/// Callbacks run while `delivery` is held, so `cancel` waiting on the same
/// lock guarantees no callback is running or will run once it returns.
/// A cancel issued from inside any subscription callback skips the wait and
/// only guarantees that no further callback starts; waiting there could
/// deadlock two subscriptions cancelling each other.
struct Gate {
    cancelled: AtomicBool,
    delivery: Mutex<()>,
}

impl Gate {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            delivery: Mutex::new(()),
        }
    }

    /// Run `f` unless cancelled; returns whether delivery may continue
    fn deliver<F: FnOnce()>(&self, f: F) -> bool {
        let _guard = lock(&self.delivery);
        if self.cancelled.load(Ordering::SeqCst) {
            return false;
        }
        {
            let _scope = DeliveryScope::enter();
            f();
        }
        !self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if !DeliveryScope::is_active() {
            drop(lock(&self.delivery));
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A live subscription created by [`sink`]
///
/// Dropping it cancels delivery.
pub struct Subscription {
    gate: Arc<Gate>,
    task: JoinHandle<()>,
    label: String,
}

impl Subscription {
    /// Stop delivery and drop the upstream publisher
    ///
    /// Called outside any subscription callback, it waits for a callback that
    /// is already running, so nothing is delivered after it returns. Called
    /// from inside a subscription callback (this one's or another's) it does
    /// not wait, but no further callback starts after it returns.
    pub fn cancel(&self) {
        if !self.gate.is_cancelled() {
            debug!("[{}] cancelling subscription", self.label);
        }
        self.gate.cancel();
        self.task.abort();
    }

    /// Whether values may still be delivered
    pub fn is_active(&self) -> bool {
        !self.gate.is_cancelled() && !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Subscribe to `publisher` with value and completion callbacks
///
/// Values are delivered serially on a tokio worker. `receive_completion` is
/// called once with the exit case unless the subscription is cancelled first.
/// Fails with `NoRuntime` outside of a tokio runtime.
pub fn sink<T, E, FV, FC>(
    publisher: Publisher<T, E>,
    receive_value: FV,
    receive_completion: FC,
) -> StreamResult<Subscription>
where
    T: Send + 'static,
    E: Send + 'static,
    FV: FnMut(T) + Send + 'static,
    FC: FnOnce(ExitCase<E>) + Send + 'static,
{
    sink_with_config(publisher, SinkConfig::default(), receive_value, receive_completion)
}

/// [`sink`] with explicit settings
pub fn sink_with_config<T, E, FV, FC>(
    publisher: Publisher<T, E>,
    config: SinkConfig,
    mut receive_value: FV,
    receive_completion: FC,
) -> StreamResult<Subscription>
where
    T: Send + 'static,
    E: Send + 'static,
    FV: FnMut(T) + Send + 'static,
    FC: FnOnce(ExitCase<E>) + Send + 'static,
{
    let handle = Handle::try_current()?;
    let gate = Arc::new(Gate::new());
    let task_gate = Arc::clone(&gate);
    let label = config.label.clone();

    debug!("[{}] subscribing", label);
    let task = handle.spawn(async move {
        let mut publisher = publisher;
        let mut exit = ExitCase::Completed;
        let mut delivered = 0usize;

        while let Some(item) = publisher.next().await {
            match item {
                Ok(value) => {
                    if config.trace_values {
                        trace!("[{}] delivering value #{}", config.label, delivered);
                    }
                    if !task_gate.deliver(|| receive_value(value)) {
                        return;
                    }
                    delivered += 1;
                }
                Err(e) => {
                    exit = ExitCase::Errored(e);
                    break;
                }
            }
        }

        debug!(
            "[{}] finished after {} values (completed: {})",
            config.label,
            delivered,
            exit.is_completed()
        );
        task_gate.deliver(|| receive_completion(exit));
    });

    Ok(Subscription { gate, task, label })
}
