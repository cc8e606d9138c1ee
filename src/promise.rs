//! Deferred single-shot publishers
//!
//! [`deferred`] turns a callback-style operation ("call this promise exactly
//! once with a result") into a lazily started publisher. The operation runs
//! only when a publisher is first polled, and every publisher created from the
//! same [`Deferred`] runs it again from scratch.

use async_stream::stream;
use futures::channel::oneshot;
use futures_util::stream::StreamExt;
use log::{debug, warn};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{StreamError, StreamResult};
use crate::rx::Publisher;

enum Slot<T, E> {
    Pending(oneshot::Sender<Result<T, E>>),
    Resolved,
}

/// One-shot resolver handed to a deferred operation
///
/// Clones share the same slot: whichever clone resolves first wins and every
/// later call is ignored.
pub struct Promise<T, E> {
    slot: Arc<Mutex<Slot<T, E>>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Promise {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl<T, E> Promise<T, E> {
    fn new(sender: oneshot::Sender<Result<T, E>>) -> Self {
        Promise {
            slot: Arc::new(Mutex::new(Slot::Pending(sender))),
        }
    }

    /// A promise paired with the receiver its first resolution is sent to
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Result<T, E>>) {
        let (tx, rx) = oneshot::channel();
        (Promise::new(tx), rx)
    }

    /// Deliver the result to the subscriber
    ///
    /// Returns `AlreadyResolved` if any clone of this promise was resolved
    /// before, and `Cancelled` if the subscriber is gone.
    pub fn resolve(&self, result: Result<T, E>) -> StreamResult<()> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *slot, Slot::Resolved) {
            Slot::Pending(sender) => sender.send(result).map_err(|_| {
                debug!("Promise resolved after its subscriber was cancelled");
                StreamError::Cancelled
            }),
            Slot::Resolved => {
                debug!("Promise resolved more than once; ignoring");
                Err(StreamError::AlreadyResolved)
            }
        }
    }

    pub fn fulfill(&self, value: T) -> StreamResult<()> {
        self.resolve(Ok(value))
    }

    pub fn reject(&self, error: E) -> StreamResult<()> {
        self.resolve(Err(error))
    }

    pub fn is_resolved(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*slot, Slot::Resolved)
    }

    /// True once the subscriber has gone away; long-running work may stop early
    pub fn is_cancelled(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match &*slot {
            Slot::Pending(sender) => sender.is_canceled(),
            Slot::Resolved => false,
        }
    }
}

/// A reusable, lazily started single-value source
pub struct Deferred<T, E> {
    resolver: Arc<dyn Fn(Promise<T, E>) + Send + Sync + 'static>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Deferred {
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<T, E> Deferred<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new<F>(resolver: F) -> Self
    where
        F: Fn(Promise<T, E>) + Send + Sync + 'static,
    {
        Deferred {
            resolver: Arc::new(resolver),
        }
    }

    /// Create a fresh publisher; the resolver runs when it is first polled
    ///
    /// Dropping the publisher before the promise is resolved cancels it: the
    /// eventual result is discarded.
    pub fn stream(&self) -> Publisher<T, E> {
        let resolver = Arc::clone(&self.resolver);
        stream! {
            let (promise, rx) = Promise::channel();
            resolver(promise);
            match rx.await {
                Ok(result) => yield result,
                Err(_) => warn!("Deferred resolver dropped its promise without resolving it"),
            }
        }
        .boxed()
    }

    /// Run the operation once and wait for its result
    ///
    /// `None` means the resolver dropped its promise unresolved.
    pub async fn first(&self) -> Option<Result<T, E>> {
        self.stream().next().await
    }
}

/// Build a [`Deferred`] from a callback-style operation
///
/// # Examples
/// ```
/// use rx_combine::*;
/// use futures_util::stream::StreamExt;
///
/// # async fn example() {
/// let lookup = deferred(|promise: Promise<u32, String>| {
///     let _ = promise.fulfill(42);
/// });
/// assert_eq!(lookup.stream().collect::<Vec<_>>().await, vec![Ok(42)]);
/// # }
/// ```
pub fn deferred<T, E, F>(resolver: F) -> Deferred<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(Promise<T, E>) + Send + Sync + 'static,
{
    Deferred::new(resolver)
}
