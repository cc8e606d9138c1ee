//! Bridges from callback-completed animation APIs to publishers
//!
//! Platform animation APIs are fire-and-forget: they take a duration, a delay,
//! a mutation block and a completion callback receiving a `finished` flag.
//! The helpers here turn one such call into a single-value publisher, and a
//! stream of values into a stream of finished flags.

use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures_util::pin_mut;
use futures_util::stream::StreamExt;
use log::debug;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::sleep;

use crate::config::AnimationConfig;
use crate::error::StreamResult;
use crate::promise::{deferred, Promise};
use crate::rx::Publisher;

/// The state change an animation interpolates
pub type Mutation = Box<dyn FnOnce() + Send + 'static>;

/// Completion callback receiving the `finished` flag
pub type CompletionHandler = Box<dyn FnMut(bool) + Send + 'static>;

/// A callback-completed animation API
///
/// Implementations may call `completion` synchronously, later, from another
/// thread, or more than once; the publishers built on top only observe the
/// first call.
pub trait Animator: Send + Sync {
    fn animate(
        &self,
        duration: Duration,
        delay: Duration,
        mutation: Mutation,
        completion: CompletionHandler,
    );
}

/// Animator driven by tokio timers
///
/// Runs the mutation once `delay` has elapsed and reports `finished = true`
/// after a further `duration`.
#[derive(Debug, Clone)]
pub struct TimedAnimator {
    handle: Handle,
}

impl TimedAnimator {
    /// Bind to the current tokio runtime
    pub fn new() -> StreamResult<Self> {
        Ok(Self {
            handle: Handle::try_current()?,
        })
    }

    /// Bind to a given runtime, so animations can be started from threads
    /// outside it
    pub fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Animator for TimedAnimator {
    fn animate(
        &self,
        duration: Duration,
        delay: Duration,
        mutation: Mutation,
        mut completion: CompletionHandler,
    ) {
        debug!("Starting timed animation ({:?} after {:?})", duration, delay);
        self.handle.spawn(async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            mutation();
            sleep(duration).await;
            completion(true);
        });
    }
}

/// Run one animation and emit its `finished` flag
///
/// The animation starts when the returned publisher is first polled. Exactly
/// one value is emitted no matter how often the animator fires its completion
/// callback; dropping the publisher first discards the result.
pub fn animate<A, F>(animator: Arc<A>, config: AnimationConfig, mutation: F) -> Publisher<bool, Infallible>
where
    A: Animator + ?Sized + 'static,
    F: Fn() + Send + Sync + 'static,
{
    let mutation = Arc::new(mutation);
    deferred(move |promise: Promise<bool, Infallible>| {
        let mutation = Arc::clone(&mutation);
        animator.animate(
            config.duration,
            config.delay,
            Box::new(move || mutation()),
            Box::new(move |finished| {
                let _ = promise.fulfill(finished);
            }),
        );
    })
    .stream()
}

/// Run one animation per source value, emitting each `finished` flag
///
/// Flags are emitted in the order the animations finish. Animations are not
/// serialized: a value arriving while an earlier animation is still running
/// starts its own animation straight away, so the two overlap.
///
/// Each value is moved into its own mutation, so values need not be `Clone`
/// or `Sync`.
pub fn animate_each<T, A, F>(
    source: Publisher<T, Infallible>,
    animator: Arc<A>,
    config: AnimationConfig,
    mutation: F,
) -> Publisher<bool, Infallible>
where
    T: Send + 'static,
    A: Animator + ?Sized + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    let mutation = Arc::new(mutation);
    stream! {
        pin_mut!(source);
        let mut in_flight = FuturesUnordered::new();
        let mut source_done = false;

        loop {
            tokio::select! {
                maybe_item = source.next(), if !source_done => {
                    match maybe_item {
                        Some(Ok(value)) => {
                            let mutation = Arc::clone(&mutation);
                            let (promise, finished) = Promise::<bool, Infallible>::channel();
                            animator.animate(
                                config.duration,
                                config.delay,
                                Box::new(move || mutation(value)),
                                Box::new(move |flag| {
                                    let _ = promise.fulfill(flag);
                                }),
                            );
                            in_flight.push(finished);
                        }
                        Some(Err(never)) => match never {},
                        None => source_done = true,
                    }
                },
                Some(finished) = in_flight.next(), if !in_flight.is_empty() => {
                    match finished {
                        Ok(Ok(flag)) => {
                            yield Ok::<bool, Infallible>(flag);
                        }
                        Ok(Err(never)) => match never {},
                        Err(_) => debug!("animator dropped its completion handler without calling it"),
                    }
                },
                else => break,
            }
        }
    }
    .boxed()
}

/// Extension trait running an animation per value of a failure-free publisher
pub trait AnimateStreamExt<T>: futures_core::Stream<Item = Result<T, Infallible>> + Sized + Send + 'static
where
    T: Send + 'static,
{
    fn animate_each<A, F>(self, animator: Arc<A>, config: AnimationConfig, mutation: F) -> Publisher<bool, Infallible>
    where
        A: Animator + ?Sized + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        animate_each(self.boxed(), animator, config, mutation)
    }
}

impl<T, S> AnimateStreamExt<T> for S
where
    S: futures_core::Stream<Item = Result<T, Infallible>> + Sized + Send + 'static,
    T: Send + 'static,
{
}
