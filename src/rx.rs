//! rx-combine - reactive operators over boxed async streams
//!
//! A [`Publisher`] is a boxed stream of `Result<T, E>`. `Ok` items are values,
//! an `Err` item is the terminal failure, and the end of the stream is a
//! successful completion. Every operator in this module yields nothing after
//! forwarding a failure.

use async_stream::stream;
use futures_core::Stream;
use futures_util::pin_mut;
use std::task::{Context, Poll};
use futures_util::{
    future,
    stream::{self, BoxStream, StreamExt},
};

/// A boxed, heap-allocated stream of values that may terminate with a failure
pub type Publisher<T, E> = BoxStream<'static, Result<T, E>>;

/// How a publisher ended, as reported to a subscription's completion callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCase<E> {
    Completed,
    Errored(E),
}

impl<E> ExitCase<E> {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExitCase::Completed)
    }
}

// ================================
// Constructors
// ================================

/// Emit a single value, then complete
///
/// Like every [`Publisher`], the result is consumed by one subscriber. Each
/// call builds an independent publisher, so subscribe twice by calling twice
/// (or keep a `|| success(value.clone())` factory).
///
/// # Examples
/// ```
/// use rx_combine::*;
/// use futures_util::stream::StreamExt;
///
/// # async fn example() {
/// let result = success::<_, String>(5).collect::<Vec<_>>().await;
/// assert_eq!(result, vec![Ok(5)]);
/// # }
/// ```
pub fn success<T, E>(value: T) -> Publisher<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    stream::once(future::ready(Ok(value))).boxed()
}

/// Terminate immediately with `error`, emitting no values
///
/// Single-subscriber, like [`success`]: call again for another subscriber.
pub fn fail<T, E>(error: E) -> Publisher<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    stream::once(future::ready(Err(error))).boxed()
}

/// Complete immediately without emitting anything
pub fn empty<T, E>() -> Publisher<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    stream::empty().boxed()
}

/// Emit every value of an iterator, then complete
pub fn from_iter<I, T, E>(iter: I) -> Publisher<T, E>
where
    I: IntoIterator<Item = T> + Send + 'static,
    <I as IntoIterator>::IntoIter: Send,
    T: Send + 'static,
    E: Send + 'static,
{
    stream::iter(iter.into_iter().map(Ok)).boxed()
}

// ================================
// Operators
// ================================

/// Ready `other` values consumed by `with_latest_from` before `source` is polled
const OTHER_BUDGET: usize = 32;

/// One step of `with_latest_from`, as seen from `source`
enum Sampled<S, E> {
    Value(S),
    Failed(E),
    Done,
}

/// Stop a result stream right after its first failure
pub fn terminate_on_error<T, E, S>(s: S) -> Publisher<T, E>
where
    S: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    stream! {
        pin_mut!(s);
        while let Some(item) = s.next().await {
            let failed = item.is_err();
            yield item;
            if failed {
                break;
            }
        }
    }
    .boxed()
}

/// Drop every absent value and unwrap the present ones
///
/// # Examples
/// ```
/// use rx_combine::*;
/// use futures_util::stream::StreamExt;
///
/// # async fn example() {
/// let source = from_iter::<_, _, String>(vec![Some(1), None, Some(2), None, None, Some(3)]);
/// let result = ignore_nil(source).collect::<Vec<_>>().await;
/// assert_eq!(result, vec![Ok(1), Ok(2), Ok(3)]);
/// # }
/// ```
pub fn ignore_nil<T, E>(s: Publisher<Option<T>, E>) -> Publisher<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    stream! {
        pin_mut!(s);
        while let Some(item) = s.next().await {
            match item {
                Ok(Some(value)) => yield Ok(value),
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    }
    .boxed()
}

/// Call `f` with every value before forwarding it unchanged
///
/// The callback runs synchronously, once per value, before the value is
/// handed downstream. Failures and completion pass through untouched; a
/// panicking callback is not caught.
pub fn receive_output<T, E, F>(s: Publisher<T, E>, mut f: F) -> Publisher<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: FnMut(&T) + Send + 'static,
{
    stream! {
        pin_mut!(s);
        while let Some(item) = s.next().await {
            match item {
                Ok(value) => {
                    f(&value);
                    yield Ok(value);
                }
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    }
    .boxed()
}

/// Combine each value of `source` with the latest value seen on `other`
///
/// Only `source` drives output: a value from `source` is combined with the
/// most recent `other` value and emitted, while values from `other` merely
/// update that latest value. Source values that arrive before `other` has
/// produced anything are dropped.
///
/// The first failure from either side is forwarded and ends the stream.
/// Completion of `source` completes the output; completion of `other` keeps
/// its last value in use.
///
/// When both sides are ready at once, `other` is polled first, so its pending
/// value becomes the latest before the source value is paired. At most
/// `OTHER_BUDGET` ready `other` values are taken per source poll, so an
/// always-ready `other` can neither starve `source` nor hold the executor
/// thread. This ordering is implementation-defined.
///
/// # Examples
/// ```
/// use rx_combine::*;
/// use futures_util::stream::StreamExt;
///
/// # async fn example() {
/// let source = from_iter::<_, _, String>(vec![1, 2]);
/// let other = from_iter::<_, _, String>(vec![10, 20]);
/// let result = with_latest_from(source, other, |s, o| s + o)
///     .collect::<Vec<_>>()
///     .await;
/// assert_eq!(result, vec![Ok(21), Ok(22)]);
/// # }
/// ```
pub fn with_latest_from<S, O, R, E, F>(
    source: Publisher<S, E>,
    other: Publisher<O, E>,
    mut combine: F,
) -> Publisher<R, E>
where
    S: Send + 'static,
    O: Clone + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
    F: FnMut(S, O) -> R + Send + 'static,
{
    stream! {
        let mut source = source;
        let mut other = other;
        let mut latest: Option<O> = None;
        let mut other_done = false;

        loop {
            let step = future::poll_fn(|cx| {
                poll_sample(cx, &mut source, &mut other, &mut other_done, &mut latest)
            })
            .await;

            match step {
                Sampled::Value(value) => {
                    if let Some(current) = &latest {
                        yield Ok(combine(value, current.clone()));
                    }
                }
                Sampled::Failed(e) => {
                    yield Err(e);
                    break;
                }
                Sampled::Done => break,
            }
        }
    }
    .boxed()
}

/// Take the ready `other` values (up to the budget), then poll `source` once
fn poll_sample<S, O, E>(
    cx: &mut Context<'_>,
    source: &mut Publisher<S, E>,
    other: &mut Publisher<O, E>,
    other_done: &mut bool,
    latest: &mut Option<O>,
) -> Poll<Sampled<S, E>> {
    let mut drained = 0;
    while !*other_done && drained < OTHER_BUDGET {
        match other.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(value))) => {
                *latest = Some(value);
                drained += 1;
            }
            Poll::Ready(Some(Err(e))) => return Poll::Ready(Sampled::Failed(e)),
            Poll::Ready(None) => *other_done = true,
            Poll::Pending => break,
        }
    }

    match source.poll_next_unpin(cx) {
        Poll::Ready(Some(Ok(value))) => Poll::Ready(Sampled::Value(value)),
        Poll::Ready(Some(Err(e))) => Poll::Ready(Sampled::Failed(e)),
        Poll::Ready(None) => Poll::Ready(Sampled::Done),
        Poll::Pending => {
            // `other` was cut off while still ready and registered no waker
            if drained == OTHER_BUDGET {
                cx.waker().wake_by_ref();
            }
            Poll::Pending
        }
    }
}

/// [`with_latest_from`] pairing each source value with the latest `other` value
pub fn with_latest_from_pair<S, O, E>(
    source: Publisher<S, E>,
    other: Publisher<O, E>,
) -> Publisher<(S, O), E>
where
    S: Send + 'static,
    O: Clone + Send + 'static,
    E: Send + 'static,
{
    with_latest_from(source, other, |s, o| (s, o))
}

/// [`with_latest_from`] keeping only the latest `other` value
///
/// Useful for sequencing: "when `source` fires, act on `other`'s state".
pub fn with_latest_from_other<S, O, E>(
    source: Publisher<S, E>,
    other: Publisher<O, E>,
) -> Publisher<O, E>
where
    S: Send + 'static,
    O: Clone + Send + 'static,
    E: Send + 'static,
{
    with_latest_from(source, other, |_, o| o)
}
