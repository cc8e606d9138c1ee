use futures_core::Stream;
use futures_util::stream::StreamExt;

use crate::error::StreamResult;
use crate::rx::{
    ignore_nil, receive_output, terminate_on_error, with_latest_from, with_latest_from_other,
    with_latest_from_pair, ExitCase, Publisher,
};
use crate::subscription::{sink, Subscription};

/// Values that may be absent; implemented for `Option<T>`
pub trait OptionLike {
    type Inner;
    fn into_option(self) -> Option<Self::Inner>;
}

impl<T> OptionLike for Option<T> {
    type Inner = T;

    fn into_option(self) -> Option<T> {
        self
    }
}

/// Lift any plain stream into a publisher with the chosen failure type
pub trait IntoPublisher: Stream + Sized + Send + 'static
where
    Self::Item: Send + 'static,
{
    fn into_publisher<E>(self) -> Publisher<Self::Item, E>
    where
        E: Send + 'static,
    {
        self.map(Ok).boxed()
    }
}

impl<S> IntoPublisher for S
where
    S: Stream + Sized + Send + 'static,
    S::Item: Send + 'static,
{
}

/// Extension trait providing the reactive operators on result streams
pub trait PublisherExt<T: Send + 'static, E: Send + 'static>:
    Stream<Item = Result<T, E>> + Sized + Send + 'static
{
    /// Drop absent values and unwrap the present ones
    fn ignore_nil(self) -> Publisher<T::Inner, E>
    where
        T: OptionLike,
        T::Inner: Send + 'static,
    {
        ignore_nil(self.map(|item| item.map(OptionLike::into_option)).boxed())
    }

    /// Observe each value without changing it
    fn receive_output<F>(self, f: F) -> Publisher<T, E>
    where
        F: FnMut(&T) + Send + 'static,
    {
        receive_output(self.boxed(), f)
    }

    /// Combine each value with the latest value of `other`
    fn with_latest_from<O, R, S2, F>(self, other: S2, combine: F) -> Publisher<R, E>
    where
        S2: Stream<Item = Result<O, E>> + Send + 'static,
        O: Clone + Send + 'static,
        R: Send + 'static,
        F: FnMut(T, O) -> R + Send + 'static,
    {
        with_latest_from(self.boxed(), other.boxed(), combine)
    }

    /// Pair each value with the latest value of `other`
    fn with_latest_from_pair<O, S2>(self, other: S2) -> Publisher<(T, O), E>
    where
        S2: Stream<Item = Result<O, E>> + Send + 'static,
        O: Clone + Send + 'static,
    {
        with_latest_from_pair(self.boxed(), other.boxed())
    }

    /// Emit the latest value of `other` each time this publisher emits
    fn with_latest_from_other<O, S2>(self, other: S2) -> Publisher<O, E>
    where
        S2: Stream<Item = Result<O, E>> + Send + 'static,
        O: Clone + Send + 'static,
    {
        with_latest_from_other(self.boxed(), other.boxed())
    }

    /// Stop right after the first failure
    fn terminate_on_error(self) -> Publisher<T, E> {
        terminate_on_error(self)
    }

    /// Subscribe with value and completion callbacks
    fn sink<FV, FC>(self, receive_value: FV, receive_completion: FC) -> StreamResult<Subscription>
    where
        FV: FnMut(T) + Send + 'static,
        FC: FnOnce(ExitCase<E>) + Send + 'static,
    {
        sink(self.boxed(), receive_value, receive_completion)
    }
}

impl<T, E, S> PublisherExt<T, E> for S
where
    S: Stream<Item = Result<T, E>> + Sized + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
}
