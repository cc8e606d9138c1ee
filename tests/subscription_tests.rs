use futures::channel::mpsc;
use futures_util::stream::StreamExt;
use rx_combine::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};

#[derive(Debug, Clone, PartialEq)]
struct TestError(&'static str);

#[tokio::test]
async fn test_sink_delivers_values_then_completion() {
    let values = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&values);
    let (done_tx, done_rx) = oneshot::channel();

    let _subscription = from_iter::<_, _, TestError>(vec![1, 2, 3])
        .sink(
            move |v| recorded.lock().unwrap().push(v),
            move |exit| {
                let _ = done_tx.send(exit);
            },
        )
        .unwrap();

    let exit = timeout(Duration::from_secs(1), done_rx).await.unwrap().unwrap();
    assert_eq!(exit, ExitCase::Completed);
    assert_eq!(*values.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_sink_reports_failure_once() {
    let values = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&values);
    let (done_tx, done_rx) = oneshot::channel();

    let source = futures_util::stream::iter(vec![Ok(1), Err(TestError("broken")), Ok(2)]).boxed();
    let _subscription = sink(
        source,
        move |v| recorded.lock().unwrap().push(v),
        move |exit| {
            let _ = done_tx.send(exit);
        },
    )
    .unwrap();

    let exit = timeout(Duration::from_secs(1), done_rx).await.unwrap().unwrap();
    assert_eq!(exit, ExitCase::Errored(TestError("broken")));
    assert_eq!(*values.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn test_cancel_prevents_late_deferred_value() {
    let stash: Arc<Mutex<Option<Promise<i32, TestError>>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&stash);
    let source = deferred(move |promise| {
        *slot.lock().unwrap() = Some(promise);
    });

    let received = Arc::new(AtomicUsize::new(0));
    let completions = Arc::new(AtomicUsize::new(0));
    let (r, c) = (Arc::clone(&received), Arc::clone(&completions));
    let subscription = sink(
        source.stream(),
        move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        },
        move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        },
    )
    .unwrap();

    // Wait for the resolver to run on the subscription task.
    let promise = loop {
        if let Some(promise) = stash.lock().unwrap().take() {
            break promise;
        }
        sleep(Duration::from_millis(5)).await;
    };

    subscription.cancel();
    assert!(!subscription.is_active());
    let _ = promise.fulfill(99);

    sleep(Duration::from_millis(50)).await;
    assert_eq!(received.load(Ordering::SeqCst), 0);
    assert_eq!(completions.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_callback_after_cancel_returns() {
    let (tx, rx) = mpsc::unbounded::<Result<usize, TestError>>();
    let received = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&received);

    let subscription = sink(
        rx.boxed(),
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
        |_| {},
    )
    .unwrap();

    for i in 0..100 {
        tx.unbounded_send(Ok(i)).unwrap();
    }
    subscription.cancel();
    let at_cancel = received.load(Ordering::SeqCst);

    for i in 100..200 {
        let _ = tx.unbounded_send(Ok(i));
    }
    sleep(Duration::from_millis(50)).await;
    assert_eq!(received.load(Ordering::SeqCst), at_cancel);
}

#[tokio::test]
async fn test_cancel_from_inside_callback() {
    let holder: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let inner = Arc::clone(&holder);
    let received = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&received);
    let (tx, rx) = mpsc::unbounded::<Result<i32, TestError>>();

    let subscription = sink(
        rx.boxed(),
        move |v| {
            recorded.lock().unwrap().push(v);
            if v == 2 {
                if let Some(subscription) = inner.lock().unwrap().as_ref() {
                    subscription.cancel();
                }
            }
        },
        |_| {},
    )
    .unwrap();
    *holder.lock().unwrap() = Some(subscription);

    for i in 1..=4 {
        tx.unbounded_send(Ok(i)).unwrap();
    }
    sleep(Duration::from_millis(50)).await;

    assert_eq!(*received.lock().unwrap(), vec![1, 2]);
    assert!(!holder.lock().unwrap().as_ref().unwrap().is_active());
}

type SubscriptionSlot = Arc<Mutex<Option<Subscription>>>;

/// Subscribe so that the first value waits for the peer's callback, then cancels the peer
fn cancel_peer_on_value(
    publisher: Publisher<(), TestError>,
    rendezvous: Arc<Barrier>,
    peer: SubscriptionSlot,
    done: tokio::sync::mpsc::UnboundedSender<&'static str>,
    name: &'static str,
) -> Subscription {
    sink(
        publisher,
        move |_| {
            rendezvous.wait();
            if let Some(peer) = peer.lock().unwrap().as_ref() {
                peer.cancel();
            }
            let _ = done.send(name);
        },
        |_| {},
    )
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_subscriptions_cancelling_each_other_from_callbacks() {
    let rendezvous = Arc::new(Barrier::new(2));
    let x_slot: SubscriptionSlot = Arc::new(Mutex::new(None));
    let y_slot: SubscriptionSlot = Arc::new(Mutex::new(None));
    let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();
    let (x_tx, x_rx) = mpsc::unbounded::<Result<(), TestError>>();
    let (y_tx, y_rx) = mpsc::unbounded::<Result<(), TestError>>();

    let x = cancel_peer_on_value(x_rx.boxed(), Arc::clone(&rendezvous), Arc::clone(&y_slot), done_tx.clone(), "x");
    let y = cancel_peer_on_value(y_rx.boxed(), Arc::clone(&rendezvous), Arc::clone(&x_slot), done_tx, "y");
    *x_slot.lock().unwrap() = Some(x);
    *y_slot.lock().unwrap() = Some(y);

    // Both callbacks run at once, each cancelling the other mid-delivery.
    x_tx.unbounded_send(Ok(())).unwrap();
    y_tx.unbounded_send(Ok(())).unwrap();

    let mut finished = timeout(Duration::from_secs(2), async {
        vec![done_rx.recv().await, done_rx.recv().await]
    })
    .await
    .expect("callbacks deadlocked while cancelling each other");
    finished.sort();
    assert_eq!(finished, vec![Some("x"), Some("y")]);

    assert!(!x_slot.lock().unwrap().as_ref().unwrap().is_active());
    assert!(!y_slot.lock().unwrap().as_ref().unwrap().is_active());
}

#[tokio::test]
async fn test_dropping_subscription_cancels() {
    let (tx, rx) = mpsc::unbounded::<Result<i32, TestError>>();
    let subscription = sink(rx.boxed(), |_| {}, |_| {}).unwrap();
    sleep(Duration::from_millis(10)).await;
    assert!(subscription.is_active());

    drop(subscription);
    sleep(Duration::from_millis(10)).await;
    assert!(tx.is_closed());
}

#[tokio::test]
async fn test_sink_with_config() {
    let (done_tx, done_rx) = oneshot::channel();
    let config = SinkConfig {
        label: "preview".to_string(),
        trace_values: true,
    };

    let _subscription = sink_with_config(
        success::<_, TestError>("lut"),
        config,
        |_| {},
        move |exit| {
            let _ = done_tx.send(exit);
        },
    )
    .unwrap();

    assert_eq!(done_rx.await.unwrap(), ExitCase::Completed);
}

#[test]
fn test_sink_outside_runtime_fails() {
    let result = sink(success::<_, TestError>(1), |_| {}, |_| {});
    assert!(matches!(result, Err(StreamError::NoRuntime)));
}
