//! End-to-end tests of the receive loop against the in-memory mailbox.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use debugtap_receiver::{
    DebugMessage, MailboxEvent, MemoryMailbox, Receiver, ReceiverConfig, ReceiverError,
    ReceiverState, SEGMENT_SIZE,
};
use tokio::sync::mpsc;

const WAIT: Duration = Duration::from_millis(25);
const PRODUCER_TIMEOUT: Duration = Duration::from_secs(5);
const DEADLINE: Duration = Duration::from_secs(5);

fn config() -> ReceiverConfig {
    ReceiverConfig::builder().wait_timeout(WAIT).build()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(DEADLINE, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Ready must never be asserted between a data-ready wakeup and the read.
fn assert_alternation(events: &[MailboxEvent]) {
    let mut pending = false;
    for event in events {
        match event {
            MailboxEvent::DataSignaled => pending = true,
            MailboxEvent::Read => pending = false,
            MailboxEvent::Ready => assert!(!pending, "ready reasserted mid-record: {events:?}"),
            _ => {}
        }
    }
}

fn produce(mailbox: &Arc<MemoryMailbox>, pid: u32, text: &'static str) -> tokio::task::JoinHandle<bool> {
    let mailbox = Arc::clone(mailbox);
    tokio::task::spawn_blocking(move || mailbox.deposit(pid, text, PRODUCER_TIMEOUT).unwrap())
}

#[tokio::test]
async fn test_single_message_round_trip() {
    // A long wait keeps idle ticks out of the event log.
    let config = ReceiverConfig::builder()
        .wait_timeout(Duration::from_secs(1))
        .build();
    let mailbox = Arc::new(MemoryMailbox::new());
    let (tx, mut rx) = mpsc::channel(8);
    let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &config, tx).unwrap();

    assert!(produce(&mailbox, 42, "hello").await.unwrap());
    let message = tokio::time::timeout(DEADLINE, rx.recv()).await.unwrap().unwrap();
    assert_eq!(message, DebugMessage::new(42, "hello"));

    // The loop reasserts readiness once the record is published.
    wait_until(|| mailbox.ready_count() >= 2).await;
    receiver.close().await.unwrap();

    let events = mailbox.events();
    assert_eq!(
        events[..4],
        [
            MailboxEvent::Ready,
            MailboxEvent::DataSignaled,
            MailboxEvent::Read,
            MailboxEvent::Ready
        ]
    );
    assert_eq!(mailbox.ready_count(), 2);
    assert_alternation(&events);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_messages_published_in_order() {
    let mailbox = Arc::new(MemoryMailbox::new());
    let (tx, mut rx) = mpsc::channel(16);
    let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &config(), tx).unwrap();

    let producer = {
        let mailbox = Arc::clone(&mailbox);
        tokio::task::spawn_blocking(move || {
            for i in 0..5u32 {
                assert!(mailbox.deposit(100 + i, &format!("message {i}"), PRODUCER_TIMEOUT).unwrap());
            }
        })
    };
    producer.await.unwrap();

    for i in 0..5u32 {
        let message = tokio::time::timeout(DEADLINE, rx.recv()).await.unwrap().unwrap();
        assert_eq!(message, DebugMessage::new(100 + i, format!("message {i}")));
    }
    receiver.close().await.unwrap();
    assert_alternation(&mailbox.events());
}

#[tokio::test]
async fn test_idle_receiver_closes_cleanly() {
    let mailbox = Arc::new(MemoryMailbox::new());
    let (tx, mut rx) = mpsc::channel(8);
    let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &config(), tx).unwrap();

    wait_until(|| mailbox.idle_count() >= 3).await;
    let started = tokio::time::Instant::now();
    tokio::time::timeout(DEADLINE, receiver.close())
        .await
        .unwrap()
        .unwrap();
    // Shutdown is observed after at most the wait in flight.
    assert!(started.elapsed() < WAIT * 20);

    assert!(rx.try_recv().is_err());
    assert_eq!(receiver.state(), ReceiverState::Closed);
    assert!(mailbox.is_released());
    assert!(!mailbox.events().contains(&MailboxEvent::Read));
}

#[tokio::test]
async fn test_wait_failure_surfaces_on_close() {
    let mailbox = Arc::new(MemoryMailbox::new().fail_wait_on(2));
    let (tx, _rx) = mpsc::channel(8);
    let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &config(), tx).unwrap();

    wait_until(|| receiver.is_finished()).await;
    assert_eq!(receiver.state(), ReceiverState::Faulted);

    let err = receiver.close().await.unwrap_err();
    assert!(matches!(err, ReceiverError::SignalFailure { operation: "wait", .. }));
    assert_eq!(receiver.state(), ReceiverState::Closed);

    let events = mailbox.events();
    let failed = events
        .iter()
        .position(|e| *e == MailboxEvent::WaitFailed)
        .unwrap();
    assert!(!events[failed..].contains(&MailboxEvent::Ready));
    assert_eq!(mailbox.ready_count(), 2);
    assert!(mailbox.is_released());
}

#[tokio::test]
async fn test_ready_failure_stops_before_waiting() {
    let mailbox = Arc::new(MemoryMailbox::new().fail_ready_on(1));
    let (tx, _rx) = mpsc::channel(8);
    let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &config(), tx).unwrap();

    let err = receiver.close().await.unwrap_err();
    assert!(matches!(err, ReceiverError::SignalFailure { operation: "set", .. }));
    assert_eq!(
        mailbox.events(),
        vec![MailboxEvent::ReadyFailed, MailboxEvent::Released]
    );
}

#[tokio::test]
async fn test_malformed_record_stops_loop() {
    let mailbox = Arc::new(MemoryMailbox::new());
    let (tx, mut rx) = mpsc::channel(8);
    let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &config(), tx).unwrap();

    let garbage = vec![b'x'; SEGMENT_SIZE];
    let producer = {
        let mailbox = Arc::clone(&mailbox);
        tokio::task::spawn_blocking(move || mailbox.deposit_raw(&garbage, PRODUCER_TIMEOUT))
    };
    assert!(producer.await.unwrap());

    wait_until(|| receiver.is_finished()).await;
    let err = receiver.close().await.unwrap_err();
    assert!(matches!(err, ReceiverError::MalformedRecord(_)));
    assert!(rx.try_recv().is_err());

    let events = mailbox.events();
    let read = events.iter().position(|e| *e == MailboxEvent::Read).unwrap();
    assert!(!events[read..].contains(&MailboxEvent::Ready));
}

#[tokio::test]
async fn test_dropped_output_stops_loop() {
    let mailbox = Arc::new(MemoryMailbox::new());
    let (tx, rx) = mpsc::channel(8);
    let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &config(), tx).unwrap();
    drop(rx);

    assert!(produce(&mailbox, 1, "nobody listens").await.unwrap());
    wait_until(|| receiver.is_finished()).await;
    let err = receiver.close().await.unwrap_err();
    assert!(matches!(err, ReceiverError::OutputClosed));
}

#[tokio::test]
async fn test_backpressure_holds_ready() {
    let mailbox = Arc::new(MemoryMailbox::new());
    let (tx, mut rx) = mpsc::channel(1);
    let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &config(), tx).unwrap();

    assert!(produce(&mailbox, 1, "first").await.unwrap());
    assert!(produce(&mailbox, 2, "second").await.unwrap());

    // "second" is decoded but cannot be published: no new readiness.
    wait_until(|| mailbox.events().iter().filter(|e| **e == MailboxEvent::Read).count() == 2).await;
    let readies = mailbox.ready_count();
    let blocked = {
        let mailbox = Arc::clone(&mailbox);
        tokio::task::spawn_blocking(move || mailbox.deposit(3, "third", WAIT * 4).unwrap())
    };
    assert!(!blocked.await.unwrap());
    assert_eq!(mailbox.ready_count(), readies);

    assert_eq!(rx.recv().await.unwrap(), DebugMessage::new(1, "first"));
    assert_eq!(
        tokio::time::timeout(DEADLINE, rx.recv()).await.unwrap().unwrap(),
        DebugMessage::new(2, "second")
    );
    wait_until(|| mailbox.ready_count() > readies).await;

    receiver.close().await.unwrap();
    assert_alternation(&mailbox.events());
}

#[tokio::test]
async fn test_close_while_publish_blocked() {
    let mailbox = Arc::new(MemoryMailbox::new());
    let (tx, _rx) = mpsc::channel(1);
    let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &config(), tx).unwrap();

    assert!(produce(&mailbox, 1, "fills channel").await.unwrap());
    assert!(produce(&mailbox, 2, "blocks publish").await.unwrap());
    wait_until(|| mailbox.events().iter().filter(|e| **e == MailboxEvent::Read).count() == 2).await;

    tokio::time::timeout(DEADLINE, receiver.close())
        .await
        .unwrap()
        .unwrap();
    assert!(mailbox.is_released());
}

#[tokio::test]
async fn test_double_close_is_safe() {
    let mailbox = Arc::new(MemoryMailbox::new());
    let (tx, _rx) = mpsc::channel(8);
    let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &config(), tx).unwrap();

    receiver.close().await.unwrap();
    receiver.close().await.unwrap();

    assert_eq!(mailbox.release_calls(), 1);
    assert_eq!(receiver.state(), ReceiverState::Closed);
}

#[tokio::test]
async fn test_faulted_receiver_second_close_is_ok() {
    let mailbox = Arc::new(MemoryMailbox::new().fail_wait_on(1));
    let (tx, _rx) = mpsc::channel(8);
    let mut receiver = Receiver::start_with(Arc::clone(&mailbox), &config(), tx).unwrap();

    assert!(receiver.close().await.is_err());
    assert!(receiver.close().await.is_ok());
    assert_eq!(mailbox.release_calls(), 1);
}
