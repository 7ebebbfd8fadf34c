//! Event delivery between the two roles of a session.

mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use common::{TestResult, wait_for_state};
use peerframe::{ConnectionState, Event, EventKind, PeerId};
use peerframe_testing::{EventRecorder, LoggerHandle, SessionPair, logger};
use rstest::rstest;
use serde_json::json;
use serial_test::serial;

const QUIET: Duration = Duration::from_millis(50);

#[tokio::test]
async fn send_start_fires_one_handler_without_payload() -> TestResult {
    let pair = SessionPair::start("start-once").await?;
    let mut events = EventRecorder::all(&pair.embed);

    pair.app.send_start().await?;

    let event = events.next().await.ok_or("start not delivered")?;
    assert_eq!(event, Event::Start);
    assert!(event.json_payload().is_none());
    assert!(events.is_quiet_for(QUIET).await, "unexpected extra event");
    pair.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn ack_record_carries_the_identifier() -> TestResult {
    let pair = SessionPair::start("ack").await?;
    let mut acks = EventRecorder::attach(&pair.app, &[EventKind::AckRecord]);

    pair.embed.ack_record(42).await?;

    assert_eq!(acks.next().await, Some(Event::AckRecord(42)));
    pair.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn every_helper_arrives_in_send_order() -> TestResult {
    let pair = SessionPair::start("helpers").await?;
    let mut events = EventRecorder::all(&pair.embed);

    pair.app.send_source_ready().await?;
    pair.app.send_mirror_ready().await?;
    pair.app.send_start().await?;
    pair.app.send_record(&json!({ "id": 1, "kind": "click" })).await?;
    pair.app.ack_record(7).await?;
    pair.app
        .send_remote_control(&json!({ "command": "pause" }))
        .await?;
    pair.app.send_stop().await?;

    let mut received = Vec::new();
    for _ in 0..7 {
        received.push(events.next().await.ok_or("event missing")?);
    }
    assert_eq!(
        received,
        vec![
            Event::SourceReady,
            Event::MirrorReady,
            Event::Start,
            Event::SendRecord(json!({ "id": 1, "kind": "click" })),
            Event::AckRecord(7),
            Event::RemoteControl(json!({ "command": "pause" })),
            Event::Stop,
        ]
    );
    pair.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn responder_replies_over_the_inbound_channel() -> TestResult {
    let pair = SessionPair::start("reply").await?;
    let mut embed_events = EventRecorder::attach(&pair.embed, &[EventKind::SourceReady]);
    let mut app_events = EventRecorder::attach(&pair.app, &[EventKind::MirrorReady]);

    pair.app.send_source_ready().await?;
    assert_eq!(embed_events.next().await, Some(Event::SourceReady));

    pair.embed.send_mirror_ready().await?;
    assert_eq!(app_events.next().await, Some(Event::MirrorReady));
    assert_eq!(pair.embed.remote(), Some(PeerId::from("reply-app")));
    pair.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn every_handler_for_a_kind_runs_in_order() -> TestResult {
    let pair = SessionPair::start("fanout").await?;
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    for label in ["first", "second"] {
        let order = Arc::clone(&order);
        pair.embed.on(EventKind::Stop, move |_| {
            order
                .lock()
                .map_err(|_| "order lock poisoned")?
                .push(label);
            Ok(())
        });
    }
    let mut stops = EventRecorder::attach(&pair.embed, &[EventKind::Stop]);

    pair.app.send_stop().await?;
    stops.next().await.ok_or("stop not delivered")?;

    let order = order.lock().map_err(|_| "order lock poisoned")?.clone();
    assert_eq!(order, ["first", "second"]);
    assert_eq!(pair.embed.handler_count(EventKind::Stop), 3);
    pair.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn handler_error_skips_later_handlers_and_keeps_the_channel(
    mut logger: LoggerHandle,
) -> TestResult {
    let pair = SessionPair::start("handler-error").await?;
    let later = Arc::new(AtomicUsize::new(0));
    pair.embed
        .on(EventKind::Start, |_| Err("refusing to start".into()));
    {
        let later = Arc::clone(&later);
        pair.embed.on(EventKind::Start, move |_| {
            later.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    let mut stops = EventRecorder::attach(&pair.embed, &[EventKind::Stop]);

    pair.app.send_start().await?;
    pair.app.send_stop().await?;

    assert_eq!(stops.next().await, Some(Event::Stop));
    assert_eq!(later.load(Ordering::SeqCst), 0);
    assert!(pair.embed.is_open());
    assert!(
        logger.contains(log::Level::Error, "refusing to start"),
        "handler failure not logged"
    );
    pair.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn handler_panic_releases_the_channel() -> TestResult {
    let pair = SessionPair::start("handler-panic").await?;
    pair.embed
        .on(EventKind::Stop, |_| panic!("stop handler exploded"));
    let mut starts = EventRecorder::attach(&pair.embed, &[EventKind::Start]);

    pair.app.send_stop().await?;
    wait_for_state(&pair.app, ConnectionState::Closed).await?;
    wait_for_state(&pair.embed, ConnectionState::Closed).await?;

    pair.app.send_start().await?;
    assert_eq!(starts.next().await, Some(Event::Start));
    pair.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn handlers_registered_on_the_builder_see_the_first_event() -> TestResult {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let pair = SessionPair::start_with("builder-handlers", peerframe::MemoryNetwork::new(), |builder| {
        let counter = Arc::clone(&counter);
        builder.on(EventKind::SourceReady, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    })
    .await?;
    let mut ready = EventRecorder::attach(&pair.embed, &[EventKind::SourceReady]);

    pair.app.send_source_ready().await?;
    ready.next().await.ok_or("source-ready not delivered")?;

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    pair.shutdown().await;
    Ok(())
}
