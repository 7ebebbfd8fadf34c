//! Connection establishment, readiness, and teardown.

mod common;

use std::time::{Duration, Instant};

use common::{TestResult, wait_for_state};
use peerframe::{
    ChannelError,
    ChannelEvent,
    ConfigError,
    ConnectionState,
    Event,
    EventKind,
    Identity,
    MemoryNetwork,
    Peer,
    PeerId,
    RawMessage,
    Role,
    TransportError,
    Transporter,
};
use peerframe_testing::{EventRecorder, SessionPair};

#[tokio::test]
async fn first_send_connects_lazily() -> TestResult {
    let pair = SessionPair::start("lazy").await?;
    assert_eq!(pair.app.state(), ConnectionState::Disconnected);
    assert_eq!(pair.embed.state(), ConnectionState::Disconnected);
    let mut events = EventRecorder::attach(&pair.embed, &[EventKind::Start]);

    pair.app.send_start().await?;

    assert_eq!(pair.app.state(), ConnectionState::Open);
    assert_eq!(pair.app.remote(), Some(PeerId::from("lazy-embed")));
    assert_eq!(events.next().await, Some(Event::Start));
    wait_for_state(&pair.embed, ConnectionState::Open).await?;
    pair.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn login_always_succeeds() -> TestResult {
    let pair = SessionPair::start("login").await?;
    assert!(pair.app.login().await?);
    assert!(pair.embed.login().await?);
    pair.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn sending_without_a_remote_peer_fails() -> TestResult {
    let network = MemoryNetwork::new();
    let app = Transporter::new(Identity::new("alone", Role::App), network).await?;

    let err = app.send_start().await.expect_err("no embed peer registered");

    assert!(
        matches!(
            &err,
            TransportError::Channel(ChannelError::PeerUnavailable(id)) if id.as_str() == "alone-embed"
        ),
        "unexpected error: {err}"
    );
    assert_eq!(app.state(), ConnectionState::Closed);
    app.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn readiness_barrier_waits_for_open() -> TestResult {
    let delay = Duration::from_millis(50);
    let pair =
        SessionPair::start_with("barrier", MemoryNetwork::new().with_open_delay(delay), |b| b)
            .await?;
    let mut events = EventRecorder::attach(&pair.embed, &[EventKind::Start]);
    let mut states = pair.app.watch_state();

    let started = Instant::now();
    pair.app.send_start().await?;

    assert!(started.elapsed() >= delay, "send did not wait for open");
    assert!(states.has_changed()?);
    assert_eq!(*states.borrow_and_update(), ConnectionState::Open);
    assert_eq!(events.next().await, Some(Event::Start));
    pair.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn connect_timeout_abandons_a_slow_channel() -> TestResult {
    let network = MemoryNetwork::new().with_open_delay(Duration::from_secs(5));
    let _embed = Transporter::new(Identity::new("slow", Role::Embed), network.clone()).await?;
    let app = Transporter::builder(Identity::new("slow", Role::App))
        .connect_timeout(Duration::from_millis(20))
        .build(network)
        .await?;

    let err = app.connect().await.expect_err("open never arrives in time");

    assert!(matches!(err, TransportError::Timeout(limit) if limit == Duration::from_millis(20)));
    wait_for_state(&app, ConnectionState::Closed).await?;
    Ok(())
}

#[tokio::test]
async fn open_timeout_bounds_the_readiness_barrier() -> TestResult {
    let network = MemoryNetwork::new().with_open_delay(Duration::from_secs(5));
    let app = Transporter::builder(Identity::new("pending", Role::App))
        .open_timeout(Duration::from_millis(20))
        .build(network.clone())
        .await?;

    let _pending = network
        .connect_to(&PeerId::from("pending-embed"), &PeerId::from("pending-app"))
        .await?;
    wait_for_state(&app, ConnectionState::Connecting).await?;

    let err = app.send_start().await.expect_err("channel never opens");
    assert!(matches!(err, TransportError::Timeout(_)));
    app.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn close_then_send_reconnects() -> TestResult {
    let pair = SessionPair::start("reconnect").await?;
    let mut events = EventRecorder::attach(&pair.embed, &[EventKind::Start, EventKind::Stop]);

    pair.app.send_start().await?;
    assert_eq!(events.next().await, Some(Event::Start));

    pair.app.close();
    assert_eq!(pair.app.state(), ConnectionState::Closed);
    assert_eq!(pair.app.remote(), None);
    wait_for_state(&pair.embed, ConnectionState::Closed).await?;

    pair.app.send_stop().await?;
    assert_eq!(pair.app.state(), ConnectionState::Open);
    assert_eq!(events.next().await, Some(Event::Stop));
    pair.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn close_discards_partial_inbound_transmission() -> TestResult {
    let network = MemoryNetwork::new();
    let app = Transporter::new(Identity::new("partial", Role::App), network.clone()).await?;
    let mut events = EventRecorder::all(&app);
    let embed_id = PeerId::from("partial-embed");
    let app_id = PeerId::from("partial-app");

    let mut first = network.connect_to(&embed_id, &app_id).await?;
    assert_eq!(first.next_event().await, Some(ChannelEvent::Open));
    first
        .sink()
        .send(RawMessage::Text(r#"part1-2endpart;{"event":"#.to_owned()))?;
    first
        .sink()
        .send(RawMessage::Text(r#"{"event":"source-ready"}"#.to_owned()))?;
    assert_eq!(events.next().await, Some(Event::SourceReady));

    app.close();
    assert_eq!(first.next_event().await, Some(ChannelEvent::Close));

    let mut second = network.connect_to(&embed_id, &app_id).await?;
    assert_eq!(second.next_event().await, Some(ChannelEvent::Open));
    second
        .sink()
        .send(RawMessage::Text(r#"part2-2endpart;"stop"}"#.to_owned()))?;
    assert!(
        events.is_quiet_for(Duration::from_millis(50)).await,
        "stale part completed a transmission"
    );

    second
        .sink()
        .send(RawMessage::Text(r#"{"event":"start"}"#.to_owned()))?;
    assert_eq!(events.next().await, Some(Event::Start));
    app.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn duplicate_identity_is_rejected() -> TestResult {
    let network = MemoryNetwork::new();
    let _first = Transporter::new(Identity::new("twin", Role::App), network.clone()).await?;

    let err = Transporter::new(Identity::new("twin", Role::App), network)
        .await
        .expect_err("id already registered");

    assert!(matches!(err, TransportError::Channel(ChannelError::IdTaken(_))));
    Ok(())
}

#[tokio::test]
async fn invalid_configuration_is_rejected() -> TestResult {
    let err = Transporter::builder(Identity::new("config", Role::App))
        .max_payload_len(0)
        .build(MemoryNetwork::new())
        .await
        .expect_err("zero payload bound");

    assert!(matches!(
        err,
        TransportError::Config(ConfigError::Zero("max_payload_len"))
    ));
    Ok(())
}

#[tokio::test]
async fn shutdown_releases_the_peer_id() -> TestResult {
    let network = MemoryNetwork::new();
    let app = Transporter::new(Identity::new("bye", Role::App), network.clone()).await?;
    assert!(network.is_registered(&PeerId::from("bye-app")));

    app.shutdown().await;

    assert!(!network.is_registered(&PeerId::from("bye-app")));
    Transporter::new(Identity::new("bye", Role::App), network).await?;
    Ok(())
}
