//! Demo binary running both roles of a session in one process.
//!
//! The embed side announces itself first, which makes it dial the app side.
//! The app side then streams records over that channel and waits for every
//! acknowledgement before sending `stop`.

mod cli;

use std::time::Duration;

use clap::Parser;
use peerframe::{Event, EventKind, Identity, MemoryNetwork, Role, TransportError, Transporter};
use serde_json::{Value, json};
use tokio::{sync::mpsc, time::timeout};

const ACK_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Enable structured logging for the demo.
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();
    let network = MemoryNetwork::new();

    let (received_tx, mut received_rx) = mpsc::unbounded_channel::<u64>();
    let embed = Transporter::builder(Identity::new(cli.uid.as_str(), Role::Embed))
        .max_payload_len(cli.max_payload)
        .on(EventKind::Start, |_| {
            tracing::info!("embed: start requested");
            Ok(())
        })
        .on(EventKind::SendRecord, move |event| {
            let Event::SendRecord(record) = event else {
                return Ok(());
            };
            let id = record
                .get("id")
                .and_then(Value::as_u64)
                .ok_or("record carries no id")?;
            tracing::info!(id, "embed: record received");
            received_tx.send(id)?;
            Ok(())
        })
        .build(network.clone())
        .await?;

    let (acked_tx, mut acked_rx) = mpsc::unbounded_channel::<u64>();
    let app = Transporter::builder(Identity::new(cli.uid.as_str(), Role::App))
        .max_payload_len(cli.max_payload)
        .on(EventKind::MirrorReady, |_| {
            tracing::info!("app: mirror ready");
            Ok(())
        })
        .on(EventKind::AckRecord, move |event| {
            if let Event::AckRecord(id) = event {
                acked_tx.send(*id)?;
            }
            Ok(())
        })
        .build(network)
        .await?;

    embed.send_mirror_ready().await?;

    let records = cli.records;
    let responder = embed.clone();
    let acker = tokio::spawn(async move {
        for _ in 0..records {
            let Some(id) = received_rx.recv().await else {
                break;
            };
            responder.ack_record(id).await?;
        }
        Ok::<_, TransportError>(())
    });

    app.login().await?;
    app.send_source_ready().await?;
    app.send_start().await?;
    let filler = "x".repeat(cli.record_size);
    for id in 0..records {
        app.send_record(&json!({ "id": id, "data": filler })).await?;
    }

    for _ in 0..records {
        match timeout(ACK_TIMEOUT, acked_rx.recv()).await? {
            Some(id) => tracing::info!(id, "app: record acknowledged"),
            None => break,
        }
    }
    app.send_stop().await?;
    acker.await??;

    println!(
        "{records} record(s) of {} chars delivered and acknowledged",
        cli.record_size
    );

    app.shutdown().await;
    embed.shutdown().await;
    Ok(())
}
