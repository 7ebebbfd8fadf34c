//! Typed shorthands for each event kind.

use serde::Serialize;

use super::Transporter;
use crate::{channel::Peer, error::Result, event::Event};

impl<P: Peer> Transporter<P> {
    /// Announce that the recording side is ready.
    ///
    /// # Errors
    ///
    /// See [`Transporter::send`].
    pub async fn send_source_ready(&self) -> Result<()> { self.send(&Event::SourceReady).await }

    /// Announce that the replaying side is ready.
    ///
    /// # Errors
    ///
    /// See [`Transporter::send`].
    pub async fn send_mirror_ready(&self) -> Result<()> { self.send(&Event::MirrorReady).await }

    /// Ask the remote side to begin.
    ///
    /// # Errors
    ///
    /// See [`Transporter::send`].
    pub async fn send_start(&self) -> Result<()> { self.send(&Event::Start).await }

    /// Send one record. Large records are fragmented transparently.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Serialize`](crate::TransportError::Serialize)
    /// if `record` cannot be represented as JSON, otherwise see
    /// [`Transporter::send`].
    pub async fn send_record<R>(&self, record: &R) -> Result<()>
    where
        R: Serialize + ?Sized,
    {
        let payload = serde_json::to_value(record)?;
        self.send(&Event::SendRecord(payload)).await
    }

    /// Acknowledge the record identified by `id`.
    ///
    /// # Errors
    ///
    /// See [`Transporter::send`].
    pub async fn ack_record(&self, id: u64) -> Result<()> { self.send(&Event::AckRecord(id)).await }

    /// Ask the remote side to stop.
    ///
    /// # Errors
    ///
    /// See [`Transporter::send`].
    pub async fn send_stop(&self) -> Result<()> { self.send(&Event::Stop).await }

    /// Forward a control command to the remote side.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Serialize`](crate::TransportError::Serialize)
    /// if `command` cannot be represented as JSON, otherwise see
    /// [`Transporter::send`].
    pub async fn send_remote_control<C>(&self, command: &C) -> Result<()>
    where
        C: Serialize + ?Sized,
    {
        let payload = serde_json::to_value(command)?;
        self.send(&Event::RemoteControl(payload)).await
    }
}
