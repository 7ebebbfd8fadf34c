//! Event kinds and the envelope exchanged between peers.
//!
//! [`Event`] is the unit delivered to subscribers once a message has been
//! reassembled. It serializes to the JSON shape
//! `{"event": "<kind>", "payload": <value>}` with the payload omitted for
//! kinds that carry none. The kebab-case kind names are part of the wire
//! contract.
//!
//! Decoding is lenient where peers differ in what they send:
//!
//! - A record or remote-control envelope without a payload decodes with a
//!   `null` payload.
//! - A payload on a signal kind is ignored.
//! - Acknowledgement ids must be non-negative whole numbers. `42.0` is
//!   accepted as `42`; fractional or negative ids are rejected with
//!   [`EnvelopeError::InvalidRecordId`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Closed set of event kinds understood by both ends of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// The recording side is ready to stream.
    SourceReady,
    /// The replaying side is ready to receive.
    MirrorReady,
    /// Begin streaming records.
    Start,
    /// A single record.
    SendRecord,
    /// Acknowledgement of a record id.
    AckRecord,
    /// Stop streaming.
    Stop,
    /// Control command from the replaying side.
    RemoteControl,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [EventKind; 7] = [
        EventKind::SourceReady,
        EventKind::MirrorReady,
        EventKind::Start,
        EventKind::SendRecord,
        EventKind::AckRecord,
        EventKind::Stop,
        EventKind::RemoteControl,
    ];

    /// Number of distinct kinds.
    pub const COUNT: usize = Self::ALL.len();

    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::SourceReady => "source-ready",
            EventKind::MirrorReady => "mirror-ready",
            EventKind::Start => "start",
            EventKind::SendRecord => "send-record",
            EventKind::AckRecord => "ack-record",
            EventKind::Stop => "stop",
            EventKind::RemoteControl => "remote-control",
        }
    }

    /// Dense index used by fixed-size handler tables.
    #[must_use]
    pub const fn index(self) -> usize { self as usize }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Envelope carrying an event kind and the payload that kind defines.
///
/// # Examples
///
/// ```
/// use peerframe::event::{Event, EventKind};
/// let ack = Event::AckRecord(42);
/// assert_eq!(ack.kind(), EventKind::AckRecord);
/// assert_eq!(
///     serde_json::to_string(&ack).unwrap(),
///     r#"{"event":"ack-record","payload":42}"#
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "kebab-case",
    try_from = "RawEnvelope"
)]
pub enum Event {
    /// See [`EventKind::SourceReady`].
    SourceReady,
    /// See [`EventKind::MirrorReady`].
    MirrorReady,
    /// See [`EventKind::Start`].
    Start,
    /// An opaque record produced by the recording side.
    SendRecord(Value),
    /// Identifier of an acknowledged record.
    AckRecord(u64),
    /// See [`EventKind::Stop`].
    Stop,
    /// Opaque control payload.
    RemoteControl(Value),
}

/// Envelope as it appears on the wire, before the payload is checked
/// against the kind.
#[derive(Deserialize)]
struct RawEnvelope {
    event: EventKind,
    #[serde(default)]
    payload: Value,
}

/// Reasons a well-formed JSON envelope is not a valid [`Event`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EnvelopeError {
    /// The acknowledgement id is not a non-negative whole number.
    #[error("invalid record id: {0}")]
    InvalidRecordId(Value),
}

impl TryFrom<RawEnvelope> for Event {
    type Error = EnvelopeError;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        Ok(match raw.event {
            EventKind::SourceReady => Event::SourceReady,
            EventKind::MirrorReady => Event::MirrorReady,
            EventKind::Start => Event::Start,
            EventKind::Stop => Event::Stop,
            EventKind::SendRecord => Event::SendRecord(raw.payload),
            EventKind::RemoteControl => Event::RemoteControl(raw.payload),
            EventKind::AckRecord => Event::AckRecord(record_id(&raw.payload)?),
        })
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    reason = "the float is checked to be a whole number within u64 range"
)]
fn record_id(payload: &Value) -> Result<u64, EnvelopeError> {
    if let Some(id) = payload.as_u64() {
        return Ok(id);
    }
    payload
        .as_f64()
        .filter(|id| id.fract() == 0.0 && *id >= 0.0 && *id < u64::MAX as f64)
        .map(|id| id as u64)
        .ok_or_else(|| EnvelopeError::InvalidRecordId(payload.clone()))
}

impl Event {
    /// Kind tag of this envelope.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Event::SourceReady => EventKind::SourceReady,
            Event::MirrorReady => EventKind::MirrorReady,
            Event::Start => EventKind::Start,
            Event::SendRecord(_) => EventKind::SendRecord,
            Event::AckRecord(_) => EventKind::AckRecord,
            Event::Stop => EventKind::Stop,
            Event::RemoteControl(_) => EventKind::RemoteControl,
        }
    }

    /// Borrow the payload as JSON, if the kind carries one.
    ///
    /// Acknowledgements are returned as owned numbers, so this only covers
    /// the opaque payloads.
    #[must_use]
    pub fn json_payload(&self) -> Option<&Value> {
        match self {
            Event::SendRecord(value) | Event::RemoteControl(value) => Some(value),
            _ => None,
        }
    }

    /// Whether this kind carries no payload at all.
    #[must_use]
    pub const fn is_signal(&self) -> bool {
        matches!(
            self,
            Event::SourceReady | Event::MirrorReady | Event::Start | Event::Stop
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    #[case(Event::SourceReady, r#"{"event":"source-ready"}"#)]
    #[case(Event::MirrorReady, r#"{"event":"mirror-ready"}"#)]
    #[case(Event::Start, r#"{"event":"start"}"#)]
    #[case(Event::Stop, r#"{"event":"stop"}"#)]
    #[case(Event::AckRecord(42), r#"{"event":"ack-record","payload":42}"#)]
    #[case(
        Event::SendRecord(json!({"type": 2})),
        r#"{"event":"send-record","payload":{"type":2}}"#
    )]
    #[case(
        Event::RemoteControl(json!("pause")),
        r#"{"event":"remote-control","payload":"pause"}"#
    )]
    fn events_use_the_wire_shape(#[case] event: Event, #[case] expected: &str) {
        let encoded = serde_json::to_string(&event).expect("serialize event");
        assert_eq!(encoded, expected);
        let decoded: Event = serde_json::from_str(expected).expect("deserialize event");
        assert_eq!(decoded, event);
    }

    #[test]
    fn kind_names_match_serde_names() {
        for kind in EventKind::ALL {
            let encoded = serde_json::to_value(kind).expect("serialize kind");
            assert_eq!(encoded, Value::String(kind.as_str().to_owned()));
        }
    }

    #[test]
    fn kind_indices_are_dense() {
        for (position, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }

    #[test]
    fn unknown_event_names_are_rejected() {
        let err = serde_json::from_str::<Event>(r#"{"event":"rewind"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn signals_carry_no_payload() {
        assert!(Event::Start.is_signal());
        assert!(Event::Start.json_payload().is_none());
        assert!(!Event::AckRecord(1).is_signal());
        assert_eq!(
            Event::SendRecord(json!(1)).json_payload(),
            Some(&json!(1))
        );
    }

    #[rstest]
    #[case(r#"{"event":"send-record"}"#, Event::SendRecord(Value::Null))]
    #[case(r#"{"event":"remote-control"}"#, Event::RemoteControl(Value::Null))]
    #[case(r#"{"event":"start","payload":"ignored"}"#, Event::Start)]
    #[case(r#"{"event":"ack-record","payload":42.0}"#, Event::AckRecord(42))]
    fn lenient_envelopes_decode(#[case] text: &str, #[case] expected: Event) {
        let decoded: Event = serde_json::from_str(text).expect("deserialize event");
        assert_eq!(decoded, expected);
    }

    #[rstest]
    #[case(r#"{"event":"ack-record","payload":-1}"#)]
    #[case(r#"{"event":"ack-record","payload":1.5}"#)]
    #[case(r#"{"event":"ack-record","payload":"7"}"#)]
    #[case(r#"{"event":"ack-record"}"#)]
    fn invalid_record_ids_are_rejected(#[case] text: &str) {
        let err = serde_json::from_str::<Event>(text).expect_err("invalid record id");
        assert!(err.to_string().contains("invalid record id"), "{err}");
    }
}
