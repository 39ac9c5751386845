//! Socket Mode wire format.
//!
//! Slack pushes JSON text frames over the WebSocket. Three kinds matter here:
//! `hello` after connecting, `disconnect` when Slack wants the client to
//! reconnect elsewhere, and envelopes (`events_api`, `slash_commands`, ...)
//! that must be acknowledged by echoing their `envelope_id`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{MessageEvent, SlackEnvelope, SlackEvent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketFrame {
    Hello,
    Disconnect { reason: String },
    Envelope(SlackEnvelope),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("malformed socket frame: {0}")]
    Malformed(String),
    #[error("socket frame of type `{frame_type}` has no envelope_id")]
    MissingEnvelopeId { frame_type: String },
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: String,
    envelope_id: Option<String>,
    reason: Option<String>,
    payload: Option<RawPayload>,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    event: Option<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    channel: Option<String>,
    user: Option<String>,
    bot_id: Option<String>,
    text: Option<String>,
    thread_ts: Option<String>,
}

#[derive(Debug, Serialize)]
struct Acknowledgement<'a> {
    envelope_id: &'a str,
}

pub fn parse_socket_frame(raw: &str) -> Result<SocketFrame, FrameError> {
    let frame: RawFrame =
        serde_json::from_str(raw).map_err(|error| FrameError::Malformed(error.to_string()))?;

    match frame.frame_type.as_str() {
        "hello" => Ok(SocketFrame::Hello),
        "disconnect" => Ok(SocketFrame::Disconnect {
            reason: frame.reason.unwrap_or_else(|| "unspecified".to_owned()),
        }),
        _ => {
            let Some(envelope_id) = frame.envelope_id else {
                return Err(FrameError::MissingEnvelopeId { frame_type: frame.frame_type });
            };
            let event = envelope_event(&frame.frame_type, frame.payload);
            Ok(SocketFrame::Envelope(SlackEnvelope { envelope_id, event }))
        }
    }
}

fn envelope_event(frame_type: &str, payload: Option<RawPayload>) -> SlackEvent {
    if frame_type != "events_api" {
        return SlackEvent::Unsupported { event_type: frame_type.to_owned() };
    }

    match payload.and_then(|payload| payload.event) {
        Some(event) if event.event_type == "message" => SlackEvent::Message(MessageEvent {
            channel_id: event.channel.unwrap_or_default(),
            thread_ts: event.thread_ts,
            // bot_message subtypes carry a bot_id instead of a user
            user_id: event.user.or(event.bot_id).unwrap_or_default(),
            text: event.text.unwrap_or_default(),
        }),
        Some(event) => SlackEvent::Unsupported { event_type: event.event_type },
        None => SlackEvent::Unsupported { event_type: frame_type.to_owned() },
    }
}

pub fn acknowledgement_frame(envelope_id: &str) -> String {
    serde_json::to_string(&Acknowledgement { envelope_id })
        .unwrap_or_else(|_| format!("{{\"envelope_id\":\"{envelope_id}\"}}"))
}
