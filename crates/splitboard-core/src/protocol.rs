//! Splitboard wire protocol.
//!
//! Every message on the event channel is a JSON text frame of the form
//! `{"event": <name>, "data": <payload>}`. `data` is omitted for events that
//! carry no payload (a bare `clear`). The relay forwards client frames
//! verbatim, so the typed payloads below are a client-side convenience: the
//! server never validates them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::error::{Result, SplitboardError};

/// Event names carried in [`Frame::event`].
pub mod events {
    /// Server -> client, once per connection.
    pub const ASSIGN_SIDE: &str = "assignSide";
    pub const DRAW: &str = "draw";
    pub const CLEAR: &str = "clear";
    pub const MESSAGE: &str = "message";
}

/// One of the two fixed halves of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line segment in canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawEvent {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    /// Hex (`#ff0000`) or named CSS color.
    pub color: String,
    pub size: f64,
}

/// Erase one half of the board, or all of it when `side` is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClearEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
}

/// Short text notice tagged with the sender's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub message: String,
    /// `None` when the sender has not been assigned a side yet.
    pub side: Option<Side>,
}

/// The wire envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Frame {
    /// A frame with a serialized payload.
    pub fn new<T: Serialize>(event: &str, data: &T) -> Result<Self> {
        Ok(Self {
            event: event.to_string(),
            data: Some(serde_json::to_value(data)?),
        })
    }

    /// A frame with no payload.
    pub fn bare(event: &str) -> Self {
        Self {
            event: event.to_string(),
            data: None,
        }
    }

    pub fn assign_side(side: Side) -> Self {
        Self {
            event: events::ASSIGN_SIDE.to_string(),
            data: Some(serde_json::Value::String(side.as_str().to_string())),
        }
    }

    pub fn clear(event: Option<&ClearEvent>) -> Result<Self> {
        match event {
            Some(ev) => Self::new(events::CLEAR, ev),
            None => Ok(Self::bare(events::CLEAR)),
        }
    }

    pub fn message(event: &MessageEvent) -> Result<Self> {
        Self::new(events::MESSAGE, event)
    }

    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self.data.clone().ok_or_else(|| {
            SplitboardError::Protocol(format!("'{}' event has no data", self.event))
        })?;
        Ok(serde_json::from_value(data)?)
    }
}

/// A typed view of a frame, as a participant would interpret it.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    AssignSide(Side),
    Draw(DrawEvent),
    Clear(Option<ClearEvent>),
    Message(MessageEvent),
}

impl TryFrom<&Frame> for BoardEvent {
    type Error = SplitboardError;

    fn try_from(frame: &Frame) -> Result<Self> {
        match frame.event.as_str() {
            events::ASSIGN_SIDE => Ok(BoardEvent::AssignSide(frame.payload()?)),
            events::DRAW => Ok(BoardEvent::Draw(frame.payload()?)),
            events::CLEAR => match &frame.data {
                None | Some(serde_json::Value::Null) => Ok(BoardEvent::Clear(None)),
                Some(_) => Ok(BoardEvent::Clear(Some(frame.payload()?))),
            },
            events::MESSAGE => Ok(BoardEvent::Message(frame.payload()?)),
            other => Err(SplitboardError::Protocol(format!("Unknown event: {other}"))),
        }
    }
}
