//! Field extraction for LiveKit webhook payloads.
//!
//! LiveKit posts a JSON object for every room, participant, track, and
//! egress state change. The handler keeps the raw payload and a small
//! summary of the fields operators care about most. Extraction is lenient:
//! a missing or wrongly-typed field becomes `None` instead of an error,
//! so a payload from a newer server version is still recorded.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Summary of the `room` object of a webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Room session ID.
    pub sid: Option<String>,
    /// Room name, as given when the room was created.
    pub name: Option<String>,
    /// Current number of participants (`numParticipants`).
    pub num_participants: Option<Value>,
    /// Unix timestamp of room creation (`creationTime`).
    pub creation_time: Option<Value>,
}

/// Summary of the `participant` object of a webhook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    /// Participant session ID.
    pub sid: Option<String>,
    /// Participant identity.
    pub identity: Option<String>,
    /// Unix timestamp when the participant joined (`joinedAt`).
    pub joined_at: Option<Value>,
}

/// Fields pulled out of a webhook payload for logging and the `/logs` view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    /// Event name, e.g. `room_started` or `participant_joined`.
    pub event_type: Option<String>,
    /// Unique ID of this webhook delivery.
    pub event_id: Option<String>,
    /// Server timestamp of the event (`createdAt`). LiveKit encodes int64
    /// values as strings, so the JSON value is kept as received.
    pub created_at: Option<Value>,
    pub room_info: RoomSummary,
    /// `None` when the event has no participant attached.
    pub participant_info: Option<ParticipantSummary>,
}

impl ExtractedFields {
    /// Extracts the summary fields from a webhook payload.
    pub fn from_payload(payload: &Value) -> Self {
        let room = payload.get("room");
        let participant = payload
            .get("participant")
            .filter(|value| value.is_object() && !is_empty_payload(value));

        Self {
            event_type: string_field(Some(payload), "event"),
            event_id: string_field(Some(payload), "id"),
            created_at: value_field(Some(payload), "createdAt"),
            room_info: RoomSummary {
                sid: string_field(room, "sid"),
                name: string_field(room, "name"),
                num_participants: value_field(room, "numParticipants"),
                creation_time: value_field(room, "creationTime"),
            },
            participant_info: participant.map(|p| ParticipantSummary {
                sid: string_field(Some(p), "sid"),
                identity: string_field(Some(p), "identity"),
                joined_at: value_field(Some(p), "joinedAt"),
            }),
        }
    }

    /// Event type for log lines, `unknown` when the payload had none.
    pub fn event_label(&self) -> &str {
        self.event_type.as_deref().unwrap_or("unknown")
    }
}

/// Returns `true` for payloads that carry no data: `null`, `false`, `0`,
/// an empty string, an empty array, or an empty object.
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn string_field(parent: Option<&Value>, key: &str) -> Option<String> {
    parent?.get(key)?.as_str().map(str::to_string)
}

fn value_field(parent: Option<&Value>, key: &str) -> Option<Value> {
    parent?.get(key).filter(|v| !v.is_null()).cloned()
}
