//! Event envelope: the typed message unit broadcast to room members.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of event kinds a room can carry.
///
/// Extend only by adding new kinds; existing kinds are never repurposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// The room's presence set changed; payload is `{users: [names]}`.
    PresenceUpdate,
    /// A board was updated; payload is the serialized board.
    BoardUpdated,
    /// A column was created; payload is the serialized column.
    ColumnCreated,
    /// A column was deleted; payload is `{columnId}`.
    ColumnDeleted,
    /// A card was created; payload is the serialized card.
    CardCreated,
    /// A card was updated; payload is the serialized card.
    CardUpdated,
    /// A card was deleted; payload is `{cardId, columnId}`.
    CardDeleted,
}

/// One event as delivered to every current member of a room.
///
/// Sent on the wire as `{"type": <kind>, "payload": <object>}`, one event
/// per transport frame. The payload is opaque to the hub for every kind
/// except [`EventKind::PresenceUpdate`], which the hub produces itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub payload: Value,
}

impl EventEnvelope {
    /// Wrap a payload in an envelope of the given kind.
    #[must_use]
    pub fn new(kind: EventKind, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// Build a presence update carrying the room's current display names.
    #[must_use]
    pub fn presence_update(users: &BTreeSet<String>) -> Self {
        Self::new(
            EventKind::PresenceUpdate,
            serde_json::json!({ "users": users }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_presence_update_wire_format() {
        let users = BTreeSet::from(["alice".to_string()]);
        let json = serde_json::to_string(&EventEnvelope::presence_update(&users)).unwrap();
        assert_eq!(
            json,
            r#"{"type":"PRESENCE_UPDATE","payload":{"users":["alice"]}}"#
        );
    }

    #[test]
    fn should_serialize_kind_names_in_screaming_snake_case() {
        let envelope = EventEnvelope::new(
            EventKind::CardDeleted,
            serde_json::json!({"cardId": 3, "columnId": 1}),
        );
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "CARD_DELETED");
        assert_eq!(value["payload"]["cardId"], 3);
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let envelope = EventEnvelope::new(
            EventKind::ColumnCreated,
            serde_json::json!({"id": 9, "title": "Doing"}),
        );
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn should_reject_unknown_event_kind() {
        let result: Result<EventEnvelope, _> =
            serde_json::from_str(r#"{"type":"CARD_EXPLODED","payload":{}}"#);
        assert!(result.is_err());
    }
}
