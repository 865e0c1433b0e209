//! Defines the WebSocket message protocol between the telephony platform and the relay.

use serde::{Deserialize, Serialize};

/// Who spoke a transcript entry.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Agent,
    User,
}

/// A single entry in the running call transcript.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub role: Speaker,
    pub content: String,
}

/// Events sent from the telephony platform to the relay.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "interaction_type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// The caller finished speaking and a reply is expected. Only the most
    /// recent transcript entry is fed to the assistant.
    ResponseRequired {
        response_id: u64,
        transcript: Vec<Utterance>,
    },
    /// The caller has been silent for a while; the assistant should produce
    /// a re-engagement utterance.
    ReminderRequired { response_id: u64 },
    /// A transcript keep-alive frame sent between turns. Parsed so it does
    /// not show up as a protocol error, then discarded.
    UpdateOnly {
        #[serde(default)]
        transcript: Vec<Utterance>,
    },
}

impl InboundEvent {
    /// The id the platform uses to correlate our output with this event,
    /// if the event expects output at all.
    pub fn response_id(&self) -> Option<u64> {
        match self {
            InboundEvent::ResponseRequired { response_id, .. } => Some(*response_id),
            InboundEvent::ReminderRequired { response_id } => Some(*response_id),
            InboundEvent::UpdateOnly { .. } => None,
        }
    }
}

/// The constant `response_type` discriminator on every outbound message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Response,
}

/// A message sent from the relay to the telephony platform.
///
/// A turn is a sequence of chunks (`content_complete: false`) terminated by
/// exactly one completion marker (`content_complete: true`, empty content),
/// all carrying the `response_id` of the event that triggered the turn.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub response_type: ResponseType,
    pub response_id: u64,
    pub content: String,
    pub content_complete: bool,
    pub end_call: bool,
}

impl OutboundMessage {
    /// The one-off greeting spoken as soon as the call connects.
    pub fn greeting(content: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Response,
            response_id: 0,
            content: content.into(),
            content_complete: true,
            end_call: false,
        }
    }

    /// An incremental piece of assistant output for an in-progress turn.
    pub fn chunk(response_id: u64, content: impl Into<String>) -> Self {
        Self {
            response_type: ResponseType::Response,
            response_id,
            content: content.into(),
            content_complete: false,
            end_call: false,
        }
    }

    /// The end-of-turn marker the platform relies on to detect completion.
    pub fn turn_complete(response_id: u64) -> Self {
        Self {
            response_type: ResponseType::Response,
            response_id,
            content: String::new(),
            content_complete: true,
            end_call: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_response_required_event() {
        let raw = json!({
            "interaction_type": "response_required",
            "response_id": 3,
            "transcript": [
                { "role": "agent", "content": "How can I help?" },
                { "role": "user", "content": "I need to reschedule." }
            ]
        });

        let event: InboundEvent = serde_json::from_value(raw).unwrap();
        match event {
            InboundEvent::ResponseRequired {
                response_id,
                transcript,
            } => {
                assert_eq!(response_id, 3);
                assert_eq!(transcript.len(), 2);
                assert_eq!(transcript[1].role, Speaker::User);
                assert_eq!(transcript[1].content, "I need to reschedule.");
            }
            other => panic!("Expected ResponseRequired, got {:?}", other),
        }
    }

    #[test]
    fn parses_reminder_required_event() {
        let raw = json!({ "interaction_type": "reminder_required", "response_id": 5 });
        let event: InboundEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.response_id(), Some(5));
    }

    #[test]
    fn parses_update_only_event_with_and_without_transcript() {
        let with: InboundEvent = serde_json::from_value(json!({
            "interaction_type": "update_only",
            "transcript": [{ "role": "user", "content": "uh" }]
        }))
        .unwrap();
        assert_eq!(with.response_id(), None);

        let without: InboundEvent =
            serde_json::from_value(json!({ "interaction_type": "update_only" })).unwrap();
        assert_eq!(without.response_id(), None);
    }

    #[test]
    fn outbound_chunk_wire_format_is_exact() {
        let msg = OutboundMessage::chunk(7, "Hello");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "response_type": "response",
                "response_id": 7,
                "content": "Hello",
                "content_complete": false,
                "end_call": false
            })
        );
    }

    #[test]
    fn outbound_turn_complete_has_empty_content() {
        let msg = OutboundMessage::turn_complete(9);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "response_type": "response",
                "response_id": 9,
                "content": "",
                "content_complete": true,
                "end_call": false
            })
        );
    }
}
