//! JSON messages exchanged over the session socket.

use crate::stroke::StrokePoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent to the server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Local stroke points for the other participants.
    UpdateCanvas {
        username: String,
        #[serde(rename = "sessionId")]
        session_id: String,
        /// JSON-encoded array of stroke points.
        #[serde(rename = "canvasState")]
        canvas_state: String,
    },
}

impl ClientMessage {
    pub fn update_canvas(
        username: impl Into<String>,
        session_id: impl Into<String>,
        points: &[StrokePoint],
    ) -> serde_json::Result<Self> {
        Ok(ClientMessage::UpdateCanvas {
            username: username.into(),
            session_id: session_id.into(),
            canvas_state: serde_json::to_string(points)?,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Raw inbound frame: `{type, status?, data}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub data: Value,
}

/// Canvas state carried by an inbound `update-canvas`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CanvasState {
    /// Points serialized to a JSON string by the sender.
    Encoded(String),
    Inline(Vec<StrokePoint>),
}

impl CanvasState {
    fn into_points(self) -> serde_json::Result<Vec<StrokePoint>> {
        match self {
            CanvasState::Encoded(json) => serde_json::from_str(&json),
            CanvasState::Inline(points) => Ok(points),
        }
    }
}

/// Payload of an inbound `update-canvas`.
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "canvasState", alias = "clicks")]
    canvas_state: CanvasState,
}

impl CanvasUpdate {
    pub fn into_points(self) -> serde_json::Result<Vec<StrokePoint>> {
        self.canvas_state.into_points()
    }
}

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    NewUser(Value),
    UpdateCanvas {
        username: Option<String>,
        points: Vec<StrokePoint>,
    },
    ServerDown(Value),
    NewPeer(Value),
    AckSession(Value),
}

impl ServerMessage {
    /// Decode a text frame.
    ///
    /// Returns `Ok(None)` for well-formed frames of an unknown type.
    pub fn decode(text: &str) -> serde_json::Result<Option<Self>> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let message = match envelope.kind.as_str() {
            "new-user" => ServerMessage::NewUser(envelope.data),
            "update-canvas" => {
                let update: CanvasUpdate = serde_json::from_value(envelope.data)?;
                let username = update.username.clone();
                ServerMessage::UpdateCanvas {
                    username,
                    points: update.into_points()?,
                }
            }
            "server-down" => ServerMessage::ServerDown(envelope.data),
            "newPeer" => ServerMessage::NewPeer(envelope.data),
            "ack-session" => ServerMessage::AckSession(envelope.data),
            other => {
                log::debug!("Ignoring message of unknown type {other:?}");
                return Ok(None);
            }
        };
        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::StrokeStyle;

    #[test]
    fn test_update_canvas_serialize() {
        let points = vec![StrokePoint::new(1.0, 2.0, false, StrokeStyle::default())];
        let message = ClientMessage::update_canvas("ann", "abc", &points).unwrap();
        let json: Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "update-canvas");
        assert_eq!(json["data"]["username"], "ann");
        assert_eq!(json["data"]["sessionId"], "abc");
        let state = json["data"]["canvasState"].as_str().unwrap();
        let decoded: Vec<StrokePoint> = serde_json::from_str(state).unwrap();
        assert_eq!(decoded, points);
    }

    #[test]
    fn test_decode_encoded_canvas_state() {
        let points = vec![StrokePoint::new(5.0, 6.0, true, StrokeStyle::default())];
        let frame = serde_json::json!({
            "type": "update-canvas",
            "status": 200,
            "data": {
                "username": "bo",
                "canvasState": serde_json::to_string(&points).unwrap(),
            }
        });
        let message = ServerMessage::decode(&frame.to_string()).unwrap().unwrap();
        assert_eq!(
            message,
            ServerMessage::UpdateCanvas {
                username: Some("bo".to_string()),
                points,
            }
        );
    }

    #[test]
    fn test_decode_inline_clicks() {
        let frame = r##"{"type":"update-canvas","data":{"clicks":[
            {"x":1,"y":1,"drag":false,"remote":false,
             "style":{"colour":"#000","width":"small","type":"pen"}}]}}"##;
        match ServerMessage::decode(frame).unwrap() {
            Some(ServerMessage::UpdateCanvas { username, points }) => {
                assert_eq!(username, None);
                assert_eq!(points.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_simple_messages() {
        let message = ServerMessage::decode(r#"{"type":"new-user","data":{"name":"cy"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(message, ServerMessage::NewUser(serde_json::json!({"name": "cy"})));

        let message = ServerMessage::decode(r#"{"type":"server-down"}"#).unwrap().unwrap();
        assert_eq!(message, ServerMessage::ServerDown(Value::Null));

        let message = ServerMessage::decode(r#"{"type":"newPeer","data":"p1"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(message, ServerMessage::NewPeer(Value::String("p1".into())));
    }

    #[test]
    fn test_decode_unknown_and_malformed() {
        assert_eq!(ServerMessage::decode(r#"{"type":"mystery"}"#).unwrap(), None);
        assert!(ServerMessage::decode("not json").is_err());
        assert!(ServerMessage::decode(r#"{"data":{}}"#).is_err());
        assert!(
            ServerMessage::decode(r#"{"type":"update-canvas","data":{"canvasState":"[oops"}}"#)
                .is_err()
        );
    }
}
