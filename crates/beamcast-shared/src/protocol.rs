use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RoomErrorCode;
use crate::types::{ClientId, Role, RoomId};

/// Frames a client may send. Every frame is a JSON object with a mandatory
/// `type` tag; anything that does not parse into this enum is dropped by the
/// transport.
///
/// `offer`, `answer` and `candidate` payloads are opaque descriptors from the
/// peer-media layer and are forwarded without inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    Ping,
    CreateRoom {
        name: String,
        key: String,
    },
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        key: String,
    },
    LeaveRoom,
    GetRoomList,
    BroadcasterReady,
    ViewerJoin,
    Offer {
        #[serde(rename = "viewerId", default, skip_serializing_if = "Option::is_none")]
        viewer_id: Option<ClientId>,
        offer: Value,
    },
    Answer {
        answer: Value,
    },
    IceCandidate {
        candidate: Value,
        #[serde(rename = "viewerId", default, skip_serializing_if = "Option::is_none")]
        viewer_id: Option<ClientId>,
    },
    ChatMessage {
        message: String,
    },
}

/// Frames the server emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    Pong,
    RoomCreated {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        name: String,
        role: Role,
    },
    RoomJoined {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        name: String,
        role: Role,
    },
    RoomLeft,
    RoomError {
        code: RoomErrorCode,
        error: String,
    },
    RoomList {
        rooms: Vec<RoomSummary>,
    },
    ViewerJoined {
        #[serde(rename = "viewerId")]
        viewer_id: ClientId,
    },
    ViewerLeft {
        #[serde(rename = "viewerId")]
        viewer_id: ClientId,
    },
    BroadcasterAvailable,
    BroadcasterLeft,
    NoBroadcaster,
    Offer {
        offer: Value,
    },
    Answer {
        #[serde(rename = "viewerId")]
        viewer_id: ClientId,
        answer: Value,
    },
    IceCandidate {
        candidate: Value,
        #[serde(rename = "viewerId", default, skip_serializing_if = "Option::is_none")]
        viewer_id: Option<ClientId>,
    },
    ChatBroadcast {
        sender: Role,
        message: String,
        /// Server-assigned, milliseconds since the UNIX epoch.
        timestamp: i64,
    },
}

impl From<RoomErrorCode> for ServerFrame {
    fn from(code: RoomErrorCode) -> Self {
        ServerFrame::RoomError {
            code,
            error: code.to_string(),
        }
    }
}

/// Public summary of one room in a `room-list` snapshot.
/// Carries no secrets and no connection identities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub participants: u8,
    #[serde(rename = "isFull")]
    pub is_full: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_create_room() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"create-room","name":"movie","key":"hunter2"}"#)
                .unwrap();
        assert_eq!(
            frame,
            ClientFrame::CreateRoom {
                name: "movie".into(),
                key: "hunter2".into(),
            }
        );
    }

    #[test]
    fn test_parse_join_room() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"join-room","roomId":"room-abcd1234","key":"hunter2"}"#)
                .unwrap();
        assert_eq!(
            frame,
            ClientFrame::JoinRoom {
                room_id: RoomId::from("room-abcd1234"),
                key: "hunter2".into(),
            }
        );
    }

    #[test]
    fn test_parse_offer_with_and_without_viewer_id() {
        let with: ClientFrame = serde_json::from_str(
            r#"{"type":"offer","viewerId":"client-2","offer":{"sdp":"v=0"}}"#,
        )
        .unwrap();
        assert_eq!(
            with,
            ClientFrame::Offer {
                viewer_id: Some(ClientId::new(2)),
                offer: json!({"sdp": "v=0"}),
            }
        );

        let without: ClientFrame =
            serde_json::from_str(r#"{"type":"offer","offer":{"sdp":"v=0"}}"#).unwrap();
        assert_eq!(
            without,
            ClientFrame::Offer {
                viewer_id: None,
                offer: json!({"sdp": "v=0"}),
            }
        );
    }

    #[test]
    fn test_parse_bare_frames() {
        for (text, expected) in [
            (r#"{"type":"ping"}"#, ClientFrame::Ping),
            (r#"{"type":"leave-room"}"#, ClientFrame::LeaveRoom),
            (r#"{"type":"get-room-list"}"#, ClientFrame::GetRoomList),
            (r#"{"type":"broadcaster-ready"}"#, ClientFrame::BroadcasterReady),
            (r#"{"type":"viewer-join"}"#, ClientFrame::ViewerJoin),
        ] {
            let frame: ClientFrame = serde_json::from_str(text).unwrap();
            assert_eq!(frame, expected);
        }
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"shutdown-server"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>(r#"{"no_type":true}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>("not json at all").is_err());
    }

    #[test]
    fn test_room_created_wire_shape() {
        let v = serde_json::to_value(ServerFrame::RoomCreated {
            room_id: RoomId::from("room-abcd1234"),
            name: "movie".into(),
            role: Role::Broadcaster,
        })
        .unwrap();
        assert_eq!(
            v,
            json!({
                "type": "room-created",
                "roomId": "room-abcd1234",
                "name": "movie",
                "role": "broadcaster",
            })
        );
    }

    #[test]
    fn test_room_error_wire_shape() {
        let v = serde_json::to_value(ServerFrame::from(RoomErrorCode::InvalidKey)).unwrap();
        assert_eq!(
            v,
            json!({
                "type": "room-error",
                "code": "INVALID_KEY",
                "error": "Incorrect room key.",
            })
        );
    }

    #[test]
    fn test_room_list_wire_shape() {
        let v = serde_json::to_value(ServerFrame::RoomList {
            rooms: vec![RoomSummary {
                id: RoomId::from("room-abcd1234"),
                name: "movie".into(),
                participants: 2,
                is_full: true,
            }],
        })
        .unwrap();
        assert_eq!(
            v,
            json!({
                "type": "room-list",
                "rooms": [{"id": "room-abcd1234", "name": "movie", "participants": 2, "isFull": true}],
            })
        );
    }

    #[test]
    fn test_offer_to_viewer_has_no_viewer_id() {
        let v = serde_json::to_value(ServerFrame::Offer {
            offer: json!({"sdp": "v=0"}),
        })
        .unwrap();
        assert_eq!(v, json!({"type": "offer", "offer": {"sdp": "v=0"}}));
    }

    #[test]
    fn test_answer_to_broadcaster_carries_viewer_id() {
        let v = serde_json::to_value(ServerFrame::Answer {
            viewer_id: ClientId::new(2),
            answer: json!({"sdp": "v=0"}),
        })
        .unwrap();
        assert_eq!(
            v,
            json!({"type": "answer", "viewerId": "client-2", "answer": {"sdp": "v=0"}})
        );
    }

    #[test]
    fn test_ice_candidate_viewer_id_is_optional() {
        let stripped = serde_json::to_value(ServerFrame::IceCandidate {
            candidate: json!({"candidate": "udp 1"}),
            viewer_id: None,
        })
        .unwrap();
        assert_eq!(
            stripped,
            json!({"type": "ice-candidate", "candidate": {"candidate": "udp 1"}})
        );

        let tagged = serde_json::to_value(ServerFrame::IceCandidate {
            candidate: json!({"candidate": "udp 1"}),
            viewer_id: Some(ClientId::new(7)),
        })
        .unwrap();
        assert_eq!(
            tagged,
            json!({
                "type": "ice-candidate",
                "candidate": {"candidate": "udp 1"},
                "viewerId": "client-7",
            })
        );
    }

    #[test]
    fn test_chat_broadcast_wire_shape() {
        let v = serde_json::to_value(ServerFrame::ChatBroadcast {
            sender: Role::Viewer,
            message: "hi".into(),
            timestamp: 1_700_000_000_000,
        })
        .unwrap();
        assert_eq!(
            v,
            json!({
                "type": "chat-broadcast",
                "sender": "viewer",
                "message": "hi",
                "timestamp": 1_700_000_000_000_i64,
            })
        );
    }
}
