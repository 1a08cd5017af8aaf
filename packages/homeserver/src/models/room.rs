use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::room_event;

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct CreateRoomRequest {
    #[schema(example = "Holiday photos")]
    pub name: Option<String>,
    /// Local users to invite.
    #[serde(default)]
    #[schema(example = json!(["@bob:hs1"]))]
    pub invite: Vec<String>,
    /// `public_chat` lets anyone join without an invite.
    #[schema(example = "private_chat")]
    pub preset: Option<String>,
    #[serde(default)]
    pub is_direct: bool,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct RoomIdResponse {
    #[schema(example = "!aBcDeFgHiJkLmNoPqR:hs1")]
    pub room_id: String,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct SendEventResponse {
    #[schema(example = "$aBcDeFgHiJkLmNoPqRsTuVwXyZ012345")]
    pub event_id: String,
}

/// An event as served to clients.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ClientEvent {
    pub event_id: String,
    pub room_id: String,
    pub sender: String,
    #[serde(rename = "type")]
    #[schema(example = "m.room.message")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    /// Exactly what the sender put in.
    #[schema(value_type = Object)]
    pub content: Value,
    pub origin_server_ts: i64,
}

impl From<room_event::Model> for ClientEvent {
    fn from(event: room_event::Model) -> Self {
        Self {
            event_id: event.event_id,
            room_id: event.room_id,
            sender: event.sender,
            event_type: event.event_type,
            state_key: event.state_key,
            content: event.content,
            origin_server_ts: event.origin_server_ts,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
pub enum Direction {
    #[default]
    #[serde(rename = "b")]
    Backward,
    #[serde(rename = "f")]
    Forward,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessagesQuery {
    /// Token from a previous response's `end`.
    pub from: Option<String>,
    #[serde(default)]
    pub dir: Direction,
    /// Maximum number of events (1-100, default 10).
    #[param(example = 10)]
    pub limit: Option<u64>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessagesResponse {
    pub chunk: Vec<ClientEvent>,
    pub start: String,
    /// Absent when there are no more events in this direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}
