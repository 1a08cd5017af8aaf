use axum::{
    Json,
    extract::{Path, State},
};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use serde_json::{Value, json};
use tracing::instrument;

use crate::entity::{room, room_event, room_membership};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::{AppJson, AppQuery};
use crate::models::room::{
    ClientEvent, CreateRoomRequest, Direction, MessagesQuery, MessagesResponse, RoomIdResponse,
    SendEventResponse,
};
use crate::profile::user_exists;
use crate::state::AppState;
use crate::utils::identifiers::{UserId, random_string};

const DEFAULT_MESSAGES_LIMIT: u64 = 10;
const MAX_MESSAGES_LIMIT: u64 = 100;

struct NewEvent<'a> {
    room_id: &'a str,
    sender: &'a str,
    event_type: &'a str,
    state_key: Option<&'a str>,
    txn_id: Option<&'a str>,
    content: Value,
}

async fn append_event<C: ConnectionTrait>(
    db: &C,
    event: NewEvent<'_>,
) -> Result<room_event::Model, DbErr> {
    room_event::ActiveModel {
        event_id: Set(format!("${}", random_string(32))),
        room_id: Set(event.room_id.to_owned()),
        sender: Set(event.sender.to_owned()),
        event_type: Set(event.event_type.to_owned()),
        state_key: Set(event.state_key.map(str::to_owned)),
        txn_id: Set(event.txn_id.map(str::to_owned)),
        content: Set(event.content),
        origin_server_ts: Set(chrono::Utc::now().timestamp_millis()),
        ..Default::default()
    }
    .insert(db)
    .await
}

async fn set_membership<C: ConnectionTrait>(
    db: &C,
    room_id: &str,
    user_id: &str,
    membership: &str,
) -> Result<(), DbErr> {
    room_membership::Entity::insert(room_membership::ActiveModel {
        room_id: Set(room_id.to_owned()),
        user_id: Set(user_id.to_owned()),
        membership: Set(membership.to_owned()),
        updated_at: Set(chrono::Utc::now()),
    })
    .on_conflict(
        OnConflict::columns([
            room_membership::Column::RoomId,
            room_membership::Column::UserId,
        ])
        .update_columns([
            room_membership::Column::Membership,
            room_membership::Column::UpdatedAt,
        ])
        .to_owned(),
    )
    .exec_without_returning(db)
    .await?;

    append_event(
        db,
        NewEvent {
            room_id,
            sender: user_id,
            event_type: "m.room.member",
            state_key: Some(user_id),
            txn_id: None,
            content: json!({ "membership": membership }),
        },
    )
    .await?;
    Ok(())
}

async fn find_room<C: ConnectionTrait>(db: &C, room_id: &str) -> Result<room::Model, AppError> {
    room::Entity::find_by_id(room_id.to_owned())
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Room not found".into()))
}

async fn membership_of<C: ConnectionTrait>(
    db: &C,
    room_id: &str,
    user_id: &str,
) -> Result<Option<String>, DbErr> {
    Ok(
        room_membership::Entity::find_by_id((room_id.to_owned(), user_id.to_owned()))
            .one(db)
            .await?
            .map(|m| m.membership),
    )
}

/// Fail unless the room exists and `user_id` is currently joined.
async fn require_joined<C: ConnectionTrait>(
    db: &C,
    room_id: &str,
    user_id: &str,
) -> Result<(), AppError> {
    find_room(db, room_id).await?;
    match membership_of(db, room_id, user_id).await?.as_deref() {
        Some(room_membership::JOIN) => Ok(()),
        _ => Err(AppError::PermissionDenied(format!(
            "{user_id} is not in room {room_id}"
        ))),
    }
}

#[utoipa::path(
    post,
    path = "/_matrix/client/v3/createRoom",
    tag = "Rooms",
    operation_id = "createRoom",
    summary = "Create a room",
    description = "The creator joins immediately. Invitees must be local users.",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomIdResponse),
        (status = 400, description = "Invalid invite list (M_INVALID_PARAM)", body = ErrorBody),
        (status = 401, description = "Unauthorized (M_MISSING_TOKEN, M_UNKNOWN_TOKEN)", body = ErrorBody),
        (status = 404, description = "Invitee does not exist (M_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(creator = %auth_user.user_id))]
pub async fn create_room(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRoomRequest>,
) -> Result<Json<RoomIdResponse>, AppError> {
    let mut invitees = Vec::with_capacity(payload.invite.len());
    for raw in &payload.invite {
        let invitee = UserId::parse(raw)?;
        if !state.is_local(invitee.server_name()) {
            return Err(AppError::Validation(format!(
                "Cannot invite {invitee}: remote invites are not supported"
            )));
        }
        if !user_exists(&state.db, invitee.as_str()).await? {
            return Err(AppError::NotFound(format!("User {invitee} not found")));
        }
        invitees.push(invitee);
    }

    let room_id = format!("!{}:{}", random_string(18), state.config.server.server_name);
    let creator = auth_user.user_id.as_str();

    let txn = state.db.begin().await?;

    room::ActiveModel {
        room_id: Set(room_id.clone()),
        creator: Set(creator.to_owned()),
        name: Set(payload.name.clone()),
        is_public: Set(payload.preset.as_deref() == Some("public_chat")),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(&txn)
    .await?;

    append_event(
        &txn,
        NewEvent {
            room_id: &room_id,
            sender: creator,
            event_type: "m.room.create",
            state_key: Some(""),
            txn_id: None,
            content: json!({ "creator": creator }),
        },
    )
    .await?;
    set_membership(&txn, &room_id, creator, room_membership::JOIN).await?;

    if let Some(name) = &payload.name {
        append_event(
            &txn,
            NewEvent {
                room_id: &room_id,
                sender: creator,
                event_type: "m.room.name",
                state_key: Some(""),
                txn_id: None,
                content: json!({ "name": name }),
            },
        )
        .await?;
    }

    for invitee in &invitees {
        if invitee.as_str() != creator {
            set_membership(&txn, &room_id, invitee.as_str(), room_membership::INVITE).await?;
        }
    }

    txn.commit().await?;

    tracing::info!(room_id = %room_id, invited = invitees.len(), is_direct = payload.is_direct, "created room");

    Ok(Json(RoomIdResponse { room_id }))
}

#[utoipa::path(
    post,
    path = "/_matrix/client/v3/rooms/{room_id}/join",
    tag = "Rooms",
    operation_id = "joinRoom",
    summary = "Join a room",
    description = "Allowed when invited, already joined, or the room is public.",
    params(("room_id" = String, Path, description = "Room id")),
    responses(
        (status = 200, description = "Joined", body = RoomIdResponse),
        (status = 401, description = "Unauthorized (M_MISSING_TOKEN, M_UNKNOWN_TOKEN)", body = ErrorBody),
        (status = 403, description = "Not invited (M_FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Unknown room (M_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn join_room(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomIdResponse>, AppError> {
    let user_id = auth_user.user_id.as_str();
    let txn = state.db.begin().await?;

    let room = find_room(&txn, &room_id).await?;
    match membership_of(&txn, &room_id, user_id).await?.as_deref() {
        Some(room_membership::JOIN) => return Ok(Json(RoomIdResponse { room_id })),
        Some(room_membership::INVITE) => {}
        _ if room.is_public => {}
        _ => {
            return Err(AppError::PermissionDenied(format!(
                "{user_id} is not invited to {room_id}"
            )));
        }
    }

    set_membership(&txn, &room_id, user_id, room_membership::JOIN).await?;
    txn.commit().await?;

    Ok(Json(RoomIdResponse { room_id }))
}

#[utoipa::path(
    post,
    path = "/_matrix/client/v3/join/{room_id}",
    tag = "Rooms",
    operation_id = "joinRoomById",
    summary = "Join a room (alias path)",
    params(("room_id" = String, Path, description = "Room id")),
    responses(
        (status = 200, description = "Joined", body = RoomIdResponse),
        (status = 403, description = "Not invited (M_FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Unknown room (M_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn join_room_by_id(
    auth_user: AuthUser,
    state: State<AppState>,
    room_id: Path<String>,
) -> Result<Json<RoomIdResponse>, AppError> {
    join_room(auth_user, state, room_id).await
}

#[utoipa::path(
    put,
    path = "/_matrix/client/v3/rooms/{room_id}/send/{event_type}/{txn_id}",
    tag = "Rooms",
    operation_id = "sendEvent",
    summary = "Send a message event",
    description = "Content is stored and served back exactly as sent, including any \
        `info.xyz.amorgan.blurhash`. Retrying with the same `txn_id` returns the original \
        event id.",
    params(
        ("room_id" = String, Path, description = "Room id"),
        ("event_type" = String, Path, description = "Event type, e.g. `m.room.message`"),
        ("txn_id" = String, Path, description = "Client transaction id"),
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Sent", body = SendEventResponse),
        (status = 400, description = "Body is not a JSON object (M_BAD_JSON)", body = ErrorBody),
        (status = 403, description = "Not joined (M_FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Unknown room (M_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, content), fields(sender = %auth_user.user_id))]
pub async fn send_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((room_id, event_type, txn_id)): Path<(String, String, String)>,
    AppJson(content): AppJson<Value>,
) -> Result<Json<SendEventResponse>, AppError> {
    if !content.is_object() {
        return Err(AppError::BadJson("Event content must be a JSON object".into()));
    }
    let sender = auth_user.user_id.as_str();
    require_joined(&state.db, &room_id, sender).await?;

    if let Some(existing) = find_by_txn(&state.db, &room_id, sender, &txn_id).await? {
        return Ok(Json(SendEventResponse {
            event_id: existing.event_id,
        }));
    }

    let inserted = append_event(
        &state.db,
        NewEvent {
            room_id: &room_id,
            sender,
            event_type: &event_type,
            state_key: None,
            txn_id: Some(&txn_id),
            content,
        },
    )
    .await;

    let event = match inserted {
        Ok(event) => event,
        // A concurrent retry with the same txn id won the insert.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            find_by_txn(&state.db, &room_id, sender, &txn_id)
                .await?
                .ok_or_else(|| AppError::from(e))?
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Json(SendEventResponse {
        event_id: event.event_id,
    }))
}

async fn find_by_txn<C: ConnectionTrait>(
    db: &C,
    room_id: &str,
    sender: &str,
    txn_id: &str,
) -> Result<Option<room_event::Model>, DbErr> {
    room_event::Entity::find()
        .filter(room_event::Column::RoomId.eq(room_id))
        .filter(room_event::Column::Sender.eq(sender))
        .filter(room_event::Column::TxnId.eq(txn_id))
        .one(db)
        .await
}

#[utoipa::path(
    get,
    path = "/_matrix/client/v3/rooms/{room_id}/messages",
    tag = "Rooms",
    operation_id = "getMessages",
    summary = "Paginate the room timeline",
    params(
        ("room_id" = String, Path, description = "Room id"),
        MessagesQuery,
    ),
    responses(
        (status = 200, description = "A page of events", body = MessagesResponse),
        (status = 400, description = "Bad pagination token (M_INVALID_PARAM)", body = ErrorBody),
        (status = 403, description = "Not joined (M_FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Unknown room (M_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = %auth_user.user_id))]
pub async fn get_messages(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    AppQuery(query): AppQuery<MessagesQuery>,
) -> Result<Json<MessagesResponse>, AppError> {
    require_joined(&state.db, &room_id, auth_user.user_id.as_str()).await?;

    let from = query
        .from
        .as_deref()
        .map(|token| {
            token
                .parse::<i32>()
                .map_err(|_| AppError::Validation(format!("Invalid pagination token '{token}'")))
        })
        .transpose()?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_MESSAGES_LIMIT)
        .clamp(1, MAX_MESSAGES_LIMIT);

    let mut select = room_event::Entity::find().filter(room_event::Column::RoomId.eq(&room_id));
    select = match (query.dir, from) {
        (Direction::Backward, Some(from)) => select.filter(room_event::Column::Id.lt(from)),
        (Direction::Forward, Some(from)) => select.filter(room_event::Column::Id.gt(from)),
        (_, None) => select,
    };
    select = match query.dir {
        Direction::Backward => select.order_by_desc(room_event::Column::Id),
        Direction::Forward => select.order_by_asc(room_event::Column::Id),
    };
    let events = select.limit(limit).all(&state.db).await?;

    let start = match (from, query.dir) {
        (Some(from), _) => from,
        (None, Direction::Backward) => events.first().map(|e| e.id + 1).unwrap_or(0),
        (None, Direction::Forward) => 0,
    };
    let end = (events.len() as u64 == limit)
        .then(|| events.last().map(|e| e.id.to_string()))
        .flatten();

    Ok(Json(MessagesResponse {
        chunk: events.into_iter().map(ClientEvent::from).collect(),
        start: start.to_string(),
        end,
    }))
}

#[utoipa::path(
    get,
    path = "/_matrix/client/v3/rooms/{room_id}/event/{event_id}",
    tag = "Rooms",
    operation_id = "getEvent",
    summary = "Fetch one event",
    params(
        ("room_id" = String, Path, description = "Room id"),
        ("event_id" = String, Path, description = "Event id"),
    ),
    responses(
        (status = 200, description = "Event", body = ClientEvent),
        (status = 403, description = "Not joined (M_FORBIDDEN)", body = ErrorBody),
        (status = 404, description = "Unknown room or event (M_NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_event(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((room_id, event_id)): Path<(String, String)>,
) -> Result<Json<ClientEvent>, AppError> {
    require_joined(&state.db, &room_id, auth_user.user_id.as_str()).await?;

    let event = room_event::Entity::find()
        .filter(room_event::Column::RoomId.eq(&room_id))
        .filter(room_event::Column::EventId.eq(&event_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))?;

    Ok(Json(ClientEvent::from(event)))
}
