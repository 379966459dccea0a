use axum::{
    extract::{Path, State},
    routing::get,
    Json,
};

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    serialized::{Health, RoomState, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "health",
    responses(
        (status = 200, body = Health)
    )
)]
pub async fn health() -> Json<Health> {
    Json(Health::ok())
}

#[utoipa::path(
    get,
    path = "/v1/rooms/{id}",
    tag = "rooms",
    params(
        ("id" = String, Path, description = "The public token of the room")
    ),
    responses(
        (status = 200, body = RoomState),
        (status = 404, description = "There is no such room")
    )
)]
pub async fn room(
    State(context): State<ServerContext>,
    Path(id): Path<String>,
) -> ServerResult<Json<RoomState>> {
    let snapshot = context
        .collab
        .room_snapshot(&id)
        .ok_or(ServerError::NotFound {
            resource: "Room",
            identifier: id,
        })?;

    Ok(Json(snapshot.to_serialized()))
}

pub fn router() -> Router {
    Router::new().route("/:id", get(room))
}
