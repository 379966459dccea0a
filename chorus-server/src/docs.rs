use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::{schemas::*, serialized::*};

#[derive(OpenApi)]
#[openapi(
    paths(crate::rooms::health, crate::rooms::room, crate::gateway::gateway),
    components(schemas(
        Health,
        RoomState,
        RoomStatus,
        RoomRole,
        SyncStrategy,
        Track,
        ServerMessage,
        CreateRoomSchema,
        JoinRoomSchema,
        RoomSchema,
        AddTrackSchema,
        SetTransportSchema,
        HeartbeatSchema,
        SignalSchema,
    )),
    info(
        description = "chorus-server coordinates shared listening rooms. Clients talk to it over the gateway socket"
    )
)]
pub struct ApiDoc;

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
