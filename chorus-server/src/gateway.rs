use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use log::{debug, warn};

use crate::{context::ServerContext, schemas::ClientMessage, serialized::ServerMessage};

type Outbound = SplitSink<WebSocket, Message>;

#[utoipa::path(
    get,
    path = "/v1/gateway",
    tag = "gateway",
    responses(
        (
            status = 101,
            description = "A socket carrying JSON text frames. Clients send ClientMessage frames and receive these",
            body = ServerMessage
        )
    )
)]
pub async fn gateway(
    State(context): State<ServerContext>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, context))
}

/// Serves one control channel until either side closes it.
async fn handle_socket(socket: WebSocket, context: ServerContext) {
    let collab = context.collab;
    let (connection_id, mut events) = collab.connect();
    let (mut outbound, mut inbound) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };

                if send(&mut outbound, ServerMessage::from(event)).await.is_err() {
                    break;
                }
            }
            message = inbound.next() => match message {
                Some(Ok(Message::Text(text))) => match ClientMessage::parse(&text) {
                    Ok(command) => {
                        // Failures are reported to the connection through its events
                        let _ = collab.handle(connection_id, command).await;
                    }
                    Err(error) => {
                        debug!("Connection {} sent a bad frame: {}", connection_id, error);

                        let message = ServerMessage::RoomError {
                            message: error.to_string(),
                        };

                        if send(&mut outbound, message).await.is_err() {
                            break;
                        }
                    }
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }

    collab.disconnect(connection_id);
}

async fn send(outbound: &mut Outbound, message: ServerMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(&message) {
        Ok(json) => outbound.send(Message::Text(json)).await,
        Err(error) => {
            warn!("Could not serialize {:?}: {}", message, error);
            Ok(())
        }
    }
}
