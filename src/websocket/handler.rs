use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::models::messages::{ClientMessage, ServerMessage};
use crate::AppState;

/// Handshake data supplied by the client. The owner id is taken on trust,
/// whoever supplies the string controls that owner's note.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub owner_id: Option<String>,
}

/// WebSocket handler
pub async fn sync_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("New sync connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, params.owner_id.unwrap_or_default(), state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, owner_id: String, state: Arc<AppState>) {
    // Generate unique session ID to identify this client
    let session_id = Uuid::new_v4().to_string();

    info!(
        "Sync connection established for owner '{}' with session_id: {}",
        owner_id, session_id
    );

    // Split the socket into sender and receiver
    let (sender, mut receiver) = socket.split();

    // The sender is written from multiple tasks, so wrap it in an Arc and Mutex
    let sender = Arc::new(Mutex::new(sender));

    let (mut broadcast_rx, initial) = state.sync.handle_connect(&session_id, &owner_id).await;

    // Push the owner's stored note before anything else reaches this session
    if let Some(msg) = initial {
        if !send_message(&sender, &msg).await {
            error!("Failed to send initial content to session {}", session_id);
        }
    }

    info!(
        "Total connected sessions: {}",
        state.sync.connection_count()
    );

    // Start a task that drains this session's registry channel to the client
    let send_sender = sender.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = broadcast_rx.recv().await {
            if !send_message(&send_sender, &msg).await {
                break;
            }
        }
    });

    // Start an async task to listen to the websocket for incoming messages.
    // Use pattern matching to only process text messages
    // ❌ Binary message arrives → Pattern doesn't match, loop continues to next iteration
    // ❌ Error occurs → Pattern doesn't match, loop continues to next iteration
    // ❌ Stream ends (None) → Pattern doesn't match, loop exits
    // ✅ Text message arrives → Pattern matches, process the message
    let recv_sender = sender.clone();
    let recv_session = session_id.clone();
    let recv_owner = owner_id.clone();
    let sync = state.sync.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(Message::Text(msg))) = receiver.next().await {
            debug!(
                "Received message from session {} ({} bytes)",
                recv_session,
                msg.len()
            );

            // Parse the incoming message as JSON
            let client_msg: ClientMessage = match serde_json::from_str(&msg) {
                Ok(client_msg) => client_msg,
                Err(e) => {
                    error!(
                        "Failed to parse message from session {}: {}",
                        recv_session, e
                    );
                    continue;
                }
            };

            // Handle different message types
            match client_msg {
                ClientMessage::Edit { content } => {
                    if let Some(reply) =
                        sync.handle_edit(&recv_session, &recv_owner, content).await
                    {
                        if !send_message(&recv_sender, &reply).await {
                            break;
                        }
                    }
                }
                ClientMessage::Ping => {
                    let pong = sync.handle_ping();
                    if !send_message(&recv_sender, &pong).await {
                        break;
                    }
                }
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.sync.handle_disconnect(&session_id);
    info!(
        "Sync connection closed for session {}. Remaining sessions: {}",
        session_id,
        state.sync.connection_count()
    );
}

/// Serialize and send one server message. Returns false when the socket is gone.
async fn send_message(
    sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>,
    msg: &ServerMessage,
) -> bool {
    let text = serde_json::to_string(msg).unwrap();
    sender.lock().await.send(Message::Text(text)).await.is_ok()
}
