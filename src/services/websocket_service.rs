//! Socket connection lifecycle.
//!
//! A connection authenticates with the session key minted by the bootstrap
//! endpoint, joins the directory, and from then on exchanges action frames
//! through the dispatcher. A dedicated writer task keeps outbound frames
//! flowing while the handler awaits inbound ones.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock,
    dto::ws::{ErrorPayload, OutboundEnvelope},
    error::ServiceError,
    messages,
    services::{dispatcher, session_service},
    state::{PeerHandle, SharedState},
};

/// Handle the full lifecycle of one socket connection.
pub async fn handle_socket(
    state: SharedState,
    socket: WebSocket,
    skey: Option<String>,
    is_cron: bool,
) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let session = match session_service::authenticate(
        &state,
        skey.as_deref().unwrap_or(""),
        clock::now(),
    )
    .await
    {
        Ok(session) => session,
        Err(err) => {
            let payload = match &err {
                ServiceError::Domain(domain) => ErrorPayload::from(domain),
                other => ErrorPayload {
                    errorcode: "generalexception".to_owned(),
                    error: messages::localize("generalexception", Some(&other.to_string())),
                    stacktrace: String::new(),
                },
            };
            let frame = OutboundEnvelope::new("error", json!(payload));
            let _ = outbound_tx.send(frame.to_message());
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let peer = PeerHandle {
        conn: Uuid::new_v4(),
        tx: outbound_tx.clone(),
        session: session.clone(),
        is_cron,
    };
    state.directory().register(peer.clone());
    info!(
        conn = %peer.conn,
        userid = session.userid,
        groupid = session.groupid,
        cron = is_cron,
        "socket connected"
    );

    if !is_cron {
        dispatcher::notify_presence(&state, &session, true, Some(peer.conn)).await;
    }

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => dispatcher::dispatch(&state, &peer, &text).await,
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(conn = %peer.conn, error = %err, "websocket receive error");
                break;
            }
        }
    }

    // Leave the directory before announcing so the departing connection is
    // excluded from its own farewell.
    state.directory().unregister(peer.conn);
    info!(conn = %peer.conn, userid = session.userid, "socket disconnected");
    if !is_cron {
        dispatcher::notify_presence(&state, &session, false, None).await;
    }

    finalize(writer_task, outbound_tx).await;
}

/// Close the writer channel and wait for the writer task to drain.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
