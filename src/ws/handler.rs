//! WebSocket upgrade handler

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::game::{Outbound, RoomHandle, Session};
use crate::ws::ingress::apply_frame;

/// WebSocket upgrade handler for one room endpoint
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    room: Arc<RoomHandle>,
    max_message_bytes: usize,
) -> Response {
    if !room.is_running() {
        warn!(room = %room.name(), "Upgrade refused, room is not running");
        return (StatusCode::SERVICE_UNAVAILABLE, "room unavailable").into_response();
    }

    ws.max_message_size(max_message_bytes)
        .max_frame_size(max_message_bytes)
        .on_upgrade(move |socket| {
            let conn_id = Uuid::new_v4();
            let span = info_span!("conn", room = %room.name(), %conn_id, session_id = tracing::field::Empty);
            handle_socket(socket, room, conn_id).instrument(span)
        })
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, room: Arc<RoomHandle>, conn_id: Uuid) {
    let (session, outbound_rx) = match room.join(conn_id).await {
        Ok(joined) => joined,
        Err(e) => {
            warn!(error = %e, "Join failed, closing connection");
            return;
        }
    };
    tracing::Span::current().record("session_id", session.id());
    info!("New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();

    // Spawn writer task: queued frames -> WebSocket
    let writer_handle = tokio::spawn(
        write_outbound(ws_sink, outbound_rx, session.clone()).in_current_span(),
    );

    read_inbound(ws_stream, &session, &room).await;

    room.leave(session.id()).await;

    // Dropping the writer drops the sink; with the stream gone the socket closes
    writer_handle.abort();

    info!("WebSocket connection closed");
}

/// Reader loop: WebSocket -> session input slot, until close, error,
/// eviction or the room stopping
async fn read_inbound(
    mut ws_stream: SplitStream<WebSocket>,
    session: &Session,
    room: &RoomHandle,
) {
    loop {
        let next = tokio::select! {
            _ = session.evicted() => {
                info!("Connection evicted");
                return;
            }
            // Covers joins still queued when the tick loop died
            _ = room.stopped() => {
                info!("Room stopped, closing connection");
                return;
            }
            next = ws_stream.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                apply_frame(session, text.as_bytes());
            }
            Some(Ok(Message::Binary(bytes))) => {
                apply_frame(session, &bytes);
            }
            Some(Ok(Message::Pong(_))) => {
                session.mark_alive();
            }
            Some(Ok(Message::Ping(_))) => {
                debug!("Received ping");
            }
            Some(Ok(Message::Close(_))) => {
                info!("Client initiated close");
                return;
            }
            Some(Err(e)) => {
                debug!(error = %e, "WebSocket error");
                return;
            }
            None => return,
        }
    }
}

/// Writer loop: drains the session's outbound queue. Send failures end the
/// loop quietly; the reader or the liveness sweep notices the dead socket.
async fn write_outbound(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
    session: Arc<Session>,
) {
    while let Some(outbound) = outbound_rx.recv().await {
        let result = match outbound {
            Outbound::Frame(payload) => {
                let len = payload.len();
                // axum 0.7 text frames own a String, so each recipient copies the shared payload
                let sent = ws_sink.send(Message::Text(payload.to_string())).await;
                session.frame_written(len);
                sent
            }
            Outbound::Ping => ws_sink.send(Message::Ping(Vec::new())).await,
        };

        if let Err(e) = result {
            debug!(error = %e, "WebSocket send failed");
            break;
        }
    }
}
