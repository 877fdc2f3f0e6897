use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::server::{Server, ServerOptions};

/// The one frame a client must send before anything else.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FirstFrame {
    #[serde(default)]
    auth_token: String,
    #[serde(default)]
    room_id: i64,
}

pub fn router(server: Arc<Server>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(server)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(server): State<Arc<Server>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, server))
}

/// Per-connection entry point. Spawns the writer pump, runs the reader
/// inline, and tears the session down when either side ends.
async fn handle_connection(socket: WebSocket, server: Arc<Server>) {
    let (tx, rx) = socket.split();
    let (ch, outbound_rx) = Channel::new(server.options.outbound_queue_size);

    let writer = tokio::spawn(write_pump(tx, outbound_rx, server.options.clone()));
    read_pump(rx, ch.clone(), &server).await;

    // Teardown: the bucket forgets the session, Logic updates routing
    // state, and dropping our channel reference lets the writer drain out
    // and close the socket.
    let user_id = ch.user_id();
    let room_id = ch.room_id();
    if user_id != 0 {
        server.bucket(user_id).delete_channel(user_id);
        if let Err(e) = server.operator.disconnect(user_id, room_id).await {
            warn!(user_id, room_id, error = %e, "disconnect rpc failed");
        }
        info!(user_id, room_id, "session closed");
    }
    drop(ch);
    let _ = writer.await;
}

/// Drains the outbound queue onto the socket and keeps the heartbeat
/// going. Every write carries the write deadline; a peer that cannot take
/// a ping in time is gone.
async fn write_pump(
    mut tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Message>,
    options: ServerOptions,
) {
    let mut ticker = tokio::time::interval(options.ping_period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker.tick().await; // the first tick fires immediately

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(msg) => {
                        match timeout(options.write_wait, tx.send(msg)).await {
                            Ok(Ok(())) => {}
                            _ => break,
                        }
                    }
                    None => {
                        // session torn down - say goodbye properly
                        let _ = timeout(options.write_wait, tx.send(Message::Close(None))).await;
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                match timeout(options.write_wait, tx.send(Message::Ping(Vec::new().into()))).await {
                    Ok(Ok(())) => {}
                    _ => break,
                }
            }
        }
    }
}

/// Reads until close, error, or heartbeat loss. The first text frame must
/// carry `{authToken, roomId}`; after the session joins, inbound text is
/// ignored (pushes are RPC-driven) but the loop keeps observing pongs and
/// close frames.
async fn read_pump(mut rx: SplitStream<WebSocket>, ch: Arc<Channel>, server: &Arc<Server>) {
    let mut joined = false;
    loop {
        let frame = match timeout(server.options.pong_wait, rx.next()).await {
            Err(_) => {
                debug!("read deadline expired, closing");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(error = %e, "socket read error");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => {
                if joined {
                    continue;
                }
                if text.len() > server.options.max_message_size {
                    warn!(size = text.len(), "oversized first frame, closing");
                    break;
                }
                let first: FirstFrame = match serde_json::from_str(&text) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(error = %e, "malformed first frame, closing");
                        break;
                    }
                };
                if first.auth_token.is_empty() {
                    warn!("first frame has no auth token, closing");
                    break;
                }
                let user_id = match server
                    .operator
                    .connect(&first.auth_token, first.room_id, &server.server_id)
                    .await
                {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(error = %e, "connect rpc failed, closing");
                        break;
                    }
                };
                if user_id == 0 {
                    warn!("auth token did not resolve, closing");
                    break;
                }
                server.bucket(user_id).put(user_id, first.room_id, ch.clone());
                joined = true;
                info!(user_id, room_id = first.room_id, "session joined");
            }
            Message::Ping(data) => {
                let _ = ch.push_raw(Message::Pong(data));
            }
            // any inbound traffic refreshes the read deadline; pongs exist
            // exactly for that
            Message::Pong(_) => {}
            Message::Close(_) => break,
            Message::Binary(_) => {
                // text frames only
                if !joined {
                    break;
                }
            }
        }
    }
}
