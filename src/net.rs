//! Per-session TCP connection handling (spec.md §5: "cooperative
//! per-session tasks" on top of a shared thread pool).
//!
//! Grounded in the teacher's `servers/ticker.rs` accept-loop idiom
//! (bind, loop, spawn one task per accepted stream) but framing reads
//! with [`crate::codec::FrameCodec`] over a `tokio_util::codec::Framed`
//! instead of the teacher's raw byte buffer, and pairing the read half
//! with a dedicated writer task drained from the session's own output
//! queue (spec.md §3: "an output queue to which messages can be
//! dispatched") rather than the teacher's actor mailbox.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::codec::{FrameCodec, Message};
use crate::handlers;
use crate::lobby::signal::Signal;
use crate::registry::GameServerLifecycle;
use crate::session::Session;
use crate::state::AppState;

/// Bounded so a stalled client cannot grow its own output queue without
/// limit; a full queue is surfaced to callers as a soft send failure
/// (spec.md §4.9: delivery outcome is reported, never fatal to the
/// broader operation).
const OUTPUT_QUEUE_CAPACITY: usize = 256;

/// Runs the accept loop for the client/game-server wire protocol,
/// spawning one task pair (reader + writer) per accepted connection.
/// Runs until the listener itself fails to bind; a single accept
/// failure is logged and does not stop the loop.
pub async fn run_tcp_server(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening for client/game-server connections on {addr}");

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                error!("failed to accept connection: {err:?}");
                continue;
            }
        };

        let state = state.clone();
        tokio::spawn(async move {
            handle_connection(state, stream, peer_addr).await;
        });
    }
}

async fn handle_connection(state: Arc<AppState>, stream: TcpStream, peer_addr: SocketAddr) {
    let _ = stream.set_nodelay(true);
    let framed = Framed::new(stream, FrameCodec);
    let (mut sink, mut source) = framed.split();

    let session_id = Uuid::new_v4();
    let (output_tx, mut output_rx) = mpsc::channel::<Message>(OUTPUT_QUEUE_CAPACITY);
    let session = Arc::new(Session::new(session_id, peer_addr.ip(), output_tx));
    state.sessions.insert(session.clone());

    debug!("session {session_id} connected from {peer_addr}");

    let writer = tokio::spawn(async move {
        while let Some(message) = output_rx.recv().await {
            if let Err(err) = sink.send(message).await {
                warn!("write error on session {session_id}: {err:?}");
                break;
            }
        }
    });

    loop {
        match source.next().await {
            Some(Ok(message)) => {
                if let Some(reply) = handlers::handle_message(&state, &session, message).await {
                    if !session.send(reply).await {
                        break;
                    }
                }
            }
            Some(Err(err)) => {
                warn!("decode error on session {session_id}: {err:?}");
                break;
            }
            None => break,
        }
    }

    on_disconnect(&state, session_id).await;
    writer.abort();
    debug!("session {session_id} disconnected");
}

/// Cleans up registry/lobby state on connection loss (spec.md §4.4:
/// "On session end, the registry removes the record; any still-bound
/// lobby treats the server loss as a fatal match event").
async fn on_disconnect(state: &Arc<AppState>, session_id: Uuid) {
    state.sessions.remove(session_id);

    if let Some(record) = state.game_servers.remove(session_id) {
        state.game_servers.set_lifecycle(session_id, GameServerLifecycle::Dead);
        if let Some(handle) = state.lobbies.get(record.bound_match_id) {
            let _ = handle
                .send(Signal::Shutdown {
                    grace_seconds: 20,
                    disconnect_users: true,
                    disconnect_game_server: false,
                })
                .await;
        }
    }

    state.streams.untrack_all(session_id);
}
