//! Session Gateway: accepts one long-lived WebSocket connection per
//! client, assigns its participant identity, frames/parses signaling
//! messages, and drives the liveness probe described in the protocol.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, info_span, warn, Instrument};
use warp::ws::{Message, WebSocket};

use crate::coordinator::RoomCoordinator;
use crate::facade::SfuFacade;
use crate::id_types::{generate_participant_id, RoomId};
use crate::metrics;
use crate::room::{Participant, SessionState};

/// Every tick the gateway pings live sessions and clears their `alive`
/// flag; a session still cleared on the *next* tick is force-terminated,
/// bounding silent-peer detection to two intervals (60s at this default).
pub const LIVENESS_INTERVAL: Duration = Duration::from_secs(30);

pub type OutboundTx = mpsc::UnboundedSender<Message>;

/// Handles one accepted WebSocket connection end to end: registration,
/// the liveness ticker, the inbound read loop, and cleanup on close.
pub async fn handle_connection<F: SfuFacade + 'static>(
    ws: WebSocket,
    coordinator: Arc<RoomCoordinator<F>>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    let (terminate_tx, mut terminate_rx) = tokio::sync::oneshot::channel::<()>();

    let participant_id = generate_participant_id();
    let span = info_span!("session", participant_id = %participant_id);

    let forward_task = tokio::spawn(
        async move {
            while let Some(msg) = outbound_rx.recv().await {
                if ws_tx.send(msg).await.is_err() {
                    break;
                }
            }
        }
        .instrument(span.clone()),
    );

    let participant = Arc::new(Participant::new(
        participant_id.clone(),
        RoomId::default(),
        outbound_tx.clone(),
    ));

    async {
        info!("session accepted");

        let liveness = tokio::spawn(run_liveness_ticker(
            participant.clone(),
            outbound_tx.clone(),
            terminate_tx,
        ));

        loop {
            tokio::select! {
                next = ws_rx.next() => {
                    let Some(next) = next else { break };
                    let msg = match next {
                        Ok(m) => m,
                        Err(e) => {
                            warn!(error = %e, "websocket read error");
                            break;
                        }
                    };

                    if msg.is_close() {
                        break;
                    }
                    if msg.is_pong() {
                        participant.touch();
                        *participant.last_activity.lock().await = Instant::now();
                        continue;
                    }
                    if msg.is_ping() || msg.is_binary() {
                        continue;
                    }
                    let Ok(text) = msg.to_str() else { continue };
                    coordinator.dispatch(&participant, text).await;
                }
                _ = &mut terminate_rx => {
                    warn!("liveness ticker forced termination, abandoning read loop");
                    break;
                }
            }
        }

        liveness.abort();
        coordinator.handle_disconnect(&participant).await;
        info!("session closed");
    }
    .instrument(span)
    .await;

    drop(outbound_tx);
    let _ = forward_task.await;
}

/// Ticks every `LIVENESS_INTERVAL`, clearing `alive` and pinging; a session
/// still cleared on the following tick is force-terminated by firing
/// `terminate` so the read loop abandons its wait on the peer rather than
/// depending on that (possibly silent) peer ever sending a FIN.
async fn run_liveness_ticker(
    participant: Arc<Participant>,
    outbound: OutboundTx,
    terminate: tokio::sync::oneshot::Sender<()>,
) {
    let mut ticker = interval(LIVENESS_INTERVAL);
    ticker.tick().await; // first tick fires immediately; skip it

    loop {
        ticker.tick().await;

        let was_alive = participant.alive.swap(false, std::sync::atomic::Ordering::SeqCst);
        if !was_alive {
            warn!(participant_id = %participant.id, "missed two liveness ticks, terminating session");
            metrics::LIVENESS_TERMINATIONS_TOTAL.inc();
            participant.set_state(SessionState::Closing).await;
            let _ = outbound.send(Message::close());
            let _ = terminate.send(());
            break;
        }

        if outbound.send(Message::ping(Vec::new())).is_err() {
            break;
        }
    }
}
