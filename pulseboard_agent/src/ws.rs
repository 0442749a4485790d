//! WebSocket upgrade and per-connection handler. Outbound frames come from the
//! hub channel; inbound frames are client commands.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::debug;

use crate::hub::{ClientId, Outbound};
use crate::state::AppState;
use crate::types::ClientEvent;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (id, mut rx) = state.hub.register();

    // Unregister and announce the new count on disconnect (drop).
    struct ClientGuard(AppState, ClientId);
    impl Drop for ClientGuard {
        fn drop(&mut self) {
            self.0.hub.unregister(self.1);
            self.0.pipeline.on_client_disconnected(self.0.hub.as_ref(), self.1);
        }
    }
    let _guard = ClientGuard(state.clone(), id);

    let (mut sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            let msg = match out {
                Outbound::Text(js) => Message::Text(js),
                Outbound::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            };
            if sink.send(msg).await.is_err() {
                debug!(client = id, "socket sink closed");
                break;
            }
        }
    });

    state
        .pipeline
        .on_client_connected(state.hub.as_ref(), id)
        .await;

    // Once the writer is done (server-side close or dead sink) the peer's
    // reply is not awaited.
    loop {
        tokio::select! {
            _ = &mut writer => {
                debug!(client = id, "writer finished");
                return;
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => match ClientEvent::parse(&text) {
                    Some(ClientEvent::SimulateSpike) => state.pipeline.on_spike_requested(id).await,
                    None => debug!(client = id, "ignoring frame: {text}"),
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    writer.abort();
}
