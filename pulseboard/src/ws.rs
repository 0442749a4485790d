//! Minimal WebSocket client helpers for the agent's event stream.

use anyhow::{bail, Context};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::types::Event;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Connect to the agent and return the WS stream
pub async fn connect(url: &str) -> anyhow::Result<WsStream> {
    let parsed = Url::parse(url).with_context(|| format!("invalid url {url:?}"))?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        bail!("expected a ws:// or wss:// url, got {url:?}");
    }
    let (ws, _) = connect_async(parsed.as_str())
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    Ok(ws)
}

// Await the next decodable event; None once the socket closes
pub async fn next_event(ws: &mut WsStream) -> Option<Event> {
    loop {
        match ws.next().await? {
            Ok(Message::Text(json)) => {
                if let Ok(ev) = serde_json::from_str::<Event>(&json) {
                    return Some(ev);
                }
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

// Ask the agent to spike its simulated load
pub async fn send_spike(ws: &mut WsStream) -> anyhow::Result<()> {
    ws.send(Message::Text(r#"{"event":"simulate-spike"}"#.into()))
        .await
        .context("failed to send spike request")
}
