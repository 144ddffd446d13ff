//! `splitboard watch`: join a board and print what the other side does.

use futures::{SinkExt, StreamExt};
use splitboard_core::protocol::{BoardEvent, ClearEvent, Frame, MessageEvent};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// One-line, human-readable rendering of a relayed event.
pub fn describe(event: &BoardEvent) -> String {
    match event {
        BoardEvent::AssignSide(side) => format!("You are drawing on the {side} side"),
        BoardEvent::Draw(d) => format!(
            "Line ({}, {}) -> ({}, {}) color {} size {}",
            d.x1, d.y1, d.x2, d.y2, d.color, d.size
        ),
        BoardEvent::Clear(None) | BoardEvent::Clear(Some(ClearEvent { side: None })) => {
            "Board cleared".to_string()
        }
        BoardEvent::Clear(Some(ClearEvent { side: Some(side) })) => {
            format!("The {side} side was cleared")
        }
        BoardEvent::Message(MessageEvent { message, side }) => {
            let side = side.map(|s| s.as_str()).unwrap_or("unknown");
            format!("Message from {side} side: {message}")
        }
    }
}

/// Connect to `url`, optionally send `message` once a side is assigned, and
/// print events until the server closes or Ctrl+C.
pub async fn run(url: &str, mut message: Option<String>) -> anyhow::Result<()> {
    let (ws, _) = connect_async(url).await?;
    let (mut ws_tx, mut ws_rx) = ws.split();
    tracing::info!(%url, "Connected");

    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            _ = tokio::signal::ctrl_c() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        };

        let text = match msg {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => {
                println!("Relay closed the connection");
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        };

        let frame = match Frame::decode(text.as_str()) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(%e, "Undecodable frame from relay");
                continue;
            }
        };

        match BoardEvent::try_from(&frame) {
            Ok(event) => {
                println!("{}", describe(&event));
                if let BoardEvent::AssignSide(side) = event {
                    if let Some(text) = message.take() {
                        let outgoing = Frame::message(&MessageEvent {
                            message: text,
                            side: Some(side),
                        })?;
                        ws_tx
                            .send(Message::Text(outgoing.encode()?.into()))
                            .await?;
                    }
                }
            }
            Err(e) => tracing::debug!(%e, event = %frame.event, "Skipping event"),
        }
    }

    Ok(())
}
