use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;

use events::EventBus;
use recorder_core::Ingress;

use crate::messages::{ClientConfig, ClientMessage, ServerMessage};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct WsState {
    pub event_bus: EventBus,
    pub ingress: mpsc::Sender<Ingress>,
    pub config: ClientConfig,
}

impl WsState {
    pub fn new(event_bus: EventBus, ingress: mpsc::Sender<Ingress>, config: ClientConfig) -> Self {
        Self {
            event_bus,
            ingress,
            config,
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<WsState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

type Outbound = SplitSink<WebSocket, Message>;

async fn send_message(sender: &mut Outbound, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server message");
            return true;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}

async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut event_rx = state.event_bus.subscribe();

    tracing::info!("Capture front-end connected");

    if !send_message(&mut sender, &ServerMessage::Config(state.config.clone())).await {
        return;
    }

    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    heartbeat.reset();

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            event_result = event_rx.recv() => {
                match event_result {
                    Ok(envelope) => {
                        if let Some(msg) = ServerMessage::from_event(&envelope.event) {
                            if !send_message(&mut sender, &msg).await {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(missed = n, "WebSocket client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::SaveCmd(raw)) => {
                                tracing::debug!(cmd = %raw.cmd, window = raw.window, "Received command");
                                if state.ingress.send(Ingress::Event(raw)).await.is_err() {
                                    tracing::warn!("Pipeline stopped, dropping command");
                                    break;
                                }
                            }
                            Ok(ClientMessage::End) => {
                                tracing::info!("Front-end ended the recording");
                                let _ = state.ingress.send(Ingress::End).await;
                                let _ = sender.send(Message::Close(None)).await;
                                break;
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Ignoring malformed client message");
                                let response = ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                };
                                if !send_message(&mut sender, &response).await {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "WebSocket receive failed");
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!("WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ws_state_creation() {
        let (tx, _rx) = mpsc::channel(8);
        let state = WsState::new(EventBus::new(), tx, ClientConfig::default());

        assert_eq!(state.event_bus.subscriber_count(), 0);
        assert!(state.config.spec_lists.is_empty());
    }

    #[tokio::test]
    async fn test_ingress_sender_reaches_pipeline() {
        let (tx, mut rx) = mpsc::channel(8);
        let state = WsState::new(EventBus::new(), tx, ClientConfig::default());

        state.ingress.send(Ingress::End).await.unwrap();
        assert_eq!(rx.recv().await, Some(Ingress::End));
    }
}
