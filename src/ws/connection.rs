//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single WebSocket connection:
//! subscription commands in, filtered verification events out.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::{UserId, VerificationEvent};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads subscription commands from the client.
/// - Forwards events for followed users from the [`broadcast::Receiver`].
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<VerificationEvent>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        if subs.matches(event.user_id()) {
                            let msg = WsMessage::new(
                                uuid::Uuid::new_v4().to_string(),
                                WsMessageType::Event,
                                serde_json::to_value(&event).unwrap_or_default(),
                            );
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Splits raw ids into valid user ids and a wildcard flag.
fn parse_user_ids(raw: &[String]) -> (Vec<UserId>, bool) {
    let wildcard = raw.iter().any(|s| s == "*");
    let ids = raw
        .iter()
        .filter(|s| s.as_str() != "*")
        .filter_map(|s| UserId::parse(s).ok())
        .collect();
    (ids, wildcard)
}

fn error_message(id: String, code: u16, message: &str) -> Option<String> {
    let err = WsMessage::new(
        id,
        WsMessageType::Error,
        json!({ "code": code, "message": message }),
    );
    serde_json::to_string(&err).ok()
}

/// Handles a text message from the client, returning an optional JSON response.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return error_message(String::new(), 400, "malformed JSON");
    };

    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return error_message(msg.id, 404, "unknown command");
    };

    let payload = match command {
        WsCommand::Subscribe { user_ids } => {
            let (ids, wildcard) = parse_user_ids(&user_ids);
            subs.subscribe(&ids, wildcard);
            json!({
                "subscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "count": subs.count(),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        WsCommand::Unsubscribe { user_ids } => {
            let (ids, wildcard) = parse_user_ids(&user_ids);
            subs.unsubscribe(&ids, wildcard);
            json!({
                "unsubscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "remaining_count": subs.count(),
                "wildcard": subs.is_subscribed_all(),
            })
        }
    };

    let response = WsMessage::new(msg.id, WsMessageType::Response, payload);
    serde_json::to_string(&response).ok()
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn reply(text: &str, subs: &mut SubscriptionManager) -> serde_json::Value {
        handle_text_message(text, subs)
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    #[test]
    fn subscribe_command_updates_filter() {
        let mut subs = SubscriptionManager::new();
        let resp = reply(
            r#"{"id":"1","type":"command","payload":{"command":"subscribe","user_ids":["u1"]}}"#,
            &mut subs,
        );
        assert_eq!(resp["type"], "response");
        assert_eq!(resp["id"], "1");
        assert_eq!(resp["payload"]["count"], 1);
        assert_eq!(subs.count(), 1);
    }

    #[test]
    fn wildcard_subscription() {
        let mut subs = SubscriptionManager::new();
        let resp = reply(
            r#"{"id":"2","type":"command","payload":{"command":"subscribe","user_ids":["*"]}}"#,
            &mut subs,
        );
        assert_eq!(resp["payload"]["wildcard"], true);
        assert!(subs.is_subscribed_all());
    }

    #[test]
    fn malformed_and_unknown_messages_get_errors() {
        let mut subs = SubscriptionManager::new();
        let resp = reply("not json", &mut subs);
        assert_eq!(resp["type"], "error");
        assert_eq!(resp["payload"]["code"], 400);

        let resp = reply(
            r#"{"id":"3","type":"command","payload":{"command":"purge"}}"#,
            &mut subs,
        );
        assert_eq!(resp["payload"]["code"], 404);
    }
}
