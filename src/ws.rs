//! Realtime broadcast fan-out.
//!
//! The registry maps a user id to its live websocket sessions (one user may
//! hold several: multiple tabs or devices). Delivery is best-effort and
//! at-most-once; there is no queueing of missed messages. The registry is an
//! explicitly owned object constructed in `main` and handed to whoever needs
//! to broadcast via `web::Data`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use actix_web::{HttpRequest, HttpResponse, web};
use actix_ws::{Message, Session};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::IntoParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Attendance,
    LateApproval,
    LatePermission,
    Notification,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    pub data_type: DataType,
    pub data: Value,
}

/// Server-to-client envelope.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    DataUpdate { payload: UpdatePayload },
    Pong,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ClientMessage {
    Ping,
}

/// Realtime delivery seam. Services broadcast through this trait so state
/// transitions can be observed without a live websocket handshake.
#[async_trait]
pub trait Broadcast: Send + Sync {
    /// Update pushed to every connected client.
    async fn broadcast_update(&self, data_type: DataType, data: Value);
    /// Update pushed to one user's connections only.
    async fn push_update(&self, user_id: &str, data_type: DataType, data: Value);
}

#[derive(Default)]
pub struct ConnectionRegistry {
    next_conn_id: AtomicU64,
    sessions: Mutex<HashMap<String, Vec<(u64, Session)>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, user_id: &str, session: Session) -> u64 {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.sessions.lock().unwrap();
        guard
            .entry(user_id.to_string())
            .or_default()
            .push((conn_id, session));
        tracing::debug!(user_id, conn_id, "websocket registered");
        conn_id
    }

    fn deregister(&self, user_id: &str, conn_id: u64) {
        let mut guard = self.sessions.lock().unwrap();
        if let Some(conns) = guard.get_mut(user_id) {
            conns.retain(|(id, _)| *id != conn_id);
            if conns.is_empty() {
                guard.remove(user_id);
            }
        }
        tracing::debug!(user_id, conn_id, "websocket deregistered");
    }

    pub fn connected_users(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Delivers to every live connection of one user. Silently a no-op when
    /// the user has no live connection.
    pub async fn send_to_user(&self, user_id: &str, msg: &ServerMessage) {
        let Some(text) = encode(msg) else { return };
        let targets: Vec<(String, u64, Session)> = {
            let guard = self.sessions.lock().unwrap();
            guard
                .get(user_id)
                .map(|conns| {
                    conns
                        .iter()
                        .map(|(id, s)| (user_id.to_string(), *id, s.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };
        self.dispatch(targets, text).await;
    }

    /// Delivers to every live connection across all users.
    pub async fn send_to_all(&self, msg: &ServerMessage) {
        let Some(text) = encode(msg) else { return };
        let targets: Vec<(String, u64, Session)> = {
            let guard = self.sessions.lock().unwrap();
            guard
                .iter()
                .flat_map(|(uid, conns)| {
                    conns.iter().map(|(id, s)| (uid.clone(), *id, s.clone()))
                })
                .collect()
        };
        self.dispatch(targets, text).await;
    }

    // Sessions are cloned out of the lock above; sends never hold it.
    async fn dispatch(&self, targets: Vec<(String, u64, Session)>, text: String) {
        for (user_id, conn_id, mut session) in targets {
            if session.text(text.clone()).await.is_err() {
                self.deregister(&user_id, conn_id);
            }
        }
    }
}

#[async_trait]
impl Broadcast for ConnectionRegistry {
    async fn broadcast_update(&self, data_type: DataType, data: Value) {
        self.send_to_all(&ServerMessage::DataUpdate {
            payload: UpdatePayload { data_type, data },
        })
        .await;
    }

    async fn push_update(&self, user_id: &str, data_type: DataType, data: Value) {
        self.send_to_user(
            user_id,
            &ServerMessage::DataUpdate {
                payload: UpdatePayload { data_type, data },
            },
        )
        .await;
    }
}

fn encode(msg: &ServerMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode realtime message");
            None
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct ConnectQuery {
    /// Identity the connection is registered under. Connections without it
    /// are serviced for pings but can never be targeted.
    pub user_id: Option<String>,
}

/// Websocket endpoint: `GET /ws?user_id=`.
pub async fn connect(
    req: HttpRequest,
    body: web::Payload,
    query: web::Query<ConnectQuery>,
    registry: web::Data<ConnectionRegistry>,
) -> actix_web::Result<HttpResponse> {
    let (response, session, mut stream) = actix_ws::handle(&req, body)?;

    let user_id = query.into_inner().user_id.filter(|u| !u.is_empty());
    let conn_id = user_id
        .as_deref()
        .map(|uid| registry.register(uid, session.clone()));
    let registry = registry.into_inner();

    actix_web::rt::spawn(async move {
        let mut session = session;
        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Ping(bytes) => {
                    if session.pong(&bytes).await.is_err() {
                        break;
                    }
                }
                Message::Text(text) => {
                    // Application-level keepalive; anything else is ignored.
                    if let Ok(ClientMessage::Ping) = serde_json::from_str(&text) {
                        if let Some(pong) = encode(&ServerMessage::Pong) {
                            if session.text(pong).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        if let (Some(uid), Some(cid)) = (user_id.as_deref(), conn_id) {
            registry.deregister(uid, cid);
        }
        let _ = session.close(None).await;
    });

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_update_envelope_shape() {
        let msg = ServerMessage::DataUpdate {
            payload: UpdatePayload {
                data_type: DataType::LateApproval,
                data: json!({"id": "a1"}),
            },
        };
        let encoded: Value = serde_json::from_str(&encode(&msg).unwrap()).unwrap();
        assert_eq!(
            encoded,
            json!({
                "type": "data-update",
                "payload": {"dataType": "lateApproval", "data": {"id": "a1"}}
            })
        );
    }

    #[test]
    fn pong_envelope_shape() {
        let encoded: Value = serde_json::from_str(&encode(&ServerMessage::Pong).unwrap()).unwrap();
        assert_eq!(encoded, json!({"type": "pong"}));
    }

    #[test]
    fn client_ping_parses() {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#),
            Ok(ClientMessage::Ping)
        ));
    }

    #[actix_web::test]
    async fn sending_to_empty_registry_is_a_noop() {
        let registry = ConnectionRegistry::new();
        registry.send_to_all(&ServerMessage::Pong).await;
        registry.send_to_user("nobody", &ServerMessage::Pong).await;
        assert_eq!(registry.connected_users(), 0);
    }
}
