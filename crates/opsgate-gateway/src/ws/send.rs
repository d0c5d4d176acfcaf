use axum::extract::ws::{Message, WebSocket};

/// Serialize any value to JSON and send it over the WS connection.
pub async fn json<T: serde::Serialize>(
    socket: &mut WebSocket,
    payload: &T,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(payload).unwrap_or_default();
    socket.send(Message::Text(json.into())).await
}
