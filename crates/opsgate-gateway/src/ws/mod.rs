pub mod chat;
pub mod frame;
pub mod ops;
pub mod relay;
pub mod send;

// Connection-loop tests: a real server on an ephemeral port, scripted model
// and runner behind the AppState trait objects, a tokio-tungstenite client
// driving the socket.
#[cfg(test)]
mod tests {
    use crate::app::{build_router, AppState};
    use crate::testing::{ScriptedModel, ScriptedRunner};
    use futures_util::{SinkExt, StreamExt};
    use opsgate_core::config::OpsgateConfig;
    use opsgate_exec::ExecResult;
    use std::sync::Arc;
    use tokio_tungstenite::{
        connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
    };

    type ClientWs = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    async fn spawn_gateway(model: Arc<ScriptedModel>, runner: Arc<ScriptedRunner>) -> String {
        let state = Arc::new(AppState::new(OpsgateConfig::default(), model, runner));
        let router = build_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("ws://{addr}")
    }

    async fn connect(url: String) -> ClientWs {
        let (ws, _) = connect_async(url).await.unwrap();
        ws
    }

    async fn send_text(ws: &mut ClientWs, text: &str) {
        ws.send(Message::Text(text.into())).await.unwrap();
    }

    async fn recv_text(ws: &mut ClientWs) -> String {
        loop {
            let msg = ws.next().await.expect("socket ended").unwrap();
            if let Message::Text(text) = msg {
                return text.as_str().to_string();
            }
        }
    }

    #[tokio::test]
    async fn malformed_frame_is_skipped_and_loop_survives() {
        let model = Arc::new(ScriptedModel::replying(&["pong"]));
        let runner = Arc::new(ScriptedRunner::returning(vec![]));
        let base = spawn_gateway(model.clone(), runner).await;
        let mut ws = connect(format!("{base}/ai")).await;

        send_text(&mut ws, "this is not json").await;
        send_text(&mut ws, r#"{"content":"ping"}"#).await;

        // Only the well-formed frame is answered; the bad one never reached
        // the model and did not close the connection.
        assert_eq!(recv_text(&mut ws).await, r#"{"content":"pong"}"#);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn close_terminates_only_that_connection() {
        let model = Arc::new(ScriptedModel::replying(&["first", "second"]));
        let runner = Arc::new(ScriptedRunner::returning(vec![]));
        let base = spawn_gateway(model.clone(), runner).await;

        let mut a = connect(format!("{base}/start-chat")).await;
        let mut b = connect(format!("{base}/start-chat")).await;

        send_text(&mut a, r#"{"content":"hi"}"#).await;
        assert_eq!(recv_text(&mut a).await, r#"{"content":"first"}"#);

        a.close(None).await.unwrap();
        // Drain to the clean end of stream: the server acks the close
        // without erroring.
        while let Some(msg) = a.next().await {
            assert!(msg.is_ok());
        }

        // The other connection is untouched.
        send_text(&mut b, r#"{"content":"more"}"#).await;
        assert_eq!(recv_text(&mut b).await, r#"{"content":"second"}"#);
    }

    #[tokio::test]
    async fn ops_loop_skips_malformed_frames_and_executes_commands() {
        let model = Arc::new(ScriptedModel::replying(&["ok", "printf hi"]));
        let runner = Arc::new(ScriptedRunner::returning(vec![Ok(ExecResult {
            exit_code: 0,
            output: "hi".to_string(),
        })]));
        let base = spawn_gateway(model.clone(), runner.clone()).await;
        let mut ws = connect(format!("{base}/ops")).await;

        send_text(&mut ws, "{broken").await;
        send_text(&mut ws, r#"{"content":"say hi"}"#).await;

        assert_eq!(recv_text(&mut ws).await, r#"{"content":"hi"}"#);
        // Primer plus one turn; the malformed frame cost nothing.
        assert_eq!(model.calls(), 2);
        assert_eq!(runner.calls(), 1);
    }
}
