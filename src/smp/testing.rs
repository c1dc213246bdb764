//! 测试用的内存服务端
//!
//! 客户端与服务端通过 `tokio::io::duplex` 相连，服务端按方法名应答并记录收到的请求。

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::client::SmpClient;
use crate::rpc::{Connection, ConnectionConfig};

pub(crate) struct MockServer {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
    push: mpsc::UnboundedSender<Value>,
}

impl MockServer {
    /// 已收到的请求（方法名, params）
    pub(crate) fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().clone()
    }

    /// 某个方法收到的请求参数
    pub(crate) fn params_of(&self, method: &str) -> Vec<Value> {
        self.requests
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    /// 推送一条通知
    pub(crate) fn notify(&self, method: &str, params: Value) {
        let _ = self.push.send(json!({"method": method, "params": params}));
    }

    /// 推送一条带错误的通知
    pub(crate) fn notify_error(&self, method: &str, error: Value) {
        let _ = self.push.send(json!({"method": method, "error": error}));
    }
}

/// 建立客户端与模拟服务端
///
/// `handler` 按方法名和参数返回 `Ok(result)` 或 `Err(error)`。
pub(crate) async fn start<F>(mut handler: F) -> (SmpClient, MockServer)
where
    F: FnMut(&str, &Value) -> Result<Value, Value> + Send + 'static,
{
    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
    let mut server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;

    let requests = Arc::new(Mutex::new(Vec::new()));
    let (push, mut outgoing) = mpsc::unbounded_channel::<Value>();

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = server.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(_)) => continue,
                        _ => break,
                    };
                    let request: Value = match serde_json::from_str(text.as_str()) {
                        Ok(request) => request,
                        Err(_) => continue,
                    };
                    let method = request["method"].as_str().unwrap_or_default().to_string();
                    let params = request.get("params").cloned().unwrap_or(Value::Null);
                    recorded.lock().push((method.clone(), params.clone()));

                    let reply = match handler(&method, &params) {
                        Ok(result) => json!({"id": request["id"], "result": result}),
                        Err(error) => json!({"id": request["id"], "error": error}),
                    };
                    if server.send(Message::text(reply.to_string())).await.is_err() {
                        break;
                    }
                }
                Some(value) = outgoing.recv() => {
                    if server.send(Message::text(value.to_string())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let conn = Connection::from_stream(client, ConnectionConfig::default());
    (SmpClient::from_connection(conn), MockServer { requests, push })
}
