//! 类型化的事件流
//!
//! 每个事件流订阅一个通知主题，在后台任务中解码后转发到自己的通道。
//! 取消信号触发、接收端被丢弃或连接结束时任务退出，退出时总会取消订阅。

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::client::SmpClient;
use super::method::MethodPath;
use super::types::{GameRule, Player, ServerState};
use crate::rpc::{decode_params, Notification, NotificationDispatcher};
use crate::utils::error::RpcError;

/// 事件流通道容量
const EVENT_BUFFER: usize = 1;

fn topic(group: &str, event: &str) -> MethodPath {
    MethodPath::notification().add(group).add(event)
}

/// 订阅主题并启动转发任务
fn spawn_stream<T, F>(
    dispatcher: Arc<NotificationDispatcher>,
    topic: MethodPath,
    cancel: CancellationToken,
    decode: F,
) -> Result<mpsc::Receiver<T>, RpcError>
where
    T: Send + 'static,
    F: Fn(&Notification) -> Option<T> + Send + 'static,
{
    let topic = topic.into_string();
    let mut inbound = dispatcher.try_subscribe(&topic)?;
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        loop {
            let notification = tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tx.closed() => break,
                notification = inbound.recv() => match notification {
                    Some(notification) => notification,
                    None => break,
                },
            };

            let Some(event) = decode(&notification) else {
                continue;
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                sent = tx.send(event) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }

        dispatcher.unsubscribe(&topic);
        tracing::debug!("事件流结束: {}", topic);
    });

    Ok(rx)
}

/// 解码单个参数的事件，无法解码的通知被跳过
fn typed<T>(notification: &Notification) -> Option<T>
where
    T: serde::de::DeserializeOwned,
{
    match decode_params(notification) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::debug!("跳过无法解码的通知 {}: {}", notification.method, e);
            None
        }
    }
}

/// 只关心是否发生的事件，带错误的通知被跳过
fn signal(notification: &Notification) -> Option<()> {
    notification.err().ok()
}

impl SmpClient {
    fn stream<T, F>(
        &self,
        topic: MethodPath,
        cancel: CancellationToken,
        decode: F,
    ) -> Result<mpsc::Receiver<T>, RpcError>
    where
        T: Send + 'static,
        F: Fn(&Notification) -> Option<T> + Send + 'static,
    {
        spawn_stream(self.connection().dispatcher(), topic, cancel, decode)
    }

    /// 玩家加入
    pub fn players_joined(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<Player>, RpcError> {
        self.stream(topic("players", "joined"), cancel, typed::<Player>)
    }

    /// 玩家离开
    pub fn players_left(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<Player>, RpcError> {
        self.stream(topic("players", "left"), cancel, typed::<Player>)
    }

    pub fn server_started(&self, cancel: CancellationToken) -> Result<mpsc::Receiver<()>, RpcError> {
        self.stream(topic("server", "started"), cancel, signal)
    }

    pub fn server_stopping(&self, cancel: CancellationToken) -> Result<mpsc::Receiver<()>, RpcError> {
        self.stream(topic("server", "stopping"), cancel, signal)
    }

    pub fn server_saving(&self, cancel: CancellationToken) -> Result<mpsc::Receiver<()>, RpcError> {
        self.stream(topic("server", "saving"), cancel, signal)
    }

    pub fn server_saved(&self, cancel: CancellationToken) -> Result<mpsc::Receiver<()>, RpcError> {
        self.stream(topic("server", "saved"), cancel, signal)
    }

    /// 服务器状态心跳
    pub fn server_status_updates(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<ServerState>, RpcError> {
        self.stream(topic("server", "status"), cancel, typed::<ServerState>)
    }

    /// 游戏规则变更
    pub fn gamerules_updated(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<GameRule>, RpcError> {
        self.stream(topic("gamerules", "updated"), cancel, typed::<GameRule>)
    }
}
