//! 通知分发器
//!
//! 按主题（通知的 method）把入站通知分发给订阅者。
//! 每个主题一个有界通道；通道满时丢弃最新的通知并记录警告，
//! 读取循环永远不会因为慢订阅者而阻塞。

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::types::Notification;
use crate::utils::error::RpcError;

/// 单次分发的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 已放入订阅者通道
    Delivered,
    /// 该主题没有订阅者，通知被丢弃
    NoSubscriber,
    /// 订阅者通道已满，通知被丢弃
    Dropped,
    /// 分发器已关闭
    Closed,
}

#[derive(Debug, Default)]
struct Topics {
    channels: HashMap<String, mpsc::Sender<Notification>>,
    closed: bool,
}

/// 通知分发器
#[derive(Debug)]
pub struct NotificationDispatcher {
    topics: RwLock<Topics>,
    /// 每个主题通道的容量
    capacity: usize,
}

impl NotificationDispatcher {
    /// 创建分发器，`capacity` 为每个主题通道的缓冲大小（至少为 1）
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(Topics::default()),
            capacity: capacity.max(1),
        }
    }

    /// 订阅主题
    ///
    /// 分发器关闭后返回 [`RpcError::NotifyClosed`]。
    ///
    /// # Panics
    ///
    /// 同一主题已有订阅时直接 panic：重复订阅是调用方的编程错误。
    pub fn subscribe(&self, method: &str) -> Result<mpsc::Receiver<Notification>, RpcError> {
        match self.try_subscribe(method) {
            Err(RpcError::AlreadySubscribed(method)) => {
                panic!("notification handler for '{}' already registered", method)
            }
            other => other,
        }
    }

    /// 订阅主题，重复订阅时返回 [`RpcError::AlreadySubscribed`]
    pub fn try_subscribe(&self, method: &str) -> Result<mpsc::Receiver<Notification>, RpcError> {
        let mut topics = self.topics.write();
        if topics.closed {
            return Err(RpcError::NotifyClosed);
        }
        if topics.channels.contains_key(method) {
            return Err(RpcError::AlreadySubscribed(method.to_string()));
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        topics.channels.insert(method.to_string(), tx);
        tracing::debug!("订阅通知主题: {}", method);
        Ok(rx)
    }

    /// 取消订阅并关闭通道（未订阅或重复取消是空操作）
    pub fn unsubscribe(&self, method: &str) {
        if self.topics.write().channels.remove(method).is_some() {
            tracing::debug!("取消订阅通知主题: {}", method);
        }
    }

    /// 分发一条通知
    pub fn dispatch(&self, notification: Notification) -> DispatchOutcome {
        let tx = {
            let topics = self.topics.read();
            if topics.closed {
                return DispatchOutcome::Closed;
            }
            match topics.channels.get(&notification.method) {
                Some(tx) => tx.clone(),
                None => return DispatchOutcome::NoSubscriber,
            }
        };

        match tx.try_send(notification) {
            Ok(()) => DispatchOutcome::Delivered,
            Err(TrySendError::Full(n)) => {
                tracing::warn!("通知通道已满，丢弃通知: {}", n.method);
                DispatchOutcome::Dropped
            }
            Err(TrySendError::Closed(n)) => {
                // 订阅者丢弃了接收端却没有取消订阅
                self.prune(&n.method, &tx);
                DispatchOutcome::NoSubscriber
            }
        }
    }

    /// 关闭所有主题通道，之后的订阅和分发都不再生效
    pub fn shutdown(&self) {
        let mut topics = self.topics.write();
        if topics.closed {
            return;
        }
        topics.closed = true;
        let count = topics.channels.len();
        topics.channels.clear();
        tracing::debug!("通知分发器已关闭，关闭 {} 个主题通道", count);
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.topics.read().closed
    }

    /// 主题是否有订阅
    pub fn is_subscribed(&self, method: &str) -> bool {
        self.topics.read().channels.contains_key(method)
    }

    /// 当前订阅的主题数量
    pub fn topic_count(&self) -> usize {
        self.topics.read().channels.len()
    }

    fn prune(&self, method: &str, stale: &mpsc::Sender<Notification>) {
        let mut topics = self.topics.write();
        // 只移除同一个通道，避免误删同名的新订阅
        if topics
            .channels
            .get(method)
            .is_some_and(|current| current.same_channel(stale))
        {
            topics.channels.remove(method);
            tracing::debug!("移除已失效的通知主题: {}", method);
        }
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new(8)
    }
}
