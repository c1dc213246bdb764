//! 调用关联表
//!
//! 为每个出站请求分配单调递增的 id，并把 id 映射到一次性的结果槽。
//! 每个结果槽最多投递一次：投递前先从表中移除，`oneshot` 发送端随之被消耗。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::types::RpcResponse;

/// 等待中的调用表
#[derive(Debug, Default)]
pub struct PendingCalls {
    /// 最近分配的 id（0 保留给通知）
    last_id: AtomicU64,
    /// id -> 结果槽
    slots: Mutex<HashMap<u64, oneshot::Sender<RpcResponse>>>,
}

impl PendingCalls {
    /// 创建空的调用表
    pub fn new() -> Self {
        Self::default()
    }

    /// 分配下一个请求 id，从 1 开始
    pub fn next_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 注册结果槽，返回接收端
    pub fn register(&self, id: u64) -> oneshot::Receiver<RpcResponse> {
        let (tx, rx) = oneshot::channel();
        let previous = self.slots.lock().insert(id, tx);
        debug_assert!(previous.is_none(), "request id {} registered twice", id);
        rx
    }

    /// 把响应投递给对应的调用
    ///
    /// 返回 false 表示没有匹配的调用（已超时、已取消或未知 id），
    /// 或者等待方已经离开。
    pub fn resolve(&self, response: RpcResponse) -> bool {
        let Some(id) = response.id else {
            return false;
        };

        let slot = self.slots.lock().remove(&id);
        match slot {
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }

    /// 移除调用（重复移除是空操作）
    pub fn remove(&self, id: u64) -> bool {
        self.slots.lock().remove(&id).is_some()
    }

    /// 等待中的调用数量
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// 是否没有等待中的调用
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// 注册调用并返回守卫，守卫释放时自动注销
    pub(crate) fn guard(&self, id: u64) -> (PendingGuard<'_>, oneshot::Receiver<RpcResponse>) {
        let rx = self.register(id);
        (PendingGuard { calls: self, id }, rx)
    }
}

/// 调用方持有的注销守卫
///
/// 无论调用以成功、超时、取消还是 future 被丢弃结束，都会移除表项。
pub(crate) struct PendingGuard<'a> {
    calls: &'a PendingCalls,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.calls.remove(self.id) {
            tracing::debug!("注销未完成的调用: id={}", self.id);
        }
    }
}
