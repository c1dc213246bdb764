//! 连接日志
//!
//! 连接只通过两个级别（info / error）报告观测事件，
//! 调用方可以注入自己的实现；默认转发到 `tracing`。

use std::sync::Arc;

/// 注入式日志接口
pub trait RpcLogger: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// 默认日志实现，转发到 tracing
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl RpcLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(target: "mcsmp_client::rpc", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "mcsmp_client::rpc", "{}", message);
    }
}

/// 默认日志实例
pub fn default_logger() -> Arc<dyn RpcLogger> {
    Arc::new(TracingLogger)
}
