//! 连接配置

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::logger::{default_logger, RpcLogger};

/// 连接配置
#[derive(Clone)]
pub struct ConnectionConfig {
    /// 单次调用的默认超时
    pub call_timeout: Duration,
    /// 建立连接（拨号 + 握手）的超时
    pub io_timeout: Duration,
    /// 发送队列容量，队列满时调用方等待
    pub outbound_capacity: usize,
    /// 每个通知主题的缓冲容量
    pub notification_capacity: usize,
    /// 日志接口
    pub logger: Arc<dyn RpcLogger>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(10),
            outbound_capacity: 100,
            notification_capacity: 8,
            logger: default_logger(),
        }
    }
}

impl ConnectionConfig {
    /// 设置调用超时
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// 设置连接超时
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// 设置发送队列容量
    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// 设置通知缓冲容量
    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity.max(1);
        self
    }

    /// 注入日志实现
    pub fn with_logger(mut self, logger: Arc<dyn RpcLogger>) -> Self {
        self.logger = logger;
        self
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("call_timeout", &self.call_timeout)
            .field("io_timeout", &self.io_timeout)
            .field("outbound_capacity", &self.outbound_capacity)
            .field("notification_capacity", &self.notification_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.call_timeout, Duration::from_secs(5));
        assert_eq!(config.outbound_capacity, 100);
        assert_eq!(config.notification_capacity, 8);
    }

    #[test]
    fn test_builders_clamp_capacity() {
        let config = ConnectionConfig::default()
            .with_outbound_capacity(0)
            .with_notification_capacity(0)
            .with_call_timeout(Duration::from_millis(50));
        assert_eq!(config.outbound_capacity, 1);
        assert_eq!(config.notification_capacity, 1);
        assert_eq!(config.call_timeout, Duration::from_millis(50));
        assert!(format!("{:?}", config).contains("call_timeout"));
    }
}
