//! 错误类型定义
//!
//! 定义 RPC 客户端的错误类型，提供描述性错误消息。
//!
//! ## 功能
//! - 定义 RpcError 枚举，涵盖连接、编码、传输、超时、解码等错误
//! - 提供错误分类和辅助方法
//! - 支持把远端错误载荷解析为 JSON-RPC 错误格式

use thiserror::Error;

use crate::rpc::types::JsonRpcError;

/// RPC 错误类型
#[derive(Debug, Error)]
pub enum RpcError {
    /// 建立连接失败（拨号、握手或认证）
    #[error("连接失败: {0}")]
    Connect(String),

    /// 请求参数无法编码
    #[error("请求编码失败: {0}")]
    Encode(String),

    /// 传输层错误
    #[error("传输错误: {0}")]
    Transport(String),

    /// 发送队列已关闭（连接已关闭）
    #[error("请求队列已关闭")]
    RequestChannelClosed,

    /// 响应槽在投递前被丢弃
    #[error("响应通道已关闭")]
    ResponseChannelClosed,

    /// 调用超时
    #[error("RPC 调用超时: {method} ({timeout_ms}ms)")]
    Timeout { method: String, timeout_ms: u64 },

    /// 调用被调用方取消
    #[error("RPC 调用已取消: {0}")]
    Cancelled(String),

    /// 远端返回了错误载荷
    #[error("远端返回错误: {0}")]
    Protocol(serde_json::Value),

    /// 响应缺少 result
    #[error("响应结果为空")]
    ResultEmpty,

    /// 通知缺少 params
    #[error("通知参数为空")]
    ParamsEmpty,

    /// 参数数量不符合预期
    #[error("参数数量不匹配: 期望 {expected}, 实际 {actual}")]
    ParamsCount { expected: usize, actual: usize },

    /// 载荷与目标类型不匹配
    #[error("响应解码失败: {0}")]
    Decode(String),

    /// 通知分发器已关闭
    #[error("通知分发器已关闭")]
    NotifyClosed,

    /// 主题已有订阅者
    #[error("通知主题已被订阅: {0}")]
    AlreadySubscribed(String),

    /// 调用参数不合法
    #[error("无效参数: {0}")]
    InvalidArgument(String),
}

impl RpcError {
    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            RpcError::Connect(_) => "connect_failed",
            RpcError::Encode(_) => "encode_failed",
            RpcError::Transport(_) => "transport_error",
            RpcError::RequestChannelClosed => "request_channel_closed",
            RpcError::ResponseChannelClosed => "response_channel_closed",
            RpcError::Timeout { .. } => "timeout",
            RpcError::Cancelled(_) => "cancelled",
            RpcError::Protocol(_) => "protocol_error",
            RpcError::ResultEmpty => "result_empty",
            RpcError::ParamsEmpty => "params_empty",
            RpcError::ParamsCount { .. } => "params_count",
            RpcError::Decode(_) => "decode_failed",
            RpcError::NotifyClosed => "notify_closed",
            RpcError::AlreadySubscribed(_) => "already_subscribed",
            RpcError::InvalidArgument(_) => "invalid_argument",
        }
    }

    /// 检查是否为超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout { .. })
    }

    /// 检查是否为连接相关错误
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            RpcError::Connect(_)
                | RpcError::Transport(_)
                | RpcError::RequestChannelClosed
                | RpcError::ResponseChannelClosed
        )
    }

    /// 检查是否为可恢复错误（调用方可以自行重试）
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RpcError::Timeout { .. } | RpcError::Cancelled(_) | RpcError::Connect(_)
        )
    }

    /// 远端错误载荷
    pub fn protocol_payload(&self) -> Option<&serde_json::Value> {
        match self {
            RpcError::Protocol(payload) => Some(payload),
            _ => None,
        }
    }

    /// 把远端错误载荷解析为 JSON-RPC 错误对象
    ///
    /// 载荷不是 `{code, message, data}` 结构时返回 None。
    pub fn remote_error(&self) -> Option<JsonRpcError> {
        self.protocol_payload()
            .and_then(|payload| serde_json::from_value(payload.clone()).ok())
    }

    // ============ 错误构造辅助方法 ============

    /// 创建连接失败错误（包含目标地址）
    pub fn connect_failed(endpoint: &str, reason: impl std::fmt::Display) -> Self {
        RpcError::Connect(format!("{} - {}", endpoint, reason))
    }

    /// 创建解码失败错误
    pub fn decode_failed(what: &str, reason: impl std::fmt::Display) -> Self {
        RpcError::Decode(format!("{}: {}", what, reason))
    }
}
