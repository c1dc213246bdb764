//! RPC 通信模块
//!
//! 实现 JSON-RPC over WebSocket 的客户端多路复用：
//! 一条连接上并发多个调用，按 id 关联响应，按主题分发服务端推送的通知。

pub mod config;
pub mod connection;
pub mod decode;
pub mod logger;
pub mod notify;
pub mod pending;
pub mod types;

pub use config::ConnectionConfig;
pub use connection::{CallContext, Connection};
pub use decode::{decode_params, decode_params_into, decode_result};
pub use logger::{default_logger, RpcLogger, TracingLogger};
pub use notify::{DispatchOutcome, NotificationDispatcher};
pub use pending::PendingCalls;
pub use types::*;
