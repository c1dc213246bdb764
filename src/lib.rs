//! Minecraft 服务器管理协议客户端库
//!
//! - `rpc`: JSON-RPC over WebSocket 的多路复用连接
//! - `smp`: 管理协议的类型化方法与事件流

pub mod rpc;
pub mod smp;
pub mod utils;

pub use rpc::{CallContext, Connection, ConnectionConfig};
pub use smp::{ClientOptions, SmpClient};
pub use utils::RpcError;
