//! Minecraft 服务器管理协议
//!
//! 在 `rpc` 连接之上提供类型化的管理方法与事件流。

pub mod client;
pub mod endpoints;
pub mod events;
pub mod method;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ClientOptions, SmpClient};
pub use method::MethodPath;
pub use types::*;
