//! 管理协议客户端
//!
//! 在 RPC 连接之上提供类型化的方法调用，见 `endpoints` 与 `events`。

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::method::MethodPath;
use crate::rpc::{decode_result, CallContext, Connection, ConnectionConfig};
use crate::utils::error::RpcError;

/// 客户端选项
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// WebSocket 路径，默认 `/`
    pub path: String,
    /// 使用 `wss`
    pub tls: bool,
    /// 单次调用超时
    pub call_timeout: Duration,
    /// 底层连接配置
    pub connection: ConnectionConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            tls: false,
            call_timeout: Duration::from_secs(5),
            connection: ConnectionConfig::default(),
        }
    }
}

impl ClientOptions {
    /// 设置路径，空路径被忽略，缺少的前导 `/` 会被补上
    pub fn with_path(mut self, path: &str) -> Self {
        if path.is_empty() {
            return self;
        }
        self.path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    /// 拼出端点 URL
    pub fn endpoint(&self, host: &str, port: u16) -> Result<String, RpcError> {
        if host.is_empty() {
            return Err(RpcError::Connect("无效的主机名".to_string()));
        }
        if port == 0 {
            return Err(RpcError::Connect("无效的端口".to_string()));
        }

        let scheme = if self.tls { "wss" } else { "ws" };
        // IPv6 字面量需要方括号
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };
        Ok(format!("{}://{}:{}{}", scheme, host, port, self.path))
    }
}

/// 管理协议客户端
///
/// 克隆开销很小，克隆体共享同一条连接。
#[derive(Clone)]
pub struct SmpClient {
    conn: Arc<Connection>,
    context: CallContext,
}

impl SmpClient {
    /// 连接到服务端
    pub async fn connect(
        host: &str,
        port: u16,
        token: &str,
        options: ClientOptions,
    ) -> Result<Self, RpcError> {
        let endpoint = options.endpoint(host, port)?;
        let config = options.connection.with_call_timeout(options.call_timeout);

        tracing::info!("连接管理端点: {}", endpoint);
        let conn = Connection::open(&endpoint, token, config).await?;
        Ok(Self::from_connection(conn))
    }

    /// 包装已建立的连接
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(conn),
            context: CallContext::default(),
        }
    }

    /// 返回使用指定调用上下文的客户端（共享连接）
    ///
    /// 之后经由它发起的调用都受该上下文的超时与取消约束。
    pub fn with_context(&self, context: CallContext) -> Self {
        Self {
            conn: self.conn.clone(),
            context,
        }
    }

    /// 底层连接
    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// 关闭连接
    pub async fn close(&self) -> Result<(), RpcError> {
        self.conn.close().await
    }

    /// 发起调用并解码结果
    pub(crate) async fn invoke<P, T>(&self, method: MethodPath, params: P) -> Result<T, RpcError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .conn
            .call_with(method.as_str(), params, self.context.clone())
            .await?;
        decode_result(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let options = ClientOptions::default();
        assert_eq!(
            options.endpoint("localhost", 25585).unwrap(),
            "ws://localhost:25585/"
        );
    }

    #[test]
    fn test_path_and_tls() {
        let options = ClientOptions::default().with_path("mgmt").with_tls(true);
        assert_eq!(options.path, "/mgmt");
        assert_eq!(
            options.endpoint("mc.example.net", 443).unwrap(),
            "wss://mc.example.net:443/mgmt"
        );

        let options = options.with_path("");
        assert_eq!(options.path, "/mgmt");
    }

    #[test]
    fn test_ipv6_host() {
        let options = ClientOptions::default();
        assert_eq!(options.endpoint("::1", 25585).unwrap(), "ws://[::1]:25585/");
    }

    #[test]
    fn test_invalid_host_or_port() {
        let options = ClientOptions::default();
        assert!(matches!(options.endpoint("", 25585), Err(RpcError::Connect(_))));
        assert!(matches!(options.endpoint("localhost", 0), Err(RpcError::Connect(_))));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_address_before_dialing() {
        let result = SmpClient::connect("", 25585, "token", ClientOptions::default()).await;
        assert!(matches!(result, Err(RpcError::Connect(_))));
    }
}
