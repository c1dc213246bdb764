//! RPC 连接
//!
//! 一条 WebSocket 连接承载任意数量的并发调用：
//! - 写循环从有界发送队列依次取出已编码的请求并写入连接
//! - 读循环逐帧解码：非零 id 的响应投递给关联表，其余作为通知交给分发器
//!
//! 连接断开后不会主动让等待中的调用失败，它们各自在超时后返回。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::config::ConnectionConfig;
use super::logger::RpcLogger;
use super::notify::NotificationDispatcher;
use super::pending::PendingCalls;
use super::types::{decode_envelope, encode_request, Inbound, Notification, RpcRequest, RpcResponse};
use crate::utils::error::RpcError;

/// 单次调用的上下文：可选的超时与取消信号
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl CallContext {
    /// 创建空上下文（使用连接的默认超时，不可取消）
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置本次调用的超时
    ///
    /// 实际生效的是它与连接默认超时中较小的一个。
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 设置取消信号
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn effective_timeout(&self, default: Duration) -> Duration {
        match self.timeout {
            Some(timeout) => timeout.min(default),
            None => default,
        }
    }
}

/// RPC 连接
pub struct Connection {
    /// 发送队列
    outbound: mpsc::Sender<String>,
    /// 等待中的调用
    pending: Arc<PendingCalls>,
    /// 通知分发器
    dispatcher: Arc<NotificationDispatcher>,
    /// 默认调用超时（毫秒），运行时可调整
    call_timeout_ms: AtomicU64,
    /// 关闭时等待读写循环退出的上限
    io_timeout: Duration,
    /// 关闭信号，读写循环共享
    shutdown: CancellationToken,
    closed: AtomicBool,
    /// 读写循环的任务句柄
    tasks: Mutex<Vec<JoinHandle<()>>>,
    logger: Arc<dyn RpcLogger>,
}

impl Connection {
    /// 建立连接
    ///
    /// 令牌以 `Authorization: Bearer <token>` 在握手时发送。
    /// 拨号、HTTP 或握手失败都返回 [`RpcError::Connect`]，不会重试。
    pub async fn open(
        endpoint: &str,
        token: &str,
        config: ConnectionConfig,
    ) -> Result<Self, RpcError> {
        let mut request = endpoint
            .into_client_request()
            .map_err(|e| RpcError::connect_failed(endpoint, e))?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| RpcError::connect_failed(endpoint, format!("无效的令牌: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        let (ws, response) = tokio::time::timeout(config.io_timeout, connect_async(request))
            .await
            .map_err(|_| {
                RpcError::connect_failed(
                    endpoint,
                    format!("握手超时 ({}ms)", duration_ms(config.io_timeout)),
                )
            })?
            .map_err(|e| RpcError::connect_failed(endpoint, e))?;

        config
            .logger
            .info(&format!("已连接到 {} (HTTP {})", endpoint, response.status()));
        Ok(Self::from_stream(ws, config))
    }

    /// 在已建立的 WebSocket 上启动读写循环
    ///
    /// 必须在 Tokio 运行时中调用。
    pub fn from_stream<S>(ws: WebSocketStream<S>, config: ConnectionConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (sink, stream) = ws.split();
        let (outbound, queue) = mpsc::channel(config.outbound_capacity.max(1));
        let pending = Arc::new(PendingCalls::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(config.notification_capacity));
        let shutdown = CancellationToken::new();

        let writer = tokio::spawn(writer_loop(
            sink,
            queue,
            config.logger.clone(),
            shutdown.clone(),
            config.io_timeout,
        ));
        let reader = tokio::spawn(reader_loop(
            stream,
            pending.clone(),
            dispatcher.clone(),
            config.logger.clone(),
            shutdown.clone(),
        ));

        Self {
            outbound,
            pending,
            dispatcher,
            call_timeout_ms: AtomicU64::new(duration_ms(config.call_timeout)),
            io_timeout: config.io_timeout,
            shutdown,
            closed: AtomicBool::new(false),
            tasks: Mutex::new(vec![writer, reader]),
            logger: config.logger,
        }
    }

    /// 发起调用，使用连接的默认超时
    pub async fn call<P: Serialize>(&self, method: &str, params: P) -> Result<RpcResponse, RpcError> {
        self.call_with(method, params, CallContext::default()).await
    }

    /// 发起调用
    ///
    /// 等待以下三者之一：响应到达、上下文取消、超时。
    /// 取消或超时时注销本次调用，之后到达的响应被静默丢弃。
    /// 参数在注册与入队之前编码，编码失败没有任何副作用。
    pub async fn call_with<P: Serialize>(
        &self,
        method: &str,
        params: P,
        ctx: CallContext,
    ) -> Result<RpcResponse, RpcError> {
        if self.is_closed() {
            return Err(RpcError::RequestChannelClosed);
        }

        let id = self.pending.next_id();
        let request = RpcRequest::new(id, method, params)?;
        let frame = encode_request(&request)?;

        let timeout = ctx.effective_timeout(self.call_timeout());
        let cancel = ctx.cancel.unwrap_or_default();
        // 已取消的调用不入队
        if cancel.is_cancelled() {
            return Err(RpcError::Cancelled(method.to_string()));
        }
        let (_guard, slot) = self.pending.guard(id);

        let exchange = async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RpcError::Cancelled(method.to_string())),
                sent = self.outbound.send(frame) => {
                    if sent.is_err() {
                        return Err(RpcError::RequestChannelClosed);
                    }
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(RpcError::Cancelled(method.to_string())),
                response = slot => response.map_err(|_| RpcError::ResponseChannelClosed),
            }
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!("调用超时: id={} method={}", id, method);
                Err(RpcError::Timeout {
                    method: method.to_string(),
                    timeout_ms: duration_ms(timeout),
                })
            }
        }
    }

    /// 订阅通知主题
    ///
    /// # Panics
    ///
    /// 同一主题重复订阅时 panic，见 [`NotificationDispatcher::subscribe`]。
    pub fn subscribe(&self, method: &str) -> Result<mpsc::Receiver<Notification>, RpcError> {
        self.dispatcher.subscribe(method)
    }

    /// 订阅通知主题，重复订阅返回错误而不是 panic
    pub fn try_subscribe(&self, method: &str) -> Result<mpsc::Receiver<Notification>, RpcError> {
        self.dispatcher.try_subscribe(method)
    }

    /// 取消订阅
    pub fn unsubscribe(&self, method: &str) {
        self.dispatcher.unsubscribe(method);
    }

    /// 通知分发器
    pub fn dispatcher(&self) -> Arc<NotificationDispatcher> {
        self.dispatcher.clone()
    }

    /// 当前默认调用超时
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms.load(Ordering::Relaxed))
    }

    /// 调整默认调用超时，对之后发起的调用生效
    pub fn set_call_timeout(&self, timeout: Duration) {
        self.call_timeout_ms
            .store(duration_ms(timeout), Ordering::Relaxed);
    }

    /// 等待中的调用数量
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// 连接是否已关闭
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 关闭连接
    ///
    /// 停止写循环（先写完已入队的请求）并关闭底层连接。
    /// 每个后台任务最多等待 `io_timeout`，超时后直接中止，
    /// 因此对端停止读取时关闭也不会卡住。
    /// 等待中的调用不会被主动结束，它们在各自的超时后返回。
    ///
    /// 所有任务都会被等待，之后返回遇到的第一个任务错误。
    /// 重复调用返回 `Ok(())`。
    pub async fn close(&self) -> Result<(), RpcError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.shutdown.cancel();
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let mut first_error = None;
        for mut task in tasks {
            match tokio::time::timeout(self.io_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_error
                        .get_or_insert(RpcError::Transport(format!("后台任务异常退出: {}", e)));
                }
                Err(_) => {
                    self.logger.error(&format!(
                        "后台任务未在 {}ms 内退出，已中止",
                        duration_ms(self.io_timeout)
                    ));
                    task.abort();
                }
            }
        }

        self.logger.info("连接已关闭");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ============ 读写循环 ============

async fn writer_loop<W>(
    mut sink: W,
    mut queue: mpsc::Receiver<String>,
    logger: Arc<dyn RpcLogger>,
    shutdown: CancellationToken,
    io_timeout: Duration,
) where
    W: Sink<Message, Error = WsError> + Unpin,
{
    loop {
        tokio::select! {
            frame = queue.recv() => match frame {
                Some(frame) => write_frame(&mut sink, frame, logger.as_ref()).await,
                None => break,
            },
            _ = shutdown.cancelled() => {
                // 不再接受新请求，在 io_timeout 内写完已入队的
                queue.close();
                let drain = async {
                    while let Some(frame) = queue.recv().await {
                        write_frame(&mut sink, frame, logger.as_ref()).await;
                    }
                };
                if tokio::time::timeout(io_timeout, drain).await.is_err() {
                    logger.error(&format!(
                        "写完剩余请求超时 ({}ms)，其余请求被丢弃",
                        duration_ms(io_timeout)
                    ));
                }
                break;
            }
        }
    }

    match tokio::time::timeout(io_timeout, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!("关闭写端失败: {}", e),
        Err(_) => tracing::debug!("关闭写端超时"),
    }
}

async fn write_frame<W>(sink: &mut W, frame: String, logger: &dyn RpcLogger)
where
    W: Sink<Message, Error = WsError> + Unpin,
{
    if let Err(e) = sink.send(Message::text(frame)).await {
        logger.error(&format!("写入请求失败: {}", e));
    }
}

async fn reader_loop<R>(
    mut stream: R,
    pending: Arc<PendingCalls>,
    dispatcher: Arc<NotificationDispatcher>,
    logger: Arc<dyn RpcLogger>,
    shutdown: CancellationToken,
) where
    R: Stream<Item = Result<Message, WsError>> + Unpin,
{
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            message = stream.next() => message,
        };

        let inbound = match message {
            Some(Ok(Message::Text(text))) => decode_envelope(text.as_bytes()),
            Some(Ok(Message::Binary(data))) => decode_envelope(&data),
            Some(Ok(Message::Close(frame))) => {
                logger.info(&format!("远端关闭连接: {:?}", frame));
                break;
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                logger.error(&format!("读取响应失败: {}", e));
                break;
            }
            None => {
                logger.info("连接已断开");
                break;
            }
        };

        match inbound {
            Ok(Inbound::Response(response)) => {
                let id = response.id;
                if !pending.resolve(response) {
                    tracing::debug!("丢弃无人等待的响应: id={:?}", id);
                }
            }
            Ok(Inbound::Notification(notification)) => {
                dispatcher.dispatch(notification);
            }
            Err(e) => {
                logger.error(&format!("解码响应失败: {}", e));
                break;
            }
        }
    }

    // 入站流结束，通知订阅者
    dispatcher.shutdown();
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
