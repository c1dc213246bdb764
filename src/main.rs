//! mcsmp-cli 入口点
//!
//! 连接 Minecraft 服务器管理端点，打印服务器状态，然后持续输出玩家进出事件，
//! 直到收到 Ctrl-C。
//!
//! 配置从环境变量读取：
//! - `MCSMP_HOST`：主机名，默认 `localhost`
//! - `MCSMP_PORT`：端口，默认 `25585`
//! - `MCSMP_TOKEN`：认证令牌（必填）
//! - `MCSMP_PATH`：WebSocket 路径，默认 `/`
//! - `MCSMP_TLS`：`1` / `true` 时使用 wss

use std::env;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcsmp_client::smp::{ClientOptions, SmpClient};

const DEFAULT_PORT: u16 = 25585;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统，输出到 stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("mcsmp-cli 启动");

    let host = env::var("MCSMP_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = match env::var("MCSMP_PORT") {
        Ok(port) => port
            .parse::<u16>()
            .with_context(|| format!("无效的端口: {}", port))?,
        Err(_) => DEFAULT_PORT,
    };
    let token = env::var("MCSMP_TOKEN").context("缺少环境变量 MCSMP_TOKEN")?;
    let tls = env::var("MCSMP_TLS")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let options = ClientOptions::default()
        .with_path(&env::var("MCSMP_PATH").unwrap_or_default())
        .with_tls(tls);

    let client = SmpClient::connect(&host, port, &token, options).await?;

    let status = client.server_status().await?;
    tracing::info!(
        "服务器 {} (协议 {}), 已启动: {}, 在线玩家: {}",
        status.version.name,
        status.version.protocol,
        status.started,
        status.players.len()
    );

    let cancel = CancellationToken::new();
    let mut joined = client.players_joined(cancel.clone())?;
    let mut left = client.players_left(cancel.clone())?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("收到中断信号");
                break;
            }
            player = joined.recv() => match player {
                Some(player) => tracing::info!("玩家加入: {}", player.name),
                None => break,
            },
            player = left.recv() => match player {
                Some(player) => tracing::info!("玩家离开: {}", player.name),
                None => break,
            },
        }
    }

    cancel.cancel();
    client.close().await?;
    tracing::info!("mcsmp-cli 退出");

    Ok(())
}
