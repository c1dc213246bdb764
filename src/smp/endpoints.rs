//! 类型化的管理方法
//!
//! 每个方法对应一次调用加一次结果解码。
//! 列表类方法（设置、添加、移除、清空）返回服务端更新后的完整列表。

use std::net::IpAddr;

use super::client::SmpClient;
use super::method::MethodPath;
use super::types::{
    is_online, GameRule, IncomingIpBan, IpBan, KickPlayer, Operator, Player, ServerState,
    SystemMessage, UserBan,
};
use crate::utils::error::RpcError;

// ============ 玩家 ============

impl SmpClient {
    /// 获取在线玩家
    pub async fn players(&self) -> Result<Vec<Player>, RpcError> {
        self.invoke(MethodPath::new("players"), ()).await
    }

    /// 踢出玩家，返回踢出后的在线玩家
    ///
    /// 只踢当前在线的玩家。踢出调用本身的错误被忽略：
    /// 玩家恰好同时下线时服务端会报 "Already retired"，结果以重新获取的列表为准。
    pub async fn kick_players(&self, kicks: &[KickPlayer]) -> Result<Vec<Player>, RpcError> {
        let online = self.players().await?;

        let to_kick: Vec<&KickPlayer> = kicks
            .iter()
            .filter(|k| is_online(&online, &k.player.name))
            .collect();
        if to_kick.is_empty() {
            return Ok(online);
        }

        let kicked: Result<serde_json::Value, RpcError> = self
            .invoke(MethodPath::new("players").add("kick"), (&to_kick,))
            .await;
        if let Err(e) = kicked {
            tracing::debug!("踢出玩家返回错误，已忽略: {}", e);
        }

        self.players().await
    }
}

// ============ 服务器 ============

impl SmpClient {
    /// 获取服务器状态
    pub async fn server_status(&self) -> Result<ServerState, RpcError> {
        self.invoke(MethodPath::new("server").add("status"), ()).await
    }

    /// 保存世界
    pub async fn save(&self, flush: bool) -> Result<bool, RpcError> {
        self.invoke(MethodPath::new("server").add("save"), (flush,))
            .await
    }

    /// 停止服务器
    pub async fn stop(&self) -> Result<bool, RpcError> {
        self.invoke(MethodPath::new("server").add("stop"), ()).await
    }

    /// 发送系统消息
    pub async fn system_message(&self, message: &SystemMessage) -> Result<bool, RpcError> {
        self.invoke(MethodPath::new("server").add("system_message"), (message,))
            .await
    }
}

// ============ 白名单 ============

impl SmpClient {
    pub async fn allowlist(&self) -> Result<Vec<Player>, RpcError> {
        self.invoke(MethodPath::new("allowlist"), ()).await
    }

    /// 用给定玩家替换白名单，每个玩家都必须带 UUID
    pub async fn allowlist_set(&self, players: &[Player]) -> Result<Vec<Player>, RpcError> {
        if let Some(player) = players.iter().find(|p| p.id.is_none()) {
            return Err(RpcError::InvalidArgument(format!(
                "玩家 '{}' 必须带有 UUID",
                player.name
            )));
        }
        self.invoke(MethodPath::new("allowlist").add("set"), (players,))
            .await
    }

    pub async fn allowlist_add(&self, players: &[Player]) -> Result<Vec<Player>, RpcError> {
        self.invoke(MethodPath::new("allowlist").add("add"), (players,))
            .await
    }

    pub async fn allowlist_remove(&self, players: &[Player]) -> Result<Vec<Player>, RpcError> {
        self.invoke(MethodPath::new("allowlist").add("remove"), (players,))
            .await
    }

    pub async fn allowlist_clear(&self) -> Result<Vec<Player>, RpcError> {
        self.invoke(MethodPath::new("allowlist").add("clear"), ()).await
    }
}

// ============ 封禁 ============

impl SmpClient {
    pub async fn bans(&self) -> Result<Vec<UserBan>, RpcError> {
        self.invoke(MethodPath::new("bans"), ()).await
    }

    pub async fn bans_set(&self, bans: &[UserBan]) -> Result<Vec<UserBan>, RpcError> {
        self.invoke(MethodPath::new("bans").add("set"), (bans,)).await
    }

    pub async fn bans_add(&self, bans: &[UserBan]) -> Result<Vec<UserBan>, RpcError> {
        self.invoke(MethodPath::new("bans").add("add"), (bans,)).await
    }

    pub async fn bans_remove(&self, players: &[Player]) -> Result<Vec<UserBan>, RpcError> {
        self.invoke(MethodPath::new("bans").add("remove"), (players,))
            .await
    }

    pub async fn bans_clear(&self) -> Result<Vec<UserBan>, RpcError> {
        self.invoke(MethodPath::new("bans").add("clear"), ()).await
    }
}

// ============ IP 封禁 ============

impl SmpClient {
    pub async fn ip_bans(&self) -> Result<Vec<IpBan>, RpcError> {
        self.invoke(MethodPath::new("ip_bans"), ()).await
    }

    pub async fn ip_bans_set(&self, bans: &[IpBan]) -> Result<Vec<IpBan>, RpcError> {
        self.invoke(MethodPath::new("ip_bans").add("set"), (bans,))
            .await
    }

    pub async fn ip_bans_add(&self, bans: &[IncomingIpBan]) -> Result<Vec<IpBan>, RpcError> {
        self.invoke(MethodPath::new("ip_bans").add("add"), (bans,))
            .await
    }

    /// 按 IP 解除封禁
    pub async fn ip_bans_remove(&self, ips: &[IpAddr]) -> Result<Vec<IpBan>, RpcError> {
        let ips: Vec<String> = ips.iter().map(IpAddr::to_string).collect();
        self.invoke(MethodPath::new("ip_bans").add("remove"), (ips,))
            .await
    }

    pub async fn ip_bans_clear(&self) -> Result<Vec<IpBan>, RpcError> {
        self.invoke(MethodPath::new("ip_bans").add("clear"), ()).await
    }
}

// ============ 管理员 ============

impl SmpClient {
    pub async fn operators(&self) -> Result<Vec<Operator>, RpcError> {
        self.invoke(MethodPath::new("operators"), ()).await
    }

    pub async fn operators_set(&self, operators: &[Operator]) -> Result<Vec<Operator>, RpcError> {
        self.invoke(MethodPath::new("operators").add("set"), (operators,))
            .await
    }

    pub async fn operators_add(&self, operators: &[Operator]) -> Result<Vec<Operator>, RpcError> {
        self.invoke(MethodPath::new("operators").add("add"), (operators,))
            .await
    }

    pub async fn operators_remove(&self, players: &[Player]) -> Result<Vec<Operator>, RpcError> {
        self.invoke(MethodPath::new("operators").add("remove"), (players,))
            .await
    }

    pub async fn operators_clear(&self) -> Result<Vec<Operator>, RpcError> {
        self.invoke(MethodPath::new("operators").add("clear"), ()).await
    }
}

// ============ 游戏规则 ============

impl SmpClient {
    /// 获取全部游戏规则及当前值
    pub async fn gamerules(&self) -> Result<Vec<GameRule>, RpcError> {
        self.invoke(MethodPath::new("gamerules"), ()).await
    }

    /// 更新游戏规则，返回带类型的新值
    ///
    /// 服务端只接受不带类型标注的规则，类型在发送前被去掉。
    pub async fn gamerule_update(&self, rule: GameRule) -> Result<GameRule, RpcError> {
        let rule = rule.untyped();
        self.invoke(MethodPath::new("gamerules").add("update"), (rule,))
            .await
    }
}
