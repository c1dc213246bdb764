//! 管理协议数据类型
//!
//! 字段名与服务端的 JSON 保持一致（camelCase）。
//! 封禁记录的过期时间以服务端使用的文本格式 `Mon Jan  2 15:04:05 2006`（UTC）传输。

use std::net::IpAddr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::utils::error::RpcError;

// ============ 玩家 ============

/// 玩家
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Player {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl Player {
    /// 按名字创建玩家，UUID 留空
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// 构造踢出请求
    pub fn kick(&self, message: Message) -> KickPlayer {
        KickPlayer::new(self.name.clone(), message)
    }

    /// 构造只发给该玩家的系统消息
    pub fn system_message(&self, message: Message, overlay: bool) -> SystemMessage {
        SystemMessage {
            receiving_players: vec![self.clone()],
            overlay,
            message,
        }
    }
}

/// 管理员
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub permission_level: i32,
    pub bypasses_player_limit: bool,
    pub player: Player,
}

impl Operator {
    pub fn new(player: Player, permission_level: i32, bypasses_player_limit: bool) -> Self {
        Self {
            permission_level,
            bypasses_player_limit,
            player,
        }
    }
}

// ============ 游戏规则 ============

/// 游戏规则的值类型
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameRuleType {
    /// 未标注类型（更新请求使用）
    #[default]
    Untyped,
    Integer,
    Boolean,
    /// 服务端返回的其他类型
    Other(String),
}

impl GameRuleType {
    pub fn is_untyped(&self) -> bool {
        matches!(self, Self::Untyped)
    }
}

impl From<String> for GameRuleType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "" => Self::Untyped,
            "integer" => Self::Integer,
            "boolean" => Self::Boolean,
            _ => Self::Other(value),
        }
    }
}

impl From<GameRuleType> for String {
    fn from(value: GameRuleType) -> Self {
        match value {
            GameRuleType::Untyped => String::new(),
            GameRuleType::Integer => "integer".to_string(),
            GameRuleType::Boolean => "boolean".to_string(),
            GameRuleType::Other(other) => other,
        }
    }
}

/// 游戏规则
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRule {
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "GameRuleType::is_untyped"
    )]
    pub rule_type: GameRuleType,
    pub value: String,
    pub key: String,
}

impl GameRule {
    pub fn new(key: impl Into<String>, value: impl Into<String>, rule_type: GameRuleType) -> Self {
        Self {
            rule_type,
            value: value.into(),
            key: key.into(),
        }
    }

    pub fn boolean(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, value.to_string(), GameRuleType::Boolean)
    }

    pub fn integer(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, value.to_string(), GameRuleType::Integer)
    }

    /// 去掉类型标注
    pub fn untyped(mut self) -> Self {
        self.rule_type = GameRuleType::Untyped;
        self
    }

    pub fn is_untyped(&self) -> bool {
        self.rule_type.is_untyped()
    }

    /// 读取布尔值，类型不是 boolean 时返回错误
    pub fn as_bool(&self) -> Result<bool, RpcError> {
        if self.rule_type != GameRuleType::Boolean {
            return Err(RpcError::InvalidArgument(format!(
                "游戏规则 {} 不是布尔类型",
                self.key
            )));
        }
        Ok(self.value == "true")
    }

    /// 读取整数值，类型不是 integer 或值无法解析时返回错误
    pub fn as_integer(&self) -> Result<i64, RpcError> {
        if self.rule_type != GameRuleType::Integer {
            return Err(RpcError::InvalidArgument(format!(
                "游戏规则 {} 不是整数类型",
                self.key
            )));
        }
        self.value.parse().map_err(|e| {
            RpcError::InvalidArgument(format!("游戏规则 {} 的值无效: {}", self.key, e))
        })
    }
}

// ============ 消息 ============

/// 可翻译的文本消息
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub translatable: String,
    #[serde(default)]
    pub translatable_params: Vec<String>,
    #[serde(default)]
    pub literal: String,
}

impl Message {
    pub fn new(
        literal: impl Into<String>,
        translatable: impl Into<String>,
        params: Vec<String>,
    ) -> Self {
        Self {
            translatable: translatable.into(),
            translatable_params: params,
            literal: literal.into(),
        }
    }

    /// 纯文本消息
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            literal: text.into(),
            ..Default::default()
        }
    }
}

/// 踢出请求
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KickPlayer {
    pub player: Player,
    pub message: Message,
}

impl KickPlayer {
    pub fn new(name: impl Into<String>, message: Message) -> Self {
        Self {
            player: Player::new(name),
            message,
        }
    }
}

/// 系统消息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SystemMessage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub receiving_players: Vec<Player>,
    pub overlay: bool,
    pub message: Message,
}

// ============ 封禁 ============

/// 过期时间的文本格式（对应 `Mon Jan  2 15:04:05 2006`）
pub const EXPIRES_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// 把过期时间格式化为服务端格式
pub fn format_expires(at: DateTime<Utc>) -> String {
    at.format(EXPIRES_FORMAT).to_string()
}

/// 解析服务端格式的过期时间，无法解析时返回 None
pub fn parse_expires(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), EXPIRES_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn future_expires(expires: DateTime<Utc>) -> Result<String, RpcError> {
    if expires < Utc::now() {
        return Err(RpcError::InvalidArgument(format!(
            "过期时间已过: {}",
            format_expires(expires)
        )));
    }
    Ok(format_expires(expires))
}

/// 带过期时间的封禁记录
pub trait Expiring {
    /// 服务端格式的过期时间文本
    fn expires(&self) -> &str;

    /// 过期时间，无法解析时返回 None
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        parse_expires(self.expires())
    }

    /// 过期时间有效且已过
    fn is_expired(&self) -> bool {
        self.expires_at().is_some_and(|at| Utc::now() > at)
    }
}

/// 玩家封禁记录
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserBan {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub expires: String,
    #[serde(default)]
    pub source: String,
    pub player: Player,
}

impl UserBan {
    /// 创建封禁，过期时间早于当前时间时返回错误
    pub fn new(
        player: Player,
        expires: DateTime<Utc>,
        reason: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, RpcError> {
        Ok(Self {
            reason: reason.into(),
            expires: future_expires(expires)?,
            source: source.into(),
            player,
        })
    }
}

impl Expiring for UserBan {
    fn expires(&self) -> &str {
        &self.expires
    }
}

/// IP 封禁记录
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpBan {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub expires: String,
    pub ip: String,
    #[serde(default)]
    pub source: String,
}

impl IpBan {
    pub fn new(
        ip: IpAddr,
        expires: DateTime<Utc>,
        reason: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, RpcError> {
        Ok(Self {
            reason: reason.into(),
            expires: future_expires(expires)?,
            ip: ip.to_string(),
            source: source.into(),
        })
    }

    /// 解析 IP 地址
    pub fn addr(&self) -> Result<IpAddr, RpcError> {
        parse_ip(&self.ip)
    }
}

impl Expiring for IpBan {
    fn expires(&self) -> &str {
        &self.expires
    }
}

/// 新增 IP 封禁的请求，可以附带关联玩家
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncomingIpBan {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub expires: String,
    pub ip: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub player: Player,
}

impl IncomingIpBan {
    pub fn new(
        ip: IpAddr,
        player: Player,
        expires: DateTime<Utc>,
        reason: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, RpcError> {
        Ok(Self {
            reason: reason.into(),
            expires: future_expires(expires)?,
            ip: ip.to_string(),
            source: source.into(),
            player,
        })
    }

    pub fn addr(&self) -> Result<IpAddr, RpcError> {
        parse_ip(&self.ip)
    }
}

impl Expiring for IncomingIpBan {
    fn expires(&self) -> &str {
        &self.expires
    }
}

fn parse_ip(ip: &str) -> Result<IpAddr, RpcError> {
    ip.parse()
        .map_err(|e| RpcError::InvalidArgument(format!("无效的封禁 IP {}: {}", ip, e)))
}

// ============ 服务器状态 ============

/// 服务端版本
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Version {
    pub protocol: i32,
    pub name: String,
}

impl Version {
    /// 解析 `major.minor.patch` 形式的版本名
    pub fn version_numbers(&self) -> Option<(u32, u32, u32)> {
        let mut parts = self.name.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some((major, minor, patch))
    }
}

/// 服务器状态
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerState {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub players: Vec<Player>,
    pub started: bool,
    #[serde(default)]
    pub version: Version,
}

impl ServerState {
    /// 指定名字的玩家是否在线
    pub fn is_online(&self, name: &str) -> bool {
        is_online(&self.players, name)
    }
}

/// 在玩家列表中按名字查找
pub fn is_online(players: &[Player], name: &str) -> bool {
    players.iter().any(|p| p.name == name)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    #[test]
    fn test_player_id_omitted_when_absent() {
        let player = Player::new("Steve");
        assert_eq!(serde_json::to_value(&player).unwrap(), json!({"name": "Steve"}));

        let id = Uuid::parse_str("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap();
        let player = player.with_id(id);
        assert_eq!(
            serde_json::to_value(&player).unwrap(),
            json!({"name": "Steve", "id": "069a79f4-44e9-4726-a5be-fca90e38aaf5"})
        );
    }

    #[test]
    fn test_operator_wire_names() {
        let op = Operator::new(Player::new("Alex"), 4, true);
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({"permissionLevel": 4, "bypassesPlayerLimit": true, "player": {"name": "Alex"}})
        );
    }

    #[test]
    fn test_gamerule_accessors() {
        let rule: GameRule =
            serde_json::from_value(json!({"type": "boolean", "value": "true", "key": "doDaylightCycle"}))
                .unwrap();
        assert!(rule.as_bool().unwrap());
        assert!(rule.as_integer().is_err());

        let rule = GameRule::integer("randomTickSpeed", 3);
        assert_eq!(rule.as_integer().unwrap(), 3);
        assert!(rule.as_bool().is_err());

        let broken = GameRule::new("randomTickSpeed", "fast", GameRuleType::Integer);
        assert!(matches!(broken.as_integer(), Err(RpcError::InvalidArgument(_))));
    }

    #[test]
    fn test_untyped_gamerule_omits_type() {
        let rule = GameRule::boolean("keepInventory", false).untyped();
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({"value": "false", "key": "keepInventory"})
        );

        let other: GameRule =
            serde_json::from_value(json!({"type": "float", "value": "0.5", "key": "x"})).unwrap();
        assert_eq!(other.rule_type, GameRuleType::Other("float".to_string()));
    }

    #[test]
    fn test_message_wire_names() {
        let msg = Message::new("hi", "chat.type", vec!["a".to_string()]);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"translatable": "chat.type", "translatableParams": ["a"], "literal": "hi"})
        );
    }

    #[test]
    fn test_system_message_for_player() {
        let msg = Player::new("Steve").system_message(Message::literal("hello"), true);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["receivingPlayers"], json!([{"name": "Steve"}]));
        assert_eq!(value["overlay"], json!(true));
    }

    #[test]
    fn test_expires_format() {
        let at = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(format_expires(at), "Mon Jan  2 15:04:05 2006");
        assert_eq!(parse_expires("Mon Jan  2 15:04:05 2006"), Some(at));
        assert_eq!(parse_expires("forever"), None);
    }

    #[test]
    fn test_ban_rejects_past_expiry() {
        let past = Utc::now() - Duration::hours(1);
        assert!(UserBan::new(Player::new("Steve"), past, "grief", "admin").is_err());
        assert!(IpBan::new("10.0.0.1".parse().unwrap(), past, "spam", "admin").is_err());
    }

    #[test]
    fn test_ban_expiry_helpers() {
        let future = Utc::now() + Duration::days(1);
        let ban = IpBan::new("10.0.0.1".parse().unwrap(), future, "spam", "admin").unwrap();
        assert!(!ban.is_expired());
        assert!(ban.expires_at().is_some());
        assert_eq!(ban.addr().unwrap().to_string(), "10.0.0.1");

        let old = UserBan {
            expires: "Mon Jan  2 15:04:05 2006".to_string(),
            player: Player::new("Steve"),
            ..Default::default()
        };
        assert!(old.is_expired());

        // 无法解析的过期时间视为未过期
        let forever = UserBan {
            expires: "forever".to_string(),
            ..Default::default()
        };
        assert!(!forever.is_expired());
    }

    #[test]
    fn test_incoming_ip_ban_invalid_ip() {
        let ban = IncomingIpBan {
            ip: "not-an-ip".to_string(),
            ..Default::default()
        };
        assert!(ban.addr().is_err());
    }

    #[test]
    fn test_version_numbers() {
        let v = Version {
            protocol: 770,
            name: "1.21.9".to_string(),
        };
        assert_eq!(v.version_numbers(), Some((1, 21, 9)));

        for name in ["1.21", "1.21.9.1", "1.x.9", ""] {
            let v = Version {
                protocol: 0,
                name: name.to_string(),
            };
            assert_eq!(v.version_numbers(), None, "{}", name);
        }
    }

    #[test]
    fn test_server_state_null_players() {
        let state: ServerState = serde_json::from_value(json!({
            "players": null,
            "started": true,
            "version": {"protocol": 770, "name": "1.21.9"}
        }))
        .unwrap();
        assert!(state.players.is_empty());
        assert!(state.started);

        let state: ServerState = serde_json::from_value(json!({
            "players": [{"name": "Steve"}],
            "started": true
        }))
        .unwrap();
        assert!(state.is_online("Steve"));
        assert!(!state.is_online("Alex"));
    }
}
