//! RPC 数据类型定义
//!
//! 定义请求、响应和通知的线上信封结构，以及信封的编码与解码。
//!
//! 线上格式：
//! - 请求 `{id, method, params?}`
//! - 响应 `{id, method, params?, result?, error?}`
//! - `id` 为 0 或缺失的消息一律视为通知

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::utils::error::RpcError;

// ============ 出站信封 ============

/// RPC 请求
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
}

impl RpcRequest {
    /// 创建新请求
    ///
    /// `params` 必须编码为 JSON 数组（元组、`Vec` 等）；
    /// `()` 或 `null` 表示不带参数。
    pub fn new<P: Serialize>(id: u64, method: impl Into<String>, params: P) -> Result<Self, RpcError> {
        let method = method.into();
        let value = serde_json::to_value(params)
            .map_err(|e| RpcError::Encode(format!("{}: {}", method, e)))?;

        let params = match value {
            Value::Null => None,
            Value::Array(items) if items.is_empty() => None,
            Value::Array(items) => Some(items),
            other => {
                return Err(RpcError::Encode(format!(
                    "{}: 参数必须是位置数组, 实际为 {}",
                    method,
                    json_kind(&other)
                )));
            }
        };

        Ok(Self { id, method, params })
    }
}

/// 编码请求为文本帧
pub fn encode_request(request: &RpcRequest) -> Result<String, RpcError> {
    serde_json::to_string(request).map_err(|e| RpcError::Encode(e.to_string()))
}

// ============ 入站信封 ============

/// RPC 响应（也是通知在线上的原始形态）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
    /// `"result": null` 保留为 `Some(Value::Null)`，与缺失区分
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl RpcResponse {
    /// 创建成功响应
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            ..Self::default()
        }
    }

    /// 创建错误响应
    pub fn failure(id: u64, error: Value) -> Self {
        Self {
            id: Some(id),
            error: Some(error),
            ..Self::default()
        }
    }

    /// 远端错误（如果有）
    pub fn err(&self) -> Result<(), RpcError> {
        match &self.error {
            Some(error) => Err(RpcError::Protocol(error.clone())),
            None => Ok(()),
        }
    }
}

/// 服务端推送的通知
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Notification {
    /// 创建新通知
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params: Some(params),
            error: None,
        }
    }

    /// 远端错误（如果有）
    pub fn err(&self) -> Result<(), RpcError> {
        match &self.error {
            Some(error) => Err(RpcError::Protocol(error.clone())),
            None => Ok(()),
        }
    }
}

/// 入站消息分类结果
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// 对某个请求的响应（id 非零）
    Response(RpcResponse),
    /// 服务端推送（id 为 0 或缺失）
    Notification(Notification),
}

/// 解码入站帧并分类
pub fn decode_envelope(frame: &[u8]) -> Result<Inbound, RpcError> {
    let envelope: RpcResponse =
        serde_json::from_slice(frame).map_err(|e| RpcError::decode_failed("入站帧", e))?;

    match envelope.id {
        Some(id) if id != 0 => Ok(Inbound::Response(envelope)),
        _ => Ok(Inbound::Notification(Notification {
            method: envelope.method,
            params: envelope.params,
            error: envelope.error,
        })),
    }
}

// ============ JSON-RPC 错误对象 ============

/// JSON-RPC 错误
///
/// 远端错误载荷的常见形态，通过 [`RpcError::remote_error`] 获取。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ============ 内部辅助 ============

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}


/// Property-based tests for the envelope codec
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // Strategy for generating JSON leaf values
    fn leaf_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-zA-Z0-9 _:/-]{0,30}".prop_map(Value::String),
        ]
    }

    // Strategy for generating nested JSON values
    fn value_strategy() -> impl Strategy<Value = Value> {
        leaf_strategy().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::hash_map("[a-z]{1,8}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    // Strategy for generating method names
    fn method_strategy() -> impl Strategy<Value = String> {
        "minecraft:[a-z_]{1,12}(/[a-z_]{1,12}){0,2}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// 编码后的请求再解码，方法名与参数顺序保持不变
        #[test]
        fn prop_request_preserves_method_and_params(
            id in 1u64..u64::MAX,
            method in method_strategy(),
            params in prop::collection::vec(value_strategy(), 1..6),
        ) {
            let req = RpcRequest::new(id, method.clone(), params.clone()).unwrap();
            let frame = encode_request(&req).unwrap();
            let decoded: RpcRequest = serde_json::from_str(&frame).unwrap();

            prop_assert_eq!(decoded.id, id);
            prop_assert_eq!(decoded.method, method);
            prop_assert_eq!(decoded.params, Some(params));
        }

        /// 任意非零 id 的信封都被分类为响应
        #[test]
        fn prop_nonzero_id_classifies_as_response(
            id in 1u64..u64::MAX,
            result in value_strategy(),
        ) {
            let frame = serde_json::to_vec(&RpcResponse::success(id, result)).unwrap();
            let inbound = decode_envelope(&frame).unwrap();
            prop_assert!(matches!(inbound, Inbound::Response(r) if r.id == Some(id)));
        }
    }
}
