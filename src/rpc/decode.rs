//! 类型化解码
//!
//! 把响应的 result 或通知的 params 解码为调用方指定的类型。
//! 解码要么完整成功，要么返回错误，不会产生部分填充的结果。

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{Notification, RpcResponse};
use crate::utils::error::RpcError;

/// 解码响应的 result
///
/// - 响应携带错误时返回 [`RpcError::Protocol`]
/// - result 缺失时返回 [`RpcError::ResultEmpty`]
/// - 类型不匹配时返回 [`RpcError::Decode`]
pub fn decode_result<T: DeserializeOwned>(response: &RpcResponse) -> Result<T, RpcError> {
    response.err()?;

    let result = response.result.as_ref().ok_or(RpcError::ResultEmpty)?;
    from_payload(result, "result")
}

/// 解码通知的唯一参数
///
/// - 通知携带错误时返回 [`RpcError::Protocol`]
/// - 参数个数不是 1 时返回 [`RpcError::ParamsCount`]
/// - 类型不匹配时返回 [`RpcError::Decode`]
pub fn decode_params<T: DeserializeOwned>(notification: &Notification) -> Result<T, RpcError> {
    notification.err()?;

    let params = notification.params.as_deref().unwrap_or_default();
    if params.len() != 1 {
        return Err(RpcError::ParamsCount {
            expected: 1,
            actual: params.len(),
        });
    }

    from_payload(&params[0], "params")
}

/// 把通知的整个参数数组解码为目标类型
///
/// 通知携带错误时返回 [`RpcError::Protocol`]，参数为空时返回 [`RpcError::ParamsEmpty`]。
pub fn decode_params_into<T: DeserializeOwned>(
    notification: &Notification,
) -> Result<T, RpcError> {
    notification.err()?;

    match notification.params.as_deref() {
        Some(params) if !params.is_empty() => {
            T::deserialize(Value::Array(params.to_vec()))
                .map_err(|e| RpcError::decode_failed("params", e))
        }
        _ => Err(RpcError::ParamsEmpty),
    }
}

fn from_payload<T: DeserializeOwned>(payload: &Value, what: &str) -> Result<T, RpcError> {
    T::deserialize(payload).map_err(|e| RpcError::decode_failed(what, e))
}
