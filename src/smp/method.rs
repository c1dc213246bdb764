//! 方法路径
//!
//! 服务端的方法名和通知主题都形如 `minecraft:<root>/<seg>/...`。

use std::fmt;

const NAMESPACE: &str = "minecraft:";

/// 方法路径构建器
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodPath(String);

impl MethodPath {
    /// 以根段创建路径，如 `MethodPath::new("players")` -> `minecraft:players`
    pub fn new(root: &str) -> Self {
        let mut path = String::with_capacity(NAMESPACE.len() + root.len() + 16);
        path.push_str(NAMESPACE);
        path.push_str(root);
        Self(path)
    }

    /// 通知主题的根路径 `minecraft:notification`
    pub fn notification() -> Self {
        Self::new("notification")
    }

    /// 追加一段路径，空段被忽略
    pub fn add(mut self, segment: &str) -> Self {
        if !segment.is_empty() {
            self.0.push('/');
            self.0.push_str(segment);
        }
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MethodPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MethodPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<MethodPath> for String {
    fn from(path: MethodPath) -> Self {
        path.0
    }
}
