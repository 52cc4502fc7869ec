//! 命名空间作用域
//!
//! 引用名称可以带有 `java:comp`、`java:module`、`java:app`、`java:global`
//! 作用域前缀，不带前缀的名称隐含位于 `java:comp/env` 下。

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// 组件环境前缀，归一化时剥离
pub const COMP_ENV_PREFIX: &str = "java:comp/env/";

/// `java:` 命名方案
pub const JAVA_SCHEME: &str = "java:";

/// 命名空间作用域
///
/// 声明顺序即匹配顺序，`Comp` 最具体。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceScope {
    /// 组件作用域
    Comp,
    /// 模块作用域
    Module,
    /// 应用作用域
    App,
    /// 全局作用域
    Global,
}

impl NamespaceScope {
    /// 所有作用域，按匹配顺序排列
    pub const ALL: [Self; 4] = [Self::Comp, Self::Module, Self::App, Self::Global];

    /// 上下文短名称，例如 `global`
    pub const fn context_name(self) -> &'static str {
        match self {
            Self::Comp => "comp",
            Self::Module => "module",
            Self::App => "app",
            Self::Global => "global",
        }
    }

    /// 限定名称，例如 `java:global`
    pub const fn qualified_name(self) -> &'static str {
        match self {
            Self::Comp => "java:comp",
            Self::Module => "java:module",
            Self::App => "java:app",
            Self::Global => "java:global",
        }
    }

    /// 带结尾斜杠的完整前缀，例如 `java:global/`
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Comp => "java:comp/",
            Self::Module => "java:module/",
            Self::App => "java:app/",
            Self::Global => "java:global/",
        }
    }

    /// 按声明顺序返回第一个前缀匹配的作用域
    pub fn match_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|scope| name.starts_with(scope.prefix()))
    }

    /// 去掉作用域前缀后的相对名称
    pub fn relative_name(self, name: &str) -> Option<&str> {
        name.strip_prefix(self.prefix())
    }

    /// 是否为 `java:` 限定名称
    pub fn is_qualified(name: &str) -> bool {
        name.starts_with(JAVA_SCHEME)
    }

    /// 归一化引用名称
    ///
    /// 只剥离字面量 `java:comp/env/` 前缀，重复出现时全部剥离，
    /// 保证归一化结果不再带有该前缀。
    pub fn normalize(name: &str) -> &str {
        let mut normalized = name;
        while let Some(rest) = normalized.strip_prefix(COMP_ENV_PREFIX) {
            normalized = rest;
        }
        normalized
    }

    /// 反归一化引用名称，用于展示
    ///
    /// 已经以 `java:` 开头的名称保持不变。
    pub fn denormalize(name: &str) -> Cow<'_, str> {
        if Self::is_qualified(name) {
            Cow::Borrowed(name)
        } else {
            Cow::Owned(format!("{COMP_ENV_PREFIX}{name}"))
        }
    }
}

impl fmt::Display for NamespaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qualified_name())
    }
}
