//! 错误类型定义模块
//!
//! 定义 ObjectId 解析错误 OidError 与配置加载错误 ConfigError。

use thiserror::Error;

/// ObjectId 十六进制字符串解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OidError {
    /// 字符串长度不是 24
    #[error("Invalid ObjectId length: expected 24 hex characters, got {0}")]
    InvalidLength(usize),

    /// 出现非十六进制字符
    #[error("Invalid hex digit {ch:?} at index {index}")]
    InvalidHexDigit { ch: char, index: usize },
}

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML 解析错误
    #[error("Config parse error: {0}")]
    Parse(String),
}

/// 配置 Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
