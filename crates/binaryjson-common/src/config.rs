//! 编解码配置模块
//!
//! 解码器的资源限制与宽松度开关，支持从 TOML 文件加载:
//!
//! ```toml
//! max_depth = 64
//! max_document_size = 1048576
//! strict_array_keys = false
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_MAX_DEPTH: usize = 200;
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// 编解码配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// 最大嵌套深度 (默认: 200)，顶层文档计为第 1 层
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// 允许的最大文档声明长度 (默认: 16 MiB)
    #[serde(default = "default_max_document_size")]
    pub max_document_size: usize,

    /// 数组键必须依次为 "0", "1", ... (默认: true)
    #[serde(default = "default_strict_array_keys")]
    pub strict_array_keys: bool,
}

fn default_max_depth() -> usize { DEFAULT_MAX_DEPTH }
fn default_max_document_size() -> usize { DEFAULT_MAX_DOCUMENT_SIZE }
fn default_strict_array_keys() -> bool { true }

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_document_size: default_max_document_size(),
            strict_array_keys: default_strict_array_keys(),
        }
    }
}

impl CodecConfig {
    /// 从 TOML 字符串解析配置
    ///
    /// # Brief
    /// 缺失的字段使用默认值
    ///
    /// # Arguments
    /// * `content` - TOML 文本
    ///
    /// # Returns
    /// 成功返回配置, 语法或类型错误返回 `ConfigError::Parse`
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 从 TOML 文件加载配置
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// 以宽松模式解析数组键
    pub fn permissive(mut self) -> Self {
        self.strict_array_keys = false;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::default();
        assert_eq!(config.max_depth, 200);
        assert_eq!(config.max_document_size, 16 * 1024 * 1024);
        assert!(config.strict_array_keys);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CodecConfig::from_toml_str("max_depth = 8").unwrap();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.max_document_size, DEFAULT_MAX_DOCUMENT_SIZE);
        assert!(config.strict_array_keys);
    }

    #[test]
    fn test_invalid_toml() {
        let err = CodecConfig::from_toml_str("max_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "strict_array_keys = false").unwrap();
        writeln!(file, "max_document_size = 1024").unwrap();

        let config = CodecConfig::load(file.path()).unwrap();
        assert!(!config.strict_array_keys);
        assert_eq!(config.max_document_size, 1024);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_load_missing_file() {
        let err = CodecConfig::load("/nonexistent/binaryjson.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
