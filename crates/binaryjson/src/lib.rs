//! # BinaryJSON - 自包含的 BSON 编解码器
//!
//! 将内存中的文档值树编码为 BSON 线格式，从线格式解码回值树，
//! 并把任意值投影为扩展 JSON (Extended JSON)。
//!
//! - **值模型**: [`BsonValue`] / [`Document`]，纯所有权树，键保持插入顺序
//! - **编码器**: [`encode`]，长度前缀在子文档序列化完成后写入
//! - **解码器**: [`decode`] / [`decode_with`]，带深度限制与逐字节偏移的错误报告
//! - **读取器**: [`Reader`]，遍历缓冲区中首尾相接的多个文档
//! - **扩展 JSON**: [`to_extended_json`]，`$oid` / `$date` / `$binary` 等约定
//! - **ObjectId**: 见 `binaryjson_common::ObjectId`
//!
//! ## 快速开始
//!
//! ```rust
//! use binaryjson::{decode, doc, encode};
//!
//! let doc = doc! { "a": 1 };
//! let bytes = encode(&doc).unwrap();
//! assert_eq!(bytes, [0x0C, 0, 0, 0, 0x10, b'a', 0, 1, 0, 0, 0, 0]);
//! assert_eq!(decode(&bytes).unwrap(), doc);
//! ```

pub mod codec;
pub mod de;
pub mod document;
pub mod json;
pub mod reader;
pub mod ser;
pub mod spec;
pub mod value;

#[cfg(test)]
mod strategies;

pub use binaryjson_common::{CodecConfig, ObjectId, OidError};
pub use codec::{decode, decode_with, encode, encode_to};
pub use de::{from_bson, from_document};
pub use document::Document;
pub use json::{to_extended_json, to_extended_json_string, to_extended_json_string_pretty};
pub use reader::Reader;
pub use ser::{to_bson, to_document};
pub use spec::{BinarySubtype, ElementType, SubtypeKind};
pub use value::{Binary, BsonValue, Code, LegacyKind, LegacyValue, Regex, Timestamp};

use compact_str::CompactString;
use thiserror::Error;

/// BSON 操作的错误类型
///
/// 解码相关的错误均携带相对输入缓冲区起点的字节偏移。
#[derive(Error, Debug)]
pub enum BsonError {
    /// 键中含有 NUL 字符，无法写成 cstring
    #[error("Invalid key {key:?}: keys must not contain NUL")]
    InvalidKey { key: CompactString },

    /// 正则表达式的模式或选项中含有 NUL 字符
    #[error("Invalid cstring in regex {field}: must not contain NUL")]
    InvalidCString { field: &'static str },

    /// 声明长度超过可用字节
    #[error("Truncated input at offset {offset}: need {needed} bytes, have {available}")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// 声明长度与结束符位置不一致
    #[error("Length mismatch at offset {offset}: declared {declared}, actual {actual}")]
    LengthMismatch {
        offset: usize,
        declared: usize,
        actual: usize,
    },

    /// 未知的元素类型标记
    #[error("Unsupported element type 0x{tag:02X} for key {key:?} at offset {offset}")]
    UnsupportedType {
        tag: u8,
        key: CompactString,
        offset: usize,
    },

    /// 嵌套层级超过限制
    #[error("Nesting too deep: max {0}")]
    DepthExceeded(usize),

    /// ObjectId 字符串无效
    #[error("Invalid ObjectId: {0}")]
    InvalidObjectId(#[from] OidError),

    /// 字符串不是有效的 UTF-8 编码
    #[error("Invalid UTF-8 at offset {offset}: {source}")]
    Utf8 {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    /// 数组键不是依次递增的 "0", "1", ...
    #[error("Malformed array key at offset {offset}: expected {expected:?}, found {found:?}")]
    MalformedArrayKeys {
        offset: usize,
        expected: String,
        found: CompactString,
    },

    /// 其他结构错误
    #[error("Invalid document at offset {offset}: {reason}")]
    InvalidDocument { offset: usize, reason: String },

    /// 文档体积超出限制
    #[error("Document too large: {size} bytes, max {max}")]
    DocumentTooLarge { size: usize, max: usize },

    /// 序列化过程错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 反序列化过程错误
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl BsonError {
    /// 出错位置的字节偏移(若有)
    pub fn offset(&self) -> Option<usize> {
        match self {
            BsonError::TruncatedInput { offset, .. }
            | BsonError::LengthMismatch { offset, .. }
            | BsonError::UnsupportedType { offset, .. }
            | BsonError::Utf8 { offset, .. }
            | BsonError::MalformedArrayKeys { offset, .. }
            | BsonError::InvalidDocument { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// BSON 操作的 Result 类型别名
pub type BsonResult<T> = Result<T, BsonError>;
