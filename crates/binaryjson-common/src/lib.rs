//! BinaryJSON 公共模块
//!
//! - `oid`: 12 字节 ObjectId 及其生成器
//! - `config`: 解码器配置(支持 TOML)
//! - `error`: ObjectId 解析错误与配置错误

pub mod config;
pub mod error;
pub mod oid;

pub use config::CodecConfig;
pub use error::{ConfigError, ConfigResult, OidError};
pub use oid::{Clock, ObjectId, ObjectIdGenerator, ProcessIdentity, RandomProcessIdentity, SystemClock};
