//! ObjectId 模块
//!
//! 12 字节唯一标识符，布局如下:
//! - 前 4 字节: 时间戳(秒,大端)
//! - 中 5 字节: 进程唯一值(由 ProcessIdentity 提供)
//! - 后 3 字节: 计数器低 24 位(大端)
//!
//! 相等与排序均按 12 字节逐字节比较。

use crate::error::OidError;
use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

/// ObjectId - 12 字节唯一标识符
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// 使用进程级生成器创建新的 ObjectId
    pub fn new() -> Self {
        static GENERATOR: OnceLock<ObjectIdGenerator<SystemClock, RandomProcessIdentity>> =
            OnceLock::new();
        GENERATOR
            .get_or_init(|| ObjectIdGenerator::new(SystemClock, RandomProcessIdentity::new()))
            .next_id()
    }

    /// 以当前系统时间生成 ObjectId
    ///
    /// # Arguments
    /// * `counter` - 共享计数器，每次调用原子递增
    /// * `process_unique` - 5 字节进程唯一值
    pub fn generate(counter: &AtomicU32, process_unique: [u8; 5]) -> Self {
        Self::generate_at(SystemClock.now_secs(), counter, process_unique)
    }

    /// 以指定时间戳生成 ObjectId
    ///
    /// # Brief
    /// 取计数器当前值的低 24 位，随后计数器加一
    pub fn generate_at(secs: u32, counter: &AtomicU32, process_unique: [u8; 5]) -> Self {
        let count = counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;
        if count == COUNTER_MASK {
            trace!(secs, "ObjectId counter wrapped");
        }
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&process_unique);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// 内嵌时间戳(秒)
    pub fn timestamp_secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// 内嵌时间戳转换为 UTC 时间
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(i64::from(self.timestamp_secs()), 0).unwrap_or_default()
    }

    /// 进程唯一值(第 5-9 字节)
    pub fn process_unique(&self) -> [u8; 5] {
        let mut out = [0u8; 5];
        out.copy_from_slice(&self.0[4..9]);
        out
    }

    /// 计数器(最后 3 字节)
    pub fn counter(&self) -> u32 {
        u32::from_be_bytes([0, self.0[9], self.0[10], self.0[11]])
    }

    /// 转换为 24 位小写十六进制字符串
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// 解析 24 位十六进制字符串
    ///
    /// # Brief
    /// 大小写均可接受
    ///
    /// # Returns
    /// 长度不符返回 `InvalidLength`，出现非十六进制字符返回 `InvalidHexDigit`
    pub fn parse(s: &str) -> Result<Self, OidError> {
        let len = s.chars().count();
        if len != 24 {
            return Err(OidError::InvalidLength(len));
        }
        let mut bytes = [0u8; 12];
        for (index, ch) in s.chars().enumerate() {
            let nibble = ch
                .to_digit(16)
                .ok_or(OidError::InvalidHexDigit { ch, index })? as u8;
            if index % 2 == 0 {
                bytes[index / 2] = nibble << 4;
            } else {
                bytes[index / 2] |= nibble;
            }
        }
        Ok(Self(bytes))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = OidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 12]> for ObjectId {
    fn from(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId(\"{}\")", self.to_hex())
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OidVisitor;

        impl<'de> Visitor<'de> for OidVisitor {
            type Value = ObjectId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 24 character hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ObjectId, E> {
                ObjectId::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(OidVisitor)
    }
}

/// 时钟来源
pub trait Clock {
    /// 当前 Unix 时间(秒)
    fn now_secs(&self) -> u32;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }
}

/// 进程身份来源
pub trait ProcessIdentity {
    fn process_unique_bytes(&self) -> [u8; 5];
}

/// 构造时随机抽取一次 5 字节的进程身份
#[derive(Debug, Clone, Copy)]
pub struct RandomProcessIdentity([u8; 5]);

impl RandomProcessIdentity {
    pub fn new() -> Self {
        Self(rand::random())
    }
}

impl Default for RandomProcessIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessIdentity for RandomProcessIdentity {
    fn process_unique_bytes(&self) -> [u8; 5] {
        self.0
    }
}

impl ProcessIdentity for [u8; 5] {
    fn process_unique_bytes(&self) -> [u8; 5] {
        *self
    }
}

/// ObjectId 生成器
///
/// 持有原子计数器与两个协作者，可在多线程间共享(`&self` 生成)。
#[derive(Debug)]
pub struct ObjectIdGenerator<C, P> {
    counter: AtomicU32,
    clock: C,
    identity: P,
}

impl<C: Clock, P: ProcessIdentity> ObjectIdGenerator<C, P> {
    /// 创建生成器，计数器以随机值起步
    pub fn new(clock: C, identity: P) -> Self {
        Self::with_counter(clock, identity, rand::random())
    }

    pub fn with_counter(clock: C, identity: P, start: u32) -> Self {
        Self {
            counter: AtomicU32::new(start),
            clock,
            identity,
        }
    }

    pub fn next_id(&self) -> ObjectId {
        ObjectId::generate_at(
            self.clock.now_secs(),
            &self.counter,
            self.identity.process_unique_bytes(),
        )
    }
}
