//! BSON 值类型定义模块
//!
//! 定义 BSON 格式支持的全部数据类型。值是纯粹的所有权树:
//! 文档拥有其字段，数组拥有其元素，克隆即深拷贝，不存在环。

use crate::document::Document;
use crate::spec::{BinarySubtype, ElementType};
use binaryjson_common::ObjectId;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use std::fmt;
use uuid::Uuid;

/// BSON 值的枚举类型
///
/// # 支持的类型
///
/// - **基础类型**: Null, Boolean, Int32, Int64, Double, String
/// - **复合类型**: Array, Document
/// - **时间类型**: Date(毫秒), Timestamp(秒 + 序号)
/// - **其他**: Binary, ObjectId, Code, RegularExpression, MinKey, MaxKey
/// - **遗留类型**: Undefined / DBPointer / Symbol，只能由解码器产生
///
/// # 示例
///
/// ```rust
/// use binaryjson::BsonValue;
///
/// let value = BsonValue::from("hello");
/// assert_eq!(value.type_name(), "string");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum BsonValue {
    /// 空值
    Null,
    /// 布尔值
    Boolean(bool),
    /// 32位有符号整数
    Int32(i32),
    /// 64位有符号整数
    Int64(i64),
    /// 64位浮点数
    Double(f64),
    /// UTF-8 字符串
    String(CompactString),
    /// 值数组
    Array(Vec<BsonValue>),
    /// 嵌套文档
    Document(Document),
    /// UTC 时间，自 Unix 纪元起的毫秒数
    Date(i64),
    /// 内部时间戳
    Timestamp(Timestamp),
    /// 二进制数据
    Binary(Binary),
    /// 12字节对象标识符
    ObjectId(ObjectId),
    /// JavaScript 代码，可带作用域
    Code(Code),
    /// 正则表达式
    RegularExpression(Regex),
    MinKey,
    MaxKey,
    /// 废弃的线格式类型，仅用于保真往返
    Legacy(LegacyValue),
}

/// 内部时间戳: 秒 + 同一秒内的序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    pub time: u32,
    pub increment: u32,
}

impl Timestamp {
    pub fn new(time: u32, increment: u32) -> Self {
        Self { time, increment }
    }
}

/// 二进制数据及其子类型
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    pub subtype: BinarySubtype,
    pub bytes: Vec<u8>,
}

impl Binary {
    pub fn new(subtype: BinarySubtype, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            subtype,
            bytes: bytes.into(),
        }
    }

    /// 通用子类型 (0x00)
    pub fn generic(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(BinarySubtype::GENERIC, bytes)
    }

    /// UUID 子类型 (0x04)，16 字节大端
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self::new(BinarySubtype::UUID, uuid.as_bytes().to_vec())
    }

    /// 子类型为 UUID 且长度为 16 时返回 UUID
    pub fn as_uuid(&self) -> Option<Uuid> {
        if self.subtype != BinarySubtype::UUID {
            return None;
        }
        Uuid::from_slice(&self.bytes).ok()
    }
}

/// 正则表达式
///
/// 选项字符按调用方给定的顺序保存，编码器不做排序。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Regex {
    pub pattern: CompactString,
    pub options: CompactString,
}

impl Regex {
    pub fn new(pattern: impl Into<CompactString>, options: impl Into<CompactString>) -> Self {
        Self {
            pattern: pattern.into(),
            options: options.into(),
        }
    }
}

/// JavaScript 代码值
///
/// `scope` 存在时以 CodeWithScope (0x0F) 编码。
#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub code: CompactString,
    pub scope: Option<Document>,
}

impl Code {
    pub fn new(code: impl Into<CompactString>) -> Self {
        Self {
            code: code.into(),
            scope: None,
        }
    }

    pub fn with_scope(code: impl Into<CompactString>, scope: Document) -> Self {
        Self {
            code: code.into(),
            scope: Some(scope),
        }
    }
}

/// 遗留类型的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyKind {
    Undefined,
    DbPointer {
        namespace: CompactString,
        id: ObjectId,
    },
    Symbol(CompactString),
}

/// 遗留类型值
///
/// 没有公开构造函数: 应用代码无法新建，只能从解码结果中获得并原样写回。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyValue {
    kind: LegacyKind,
}

impl LegacyValue {
    pub(crate) fn new(kind: LegacyKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &LegacyKind {
        &self.kind
    }

    pub fn element_type(&self) -> ElementType {
        match self.kind {
            LegacyKind::Undefined => ElementType::Undefined,
            LegacyKind::DbPointer { .. } => ElementType::DbPointer,
            LegacyKind::Symbol(_) => ElementType::Symbol,
        }
    }
}

impl BsonValue {
    /// 获取值的类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            BsonValue::Null => "null",
            BsonValue::Boolean(_) => "boolean",
            BsonValue::Int32(_) => "int32",
            BsonValue::Int64(_) => "int64",
            BsonValue::Double(_) => "double",
            BsonValue::String(_) => "string",
            BsonValue::Array(_) => "array",
            BsonValue::Document(_) => "document",
            BsonValue::Date(_) => "date",
            BsonValue::Timestamp(_) => "timestamp",
            BsonValue::Binary(_) => "binary",
            BsonValue::ObjectId(_) => "objectId",
            BsonValue::Code(_) => "javascript",
            BsonValue::RegularExpression(_) => "regex",
            BsonValue::MinKey => "minKey",
            BsonValue::MaxKey => "maxKey",
            BsonValue::Legacy(l) => match l.kind() {
                LegacyKind::Undefined => "undefined",
                LegacyKind::DbPointer { .. } => "dbPointer",
                LegacyKind::Symbol(_) => "symbol",
            },
        }
    }

    /// 获取线格式类型标记
    ///
    /// # Brief
    /// 带作用域的代码返回 `JavaScriptCodeWithScope`
    pub fn element_type(&self) -> ElementType {
        match self {
            BsonValue::Null => ElementType::Null,
            BsonValue::Boolean(_) => ElementType::Boolean,
            BsonValue::Int32(_) => ElementType::Int32,
            BsonValue::Int64(_) => ElementType::Int64,
            BsonValue::Double(_) => ElementType::Double,
            BsonValue::String(_) => ElementType::String,
            BsonValue::Array(_) => ElementType::Array,
            BsonValue::Document(_) => ElementType::Document,
            BsonValue::Date(_) => ElementType::DateTime,
            BsonValue::Timestamp(_) => ElementType::Timestamp,
            BsonValue::Binary(_) => ElementType::Binary,
            BsonValue::ObjectId(_) => ElementType::ObjectId,
            BsonValue::Code(c) if c.scope.is_some() => ElementType::JavaScriptCodeWithScope,
            BsonValue::Code(_) => ElementType::JavaScriptCode,
            BsonValue::RegularExpression(_) => ElementType::RegularExpression,
            BsonValue::MinKey => ElementType::MinKey,
            BsonValue::MaxKey => ElementType::MaxKey,
            BsonValue::Legacy(l) => l.element_type(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, BsonValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BsonValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            BsonValue::Int32(n) => Some(*n),
            _ => None,
        }
    }

    /// 尝试获取 i64 值
    ///
    /// # Brief
    /// Int32 与 Int64 均可转换
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            BsonValue::Int32(n) => Some(i64::from(*n)),
            BsonValue::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// 尝试获取 f64 值
    ///
    /// # Brief
    /// 数值类型均可转换，Int64 可能丢失精度
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            BsonValue::Double(n) => Some(*n),
            BsonValue::Int32(n) => Some(f64::from(*n)),
            BsonValue::Int64(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BsonValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<BsonValue>> {
        match self {
            BsonValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            BsonValue::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            BsonValue::ObjectId(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&Binary> {
        match self {
            BsonValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            BsonValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// 日期的毫秒值
    pub fn as_date_millis(&self) -> Option<i64> {
        match self {
            BsonValue::Date(ms) => Some(*ms),
            _ => None,
        }
    }

    /// 日期转换为 chrono 时间
    ///
    /// # Returns
    /// 超出 chrono 可表示范围时返回 `None`
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        self.as_date_millis().and_then(DateTime::from_timestamp_millis)
    }

    /// 获取指定键的值
    ///
    /// # Brief
    /// 从文档中获取指定键的值，或从数组中获取指定索引的值
    pub fn get(&self, key: &str) -> Option<&BsonValue> {
        match self {
            BsonValue::Document(doc) => doc.get(key),
            BsonValue::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
            _ => None,
        }
    }

    /// 按路径获取嵌套值
    ///
    /// # Arguments
    /// * `path` - 点分隔的路径，如 "user.tags.0"
    pub fn get_path(&self, path: &str) -> Option<&BsonValue> {
        let mut current = self;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }
}

impl Default for BsonValue {
    fn default() -> Self {
        BsonValue::Null
    }
}

impl fmt::Display for BsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BsonValue::Null => write!(f, "null"),
            BsonValue::Boolean(b) => write!(f, "{}", b),
            BsonValue::Int32(n) => write!(f, "{}", n),
            BsonValue::Int64(n) => write!(f, "NumberLong({})", n),
            BsonValue::Double(n) => write!(f, "{}", n),
            BsonValue::String(s) => write!(f, "\"{}\"", s),
            BsonValue::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            BsonValue::Document(doc) => write!(f, "{}", doc),
            BsonValue::Date(ms) => match self.as_datetime() {
                Some(dt) => write!(f, "Date(\"{}\")", dt.to_rfc3339()),
                None => write!(f, "Date({})", ms),
            },
            BsonValue::Timestamp(ts) => write!(f, "Timestamp({}, {})", ts.time, ts.increment),
            BsonValue::Binary(b) => {
                write!(f, "Binary(0x{:02X}, <{} bytes>)", b.subtype.as_u8(), b.bytes.len())
            }
            BsonValue::ObjectId(id) => write!(f, "ObjectId(\"{}\")", id),
            BsonValue::Code(code) => match &code.scope {
                Some(scope) => write!(f, "Code({}, scope: {})", code.code, scope),
                None => write!(f, "Code({})", code.code),
            },
            BsonValue::RegularExpression(r) => write!(f, "/{}/{}", r.pattern, r.options),
            BsonValue::MinKey => write!(f, "MinKey"),
            BsonValue::MaxKey => write!(f, "MaxKey"),
            BsonValue::Legacy(l) => match l.kind() {
                LegacyKind::Undefined => write!(f, "undefined"),
                LegacyKind::DbPointer { namespace, id } => {
                    write!(f, "DBPointer(\"{}\", {})", namespace, id)
                }
                LegacyKind::Symbol(s) => write!(f, "Symbol(\"{}\")", s),
            },
        }
    }
}

// ============================================================================
// From 特征实现 - 支持从各种 Rust 类型转换为 BsonValue
// ============================================================================

impl From<bool> for BsonValue {
    fn from(v: bool) -> Self {
        BsonValue::Boolean(v)
    }
}

impl From<i32> for BsonValue {
    fn from(v: i32) -> Self {
        BsonValue::Int32(v)
    }
}

impl From<i64> for BsonValue {
    fn from(v: i64) -> Self {
        BsonValue::Int64(v)
    }
}

impl From<f64> for BsonValue {
    fn from(v: f64) -> Self {
        BsonValue::Double(v)
    }
}

impl From<&str> for BsonValue {
    fn from(v: &str) -> Self {
        BsonValue::String(CompactString::from(v))
    }
}

impl From<String> for BsonValue {
    fn from(v: String) -> Self {
        BsonValue::String(CompactString::from(v))
    }
}

impl From<CompactString> for BsonValue {
    fn from(v: CompactString) -> Self {
        BsonValue::String(v)
    }
}

impl From<Document> for BsonValue {
    fn from(v: Document) -> Self {
        BsonValue::Document(v)
    }
}

impl From<ObjectId> for BsonValue {
    fn from(v: ObjectId) -> Self {
        BsonValue::ObjectId(v)
    }
}

impl From<Binary> for BsonValue {
    fn from(v: Binary) -> Self {
        BsonValue::Binary(v)
    }
}

impl From<Uuid> for BsonValue {
    fn from(v: Uuid) -> Self {
        BsonValue::Binary(Binary::from_uuid(v))
    }
}

impl From<Timestamp> for BsonValue {
    fn from(v: Timestamp) -> Self {
        BsonValue::Timestamp(v)
    }
}

impl From<Regex> for BsonValue {
    fn from(v: Regex) -> Self {
        BsonValue::RegularExpression(v)
    }
}

impl From<Code> for BsonValue {
    fn from(v: Code) -> Self {
        BsonValue::Code(v)
    }
}

impl From<DateTime<Utc>> for BsonValue {
    fn from(v: DateTime<Utc>) -> Self {
        BsonValue::Date(v.timestamp_millis())
    }
}

impl<T: Into<BsonValue>> From<Option<T>> for BsonValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(BsonValue::Null)
    }
}

impl<T: Into<BsonValue>> From<Vec<T>> for BsonValue {
    fn from(v: Vec<T>) -> Self {
        BsonValue::Array(v.into_iter().map(Into::into).collect())
    }
}

/// 构造 BsonValue 的便捷宏
///
/// # 示例
///
/// ```rust
/// use binaryjson::bson;
///
/// let null = bson!(null);
/// let array = bson!([1, "two", true]);
/// let doc = bson!({ "name": "test", "tags": ["a", "b"] });
/// assert_eq!(doc.get_path("tags.1").and_then(|v| v.as_str()), Some("b"));
/// ```
#[macro_export]
macro_rules! bson {
    (null) => {
        $crate::BsonValue::Null
    };
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::BsonValue::Array(vec![ $($crate::bson!($elem)),* ])
    };
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::BsonValue::Document($crate::doc! { $($key : $value),* })
    };
    ($e:expr) => {
        $crate::BsonValue::from($e)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_macro_construction() {
        let value = bson!({
            "name": "Miku",
            "age": 16,
            "tags": ["a", null, true],
            "nested": { "x": 1.5 }
        });
        assert_eq!(value.get("name").and_then(|v| v.as_str()), Some("Miku"));
        assert_eq!(value.get("age").and_then(|v| v.as_i32()), Some(16));
        assert_eq!(value.get_path("tags.1"), Some(&BsonValue::Null));
        assert_eq!(value.get_path("tags.2").and_then(|v| v.as_bool()), Some(true));
        assert_eq!(value.get_path("nested.x").and_then(|v| v.as_f64()), Some(1.5));
        assert_eq!(value.get_path("nested.y"), None);
    }

    #[test]
    fn test_element_types() {
        assert_eq!(BsonValue::Int64(1).element_type(), ElementType::Int64);
        assert_eq!(
            BsonValue::Code(Code::new("x")).element_type(),
            ElementType::JavaScriptCode
        );
        assert_eq!(
            BsonValue::Code(Code::with_scope("x", doc! {})).element_type(),
            ElementType::JavaScriptCodeWithScope
        );
        assert_eq!(BsonValue::MinKey.element_type().as_u8(), 0xFF);
        assert_eq!(BsonValue::MaxKey.element_type().as_u8(), 0x7F);
    }

    #[test]
    fn test_clone_is_deep() {
        let original = bson!({ "inner": { "n": 1 } });
        let mut copy = original.clone();
        if let BsonValue::Document(doc) = &mut copy {
            doc.insert("inner", 2);
        }
        assert_eq!(original.get_path("inner.n").and_then(|v| v.as_i32()), Some(1));
        assert_eq!(copy.get("inner").and_then(|v| v.as_i32()), Some(2));
    }

    #[test]
    fn test_uuid_binary() {
        let uuid = Uuid::new_v4();
        let binary = Binary::from_uuid(uuid);
        assert_eq!(binary.subtype, BinarySubtype::UUID);
        assert_eq!(binary.as_uuid(), Some(uuid));
        assert_eq!(Binary::generic(uuid.as_bytes().to_vec()).as_uuid(), None);
    }

    #[test]
    fn test_datetime_conversion() {
        let dt = DateTime::from_timestamp_millis(1_600_000_000_123).unwrap();
        let value = BsonValue::from(dt);
        assert_eq!(value, BsonValue::Date(1_600_000_000_123));
        assert_eq!(value.as_datetime(), Some(dt));
        assert_eq!(BsonValue::Date(i64::MAX).as_datetime(), None);
    }

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(BsonValue::Int32(7).as_i64(), Some(7));
        assert_eq!(BsonValue::Int64(7).as_i32(), None);
        assert_eq!(BsonValue::Int64(7).as_f64(), Some(7.0));
        assert_eq!(BsonValue::from(Some(3)).as_i32(), Some(3));
        assert!(BsonValue::from(None::<i32>).is_null());
    }

    #[test]
    fn test_display() {
        let value = bson!({ "a": [1, "x"], "b": null });
        assert_eq!(value.to_string(), "{\"a\": [1, \"x\"], \"b\": null}");
        assert_eq!(BsonValue::Date(0).to_string(), "Date(\"1970-01-01T00:00:00+00:00\")");
        assert_eq!(BsonValue::from(Regex::new("^a", "i")).to_string(), "/^a/i");
    }
}
