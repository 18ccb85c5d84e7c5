//! 扩展 JSON 投影模块
//!
//! 将 BsonValue 单向投影为 JSON。JSON 原生类型直接映射，
//! 其余类型使用 `$` 前缀的保留键表示。投影是全函数，不会失败。

use crate::document::Document;
use crate::value::{BsonValue, LegacyKind};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Number, Value as JsonValue};

/// 将 BsonValue 投影为扩展 JSON
///
/// # Brief
/// 四种数值与布尔类型不带类型标记，复杂类型使用扩展 JSON 格式
///
/// # 扩展 JSON 格式
/// - ObjectId: `{"$oid": "507f1f77bcf86cd799439011"}`
/// - Date: `{"$date": 1234567890000}`
/// - Timestamp: `{"$timestamp": {"t": 10, "i": 1}}`
/// - Binary: `{"$binary": "3q0=", "$type": "00"}`
/// - Regex: `{"$regex": "pattern", "$options": "i"}`
/// - Code: 代码文本本身，作用域被丢弃
/// - MinKey / MaxKey: `{"$minKey": 1}` / `{"$maxKey": 1}`
///
/// # Arguments
/// * `value` - 要投影的值
///
/// # Returns
/// JSON 值
pub fn to_extended_json(value: &BsonValue) -> JsonValue {
    match value {
        BsonValue::Null => JsonValue::Null,
        BsonValue::Boolean(b) => JsonValue::Bool(*b),
        BsonValue::Int32(n) => json!(*n),
        BsonValue::Int64(n) => json!(*n),
        BsonValue::Double(f) => match Number::from_f64(*f) {
            Some(n) => JsonValue::Number(n),
            // JSON 数字不能表示 NaN 与无穷
            None if f.is_nan() => json!("NaN"),
            None if *f > 0.0 => json!("Infinity"),
            None => json!("-Infinity"),
        },
        BsonValue::String(s) => JsonValue::String(s.to_string()),
        BsonValue::Array(arr) => JsonValue::Array(arr.iter().map(to_extended_json).collect()),
        BsonValue::Document(doc) => document_to_extended_json(doc),
        BsonValue::ObjectId(oid) => json!({ "$oid": oid.to_hex() }),
        BsonValue::Date(ms) => json!({ "$date": *ms }),
        BsonValue::Timestamp(ts) => json!({ "$timestamp": { "t": ts.time, "i": ts.increment } }),
        BsonValue::Binary(b) => json!({
            "$binary": STANDARD.encode(&b.bytes),
            "$type": format!("{:02X}", b.subtype.as_u8())
        }),
        BsonValue::RegularExpression(r) => json!({
            "$regex": r.pattern.as_str(),
            "$options": r.options.as_str()
        }),
        BsonValue::Code(code) => JsonValue::String(code.code.to_string()),
        BsonValue::MinKey => json!({ "$minKey": 1 }),
        BsonValue::MaxKey => json!({ "$maxKey": 1 }),
        BsonValue::Legacy(legacy) => match legacy.kind() {
            LegacyKind::Undefined => json!({ "$undefined": true }),
            LegacyKind::Symbol(s) => json!({ "$symbol": s.as_str() }),
            LegacyKind::DbPointer { namespace, id } => json!({
                "$dbPointer": { "$ref": namespace.as_str(), "$id": { "$oid": id.to_hex() } }
            }),
        },
    }
}

/// 将文档投影为 JSON 对象，保持键顺序
pub fn document_to_extended_json(doc: &Document) -> JsonValue {
    let mut obj = Map::with_capacity(doc.len());
    for (k, v) in doc.iter() {
        obj.insert(k.to_string(), to_extended_json(v));
    }
    JsonValue::Object(obj)
}

/// 投影为紧凑的 JSON 字符串
pub fn to_extended_json_string(doc: &Document) -> String {
    document_to_extended_json(doc).to_string()
}

/// 投影为带缩进的 JSON 字符串
pub fn to_extended_json_string_pretty(doc: &Document) -> String {
    let value = document_to_extended_json(doc);
    // serde_json::Value 的序列化不会失败
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}
