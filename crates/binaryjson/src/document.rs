//! BSON 文档结构模块
//!
//! 有序键值容器: 保持插入顺序，键唯一。重复插入同一键时原位替换值。

use crate::value::{Binary, BsonValue};
use crate::BsonResult;
use binaryjson_common::{CodecConfig, ObjectId};
use compact_str::CompactString;
use indexmap::IndexMap;
use std::fmt;

/// BSON 文档
///
/// 使用 `IndexMap` 保持字段插入顺序，解码后重新编码得到相同字节。
/// 相等比较逐字段进行，键顺序不同的两个文档不相等。
#[derive(Debug, Clone, Default)]
pub struct Document {
    fields: IndexMap<CompactString, BsonValue>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: IndexMap::with_capacity(capacity),
        }
    }

    /// 插入字段
    ///
    /// # Brief
    /// 键已存在时替换值并保持原有位置，返回旧值
    ///
    /// # Arguments
    /// * `key` - 字段名
    /// * `value` - 字段值
    pub fn insert(
        &mut self,
        key: impl Into<CompactString>,
        value: impl Into<BsonValue>,
    ) -> Option<BsonValue> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&BsonValue> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut BsonValue> {
        self.fields.get_mut(key)
    }

    /// 移除字段，其余字段顺序不变
    pub fn remove(&mut self, key: &str) -> Option<BsonValue> {
        self.fields.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &BsonValue> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BsonValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.fields.get(key).and_then(|v| v.as_i32())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(|v| v.as_f64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<BsonValue>> {
        self.fields.get(key).and_then(|v| v.as_array())
    }

    pub fn get_document(&self, key: &str) -> Option<&Document> {
        self.fields.get(key).and_then(|v| v.as_document())
    }

    pub fn get_object_id(&self, key: &str) -> Option<ObjectId> {
        self.fields.get(key).and_then(|v| v.as_object_id())
    }

    pub fn get_binary(&self, key: &str) -> Option<&Binary> {
        self.fields.get(key).and_then(|v| v.as_binary())
    }

    /// 按路径获取嵌套值
    ///
    /// # Arguments
    /// * `path` - 点分隔的路径，如 "user.address.city"，数组段使用下标
    pub fn get_path(&self, path: &str) -> Option<&BsonValue> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// 编码为 BSON 字节
    pub fn to_bytes(&self) -> BsonResult<Vec<u8>> {
        crate::codec::encode(self)
    }

    /// 从 BSON 字节解码(默认配置)
    pub fn from_bytes(data: &[u8]) -> BsonResult<Self> {
        crate::codec::decode(data)
    }

    pub fn from_bytes_with(data: &[u8], config: &CodecConfig) -> BsonResult<Self> {
        crate::codec::decode_with(data, config)
    }

    /// 投影为扩展 JSON
    pub fn to_extended_json(&self) -> serde_json::Value {
        crate::json::document_to_extended_json(self)
    }

    /// 投影为紧凑的扩展 JSON 字符串
    pub fn to_extended_json_string(&self) -> String {
        crate::json::to_extended_json_string(self)
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        // IndexMap 自身的比较忽略顺序
        self.fields.len() == other.fields.len() && self.fields.iter().eq(other.fields.iter())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{}\": {}", k, v)?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<CompactString>, V: Into<BsonValue>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl<K: Into<CompactString>, V: Into<BsonValue>> Extend<(K, V)> for Document {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl IntoIterator for Document {
    type Item = (CompactString, BsonValue);
    type IntoIter = indexmap::map::IntoIter<CompactString, BsonValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a CompactString, &'a BsonValue);
    type IntoIter = indexmap::map::Iter<'a, CompactString, BsonValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// 构造 Document 的便捷宏
///
/// # 示例
///
/// ```rust
/// use binaryjson::doc;
///
/// let empty = doc! {};
/// let doc = doc! {
///     "name": "test",
///     "value": 123
/// };
/// assert!(empty.is_empty());
/// assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["name", "value"]);
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let mut doc = $crate::Document::new();
            $(
                doc.insert($key, $crate::bson!($value));
            )*
            doc
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bson;

    #[test]
    fn test_insertion_order_preserved() {
        let mut doc = Document::new();
        doc.insert("z", 1);
        doc.insert("a", 2);
        doc.insert("m", 3);
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_equality_respects_key_order() {
        let xy = doc! { "x": 1, "y": 2 };
        let yx = doc! { "y": 2, "x": 1 };
        assert_ne!(xy, yx);
        assert_eq!(xy, doc! { "x": 1, "y": 2 });
        assert_ne!(bson!({ "d": { "x": 1, "y": 2 } }), bson!({ "d": { "y": 2, "x": 1 } }));

        let bytes = yx.to_bytes().unwrap();
        assert_ne!(Document::from_bytes(&bytes).unwrap(), xy);
        assert_eq!(Document::from_bytes(&bytes).unwrap(), yx);
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut doc = doc! { "a": 1, "b": 2, "c": 3 };
        let old = doc.insert("b", "two");
        assert_eq!(old, Some(BsonValue::Int32(2)));
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(doc.get_str("b"), Some("two"));
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut doc = doc! { "a": 1, "b": 2, "c": 3 };
        assert_eq!(doc.remove("a"), Some(BsonValue::Int32(1)));
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["b", "c"]);
        assert!(!doc.contains_key("a"));
        assert_eq!(doc.remove("a"), None);
    }

    #[test]
    fn test_typed_getters() {
        let id = ObjectId::from_bytes([7; 12]);
        let doc = doc! {
            "s": "str",
            "i": 5,
            "l": (5i64),
            "f": 2.5,
            "b": false,
            "arr": [1, 2],
            "sub": { "k": "v" },
            "id": id
        };
        assert_eq!(doc.get_str("s"), Some("str"));
        assert_eq!(doc.get_i32("i"), Some(5));
        assert_eq!(doc.get_i64("l"), Some(5));
        assert_eq!(doc.get_f64("f"), Some(2.5));
        assert_eq!(doc.get_bool("b"), Some(false));
        assert_eq!(doc.get_array("arr").map(|a| a.len()), Some(2));
        assert_eq!(doc.get_document("sub").and_then(|d| d.get_str("k")), Some("v"));
        assert_eq!(doc.get_object_id("id"), Some(id));
        assert_eq!(doc.get_path("sub.k"), Some(&bson!("v")));
        assert_eq!(doc.get_path("arr.1"), Some(&BsonValue::Int32(2)));
        assert_eq!(doc.get_i32("s"), None);
    }

    #[test]
    fn test_from_iterator_and_into_iter() {
        let doc: Document = vec![("x", 1), ("y", 2)].into_iter().collect();
        let pairs: Vec<(String, i32)> = doc
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.as_i32().unwrap()))
            .collect();
        assert_eq!(pairs, vec![("x".to_string(), 1), ("y".to_string(), 2)]);
    }

    #[test]
    fn test_bytes_round_trip() {
        let doc = doc! { "a": 1, "b": { "c": [true, null] } };
        let bytes = doc.to_bytes().unwrap();
        assert_eq!(Document::from_bytes(&bytes).unwrap(), doc);
    }
}
