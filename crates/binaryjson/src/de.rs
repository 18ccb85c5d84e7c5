//! Serde 反序列化模块
//!
//! 实现 Serde Deserializer trait，将 BsonValue 反序列化为 Rust 数据结构。
//!
//! - 基本类型: bool, 整数, 浮点数, 字符串
//! - 复合类型: 结构体, 枚举, 数组, 元组, map
//! - 整数转换: Int32 与 Int64 互转(在范围内)，Date 可读作 i64 毫秒
//! - 自描述读取(`deserialize_any`)时，非 JSON 原生类型按扩展 JSON 形式呈现

use crate::document::Document;
use crate::json::to_extended_json;
use crate::value::BsonValue;
use crate::{BsonError, BsonResult};
use compact_str::CompactString;
use serde::de::{self, DeserializeSeed, IntoDeserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use std::fmt;

pub struct Deserializer<'de> {
    input: &'de BsonValue,
}

impl<'de> Deserializer<'de> {
    pub fn new(input: &'de BsonValue) -> Self {
        Deserializer { input }
    }

    fn mismatch(&self, expected: &str) -> BsonError {
        BsonError::Deserialization(format!(
            "Expected {}, got {}",
            expected,
            self.input.type_name()
        ))
    }
}

/// 从 BsonValue 反序列化
pub fn from_bson<'a, T: Deserialize<'a>>(value: &'a BsonValue) -> BsonResult<T> {
    T::deserialize(Deserializer::new(value))
}

/// 从 Document 反序列化
pub fn from_document<T: de::DeserializeOwned>(doc: &Document) -> BsonResult<T> {
    T::deserialize(DocumentDeserializer { doc })
}

impl de::Error for BsonError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        BsonError::Deserialization(msg.to_string())
    }
}

impl<'de> de::Deserializer<'de> for Deserializer<'de> {
    type Error = BsonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Null => visitor.visit_unit(),
            BsonValue::Boolean(b) => visitor.visit_bool(*b),
            BsonValue::Int32(n) => visitor.visit_i32(*n),
            BsonValue::Int64(n) => visitor.visit_i64(*n),
            BsonValue::Double(n) => visitor.visit_f64(*n),
            BsonValue::String(s) => visitor.visit_str(s.as_str()),
            BsonValue::Binary(b) => visitor.visit_bytes(&b.bytes),
            BsonValue::ObjectId(oid) => visitor.visit_string(oid.to_hex()),
            BsonValue::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr.iter())),
            BsonValue::Document(doc) => visitor.visit_map(MapDeserializer::new(doc.into_iter())),
            BsonValue::Date(_)
            | BsonValue::Timestamp(_)
            | BsonValue::Code(_)
            | BsonValue::RegularExpression(_)
            | BsonValue::MinKey
            | BsonValue::MaxKey
            | BsonValue::Legacy(_) => de::Deserializer::deserialize_any(to_extended_json(self.input), visitor)
                .map_err(|e| BsonError::Deserialization(e.to_string())),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Boolean(b) => visitor.visit_bool(*b),
            _ => Err(self.mismatch("boolean")),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_i32(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_i32(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) => visitor.visit_i32(*n),
            BsonValue::Int64(n) => visitor.visit_i64(*n),
            _ => Err(self.mismatch("integer")),
        }
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) => visitor.visit_i64(i64::from(*n)),
            BsonValue::Int64(n) | BsonValue::Date(n) => visitor.visit_i64(*n),
            _ => Err(self.mismatch("integer")),
        }
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_u64(visitor)
    }

    /// 负数报错；目标类型的上限由 visitor 检查
    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Int32(n) if *n >= 0 => visitor.visit_u64(*n as u64),
            BsonValue::Int64(n) if *n >= 0 => visitor.visit_u64(*n as u64),
            _ => Err(self.mismatch("unsigned integer")),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Double(n) => visitor.visit_f64(*n),
            BsonValue::Int32(n) => visitor.visit_f64(f64::from(*n)),
            BsonValue::Int64(n) => visitor.visit_f64(*n as f64),
            _ => Err(self.mismatch("float")),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        if let BsonValue::String(s) = self.input {
            let mut chars = s.chars();
            if let (Some(c), None) = (chars.next(), chars.next()) {
                return visitor.visit_char(c);
            }
        }
        Err(self.mismatch("char"))
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::String(s) => visitor.visit_str(s.as_str()),
            BsonValue::ObjectId(oid) => visitor.visit_string(oid.to_hex()),
            _ => Err(self.mismatch("string")),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Binary(b) => visitor.visit_bytes(&b.bytes),
            _ => Err(self.mismatch("binary")),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Null => visitor.visit_unit(),
            _ => Err(self.mismatch("null")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr.iter())),
            _ => Err(self.mismatch("array")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::Document(doc) => visitor.visit_map(MapDeserializer::new(doc.into_iter())),
            _ => Err(self.mismatch("document")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    /// 单元变体为字符串，其余变体为单键文档 `{ variant: value }`
    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.input {
            BsonValue::String(s) => visitor.visit_enum(s.as_str().into_deserializer()),
            BsonValue::Document(doc) if doc.len() == 1 => match doc.into_iter().next() {
                Some((key, value)) => visitor.visit_enum(EnumDeserializer {
                    variant: key.as_str(),
                    value,
                }),
                None => Err(self.mismatch("enum variant")),
            },
            _ => Err(self.mismatch("string or single-key document for enum")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}

/// 顶层文档的反序列化器
struct DocumentDeserializer<'de> {
    doc: &'de Document,
}

impl<'de> de::Deserializer<'de> for DocumentDeserializer<'de> {
    type Error = BsonError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_map(MapDeserializer::new(self.doc.into_iter()))
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

struct SeqDeserializer<'de, I> {
    iter: I,
    _marker: std::marker::PhantomData<&'de ()>,
}

impl<'de, I: Iterator<Item = &'de BsonValue>> SeqDeserializer<'de, I> {
    fn new(iter: I) -> Self {
        Self {
            iter,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<'de, I: Iterator<Item = &'de BsonValue>> SeqAccess<'de> for SeqDeserializer<'de, I> {
    type Error = BsonError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Self::Error> {
        match self.iter.next() {
            Some(value) => seed.deserialize(Deserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }
}

struct MapDeserializer<'de, I> {
    iter: I,
    value: Option<&'de BsonValue>,
}

impl<'de, I: Iterator<Item = (&'de CompactString, &'de BsonValue)>> MapDeserializer<'de, I> {
    fn new(iter: I) -> Self {
        Self { iter, value: None }
    }
}

impl<'de, I: Iterator<Item = (&'de CompactString, &'de BsonValue)>> MapAccess<'de>
    for MapDeserializer<'de, I>
{
    type Error = BsonError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Self::Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(key.as_str().into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> Result<V::Value, Self::Error> {
        let value = self
            .value
            .take()
            .ok_or_else(|| BsonError::Deserialization("No value".to_string()))?;
        seed.deserialize(Deserializer::new(value))
    }
}

struct EnumDeserializer<'de> {
    variant: &'de str,
    value: &'de BsonValue,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer<'de> {
    type Error = BsonError;
    type Variant = VariantDeserializer<'de>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), Self::Error> {
        use serde::de::value::StrDeserializer;
        let deserializer: StrDeserializer<'de, BsonError> = self.variant.into_deserializer();
        let variant = seed.deserialize(deserializer)?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer<'de> {
    value: &'de BsonValue,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer<'de> {
    type Error = BsonError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(
        self,
        seed: T,
    ) -> Result<T::Value, Self::Error> {
        seed.deserialize(Deserializer::new(self.value))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error> {
        de::Deserializer::deserialize_seq(Deserializer::new(self.value), visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        de::Deserializer::deserialize_map(Deserializer::new(self.value), visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ser::{to_bson, to_document};
    use crate::value::{Binary, Timestamp};
    use crate::{bson, doc, ObjectId};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: ObjectId,
        name: String,
        age: u8,
        score: f64,
        initial: char,
        email: Option<String>,
        roles: Vec<Role>,
        meta: HashMap<String, i64>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Role {
        Admin,
        Guest(u32),
        Scoped { db: String },
        Pair(i32, bool),
    }

    #[test]
    fn test_roundtrip_struct() {
        let user = User {
            id: ObjectId::from_bytes([3; 12]),
            name: "miku".to_string(),
            age: 16,
            score: 39.5,
            initial: 'm',
            email: None,
            roles: vec![
                Role::Admin,
                Role::Guest(7),
                Role::Scoped { db: "test".into() },
                Role::Pair(-1, true),
            ],
            meta: HashMap::from([("visits".to_string(), 3i64)]),
        };

        let doc = to_document(&user).unwrap();
        assert_eq!(doc.get_str("id"), Some("030303030303030303030303"));
        let restored: User = from_document(&doc).unwrap();
        assert_eq!(restored, user);

        let bytes = doc.to_bytes().unwrap();
        let decoded: User = from_document(&Document::from_bytes(&bytes).unwrap()).unwrap();
        assert_eq!(decoded, user);
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(from_bson::<i64>(&BsonValue::Int32(-5)).unwrap(), -5);
        assert_eq!(from_bson::<i32>(&BsonValue::Int64(5)).unwrap(), 5);
        assert!(from_bson::<i32>(&BsonValue::Int64(i64::MAX)).is_err());
        assert_eq!(from_bson::<u64>(&BsonValue::Int64(i64::MAX)).unwrap(), i64::MAX as u64);
        assert!(from_bson::<u32>(&BsonValue::Int32(-1)).is_err());
        assert!(from_bson::<u8>(&BsonValue::Int32(300)).is_err());
        assert_eq!(from_bson::<i64>(&BsonValue::Date(1_000)).unwrap(), 1_000);
        assert_eq!(from_bson::<f64>(&BsonValue::Int32(2)).unwrap(), 2.0);
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = from_bson::<bool>(&bson!("yes")).unwrap_err();
        assert!(matches!(&err, BsonError::Deserialization(msg) if msg == "Expected boolean, got string"));
        assert!(from_bson::<char>(&bson!("ab")).is_err());
        assert_eq!(from_bson::<char>(&bson!("é")).unwrap(), 'é');
    }

    #[test]
    fn test_any_uses_extended_json_for_special_types() {
        let mut doc = doc! { "n": 1, "s": "x", "arr": [true, null] };
        doc.insert("date", BsonValue::Date(42));
        doc.insert("ts", Timestamp::new(10, 1));
        doc.insert("max", BsonValue::MaxKey);
        doc.insert("oid", ObjectId::from_bytes([0xAB; 12]));

        let value: serde_json::Value = from_document(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "n": 1,
                "s": "x",
                "arr": [true, null],
                "date": { "$date": 42 },
                "ts": { "$timestamp": { "t": 10, "i": 1 } },
                "max": { "$maxKey": 1 },
                "oid": "abababababababababababab"
            })
        );
    }

    #[test]
    fn test_bytes_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Blob {
            #[serde(with = "bytes_as_binary")]
            data: Vec<u8>,
        }

        mod bytes_as_binary {
            use serde::{Deserializer, Serializer};

            pub fn serialize<S: Serializer>(v: &[u8], s: S) -> Result<S::Ok, S::Error> {
                s.serialize_bytes(v)
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
                struct BytesVisitor;
                impl<'de> serde::de::Visitor<'de> for BytesVisitor {
                    type Value = Vec<u8>;
                    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                        f.write_str("bytes")
                    }
                    fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<Vec<u8>, E> {
                        Ok(v.to_vec())
                    }
                }
                d.deserialize_bytes(BytesVisitor)
            }
        }

        let blob = Blob { data: vec![0xDE, 0xAD] };
        let value = to_bson(&blob).unwrap();
        assert_eq!(value.get("data"), Some(&BsonValue::Binary(Binary::generic(vec![0xDE, 0xAD]))));
        assert_eq!(from_bson::<Blob>(&value).unwrap(), blob);
    }
}
