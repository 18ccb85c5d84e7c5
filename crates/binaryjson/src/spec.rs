//! BSON 线格式常量
//!
//! 元素类型标记与二进制子类型，见 <http://bsonspec.org/spec.html>。

use std::fmt;

/// 最小文档: int32 长度 + 结束符
pub const MIN_DOCUMENT_SIZE: usize = 5;

/// 元素类型标记
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Double = 0x01,
    String = 0x02,
    Document = 0x03,
    Array = 0x04,
    Binary = 0x05,
    Undefined = 0x06,
    ObjectId = 0x07,
    Boolean = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    RegularExpression = 0x0B,
    DbPointer = 0x0C,
    JavaScriptCode = 0x0D,
    Symbol = 0x0E,
    JavaScriptCodeWithScope = 0x0F,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    MaxKey = 0x7F,
    MinKey = 0xFF,
}

impl ElementType {
    /// 由标记字节识别类型；0x13 (Decimal128) 等不在值模型内的标记返回 None
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Double),
            0x02 => Some(Self::String),
            0x03 => Some(Self::Document),
            0x04 => Some(Self::Array),
            0x05 => Some(Self::Binary),
            0x06 => Some(Self::Undefined),
            0x07 => Some(Self::ObjectId),
            0x08 => Some(Self::Boolean),
            0x09 => Some(Self::DateTime),
            0x0A => Some(Self::Null),
            0x0B => Some(Self::RegularExpression),
            0x0C => Some(Self::DbPointer),
            0x0D => Some(Self::JavaScriptCode),
            0x0E => Some(Self::Symbol),
            0x0F => Some(Self::JavaScriptCodeWithScope),
            0x10 => Some(Self::Int32),
            0x11 => Some(Self::Timestamp),
            0x12 => Some(Self::Int64),
            0x7F => Some(Self::MaxKey),
            0xFF => Some(Self::MinKey),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// 二进制子类型分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubtypeKind {
    Generic,
    Function,
    /// 0x02，已废弃
    BinaryOld,
    /// 0x03，已废弃
    UuidOld,
    Uuid,
    Md5,
    /// 0x80-0xFF
    User(u8),
    /// 0x06-0x7F 中未定义的保留值
    Reserved(u8),
}

/// 二进制子类型
///
/// 保存原始字节，解码时遇到的任何值都原样保留。
/// 废弃子类型与保留值只能由解码器产生。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinarySubtype(u8);

impl BinarySubtype {
    pub const GENERIC: Self = Self(0x00);
    pub const FUNCTION: Self = Self(0x01);
    pub const UUID: Self = Self(0x04);
    pub const MD5: Self = Self(0x05);

    /// 用户自定义子类型，只接受 0x80-0xFF
    pub fn user(byte: u8) -> Option<Self> {
        (byte >= 0x80).then_some(Self(byte))
    }

    pub(crate) fn from_wire(byte: u8) -> Self {
        Self(byte)
    }

    pub fn as_u8(self) -> u8 {
        self.0
    }

    pub fn kind(self) -> SubtypeKind {
        match self.0 {
            0x00 => SubtypeKind::Generic,
            0x01 => SubtypeKind::Function,
            0x02 => SubtypeKind::BinaryOld,
            0x03 => SubtypeKind::UuidOld,
            0x04 => SubtypeKind::Uuid,
            0x05 => SubtypeKind::Md5,
            b if b >= 0x80 => SubtypeKind::User(b),
            b => SubtypeKind::Reserved(b),
        }
    }

    /// 是否为废弃或未定义的子类型
    pub fn is_legacy(self) -> bool {
        matches!(
            self.kind(),
            SubtypeKind::BinaryOld | SubtypeKind::UuidOld | SubtypeKind::Reserved(_)
        )
    }
}

impl Default for BinarySubtype {
    fn default() -> Self {
        Self::GENERIC
    }
}

impl fmt::Debug for BinarySubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02X})", self.kind(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_round_trip() {
        for byte in 0u8..=0xFF {
            if let Some(t) = ElementType::from_u8(byte) {
                assert_eq!(t.as_u8(), byte);
            }
        }
        assert_eq!(ElementType::from_u8(0x13), None);
        assert_eq!(ElementType::from_u8(0x00), None);
    }

    #[test]
    fn test_subtype_kinds() {
        assert_eq!(BinarySubtype::GENERIC.kind(), SubtypeKind::Generic);
        assert_eq!(BinarySubtype::from_wire(0x02).kind(), SubtypeKind::BinaryOld);
        assert_eq!(BinarySubtype::from_wire(0x03).kind(), SubtypeKind::UuidOld);
        assert_eq!(BinarySubtype::from_wire(0x42).kind(), SubtypeKind::Reserved(0x42));
        assert_eq!(BinarySubtype::user(0x80).map(|s| s.kind()), Some(SubtypeKind::User(0x80)));
        assert!(BinarySubtype::user(0x7F).is_none());
        assert!(BinarySubtype::from_wire(0x03).is_legacy());
        assert!(!BinarySubtype::MD5.is_legacy());
    }
}
