//! BSON 编解码模块
//!
//! 文档 = int32 总长度(含自身与结束符) + 元素序列 + 0x00。
//! 元素 = 类型标记 + cstring 键 + 按类型写出的负载。
//!
//! 编码器先把子文档写入临时缓冲区，测得长度后再写长度前缀，不做预估。
//! 解码器对每一层文档按声明长度切片，越界读取、结束符位置不符都会报错，
//! 错误中的偏移相对于传入缓冲区的起点。

use crate::document::Document;
use crate::spec::{BinarySubtype, ElementType, MIN_DOCUMENT_SIZE};
use crate::value::{Binary, BsonValue, Code, LegacyKind, LegacyValue, Regex, Timestamp};
use crate::{BsonError, BsonResult};
use binaryjson_common::{CodecConfig, ObjectId};
use bytes::{BufMut, BytesMut};
use compact_str::CompactString;
use tracing::debug;

/// 编码文档为字节向量
///
/// # Brief
/// 将文档序列化为 BSON 字节
///
/// # Arguments
/// * `doc` - 要编码的文档
///
/// # Returns
/// 成功返回字节向量；键中含 NUL 时返回 `InvalidKey`
///
/// # 注意
/// 编码器不限制嵌套深度。嵌套层数超过解码端 `CodecConfig::max_depth`
/// 的文档可以编码，但解码时返回 `DepthExceeded`。
pub fn encode(doc: &Document) -> BsonResult<Vec<u8>> {
    let mut buf = BytesMut::with_capacity(256);
    encode_to(doc, &mut buf)?;
    Ok(buf.to_vec())
}

/// 编码文档并追加到缓冲区
///
/// 出错时缓冲区内容不变。
pub fn encode_to(doc: &Document, buf: &mut BytesMut) -> BsonResult<()> {
    let mut body = BytesMut::with_capacity(256);
    Encoder::new(&mut body).write_document(doc)?;
    buf.put_slice(&body);
    Ok(())
}

/// 使用默认配置解码
///
/// # Brief
/// 缓冲区必须恰好包含一个文档，多个首尾相接的文档请使用 `Reader`
///
/// # Arguments
/// * `data` - 要解码的字节切片
///
/// # Returns
/// 成功返回 Document，失败返回带偏移的错误
pub fn decode(data: &[u8]) -> BsonResult<Document> {
    decode_with(data, &CodecConfig::default())
}

/// 使用指定配置解码
pub fn decode_with(data: &[u8], config: &CodecConfig) -> BsonResult<Document> {
    let result = decode_prefix(data, 0, config).and_then(|(doc, used)| {
        if used != data.len() {
            return Err(BsonError::LengthMismatch {
                offset: 0,
                declared: used,
                actual: data.len(),
            });
        }
        Ok(doc)
    });
    result.map_err(|e| {
        debug!(error = %e, len = data.len(), "BSON decode failed");
        e
    })
}

/// 解码 `data` 开头的一个文档，返回文档与其占用的字节数
///
/// `base` 为 `data[0]` 在原始缓冲区中的偏移，仅用于错误报告。
pub(crate) fn decode_prefix(
    data: &[u8],
    base: usize,
    config: &CodecConfig,
) -> BsonResult<(Document, usize)> {
    read_document(data, base, 1, config)
}

/// BSON 编码器
///
/// 内部结构，将元素写入借用的缓冲区
struct Encoder<'a> {
    buf: &'a mut BytesMut,
}

impl<'a> Encoder<'a> {
    fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf }
    }

    fn write_document(&mut self, doc: &Document) -> BsonResult<()> {
        let mut body = BytesMut::new();
        {
            let mut inner = Encoder::new(&mut body);
            for (key, value) in doc.iter() {
                inner.write_element(key, value)?;
            }
        }
        self.put_framed(body)
    }

    fn write_array(&mut self, arr: &[BsonValue]) -> BsonResult<()> {
        let mut body = BytesMut::new();
        {
            let mut inner = Encoder::new(&mut body);
            for (index, value) in arr.iter().enumerate() {
                inner.write_element(&index.to_string(), value)?;
            }
        }
        self.put_framed(body)
    }

    /// 写出 int32 长度 + 元素 + 结束符
    fn put_framed(&mut self, mut body: BytesMut) -> BsonResult<()> {
        body.put_u8(0);
        let total = body.len() + 4;
        self.buf.put_i32_le(to_i32_len(total)?);
        self.buf.put_slice(&body);
        Ok(())
    }

    fn write_element(&mut self, key: &str, value: &BsonValue) -> BsonResult<()> {
        if key.as_bytes().contains(&0) {
            return Err(BsonError::InvalidKey { key: key.into() });
        }
        self.buf.put_u8(value.element_type().as_u8());
        self.put_cstring(key);

        match value {
            BsonValue::Null | BsonValue::MinKey | BsonValue::MaxKey => {}
            BsonValue::Boolean(b) => self.buf.put_u8(u8::from(*b)),
            BsonValue::Int32(n) => self.buf.put_i32_le(*n),
            BsonValue::Int64(n) => self.buf.put_i64_le(*n),
            BsonValue::Double(n) => self.buf.put_f64_le(*n),
            BsonValue::String(s) => self.write_string(s)?,
            BsonValue::Array(arr) => self.write_array(arr)?,
            BsonValue::Document(doc) => self.write_document(doc)?,
            BsonValue::Date(ms) => self.buf.put_i64_le(*ms),
            BsonValue::Timestamp(ts) => {
                self.buf.put_u32_le(ts.increment);
                self.buf.put_u32_le(ts.time);
            }
            BsonValue::Binary(b) => {
                self.buf.put_i32_le(to_i32_len(b.bytes.len())?);
                self.buf.put_u8(b.subtype.as_u8());
                self.buf.put_slice(&b.bytes);
            }
            BsonValue::ObjectId(id) => self.buf.put_slice(id.as_bytes()),
            BsonValue::RegularExpression(r) => {
                if r.pattern.as_bytes().contains(&0) {
                    return Err(BsonError::InvalidCString { field: "pattern" });
                }
                if r.options.as_bytes().contains(&0) {
                    return Err(BsonError::InvalidCString { field: "options" });
                }
                self.put_cstring(&r.pattern);
                self.put_cstring(&r.options);
            }
            BsonValue::Code(code) => match &code.scope {
                None => self.write_string(&code.code)?,
                Some(scope) => {
                    let mut body = BytesMut::new();
                    {
                        let mut inner = Encoder::new(&mut body);
                        inner.write_string(&code.code)?;
                        inner.write_document(scope)?;
                    }
                    self.buf.put_i32_le(to_i32_len(body.len() + 4)?);
                    self.buf.put_slice(&body);
                }
            },
            BsonValue::Legacy(legacy) => match legacy.kind() {
                LegacyKind::Undefined => {}
                LegacyKind::Symbol(s) => self.write_string(s)?,
                LegacyKind::DbPointer { namespace, id } => {
                    self.write_string(namespace)?;
                    self.buf.put_slice(id.as_bytes());
                }
            },
        }
        Ok(())
    }

    /// int32 字节长度(含 NUL) + UTF-8 + NUL
    fn write_string(&mut self, s: &str) -> BsonResult<()> {
        self.buf.put_i32_le(to_i32_len(s.len() + 1)?);
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
        Ok(())
    }

    fn put_cstring(&mut self, s: &str) {
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
    }
}

fn to_i32_len(len: usize) -> BsonResult<i32> {
    i32::try_from(len).map_err(|_| BsonError::DocumentTooLarge {
        size: len,
        max: i32::MAX as usize,
    })
}

/// 解码 `data` 开头的文档
fn read_document(
    data: &[u8],
    base: usize,
    depth: usize,
    config: &CodecConfig,
) -> BsonResult<(Document, usize)> {
    let mut decoder = Decoder::enter(data, base, depth, config)?;
    let mut doc = Document::new();
    while let Some((key, _, value)) = decoder.next_element()? {
        doc.insert(key, value);
    }
    Ok((doc, decoder.data.len()))
}

/// 解码 `data` 开头的数组，丢弃数字键，按出现顺序返回元素
fn read_array(
    data: &[u8],
    base: usize,
    depth: usize,
    config: &CodecConfig,
) -> BsonResult<(Vec<BsonValue>, usize)> {
    let mut decoder = Decoder::enter(data, base, depth, config)?;
    let mut arr = Vec::new();
    while let Some((key, key_offset, value)) = decoder.next_element()? {
        if config.strict_array_keys {
            let expected = arr.len().to_string();
            if key != expected {
                return Err(BsonError::MalformedArrayKeys {
                    offset: key_offset,
                    expected,
                    found: key,
                });
            }
        }
        arr.push(value);
    }
    Ok((arr, decoder.data.len()))
}

/// BSON 解码器
///
/// 覆盖单个文档的字节范围，`data` 恰为声明长度
struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
    /// 当前元素类型标记的位置
    element: usize,
    depth: usize,
    config: &'a CodecConfig,
}

impl<'a> Decoder<'a> {
    /// 读取并校验文档头
    ///
    /// # Brief
    /// 检查深度、最小长度、体积上限以及声明长度是否超出可用字节
    fn enter(
        data: &'a [u8],
        base: usize,
        depth: usize,
        config: &'a CodecConfig,
    ) -> BsonResult<Self> {
        if depth > config.max_depth {
            return Err(BsonError::DepthExceeded(config.max_depth));
        }
        if data.len() < 4 {
            return Err(BsonError::TruncatedInput {
                offset: base,
                needed: 4,
                available: data.len(),
            });
        }
        let declared = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if declared < MIN_DOCUMENT_SIZE as i32 {
            return Err(BsonError::InvalidDocument {
                offset: base,
                reason: format!("document length {} below minimum {}", declared, MIN_DOCUMENT_SIZE),
            });
        }
        let declared = declared as usize;
        if declared > config.max_document_size {
            return Err(BsonError::DocumentTooLarge {
                size: declared,
                max: config.max_document_size,
            });
        }
        if declared > data.len() {
            return Err(BsonError::TruncatedInput {
                offset: base,
                needed: declared,
                available: data.len(),
            });
        }
        Ok(Self {
            data: &data[..declared],
            pos: 4,
            base,
            element: 4,
            depth,
            config,
        })
    }

    /// 读取下一个元素
    ///
    /// # Returns
    /// `Some((键, 键的偏移, 值))`；遇到结束符且恰好位于声明末尾时返回 `None`
    fn next_element(&mut self) -> BsonResult<Option<(CompactString, usize, BsonValue)>> {
        let tag_offset = self.pos;
        self.element = tag_offset;
        let tag = self.read_u8()?;
        if tag == 0 {
            if self.pos != self.data.len() {
                return Err(BsonError::LengthMismatch {
                    offset: self.base,
                    declared: self.data.len(),
                    actual: self.pos,
                });
            }
            return Ok(None);
        }
        let key_offset = self.abs(self.pos);
        let key = self.read_cstring()?;
        let value = self.read_value(tag, &key, tag_offset)?;
        Ok(Some((key, key_offset, value)))
    }

    fn read_value(&mut self, tag: u8, key: &CompactString, tag_offset: usize) -> BsonResult<BsonValue> {
        let element_type = ElementType::from_u8(tag).ok_or_else(|| BsonError::UnsupportedType {
            tag,
            key: key.clone(),
            offset: self.abs(tag_offset),
        })?;

        let value = match element_type {
            ElementType::Double => BsonValue::Double(f64::from_le_bytes(self.read_array::<8>()?)),
            ElementType::String => BsonValue::String(self.read_string()?),
            ElementType::Document => {
                let (doc, used) =
                    read_document(self.rest(), self.abs(self.pos), self.depth + 1, self.config)?;
                self.pos += used;
                BsonValue::Document(doc)
            }
            ElementType::Array => {
                let (arr, used) =
                    read_array(self.rest(), self.abs(self.pos), self.depth + 1, self.config)?;
                self.pos += used;
                BsonValue::Array(arr)
            }
            ElementType::Binary => {
                let len_offset = self.pos;
                let len = self.read_i32()?;
                if len < 0 {
                    return Err(self.invalid(len_offset, format!("negative binary length {}", len)));
                }
                let subtype = BinarySubtype::from_wire(self.read_u8()?);
                let bytes = self.take(len as usize)?.to_vec();
                BsonValue::Binary(Binary { subtype, bytes })
            }
            ElementType::Undefined => BsonValue::Legacy(LegacyValue::new(LegacyKind::Undefined)),
            ElementType::ObjectId => BsonValue::ObjectId(ObjectId::from_bytes(self.read_array::<12>()?)),
            ElementType::Boolean => {
                let offset = self.pos;
                match self.read_u8()? {
                    0 => BsonValue::Boolean(false),
                    1 => BsonValue::Boolean(true),
                    b => return Err(self.invalid(offset, format!("invalid boolean byte 0x{:02X}", b))),
                }
            }
            ElementType::DateTime => BsonValue::Date(self.read_i64()?),
            ElementType::Null => BsonValue::Null,
            ElementType::RegularExpression => {
                let pattern = self.read_cstring()?;
                let options = self.read_cstring()?;
                BsonValue::RegularExpression(Regex { pattern, options })
            }
            ElementType::DbPointer => {
                let namespace = self.read_string()?;
                let id = ObjectId::from_bytes(self.read_array::<12>()?);
                BsonValue::Legacy(LegacyValue::new(LegacyKind::DbPointer { namespace, id }))
            }
            ElementType::JavaScriptCode => BsonValue::Code(Code::new(self.read_string()?)),
            ElementType::Symbol => {
                BsonValue::Legacy(LegacyValue::new(LegacyKind::Symbol(self.read_string()?)))
            }
            ElementType::JavaScriptCodeWithScope => self.read_code_with_scope()?,
            ElementType::Int32 => BsonValue::Int32(self.read_i32()?),
            ElementType::Timestamp => {
                let increment = self.read_u32()?;
                let time = self.read_u32()?;
                BsonValue::Timestamp(Timestamp { time, increment })
            }
            ElementType::Int64 => BsonValue::Int64(self.read_i64()?),
            ElementType::MinKey => BsonValue::MinKey,
            ElementType::MaxKey => BsonValue::MaxKey,
        };
        Ok(value)
    }

    /// int32 总长度 + string 代码 + document 作用域
    fn read_code_with_scope(&mut self) -> BsonResult<BsonValue> {
        const MIN_CODE_WITH_SCOPE: usize = 4 + 4 + 1 + MIN_DOCUMENT_SIZE;

        let start = self.pos;
        let total = self.read_i32()?;
        if total < MIN_CODE_WITH_SCOPE as i32 {
            return Err(self.invalid(start, format!("code with scope length {} too small", total)));
        }
        let total = total as usize;
        let available = self.data.len() - start;
        if total > available {
            return Err(BsonError::TruncatedInput {
                offset: self.abs(start),
                needed: total,
                available,
            });
        }
        let code = self.read_string()?;
        let (scope, used) =
            read_document(self.rest(), self.abs(self.pos), self.depth + 1, self.config)?;
        self.pos += used;
        let consumed = self.pos - start;
        if consumed != total {
            return Err(BsonError::LengthMismatch {
                offset: self.abs(start),
                declared: total,
                actual: consumed,
            });
        }
        Ok(BsonValue::Code(Code::with_scope(code, scope)))
    }

    fn abs(&self, pos: usize) -> usize {
        self.base + pos
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn invalid(&self, pos: usize, reason: String) -> BsonError {
        BsonError::InvalidDocument {
            offset: self.abs(pos),
            reason,
        }
    }

    /// 读取 n 字节，超出文档声明长度视为长度不符
    ///
    /// 错误偏移指向越界元素的类型标记
    fn take(&mut self, n: usize) -> BsonResult<&'a [u8]> {
        if self.data.len() - self.pos < n {
            return Err(BsonError::LengthMismatch {
                offset: self.abs(self.element),
                declared: self.data.len(),
                actual: self.pos + n,
            });
        }
        let data: &'a [u8] = self.data;
        let bytes = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> BsonResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn read_u8(&mut self) -> BsonResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_i32(&mut self) -> BsonResult<i32> {
        Ok(i32::from_le_bytes(self.read_array::<4>()?))
    }

    fn read_u32(&mut self) -> BsonResult<u32> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    fn read_i64(&mut self) -> BsonResult<i64> {
        Ok(i64::from_le_bytes(self.read_array::<8>()?))
    }

    fn read_cstring(&mut self) -> BsonResult<CompactString> {
        let start = self.pos;
        let len = self.data[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| self.invalid(start, "unterminated cstring".to_string()))?;
        let bytes = self.take(len)?;
        self.pos += 1;
        self.utf8(bytes, start)
    }

    fn read_string(&mut self) -> BsonResult<CompactString> {
        let len_offset = self.pos;
        let len = self.read_i32()?;
        if len < 1 {
            return Err(self.invalid(len_offset, format!("invalid string length {}", len)));
        }
        let start = self.pos;
        let bytes = self.take(len as usize)?;
        let (text, terminator) = bytes.split_at(bytes.len() - 1);
        if terminator != [0] {
            return Err(self.invalid(start, "string is not NUL-terminated".to_string()));
        }
        self.utf8(text, start)
    }

    fn utf8(&self, bytes: &[u8], start: usize) -> BsonResult<CompactString> {
        std::str::from_utf8(bytes)
            .map(CompactString::from)
            .map_err(|source| BsonError::Utf8 {
                offset: self.abs(start) + source.valid_up_to(),
                source,
            })
    }
}
