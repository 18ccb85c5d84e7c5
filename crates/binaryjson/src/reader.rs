//! 文档读取器
//!
//! 遍历缓冲区中首尾相接的零个或多个顶层文档，每次产出一个解码结果。

use crate::codec::decode_prefix;
use crate::document::Document;
use crate::{BsonError, BsonResult};
use binaryjson_common::CodecConfig;
use tracing::{debug, trace};

/// 顺序文档读取器
///
/// - 恰好位于缓冲区末尾时返回 `None`
/// - 剩余字节不足 4 或声明长度超过剩余字节时返回 `Some(Err(TruncatedInput))`
/// - 出错后不再产出任何结果
///
/// # 示例
///
/// ```rust
/// use binaryjson::{doc, encode, Reader};
///
/// let mut buf = encode(&doc! { "n": 1 }).unwrap();
/// buf.extend(encode(&doc! { "n": 2 }).unwrap());
///
/// let docs: Vec<_> = Reader::new(&buf).collect::<Result<_, _>>().unwrap();
/// assert_eq!(docs.len(), 2);
/// assert_eq!(docs[1].get_i32("n"), Some(2));
/// ```
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
    config: CodecConfig,
    failed: bool,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, CodecConfig::default())
    }

    pub fn with_config(data: &'a [u8], config: CodecConfig) -> Self {
        Self {
            data,
            offset: 0,
            config,
            failed: false,
        }
    }

    /// 下一个文档的起始偏移
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn read_next(&mut self) -> BsonResult<Document> {
        let rest = &self.data[self.offset..];
        if rest.len() < 4 {
            return Err(BsonError::TruncatedInput {
                offset: self.offset,
                needed: 4,
                available: rest.len(),
            });
        }
        let (doc, used) = decode_prefix(rest, self.offset, &self.config)?;
        trace!(offset = self.offset, len = used, fields = doc.len(), "read document");
        self.offset += used;
        Ok(doc)
    }
}

impl<'a> Iterator for Reader<'a> {
    type Item = BsonResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }
        let result = self.read_next();
        if let Err(e) = &result {
            debug!(offset = self.offset, error = %e, "reader stopped on malformed input");
            self.failed = true;
        }
        Some(result)
    }
}

impl<'a> std::iter::FusedIterator for Reader<'a> {}
