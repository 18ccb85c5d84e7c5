//! 测试用的 proptest 值生成策略

use crate::document::Document;
use crate::spec::BinarySubtype;
use crate::value::{Binary, BsonValue, Code, Regex, Timestamp};
use binaryjson_common::ObjectId;
use proptest::prelude::*;

/// 覆盖所有可构造变体的值，最多嵌套 4 层
///
/// Double 不含 NaN，便于按相等比较往返结果
pub(crate) fn arb_value() -> impl Strategy<Value = BsonValue> {
    let leaf = prop_oneof![
        Just(BsonValue::Null),
        any::<bool>().prop_map(BsonValue::Boolean),
        any::<i32>().prop_map(BsonValue::Int32),
        any::<i64>().prop_map(BsonValue::Int64),
        any::<f64>()
            .prop_filter("NaN is not equal to itself", |f| !f.is_nan())
            .prop_map(BsonValue::Double),
        ".{0,12}".prop_map(BsonValue::from),
        any::<i64>().prop_map(BsonValue::Date),
        (any::<u32>(), any::<u32>()).prop_map(|(t, i)| BsonValue::from(Timestamp::new(t, i))),
        (prop_oneof![Just(0u8), Just(1), Just(4), Just(5), 0x80u8..=0xFF], proptest::collection::vec(any::<u8>(), 0..16))
            .prop_map(|(s, b)| BsonValue::Binary(Binary::new(BinarySubtype::from_wire(s), b))),
        proptest::array::uniform12(any::<u8>()).prop_map(|b| BsonValue::ObjectId(ObjectId::from_bytes(b))),
        ("[a-z^$.*]{0,6}", "[imsx]{0,3}").prop_map(|(p, o)| BsonValue::from(Regex::new(p, o))),
        ".{0,10}".prop_map(|c| BsonValue::from(Code::new(c))),
        Just(BsonValue::MinKey),
        Just(BsonValue::MaxKey),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(BsonValue::Array),
            arb_fields(inner.clone()).prop_map(BsonValue::Document),
            (".{0,10}", arb_fields(inner))
                .prop_map(|(c, scope)| BsonValue::from(Code::with_scope(c, scope))),
        ]
    })
}

fn arb_fields(inner: impl Strategy<Value = BsonValue>) -> impl Strategy<Value = Document> {
    proptest::collection::vec(("[a-zA-Z0-9_$.]{0,8}", inner), 0..6)
        .prop_map(|fields| fields.into_iter().collect())
}

pub(crate) fn arb_document() -> impl Strategy<Value = Document> {
    arb_fields(arb_value())
}
