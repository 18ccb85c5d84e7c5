use binaryjson::{decode, doc, encode, Binary, Document, ObjectId, Reader, Timestamp};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn sample_document() -> Document {
    let mut doc = doc! {
        "name": "Miku",
        "age": 16,
        "active": true,
        "score": 99.5,
        "tags": ["vocaloid", "crypton", "v3"],
        "address": { "street": "123 Main St", "city": "Tokyo" }
    };
    doc.insert("_id", ObjectId::from_bytes([7; 12]));
    doc.insert("avatar", Binary::generic(vec![0xAB; 256]));
    doc.insert("ts", Timestamp::new(1_700_000_000, 1));
    doc
}

fn bench_encode(c: &mut Criterion) {
    let doc = sample_document();
    c.bench_function("document_encode", |b| b.iter(|| encode(black_box(&doc))));
}

fn bench_decode(c: &mut Criterion) {
    let encoded = encode(&sample_document()).unwrap();
    c.bench_function("document_decode", |b| b.iter(|| decode(black_box(&encoded))));
}

fn bench_extended_json(c: &mut Criterion) {
    let doc = sample_document();
    c.bench_function("document_extended_json", |b| {
        b.iter(|| black_box(&doc).to_extended_json_string())
    });
}

fn bench_reader(c: &mut Criterion) {
    let one = encode(&sample_document()).unwrap();
    let buf: Vec<u8> = std::iter::repeat(one).take(100).flatten().collect();
    c.bench_function("reader_100_documents", |b| {
        b.iter(|| Reader::new(black_box(&buf)).filter(|r| r.is_ok()).count())
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_extended_json,
    bench_reader,
);

criterion_main!(benches);
