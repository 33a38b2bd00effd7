//! Benchmarks for syntax and schema validation.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ldconsole::validate::Validator;
use serde_json::json;

fn entities(count: usize) -> String {
    let items: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "id": format!("urn:ngsi-ld:Room:{i}"),
                "type": "Room",
                "temperature": {"type": "Property", "value": 20 + i % 5},
                "isPartOf": {"type": "Relationship", "object": "urn:ngsi-ld:Building:1"}
            })
        })
        .collect();
    serde_json::to_string_pretty(&items).unwrap_or_default()
}

fn bench_syntax_only(c: &mut Criterion) {
    let text = entities(200);
    let validator = Validator::default();
    c.bench_function("validate_syntax_200", |b| {
        b.iter(|| validator.validate_text(black_box(&text)))
    });
}

fn bench_schema_violations(c: &mut Criterion) {
    let text = entities(200);
    let schema = json!({
        "type": "array",
        "items": {
            "type": "object",
            "required": ["id", "type", "owner"],
            "properties": {"id": {"type": "string", "pattern": "^urn:ngsi-ld:"}}
        }
    });
    let validator = Validator::new(Some(&schema));
    c.bench_function("validate_schema_200", |b| {
        b.iter(|| validator.validate_text(black_box(&text)))
    });
}

fn bench_syntax_error(c: &mut Criterion) {
    let mut text = entities(200);
    text.truncate(text.len() / 2);
    let validator = Validator::default();
    c.bench_function("validate_truncated", |b| {
        b.iter(|| validator.validate_text(black_box(&text)))
    });
}

criterion_group!(benches, bench_syntax_only, bench_schema_violations, bench_syntax_error);
criterion_main!(benches);
