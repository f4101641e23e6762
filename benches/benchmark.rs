use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::collections::BTreeMap;

use introspect::datatype::DynamicValue;
use introspect::introspect::{create_script, update_script};
use introspect::resource::{Control, ResourceMetadata, Variable, WorkspaceResources};
use introspect::settings::TableNames;

fn workspace(size: usize) -> WorkspaceResources {
    let mut resources = WorkspaceResources::new();
    for i in 0..size {
        let metadata = ResourceMetadata {
            mod_name: Some("mod.bench".into()),
            file_name: format!("controls_{}.sp", i / 50),
            start_line_number: i as i64 * 10,
            end_line_number: i as i64 * 10 + 8,
            source_definition: format!("control \"check_{i}\" {{\n  sql = \"select 'ok'\"\n}}"),
            ..Default::default()
        };
        let mut tags = BTreeMap::new();
        tags.insert("service".to_string(), format!("svc_{}", i % 7));
        resources.add(Control {
            short_name: format!("check_{i}"),
            full_name: format!("bench.control.check_{i}"),
            title: Some(format!("Check {i}")),
            severity: Some("high".into()),
            sql: Some("select 'ok' as status".into()),
            tags: Some(tags),
            metadata: Some(metadata),
            ..Default::default()
        });
        resources.add(Variable {
            short_name: format!("var_{i}"),
            full_name: format!("var.var_{i}"),
            default: Some(DynamicValue::Tuple(vec![DynamicValue::Number(i as f64), DynamicValue::String("x".into())])),
            ..Default::default()
        });
    }
    resources
}

fn bench_scripts(c: &mut Criterion) {
    let resources = workspace(1_000);
    let tables = TableNames::default();
    c.bench_function("create_script 1000 controls", |b| {
        b.iter(|| create_script(black_box(&resources), black_box(&tables)).unwrap())
    });
    c.bench_function("update_script 1000 controls", |b| {
        b.iter(|| update_script(black_box(&resources), black_box(&tables)).unwrap())
    });
}

criterion_group!(benches, bench_scripts);
criterion_main!(benches);
