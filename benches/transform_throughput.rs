use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use csv_recast::descriptor::Descriptor;
use csv_recast::transform;

fn descriptor() -> Descriptor {
    Descriptor::from_reader(
        r#"[
            {"name": "C-1", "changes": "size, type", "type": "T_DATE_8=>T_DATE_DB2", "size": "8=>10"},
            {"name": "C-2", "changes": "size", "type": "T_TEXT=>T_TEXT", "size": "20=>12", "size_strip": "R"},
            {"name": "C-3", "changes": "size, nb_decs, type", "type": "T_NUM_V4=>T_NUM", "size": "27=>13", "nb_decs": "10=>2"},
            {"name": "C-4", "changes": "ignore", "type": "T_TEXT=>T_TEXT", "size": "4=>4"}
        ]"#
        .as_bytes(),
    )
    .expect("parse bench descriptor")
}

fn generate_rows(count: usize) -> String {
    let mut rows = String::new();
    for i in 0..count {
        let day = (i % 28) + 1;
        rows.push_str(&format!(
            "202401{day:02};ACCOUNT_LABEL_{i:05x};       123456789,1234567890;X{i:03}\n",
            i = i % 4096
        ));
    }
    rows
}

fn bench_transform(c: &mut Criterion) {
    let rows = generate_rows(20_000);
    let mut group = c.benchmark_group("transform");

    group.bench_function("rewrite_20k_rows", |b| {
        b.iter_batched(
            || descriptor(),
            |descriptor| {
                let mut output = Vec::with_capacity(rows.len());
                transform::transform(descriptor, rows.as_bytes(), &mut output, ';')
                    .expect("transform rows");
                output
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);
