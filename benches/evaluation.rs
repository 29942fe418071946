use calcfield::ast::{Context, Parser, Value};
use calcfield::FormulaEngine;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use evalexpr::*;
use rand::Rng;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn random_contexts(count: usize) -> Vec<Context> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| {
            Context::from([
                ("price".to_string(), Value::Number(rng.random_range(1.0..500.0))),
                ("qty".to_string(), Value::Number(rng.random_range(0.0f64..100.0).floor())),
                ("tax".to_string(), Value::Number(rng.random_range(0.0..0.3))),
            ])
        })
        .collect()
}

/// Benchmark tokenizing and parsing
fn benchmark_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Formula Parsing");

    let simple = "2 + 3 * 4";
    let nested = r#"IF([score] >= 90, "A", IF([score] >= 80, "B", CONCAT("C", [suffix])))"#;

    group.bench_function("parse_simple", |b| {
        b.iter(|| Parser::parse_formula(black_box(simple)).unwrap())
    });

    group.bench_function("parse_nested", |b| {
        b.iter(|| Parser::parse_formula(black_box(nested)).unwrap())
    });

    group.bench_function("evalexpr_build_operator_tree", |b| {
        b.iter(|| build_operator_tree::<DefaultNumericTypes>(black_box(simple)).unwrap())
    });
}

/// Benchmark arithmetic against native Rust and evalexpr
fn benchmark_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("Arithmetic Evaluation");
    let rt = runtime();
    let engine = FormulaEngine::offline();
    let context = Context::new();

    let expr = "(10 + 20) * 3 / (4 - 1) + 5";
    let ast = Parser::parse_formula(expr).unwrap();
    let precompiled_evalexpr = build_operator_tree::<DefaultNumericTypes>(expr).unwrap();

    group.bench_function("formula_arithmetic", |b| {
        b.to_async(&rt)
            .iter(|| async { engine.evaluate_formula(black_box(expr), &context).await })
    });

    group.bench_function("pre_parsed_arithmetic", |b| {
        b.to_async(&rt)
            .iter(|| async { engine.evaluate_ast(black_box(&ast), &context).await })
    });

    group.bench_function("native_rust_arithmetic", |b| {
        b.iter(|| black_box((10.0 + 20.0) * 3.0 / (4.0 - 1.0) + 5.0))
    });

    group.bench_function("evalexpr_arithmetic", |b| {
        b.iter(|| evalexpr::eval(black_box(expr)).unwrap())
    });

    group.bench_function("precompiled_evalexpr_arithmetic", |b| {
        b.iter(|| precompiled_evalexpr.eval().unwrap())
    });
}

/// Benchmark nested builtin calls
fn benchmark_function_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("Function Call Evaluation");
    let rt = runtime();
    let engine = FormulaEngine::offline();

    let context = Context::from([
        ("firstName".to_string(), Value::from("ada")),
        ("lastName".to_string(), Value::from("lovelace")),
        ("score".to_string(), Value::from(85.0)),
    ]);
    let ast = Parser::parse_formula(
        r#"CONCAT(UPPER(LEFT([firstName], 1)), ". ", AI_FORMAT_NAME([lastName]), " ", IF([score] > 80, "pass", "fail"))"#,
    )
    .unwrap();

    group.bench_function("nested_text_functions", |b| {
        b.to_async(&rt)
            .iter(|| async { engine.evaluate_ast(black_box(&ast), &context).await })
    });

    let sum = Parser::parse_formula("ROUND(AVG([a], [b], [c], SUM([a], [b])), 2)").unwrap();
    let numbers = Context::from([
        ("a".to_string(), Value::from(1.5)),
        ("b".to_string(), Value::from(2.25)),
        ("c".to_string(), Value::from(7.0)),
    ]);

    group.bench_function("nested_math_functions", |b| {
        b.to_async(&rt)
            .iter(|| async { engine.evaluate_ast(black_box(&sum), &numbers).await })
    });
}

/// Benchmark one formula over many records
fn benchmark_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("Batch Evaluation");
    let rt = runtime();
    let engine = FormulaEngine::offline();

    let ast = Parser::parse_formula("IF([qty] > 0, ROUND([price] * [qty] * (1 + [tax]), 2), 0)")
        .unwrap();
    let contexts = random_contexts(1_000);

    group.bench_function("batch_1000_records", |b| {
        b.to_async(&rt)
            .iter(|| async { engine.evaluate_batch(black_box(&ast), &contexts).await })
    });

    group.bench_function("sequential_1000_records", |b| {
        b.to_async(&rt).iter(|| async {
            for context in &contexts {
                black_box(engine.evaluate_ast(&ast, context).await.ok());
            }
        })
    });
}

criterion_group!(
    benches,
    benchmark_parsing,
    benchmark_arithmetic,
    benchmark_function_calls,
    benchmark_batch,
);
criterion_main!(benches);
