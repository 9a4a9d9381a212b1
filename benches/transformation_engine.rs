//! Transformation engine benchmarks across rule-set size and rule flavor.

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use scim_gateway_core::transform::{ConflictResolution, RuleType, TransformationEngine, TransformationRule};

fn exact_rules(count: usize) -> Vec<TransformationRule> {
    (0..count)
        .map(|i| {
            TransformationRule::new(
                format!("r{i}"),
                "tenant-a",
                "provider-a",
                RuleType::Exact,
                format!("Group-{i}"),
                format!("entitlement-{i}"),
            )
            .with_priority(i as i32)
        })
        .collect()
}

fn hierarchical_rules(count: usize) -> Vec<TransformationRule> {
    (0..count)
        .map(|i| {
            TransformationRule::new(
                format!("h{i}"),
                "tenant-a",
                "provider-a",
                RuleType::Hierarchical { delimiter: "/".to_string() },
                "*",
                "${level0}-${level1}",
            )
            .with_priority(i as i32)
            .with_conflict_resolution(ConflictResolution::FirstMatch)
        })
        .collect()
}

fn bench_exact_rule_scan(c: &mut Criterion) {
    let engine = TransformationEngine::new();
    let entitlements = HashMap::new();

    let mut group = c.benchmark_group("transform_exact_scan");
    for rule_count in [10usize, 100, 1_000] {
        let rules = exact_rules(rule_count);
        group.throughput(Throughput::Elements(rule_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rule_count), &rule_count, |b, _| {
            b.iter(|| {
                black_box(
                    engine
                        .transform_group(&rules, "grp-1", "Group-500", &entitlements)
                        .unwrap(),
                )
            })
        });
    }
    group.finish();
}

fn bench_hierarchical_rule(c: &mut Criterion) {
    let engine = TransformationEngine::new();
    let rules = hierarchical_rules(1);
    let entitlements = HashMap::new();

    c.bench_function("transform_hierarchical", |b| {
        b.iter(|| {
            black_box(
                engine
                    .transform_group(&rules, "grp-1", "Engineering/Platform/Core", &entitlements)
                    .unwrap(),
            )
        })
    });
}

criterion_group!(benches, bench_exact_rule_scan, bench_hierarchical_rule);
criterion_main!(benches);
