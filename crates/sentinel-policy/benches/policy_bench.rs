use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sentinel_core::types::{Environment, Tier};
use sentinel_policy::{EdgeBundle, EvaluationRequest, LocalPolicyEnforcer, OnFail, PolicyRule};
use std::collections::HashMap;

fn amount_limit_rule(max_amount: f64) -> PolicyRule {
    let mut params = HashMap::new();
    params.insert("max_amount".to_string(), serde_json::Value::from(max_amount));
    PolicyRule::new("cap", "amount_limit", params, OnFail::Deny, vec![Environment::Edge])
}

fn enforcer_with_rules(count: usize) -> LocalPolicyEnforcer {
    let rules = (0..count).map(|i| amount_limit_rule(1_000.0 * (i as f64 + 1.0))).collect();
    let mut enforcer = LocalPolicyEnforcer::new();
    enforcer.load_bundle(EdgeBundle { version: "bench".into(), hash: "h".into(), rules });
    enforcer
}

fn sample_request(amount: f64) -> EvaluationRequest<'static> {
    EvaluationRequest {
        tier: Tier::T2,
        trust_score: 0.8,
        authority_limit: 50_000.0,
        agent_status: "active",
        action_type: "write",
        amount,
        recent_similar_requests: 0,
    }
}

fn benchmark_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("enforcer_evaluate");

    for rule_count in [1, 10, 50] {
        let enforcer = enforcer_with_rules(rule_count);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(rule_count), &enforcer, |b, enforcer| {
            b.iter(|| enforcer.evaluate(black_box(&sample_request(500.0))));
        });
    }

    group.finish();
}

fn benchmark_evaluate_worst_case(c: &mut Criterion) {
    let mut group = c.benchmark_group("enforcer_evaluate_worst_case");
    group.throughput(Throughput::Elements(10_000));

    let enforcer = enforcer_with_rules(20);
    group.bench_function("10k_evaluations_all_passing", |b| {
        b.iter(|| {
            for _ in 0..10_000 {
                enforcer.evaluate(black_box(&sample_request(10.0)));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_evaluate, benchmark_evaluate_worst_case);
criterion_main!(benches);
