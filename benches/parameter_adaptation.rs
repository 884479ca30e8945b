//! Benchmarks for parameter adaptation and alias resolution
//!
//! This benchmark measures:
//! - CanonicalRequest to provider parameters for several target families
//! - Prompt-cache annotation overhead on long conversations
//! - Alias table lookup

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ai_gateway::adapter::{adapt, apply_cache_control};
use ai_gateway::routing::{AliasResolver, GatewayConfig, ResolvedTarget};
use ai_gateway::types::{CanonicalRequest, Message, ReasoningEffort, ToolDefinition};
use serde_json::json;

fn conversation(turns: usize) -> Vec<Message> {
    let mut messages = vec![Message::system("You are a helpful assistant.")];
    for i in 0..turns {
        messages.push(Message::user(format!("Question number {i}: what changed?")));
        messages.push(Message::assistant(format!("Answer number {i}: nothing much.")));
    }
    messages
}

fn request_with_tools(turns: usize) -> CanonicalRequest {
    let tool = ToolDefinition::function(
        "lookup",
        Some("Look up a record".to_string()),
        json!({"type": "object", "properties": {"id": {"type": "string"}}}),
    );
    CanonicalRequest::new("bench", conversation(turns))
        .max_tokens(1024)
        .tools(vec![tool])
        .thinking(ReasoningEffort::Medium)
}

fn bench_adaptation(c: &mut Criterion) {
    let config = GatewayConfig::default();
    let request = request_with_tools(10);
    let mut group = c.benchmark_group("adaptation");

    for routing_id in [
        "openrouter/anthropic/claude-sonnet-4",
        "bedrock/anthropic.claude-3-7-sonnet-20250219-v1:0",
        "openrouter/qwen/qwen3-32b",
        "xai/grok-3-mini",
    ] {
        let target = ResolvedTarget::new(routing_id);
        group.bench_with_input(BenchmarkId::from_parameter(routing_id), &target, |b, t| {
            b.iter(|| adapt(black_box(&request), black_box(t), &config))
        });
    }
    group.finish();
}

fn bench_cache_control(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_control");
    for turns in [2usize, 50] {
        let messages = conversation(turns);
        group.throughput(Throughput::Elements(messages.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(turns), &messages, |b, m| {
            b.iter(|| {
                let mut copy = m.clone();
                apply_cache_control(black_box(&mut copy))
            })
        });
    }
    group.finish();
}

fn bench_alias_resolution(c: &mut Criterion) {
    let resolver = AliasResolver::from_config(&GatewayConfig::default());
    c.bench_function("alias_resolution", |b| {
        b.iter(|| {
            for model in ["kimi-k2", "my-qwen3-32b-finetune", "xAI/Grok-3", "llama3"] {
                black_box(resolver.resolve(black_box(model)));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_adaptation,
    bench_cache_control,
    bench_alias_resolution
);
criterion_main!(benches);
