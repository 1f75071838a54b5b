//! # Verifier Pool Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | ledger-rules | Reference verification of one resolved transaction |
//! | dispatch | Round trip of a batch through requestor, bus and workers |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures::future::join_all;
use qc_verification_requestor::{RequestorConfig, TransactionResolver};
use qc_verifier_worker::{LedgerRules, WorkerConfig};
use shared_bus::InMemoryQueueBus;
use shared_types::{ResolvedTransaction, WireFormat};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use verifier_runtime::{LedgerGenerator, VerifierCluster};

const BATCH: usize = 100;

fn ledger(rt: &Runtime, count: usize) -> Vec<ResolvedTransaction> {
    let mut generator = LedgerGenerator::new(99);
    let resolver = generator.resolver();
    let signed = generator.generate(count);
    rt.block_on(async {
        let mut resolved = Vec::with_capacity(count);
        for tx in &signed {
            if let Ok(tx) = resolver.resolve(tx).await {
                resolved.push(tx);
            }
        }
        resolved
    })
}

fn bench_ledger_rules(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let transactions = ledger(&rt, BATCH);
    let rules = LedgerRules::default();

    let mut group = c.benchmark_group("ledger-rules");
    group.throughput(Throughput::Elements(transactions.len() as u64));
    group.bench_function("check_batch", |b| {
        b.iter(|| {
            transactions
                .iter()
                .filter(|tx| rules.check(black_box(tx)).is_ok())
                .count()
        })
    });
    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let transactions = ledger(&rt, BATCH);

    let mut group = c.benchmark_group("dispatch");
    group.measurement_time(Duration::from_secs(10));
    group.throughput(Throughput::Elements(transactions.len() as u64));

    for (workers, format) in [
        (1, WireFormat::Bincode),
        (4, WireFormat::Bincode),
        (4, WireFormat::Json),
    ] {
        let (cluster, requestor) = rt.block_on(async {
            let bus = Arc::new(InMemoryQueueBus::new());
            let mut cluster = VerifierCluster::new(
                bus,
                Arc::new(LedgerRules::default()),
                WorkerConfig::default(),
            );
            let requestor = cluster
                .start_requestor(RequestorConfig {
                    wire_format: format,
                    ..RequestorConfig::default()
                })
                .unwrap();
            cluster.start_verifiers(workers).unwrap();
            requestor
                .wait_until_number_of_verifiers(workers, Duration::from_secs(5))
                .await
                .unwrap();
            (cluster, requestor)
        });

        let submitter = &requestor;
        group.bench_with_input(
            BenchmarkId::new(format!("{format}"), workers),
            &transactions,
            |b, transactions| {
                b.to_async(&rt).iter(|| async move {
                    let mut handles = Vec::with_capacity(transactions.len());
                    for tx in transactions {
                        handles.push(submitter.verify_transaction(tx.clone()).await.unwrap());
                    }
                    black_box(join_all(handles).await)
                })
            },
        );

        requestor.shutdown();
        drop(cluster);
    }

    group.finish();
}

criterion_group!(benches, bench_ledger_rules, bench_dispatch);
criterion_main!(benches);
