use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use liquidity_core::core::{
    project, InMemoryStore, FixedClock, ObligationStore, ProjectionOptions, ProjectionService,
};
use liquidity_core::domain::{BankAccount, Counterparty, Obligation, ObligationKind};
use rust_decimal::Decimal;
use uuid::Uuid;

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

fn sample_obligations(count: usize, counterparties: &[Counterparty]) -> Vec<Obligation> {
    (0..count)
        .map(|idx| {
            let kind = if idx % 3 == 0 {
                ObligationKind::Inflow
            } else {
                ObligationKind::Outflow
            };
            let due = reference() + Duration::days((idx % 120) as i64 - 10);
            let mut obligation = Obligation::new(
                kind,
                counterparties[idx % counterparties.len()].id,
                Decimal::new(10_000 + (idx as i64 % 500) * 100, 2),
                due,
            );
            if idx % 7 == 0 {
                obligation = obligation.with_planned_date(due + Duration::days(14));
            }
            if idx % 5 == 0 {
                obligation.paid_amount = obligation.total_amount / Decimal::from(2);
            }
            obligation
        })
        .collect()
}

fn bench_projection(c: &mut Criterion) {
    let counterparties: Vec<Counterparty> = (0..200)
        .map(|idx| Counterparty::new(format!("Fornitore {idx}")))
        .collect();
    let obligations = sample_obligations(black_box(5_000), &counterparties);
    let accounts = vec![BankAccount::new("Cassa", Decimal::from(250_000))];
    let labels: HashMap<Uuid, String> = counterparties
        .iter()
        .map(|counterparty| (counterparty.id, counterparty.name.clone()))
        .collect();
    let options = ProjectionOptions::default().with_alert_threshold(Decimal::from(5_000));

    c.bench_function("project_5k_obligations_90_days", |b| {
        b.iter(|| {
            project(
                reference(),
                90,
                &accounts,
                &obligations,
                &labels,
                &options,
            )
            .expect("projection")
        })
    });

    c.bench_function("compute_5k_from_memory_store", |b| {
        b.iter_batched(
            || {
                let store = InMemoryStore::new();
                for account in &accounts {
                    store.add_account(account.clone()).expect("account");
                }
                for counterparty in &counterparties {
                    store.add_counterparty(counterparty.clone()).expect("counterparty");
                }
                for obligation in &obligations {
                    store.insert_obligation(obligation).expect("insert");
                }
                store
            },
            |store| {
                ProjectionService::compute(
                    &store,
                    &FixedClock::new(reference()),
                    365,
                    &options,
                )
                .expect("projection")
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_projection);
criterion_main!(benches);
