mod common;

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use liquidity_core::{
    cli::shell_context::{CliMode, ShellContext},
    config::ConfigManager,
    core::{
        AgingService, Deadline, FixedClock, NewObligation, ObligationService, ObligationStore,
        ProjectionService, StatusService, SummaryService,
    },
    domain::{ObligationKind, ObligationStatus},
    storage::{JsonObligationStore, StorePaths},
};
use rust_decimal_macros::dec;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

fn context_at(home: &std::path::PathBuf) -> ShellContext {
    ShellContext::with_base_dir(
        CliMode::Script,
        home.clone(),
        Arc::new(FixedClock::new(today())),
    )
    .expect("context")
}

#[test]
fn configured_threshold_flags_weeks_and_position() {
    let home = common::test_home();
    let manager = ConfigManager::with_base_dir(home.clone()).expect("config manager");
    let mut config = manager.load().expect("defaults");
    config.liquidity_alert_threshold = dec!(8000);
    manager.save(&config).expect("save");

    let context = context_at(&home);
    assert_eq!(context.config.liquidity_alert_threshold, dec!(8000));
    context
        .store
        .set_account_balance("Banca Sella", dec!(10000))
        .expect("account");
    let supplier = context.store.upsert_counterparty("Cementi Sud").expect("supplier");
    ObligationService::register(
        &context.store,
        context.clock(),
        NewObligation::new(
            ObligationKind::Outflow,
            supplier.id,
            dec!(3000),
            today() + Duration::days(9),
        ),
    )
    .expect("register");

    let result = ProjectionService::compute(
        &context.store,
        context.clock(),
        28,
        &context.projection_options(),
    )
    .expect("projection");

    assert_eq!(result.weeks.len(), 4);
    assert!(!result.weeks[0].below_threshold);
    assert!(result.weeks[1].below_threshold);
    assert_eq!(result.weeks[1].projected_balance, dec!(7000));
    assert!(!result.has_negative_weeks);

    let summary = SummaryService::position(
        &context.store,
        context.clock(),
        Some(context.config.liquidity_alert_threshold),
        Deadline::none(),
    )
    .expect("summary");
    assert_eq!(summary.payables, dec!(3000));
    assert_eq!(summary.net_position(), dec!(7000));
    assert!(!summary.below_alert_threshold);
}

#[test]
fn id_prefixes_resolve_to_a_single_obligation() {
    let home = common::test_home();
    let context = context_at(&home);
    let client = context.store.upsert_counterparty("Rossi").expect("client");
    let obligation = ObligationService::register(
        &context.store,
        context.clock(),
        NewObligation::new(
            ObligationKind::Inflow,
            client.id,
            dec!(1200),
            today() + Duration::days(5),
        ),
    )
    .expect("register");

    let prefix: String = obligation.id.to_string().chars().take(6).collect();
    let resolved = context.resolve_obligation(&prefix).expect("prefix");
    assert_eq!(resolved.id, obligation.id);
    let full = context
        .resolve_obligation(&obligation.id.to_string().to_uppercase())
        .expect("full id");
    assert_eq!(full.id, obligation.id);
    assert!(context.resolve_obligation("ab").is_err());
}

#[test]
fn sweep_then_aging_reports_late_receivables() {
    let home = common::test_home();
    let store = JsonObligationStore::new(StorePaths::under(&home)).expect("store");
    let clock = FixedClock::new(today());
    let client = store.upsert_counterparty("Bianchi Srl").expect("client");
    for (days_late, amount) in [(10, dec!(100)), (45, dec!(200)), (120, dec!(400))] {
        let obligation = liquidity_core::domain::Obligation::new(
            ObligationKind::Inflow,
            client.id,
            amount,
            today() - Duration::days(days_late),
        );
        store.insert_obligation(&obligation).expect("insert");
    }

    let updated = StatusService::sweep_overdue(&store, &clock).expect("sweep");
    assert_eq!(updated, 3);
    assert!(store
        .list_open_obligations(Deadline::none())
        .expect("open")
        .iter()
        .all(|obligation| obligation.status == ObligationStatus::Overdue));
    assert_eq!(StatusService::sweep_overdue(&store, &clock).expect("again"), 0);

    let report = AgingService::report(&store, &clock, ObligationKind::Inflow, Deadline::none())
        .expect("aging");
    assert_eq!(report.total(), dec!(700));
    let counts: Vec<usize> = report.bands.iter().map(|band| band.count).collect();
    assert_eq!(counts, vec![1, 1, 0, 1]);
}
