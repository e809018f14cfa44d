use std::{sync::Arc, thread, time::Duration as StdDuration};

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::{
    aging_service::AgingService,
    memory_store::InMemoryStore,
    obligation_service::{NewObligation, ObligationService},
    projection_service::{ProjectionOptions, ProjectionService},
    reconciliation_service::{MatchOracle, ReconciliationService},
    schedule_service::ScheduleService,
    settlement_service::{SettlementRequest, SettlementService},
    status_service::StatusService,
    storage::{Deadline, ObligationStore},
    summary_service::SummaryService,
    time::FixedClock,
    CoreError,
};
use cassa_domain::{
    AnomalyKind, BankAccount, BankMovement, Counterparty, MatchSuggestion, Obligation,
    ObligationKind, ObligationStatus, PaymentMethod, SuggestionState,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

fn clock() -> FixedClock {
    FixedClock::new(today())
}

fn store_with_cash(balance: Decimal) -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .add_account(BankAccount::new("Banca Intesa", balance))
        .expect("add account");
    store
}

fn insert(store: &InMemoryStore, kind: ObligationKind, amount: Decimal, due: NaiveDate) -> Uuid {
    let obligation = Obligation::new(kind, Uuid::new_v4(), amount, due);
    let id = obligation.id;
    store.insert_obligation(&obligation).expect("insert obligation");
    id
}

fn compute(store: &InMemoryStore, horizon: i64) -> cassa_domain::ProjectionResult {
    ProjectionService::compute(store, &clock(), horizon, &ProjectionOptions::default())
        .expect("projection")
}

#[test]
fn opening_balance_carries_through_every_week_without_obligations() {
    let store = store_with_cash(dec!(2500.75));
    let mut inactive = BankAccount::new("Conto chiuso", dec!(99999));
    inactive.is_active = false;
    store.add_account(inactive).expect("add inactive account");

    let result = compute(&store, 90);

    assert_eq!(result.opening_balance, dec!(2500.75));
    assert_eq!(result.weeks.len(), 13);
    assert!(result
        .weeks
        .iter()
        .all(|week| week.projected_balance == dec!(2500.75)));
    assert!(!result.has_negative_weeks);
}

#[test]
fn net_changes_sum_to_signed_residuals() {
    let store = store_with_cash(dec!(1000));
    insert(&store, ObligationKind::Inflow, dec!(0.10), today() + Duration::days(1));
    insert(&store, ObligationKind::Inflow, dec!(0.20), today() + Duration::days(15));
    insert(&store, ObligationKind::Outflow, dec!(333.33), today() + Duration::days(40));
    insert(&store, ObligationKind::Outflow, dec!(12.01), today() - Duration::days(3));
    let mut partial = Obligation::new(
        ObligationKind::Inflow,
        Uuid::new_v4(),
        dec!(500),
        today() + Duration::days(60),
    );
    partial.paid_amount = dec!(125.50);
    store.insert_obligation(&partial).expect("insert partial");

    let result = compute(&store, 90);

    let expected = dec!(0.10) + dec!(0.20) - dec!(333.33) - dec!(12.01) + dec!(374.50);
    assert_eq!(result.total_net_change(), expected);
    assert_eq!(result.closing_balance() - result.opening_balance, expected);
    let lines: usize = result.weeks.iter().map(|week| week.detail_lines.len()).sum();
    assert_eq!(lines, 5);
}

#[test]
fn bucket_count_matches_horizon() {
    let store = store_with_cash(dec!(0));
    for horizon in [1_i64, 6, 7, 8, 13, 14, 15, 90, 365] {
        let result = compute(&store, horizon);
        assert_eq!(result.weeks.len() as i64, (horizon + 6) / 7, "horizon {horizon}");
        for pair in result.weeks.windows(2) {
            assert_eq!(pair[0].period_end + Duration::days(1), pair[1].period_start);
        }
    }
}

#[test]
fn multi_year_horizon_keeps_every_week() {
    let store = store_with_cash(dec!(1000));
    let far = insert(&store, ObligationKind::Outflow, dec!(1500), today() + Duration::days(3990));

    let result = compute(&store, 4000);

    assert_eq!(result.weeks.len(), 572);
    let last = result.weeks.last().expect("last week");
    assert_eq!(last.period_end, today() + Duration::days(4000));
    assert!(result.weeks[570]
        .detail_lines
        .iter()
        .any(|line| line.obligation_id == far));
    assert_eq!(last.projected_balance, dec!(-500));
    assert_eq!(result.first_negative_week, Some(570));
}

#[test]
fn non_positive_horizon_is_rejected() {
    let store = store_with_cash(dec!(0));
    for horizon in [0_i64, -1, -90] {
        let err = ProjectionService::compute(&store, &clock(), horizon, &ProjectionOptions::default())
            .expect_err("horizon must be rejected");
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }
}

#[test]
fn past_due_obligation_lands_in_first_week() {
    let store = store_with_cash(dec!(5000));
    let id = insert(&store, ObligationKind::Outflow, dec!(800), today() - Duration::days(30));

    let result = compute(&store, 90);

    let first = &result.weeks[0];
    assert_eq!(first.outflow_total, dec!(800));
    assert_eq!(first.detail_lines.len(), 1);
    assert_eq!(first.detail_lines[0].obligation_id, id);
    assert!(first.detail_lines[0].past_due);
    assert_eq!(result.closing_balance(), dec!(4200));
}

#[test]
fn negative_week_is_flagged() {
    let store = store_with_cash(dec!(1000));
    insert(&store, ObligationKind::Outflow, dec!(1500), today() + Duration::days(8));

    let result = compute(&store, 28);

    assert_eq!(result.weeks[0].projected_balance, dec!(1000));
    assert_eq!(result.weeks[1].projected_balance, dec!(-500));
    assert!(result.has_negative_weeks);
    assert_eq!(result.first_negative_week, Some(1));

    let healthy = store_with_cash(dec!(1000));
    insert(&healthy, ObligationKind::Inflow, dec!(200), today() + Duration::days(2));
    insert(&healthy, ObligationKind::Outflow, dec!(900), today() + Duration::days(9));
    let result = compute(&healthy, 28);
    assert!(!result.has_negative_weeks);
    assert_eq!(result.first_negative_week, None);
}

#[test]
fn large_payable_this_week_drives_balance_negative() {
    let store = store_with_cash(dec!(10000));
    insert(&store, ObligationKind::Outflow, dec!(12000), today() + Duration::days(3));

    let result = compute(&store, 90);

    assert_eq!(result.weeks[0].net_change, dec!(-12000));
    assert_eq!(result.weeks[0].projected_balance, dec!(-2000));
    assert!(result.has_negative_weeks);
}

#[test]
fn alert_threshold_marks_weeks() {
    let store = store_with_cash(dec!(6000));
    insert(&store, ObligationKind::Outflow, dec!(2000), today() + Duration::days(10));
    let options = ProjectionOptions::default().with_alert_threshold(dec!(5000));

    let result = ProjectionService::compute(&store, &clock(), 21, &options).expect("projection");

    assert!(!result.weeks[0].below_threshold);
    assert!(result.weeks[1].below_threshold);
    assert!(result.weeks[2].below_threshold);
    assert_eq!(result.weeks_below_threshold().count(), 2);
    assert!(!result.has_negative_weeks);
}

#[test]
fn planned_date_overrides_legal_due_date() {
    let store = store_with_cash(dec!(0));
    let id = insert(&store, ObligationKind::Inflow, dec!(700), today() + Duration::days(2));

    ScheduleService::reschedule(&store, id, today() + Duration::days(20)).expect("reschedule");
    let result = compute(&store, 28);

    assert_eq!(result.weeks[0].inflow_total, Decimal::ZERO);
    assert_eq!(result.weeks[2].inflow_total, dec!(700));
    assert_eq!(
        result.weeks[2].detail_lines[0].effective_date,
        today() + Duration::days(20)
    );
}

#[test]
fn missing_due_date_is_reported_not_dropped() {
    let store = store_with_cash(dec!(100));
    let mut imported = Obligation::new(ObligationKind::Outflow, Uuid::new_v4(), dec!(50), today());
    imported.legal_due_date = None;
    store.insert_obligation(&imported).expect("insert imported");

    let result = compute(&store, 14);

    assert!(result.has_anomalies());
    assert_eq!(result.anomalies[0].obligation_id, imported.id);
    assert_eq!(result.anomalies[0].kind, AnomalyKind::MissingDueDate);
    assert_eq!(result.closing_balance(), dec!(100));
}

#[test]
fn counterparty_names_label_detail_lines() {
    let store = store_with_cash(dec!(0));
    let supplier = Counterparty::new("Cementi Padani SpA");
    let obligation = Obligation::new(
        ObligationKind::Outflow,
        supplier.id,
        dec!(10),
        today() + Duration::days(1),
    )
    .with_invoice_ref("FT-2025/118");
    store.add_counterparty(supplier).expect("add counterparty");
    store.insert_obligation(&obligation).expect("insert obligation");

    let result = compute(&store, 7);

    let line = &result.weeks[0].detail_lines[0];
    assert_eq!(line.counterparty_label, "Cementi Padani SpA");
    assert_eq!(line.invoice_ref.as_deref(), Some("FT-2025/118"));
}

#[test]
fn slow_store_times_out() {
    let store = InMemoryStore::new().with_read_latency(StdDuration::from_millis(30));
    let options = ProjectionOptions::default().with_read_timeout_ms(5);

    let err = ProjectionService::compute(&store, &clock(), 90, &options)
        .expect_err("deadline must expire");

    assert!(matches!(err, CoreError::UpstreamTimeout));
    assert!(err.is_retryable());
}

#[test]
fn offline_store_is_unavailable() {
    let store = store_with_cash(dec!(10));
    store.set_offline(true);

    let err = ProjectionService::compute(&store, &clock(), 90, &ProjectionOptions::default())
        .expect_err("store is offline");

    assert!(matches!(err, CoreError::UpstreamUnavailable(_)));
}

#[test]
fn reschedule_twice_matches_once() {
    let store = store_with_cash(dec!(0));
    let due = today() + Duration::days(4);
    let id = insert(&store, ObligationKind::Outflow, dec!(300), due);
    let planned = today() + Duration::days(30);

    ScheduleService::reschedule(&store, id, planned).expect("first reschedule");
    let once = store.get_obligation(id).expect("get once");
    ScheduleService::reschedule(&store, id, planned).expect("second reschedule");
    let twice = store.get_obligation(id).expect("get twice");

    assert_eq!(once, twice);
    assert_eq!(twice.legal_due_date, Some(due));
    assert_eq!(twice.paid_amount, Decimal::ZERO);
    assert_eq!(twice.status, ObligationStatus::Open);
    assert_eq!(twice.planned_settlement_date, Some(planned));
}

#[test]
fn reschedule_unknown_obligation_is_not_found() {
    let store = store_with_cash(dec!(0));
    let missing = Uuid::new_v4();

    let err = ScheduleService::reschedule(&store, missing, today()).expect_err("missing");

    assert!(matches!(err, CoreError::ObligationNotFound(id) if id == missing));
}

#[test]
fn failed_write_surfaces_as_persistence_failure() {
    let store = store_with_cash(dec!(0));
    let id = insert(&store, ObligationKind::Outflow, dec!(300), today());
    store.set_reject_writes(true);

    let err = ScheduleService::reschedule(&store, id, today()).expect_err("write rejected");

    assert!(matches!(err, CoreError::PersistenceFailure(_)));
}

#[test]
fn partial_payments_accumulate_to_settled() {
    let store = store_with_cash(dec!(0));
    let id = insert(&store, ObligationKind::Inflow, dec!(1000), today() + Duration::days(10));

    let first = SettlementService::settle_partial(
        &store,
        &clock(),
        &SettlementRequest::new(id, dec!(400), today()),
    )
    .expect("first payment");
    assert_eq!(first.paid_amount, dec!(400));
    assert_eq!(first.status, ObligationStatus::PartiallyPaid);
    assert_eq!(first.settlement_date, None);

    let second = SettlementService::settle_partial(
        &store,
        &clock(),
        &SettlementRequest::new(id, dec!(600), today() + Duration::days(1))
            .with_method(PaymentMethod::Riba),
    )
    .expect("second payment");
    assert_eq!(second.paid_amount, dec!(1000));
    assert_eq!(second.status, ObligationStatus::Settled);
    assert_eq!(second.settlement_date, Some(today() + Duration::days(1)));
    assert_eq!(second.payment_method, Some(PaymentMethod::Riba));

    let result = compute(&store, 14);
    assert_eq!(result.total_net_change(), Decimal::ZERO);
}

#[test]
fn payment_on_overdue_obligation_keeps_it_overdue() {
    let store = store_with_cash(dec!(0));
    let id = insert(&store, ObligationKind::Outflow, dec!(1000), today() - Duration::days(5));

    let updated = SettlementService::settle_partial(
        &store,
        &clock(),
        &SettlementRequest::new(id, dec!(100), today()),
    )
    .expect("payment");

    assert_eq!(updated.status, ObligationStatus::Overdue);
    assert_eq!(updated.residual(), dec!(900));
}

#[test]
fn invalid_settlements_write_nothing() {
    let store = store_with_cash(dec!(0));
    let id = insert(&store, ObligationKind::Outflow, dec!(100), today());

    for amount in [dec!(0), dec!(-5)] {
        let err = SettlementService::settle_partial(
            &store,
            &clock(),
            &SettlementRequest::new(id, amount, today()),
        )
        .expect_err("non-positive amount");
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    let err = SettlementService::settle_partial(
        &store,
        &clock(),
        &SettlementRequest::new(id, dec!(100.01), today()),
    )
    .expect_err("overpayment");
    assert!(matches!(
        err,
        CoreError::Overpayment { residual, attempted, .. }
            if residual == dec!(100) && attempted == dec!(100.01)
    ));

    let stored = store.get_obligation(id).expect("get");
    assert_eq!(stored.paid_amount, Decimal::ZERO);
    assert_eq!(stored.version, 0);
}

#[test]
fn stale_version_is_a_concurrency_conflict() {
    let store = store_with_cash(dec!(0));
    let id = insert(&store, ObligationKind::Outflow, dec!(100), today());
    let stale = store.get_obligation(id).expect("read");
    SettlementService::settle_partial(&store, &clock(), &SettlementRequest::new(id, dec!(10), today()))
        .expect("concurrent payment");

    let err = store
        .apply_payment(&crate::storage::PaymentRecord {
            obligation_id: id,
            expected_version: stale.version,
            amount: dec!(20),
            settlement_date: today(),
            method: PaymentMethod::Cash,
            resulting_status: ObligationStatus::PartiallyPaid,
        })
        .map_err(CoreError::from)
        .expect_err("stale write");

    assert!(matches!(err, CoreError::ConcurrencyConflict { expected: 0, found: 1, .. }));
    assert_eq!(store.get_obligation(id).expect("get").paid_amount, dec!(10));
}

#[test]
fn concurrent_settlements_both_count() {
    let store = Arc::new(store_with_cash(dec!(0)));
    let id = insert(&store, ObligationKind::Outflow, dec!(1000), today() + Duration::days(5));
    let clock = Arc::new(clock());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let clock = Arc::clone(&clock);
            thread::spawn(move || {
                SettlementService::settle_with_retry(
                    store.as_ref(),
                    clock.as_ref(),
                    &SettlementRequest::new(id, dec!(125), today()),
                    64,
                )
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread").expect("settlement");
    }

    let stored = store.get_obligation(id).expect("get");
    assert_eq!(stored.paid_amount, dec!(1000));
    assert_eq!(stored.status, ObligationStatus::Settled);
    assert_eq!(stored.version, 8);
}

#[test]
fn register_validates_and_derives_status() {
    let store = store_with_cash(dec!(0));
    let counterparty = Uuid::new_v4();

    let mut late = NewObligation::new(
        ObligationKind::Inflow,
        counterparty,
        dec!(250),
        today() - Duration::days(1),
    );
    late.invoice_ref = Some(" FT 12 ".into());
    let registered = ObligationService::register(&store, &clock(), late).expect("register");
    assert_eq!(registered.status, ObligationStatus::Overdue);
    assert_eq!(registered.invoice_ref.as_deref(), Some("FT 12"));
    assert_eq!(store.get_obligation(registered.id).expect("stored"), registered);

    let zero = NewObligation::new(ObligationKind::Inflow, counterparty, dec!(0), today());
    assert!(matches!(
        ObligationService::register(&store, &clock(), zero),
        Err(CoreError::InvalidArgument(_))
    ));

    let mut undated = NewObligation::new(ObligationKind::Inflow, counterparty, dec!(10), today());
    undated.legal_due_date = None;
    assert!(matches!(
        ObligationService::register(&store, &clock(), undated),
        Err(CoreError::InvalidArgument(_))
    ));
}

#[test]
fn assign_site_touches_only_the_site() {
    let store = store_with_cash(dec!(0));
    let id = insert(&store, ObligationKind::Outflow, dec!(90), today());
    let before = store.get_obligation(id).expect("get");
    let site = Uuid::new_v4();

    ObligationService::assign_site(&store, id, Some(site)).expect("assign");
    let after = store.get_obligation(id).expect("get");

    assert_eq!(after.site_id, Some(site));
    assert_eq!(after.version, before.version);
    assert_eq!(after.paid_amount, before.paid_amount);
}

#[test]
fn sweep_marks_only_late_unsettled_obligations() {
    let store = store_with_cash(dec!(0));
    let late = insert(&store, ObligationKind::Inflow, dec!(100), today() - Duration::days(2));
    let due_today = insert(&store, ObligationKind::Inflow, dec!(100), today());
    let settled = insert(&store, ObligationKind::Outflow, dec!(50), today() - Duration::days(9));
    SettlementService::settle_partial(
        &store,
        &clock(),
        &SettlementRequest::new(settled, dec!(50), today()),
    )
    .expect("settle");

    assert_eq!(StatusService::sweep_overdue(&store, &clock()).expect("sweep"), 1);
    assert_eq!(StatusService::sweep_overdue(&store, &clock()).expect("sweep again"), 0);

    assert_eq!(store.get_obligation(late).expect("late").status, ObligationStatus::Overdue);
    assert_eq!(store.get_obligation(due_today).expect("today").status, ObligationStatus::Open);
    assert_eq!(store.get_obligation(settled).expect("settled").status, ObligationStatus::Settled);
}

#[test]
fn aging_report_reads_from_store() {
    let store = store_with_cash(dec!(0));
    insert(&store, ObligationKind::Outflow, dec!(70), today() - Duration::days(75));
    insert(&store, ObligationKind::Outflow, dec!(30), today() - Duration::days(3));

    let report = AgingService::report(&store, &clock(), ObligationKind::Outflow, Deadline::none())
        .expect("aging");

    assert_eq!(report.total(), dec!(100));
    assert_eq!(report.bands[2].amount, dec!(70));
    assert_eq!(report.lines[0].days_late, 75);
}

#[test]
fn position_summary_splits_directions() {
    let store = store_with_cash(dec!(4000));
    insert(&store, ObligationKind::Inflow, dec!(1500), today() - Duration::days(10));
    insert(&store, ObligationKind::Inflow, dec!(500), today() + Duration::days(10));
    insert(&store, ObligationKind::Outflow, dec!(3000), today() + Duration::days(3));

    let summary = SummaryService::position(&store, &clock(), Some(dec!(5000)), Deadline::none())
        .expect("summary");

    assert_eq!(summary.cash_on_hand, dec!(4000));
    assert_eq!(summary.receivables, dec!(2000));
    assert_eq!(summary.overdue_receivables, dec!(1500));
    assert_eq!(summary.payables, dec!(3000));
    assert_eq!(summary.overdue_payables, Decimal::ZERO);
    assert_eq!(summary.net_position(), dec!(3000));
    assert_eq!(summary.open_obligations, 3);
    assert!(summary.below_alert_threshold);
}

struct ScriptedOracle {
    suggestions: Vec<(Uuid, f32)>,
}

impl MatchOracle for ScriptedOracle {
    fn suggest(
        &self,
        movement: &BankMovement,
        _candidates: &[Obligation],
    ) -> Result<Vec<MatchSuggestion>, CoreError> {
        Ok(self
            .suggestions
            .iter()
            .map(|(id, confidence)| MatchSuggestion::new(movement.id, *id, *confidence))
            .collect())
    }
}

fn movement(amount: Decimal) -> BankMovement {
    BankMovement {
        id: Uuid::new_v4(),
        account_id: Uuid::new_v4(),
        operation_date: today(),
        amount,
        description: "BONIFICO DA CLIENTE".into(),
    }
}

#[test]
fn proposals_are_filtered_clamped_and_ranked() {
    let store = store_with_cash(dec!(0));
    let receivable = insert(&store, ObligationKind::Inflow, dec!(1200), today());
    let other = insert(&store, ObligationKind::Inflow, dec!(1500), today());
    let payable = insert(&store, ObligationKind::Outflow, dec!(1200), today());
    let oracle = ScriptedOracle {
        suggestions: vec![
            (other, 0.4),
            (receivable, 1.7),
            (payable, 0.9),
            (Uuid::new_v4(), 0.99),
            (other, 0.6),
        ],
    };

    let proposals = ReconciliationService::propose(&store, &oracle, &movement(dec!(1200)))
        .expect("propose");

    assert_eq!(proposals.len(), 2);
    assert_eq!(proposals[0].obligation_id, receivable);
    assert_eq!(proposals[0].confidence, 1.0);
    assert_eq!(proposals[1].obligation_id, other);
    assert_eq!(proposals[1].confidence, 0.6);
    assert!(proposals.iter().all(|proposal| proposal.is_pending()));
    assert_eq!(
        store.get_obligation(receivable).expect("untouched").paid_amount,
        Decimal::ZERO
    );
}

#[test]
fn confirm_settles_and_reject_does_not() {
    let store = store_with_cash(dec!(0));
    let receivable = insert(&store, ObligationKind::Inflow, dec!(1200), today());
    let incoming = movement(dec!(1200));
    let oracle = ScriptedOracle {
        suggestions: vec![(receivable, 0.8)],
    };
    let mut proposals = ReconciliationService::propose(&store, &oracle, &incoming).expect("propose");

    let mut rejected = proposals[0].clone();
    ReconciliationService::reject(&mut rejected).expect("reject");
    assert_eq!(rejected.state, SuggestionState::Rejected);
    assert!(ReconciliationService::reject(&mut rejected).is_err());
    assert_eq!(store.get_obligation(receivable).expect("get").paid_amount, Decimal::ZERO);

    let updated = ReconciliationService::confirm(
        &store,
        &clock(),
        &mut proposals[0],
        &incoming,
        PaymentMethod::BankTransfer,
    )
    .expect("confirm");
    assert_eq!(updated.status, ObligationStatus::Settled);
    assert_eq!(proposals[0].state, SuggestionState::Confirmed);
}

#[test]
fn movement_above_residual_is_never_proposed() {
    let store = store_with_cash(dec!(0));
    let receivable = insert(&store, ObligationKind::Inflow, dec!(1000), today());
    let oracle = ScriptedOracle {
        suggestions: vec![(receivable, 0.5)],
    };

    let proposals = ReconciliationService::propose(&store, &oracle, &movement(dec!(1010)))
        .expect("propose");
    assert!(proposals.is_empty());

    let below = movement(dec!(990));
    let mut proposals =
        ReconciliationService::propose(&store, &oracle, &below).expect("propose");
    assert_eq!(proposals.len(), 1);
    let updated = ReconciliationService::confirm(
        &store,
        &clock(),
        &mut proposals[0],
        &below,
        PaymentMethod::BankTransfer,
    )
    .expect("confirm");
    assert_eq!(updated.residual(), dec!(10));
    assert_eq!(updated.status, ObligationStatus::PartiallyPaid);
}

#[test]
fn zero_movement_cannot_be_reconciled() {
    let store = store_with_cash(dec!(0));
    let oracle = ScriptedOracle {
        suggestions: Vec::new(),
    };
    assert!(matches!(
        ReconciliationService::propose(&store, &oracle, &movement(Decimal::ZERO)),
        Err(CoreError::InvalidArgument(_))
    ));
}
