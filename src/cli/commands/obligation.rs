use cassa_core::{
    public_api::{api_reschedule, api_settle, parse_amount, parse_id, parse_kind},
    time::parse_date,
    NewObligation, ObligationService, ObligationStore, ScheduleService, StatusService,
};
use cassa_domain::{ObligationKind, ObligationStatus};
use rust_decimal::Decimal;

use crate::cli::core::{expect_args, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::short_id;
use crate::cli::table::{Table, TableColumn, TableRenderer};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "list",
            "List open obligations",
            "list [in|out]",
            cmd_list,
        )
        .with_aliases(&["elenco", "scadenze"]),
        CommandEntry::new(
            "add",
            "Register a receivable (in) or payable (out)",
            "add <in|out> <counterparty> <amount> <due YYYY-MM-DD> [invoice]",
            cmd_add,
        )
        .with_aliases(&["nuova"]),
        CommandEntry::new(
            "settle",
            "Record a full or partial payment",
            "settle <id> <amount> [date] [method]",
            cmd_settle,
        )
        .with_aliases(&["incassa", "paga"]),
        CommandEntry::new(
            "reschedule",
            "Set or clear the planned settlement date",
            "reschedule <id> <YYYY-MM-DD|clear>",
            cmd_reschedule,
        )
        .with_aliases(&["pianifica"]),
        CommandEntry::new(
            "site",
            "Attribute an obligation to a site, or clear it",
            "site <id> [site-id]",
            cmd_site,
        )
        .with_aliases(&["cantiere"]),
        CommandEntry::new(
            "sweep",
            "Mark past-due obligations as overdue",
            "sweep",
            cmd_sweep,
        )
        .with_aliases(&["scadute"]),
    ]
}

fn cmd_list(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 0, 1, "list [in|out]")?;
    let kind = args.first().map(|raw| parse_kind(raw)).transpose()?;
    let labels = context.counterparty_labels()?;
    let today = context.clock().today();

    let mut obligations: Vec<_> = context
        .store
        .list_open_obligations(context.deadline())?
        .into_iter()
        .filter(|obligation| kind.map_or(true, |kind| obligation.kind == kind))
        .collect();
    obligations.sort_by_key(|obligation| (obligation.effective_date(), obligation.id));

    if obligations.is_empty() {
        output::info("Nessuna scadenza aperta.");
        return Ok(());
    }

    let mut table = Table::new(
        Some(format!("Scadenze aperte: {}", obligations.len())),
        vec![
            TableColumn::new("ID", 8),
            TableColumn::new("Tipo", 4),
            TableColumn::new("Controparte", 20),
            TableColumn::new("Fattura", 10),
            TableColumn::new("Scadenza", 10),
            TableColumn::new("Pianificata", 11),
            TableColumn::numeric("Residuo", 12),
            TableColumn::new("Stato", 14),
        ],
    );
    for obligation in &obligations {
        let status = obligation.derived_status(today);
        let cells = vec![
            short_id(obligation.id),
            obligation.kind.to_string(),
            labels
                .get(&obligation.counterparty_id)
                .cloned()
                .unwrap_or_else(|| short_id(obligation.counterparty_id)),
            obligation.invoice_ref.clone().unwrap_or_default(),
            obligation
                .legal_due_date
                .map(|date| context.date(date))
                .unwrap_or_else(|| "-".into()),
            obligation
                .planned_settlement_date
                .map(|date| context.date(date))
                .unwrap_or_default(),
            context.money(obligation.residual()),
            status.to_string(),
        ];
        if status == ObligationStatus::Overdue {
            table.add_highlighted_row(cells);
        } else {
            table.add_row(cells);
        }
    }
    TableRenderer::render(&table);

    let (receivables, payables) = obligations.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(inflow, outflow), obligation| match obligation.kind {
            ObligationKind::Inflow => (inflow + obligation.residual(), outflow),
            ObligationKind::Outflow => (inflow, outflow + obligation.residual()),
        },
    );
    output::two_column(&[
        ("Da incassare", context.money(receivables)),
        ("Da pagare", context.money(payables)),
    ]);
    Ok(())
}

fn cmd_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let usage = "add <in|out> <counterparty> <amount> <due YYYY-MM-DD> [invoice]";
    expect_args(args, 4, 5, usage)?;
    let kind = parse_kind(args[0])?;
    let amount = parse_amount(args[2])?;
    let due = parse_date(args[3])?;
    let counterparty = context.store.upsert_counterparty(args[1])?;

    let mut input = NewObligation::new(kind, counterparty.id, amount, due);
    input.invoice_ref = args.get(4).map(|invoice| invoice.to_string());
    let obligation = ObligationService::register(&context.store, context.clock(), input)?;

    output::success(format!(
        "Registrata scadenza {} {} {} {} al {} [{}]",
        short_id(obligation.id),
        obligation.kind,
        counterparty.name,
        context.money(obligation.total_amount),
        context.date(due),
        obligation.status
    ));
    Ok(())
}

fn cmd_settle(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 2, 4, "settle <id> <amount> [date] [method]")?;
    let obligation = context.resolve_obligation(args[0])?;
    let updated = api_settle(
        &context.store,
        context.clock(),
        obligation.id,
        args[1],
        args.get(2).copied(),
        args.get(3).copied(),
        context.config.settlement_retry_attempts,
    )?;

    output::success(format!(
        "Pagamento registrato su {}: residuo {} [{}]",
        short_id(updated.id),
        context.money(updated.residual()),
        updated.status
    ));
    Ok(())
}

fn cmd_reschedule(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 2, 2, "reschedule <id> <YYYY-MM-DD|clear>")?;
    let obligation = context.resolve_obligation(args[0])?;
    if args[1].eq_ignore_ascii_case("clear") {
        ScheduleService::clear_plan(&context.store, obligation.id)?;
        output::success(format!(
            "Data pianificata rimossa da {}; vale la scadenza legale.",
            short_id(obligation.id)
        ));
        return Ok(());
    }

    api_reschedule(&context.store, obligation.id, args[1])?;
    let planned = parse_date(args[1])?;
    output::success(format!(
        "Scadenza {} pianificata al {}.",
        short_id(obligation.id),
        context.date(planned)
    ));
    Ok(())
}

fn cmd_site(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 1, 2, "site <id> [site-id]")?;
    let obligation = context.resolve_obligation(args[0])?;
    let site = args.get(1).map(|raw| parse_id(raw)).transpose()?;
    ObligationService::assign_site(&context.store, obligation.id, site)?;
    match site {
        Some(site) => output::success(format!(
            "Scadenza {} assegnata al cantiere {site}.",
            short_id(obligation.id)
        )),
        None => output::success(format!(
            "Cantiere rimosso da {}.",
            short_id(obligation.id)
        )),
    }
    Ok(())
}

fn cmd_sweep(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 0, 0, "sweep")?;
    let updated = StatusService::sweep_overdue(&context.store, context.clock())?;
    if updated == 0 {
        output::info("Nessuna scadenza da aggiornare.");
    } else {
        output::success(format!("{updated} scadenze segnate come scadute."));
    }
    Ok(())
}
