use uuid::Uuid;

use cassa_core::{public_api::parse_amount, time::parse_date, ObligationStore, ReconciliationService};
use cassa_domain::{BankMovement, PaymentMethod};

use crate::cli::core::{expect_args, CommandError, CommandResult, ShellContext};
use crate::cli::matching::{PendingReconciliation, ResidualMatchOracle};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::short_id;
use crate::cli::table::{Table, TableColumn, TableRenderer};

const USAGE: &str =
    "match <amount> [date] [description] | match confirm <n> [method] | match reject <n>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "match",
        "Suggest obligations for a bank movement",
        USAGE,
        cmd_match,
    )
    .with_aliases(&["abbina"])]
}

fn cmd_match(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first().map(|sub| sub.to_ascii_lowercase()).as_deref() {
        Some("confirm") => {
            expect_args(args, 2, 3, "match confirm <n> [method]")?;
            confirm(context, args[1], args.get(2).copied())
        }
        Some("reject") => {
            expect_args(args, 2, 2, "match reject <n>")?;
            reject(context, args[1])
        }
        Some(_) => propose(context, args),
        None => Err(CommandError::InvalidArguments(format!("Usage: {USAGE}"))),
    }
}

fn propose(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let amount = parse_amount(args[0])?;
    let operation_date = match args.get(1) {
        Some(raw) => parse_date(raw)?,
        None => context.clock().today(),
    };
    let description = args.get(2..).map(|rest| rest.join(" ")).unwrap_or_default();
    let account_id = context
        .store
        .list_active_accounts(context.deadline())?
        .first()
        .map(|account| account.id)
        .unwrap_or_else(Uuid::nil);

    let movement = BankMovement {
        id: Uuid::new_v4(),
        account_id,
        operation_date,
        amount,
        description,
    };
    let suggestions =
        ReconciliationService::propose(&context.store, &ResidualMatchOracle::default(), &movement)?;

    if suggestions.is_empty() {
        context.pending_match = None;
        output::info("Nessuna scadenza compatibile con il movimento.");
        return Ok(());
    }

    let labels = context.counterparty_labels()?;
    let mut table = Table::new(
        Some(format!(
            "Proposte per {} del {}",
            context.money(movement.amount),
            context.date(movement.operation_date)
        )),
        vec![
            TableColumn::new("#", 2),
            TableColumn::new("ID", 8),
            TableColumn::new("Controparte", 20),
            TableColumn::numeric("Affidabilità", 12),
            TableColumn::new("Motivo", 20),
        ],
    );
    for (index, suggestion) in suggestions.iter().enumerate() {
        let obligation = context.store.get_obligation(suggestion.obligation_id)?;
        table.add_row(vec![
            (index + 1).to_string(),
            short_id(suggestion.obligation_id),
            labels
                .get(&obligation.counterparty_id)
                .cloned()
                .unwrap_or_default(),
            format!("{:.0}%", suggestion.confidence * 100.0),
            suggestion.rationale.clone().unwrap_or_default(),
        ]);
    }
    TableRenderer::render(&table);
    output::hint("Nessuna proposta viene applicata senza `match confirm <n>`.");

    context.pending_match = Some(PendingReconciliation {
        movement,
        suggestions,
    });
    Ok(())
}

fn confirm(context: &mut ShellContext, index: &str, method: Option<&str>) -> CommandResult {
    let position = pending_index(context, index)?;
    let method = method.map(PaymentMethod::parse).unwrap_or_default();
    let Some(pending) = context.pending_match.as_mut() else {
        return Err(no_pending());
    };

    let updated = ReconciliationService::confirm(
        &context.store,
        context.clock.as_ref(),
        &mut pending.suggestions[position],
        &pending.movement,
        method,
    )?;
    context.pending_match = None;
    output::success(format!(
        "Movimento abbinato a {}: residuo {} [{}]",
        short_id(updated.id),
        context.money(updated.residual()),
        updated.status
    ));
    Ok(())
}

fn reject(context: &mut ShellContext, index: &str) -> CommandResult {
    let position = pending_index(context, index)?;
    let Some(pending) = context.pending_match.as_mut() else {
        return Err(no_pending());
    };
    ReconciliationService::reject(&mut pending.suggestions[position])?;
    let remaining = pending
        .suggestions
        .iter()
        .filter(|suggestion| suggestion.is_pending())
        .count();
    if remaining == 0 {
        context.pending_match = None;
    }
    output::info(format!("Proposta {index} scartata; {remaining} ancora aperte."));
    Ok(())
}

fn pending_index(context: &ShellContext, raw: &str) -> Result<usize, CommandError> {
    let pending = context.pending_match.as_ref().ok_or_else(no_pending)?;
    raw.parse::<usize>()
        .ok()
        .filter(|n| (1..=pending.suggestions.len()).contains(n))
        .map(|n| n - 1)
        .ok_or_else(|| {
            CommandError::InvalidArguments(format!(
                "Choose a proposal between 1 and {}.",
                pending.suggestions.len()
            ))
        })
}

fn no_pending() -> CommandError {
    CommandError::InvalidArguments("No pending proposals; run `match <amount>` first.".into())
}
