use cassa_core::{public_api::parse_kind, AgingService, SummaryService};
use cassa_domain::{AgingSeverity, ObligationKind};

use crate::cli::core::{expect_args, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::short_id;
use crate::cli::table::{Table, TableColumn, TableRenderer};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "aging",
            "Overdue residuals grouped by lateness",
            "aging [in|out]",
            cmd_aging,
        )
        .with_aliases(&["anzianita"]),
        CommandEntry::new(
            "summary",
            "Cash, receivables and payables position",
            "summary",
            cmd_summary,
        )
        .with_aliases(&["posizione", "riepilogo"]),
    ]
}

fn cmd_aging(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 0, 1, "aging [in|out]")?;
    let kind = match args.first() {
        Some(raw) => parse_kind(raw)?,
        None => ObligationKind::Inflow,
    };
    let report = AgingService::report(&context.store, context.clock(), kind, context.deadline())?;

    let title = match kind {
        ObligationKind::Inflow => "Crediti scaduti",
        ObligationKind::Outflow => "Debiti scaduti",
    };
    output::section(format!("{title} al {}", context.date(report.reference_date)));

    let mut bands = Table::new(
        None::<String>,
        vec![
            TableColumn::new("Fascia", 8),
            TableColumn::numeric("Scadenze", 8),
            TableColumn::numeric("Importo", 14),
        ],
    );
    for band in &report.bands {
        bands.add_row(vec![
            format!("{} gg", band.label),
            band.count.to_string(),
            context.money(band.amount),
        ]);
    }
    TableRenderer::render(&bands);
    output::two_column(&[("Totale scaduto", context.money(report.total()))]);

    if report.lines.is_empty() {
        return Ok(());
    }
    let mut lines = Table::new(
        Some("Dettaglio"),
        vec![
            TableColumn::new("ID", 8),
            TableColumn::new("Controparte", 20),
            TableColumn::new("Fattura", 10),
            TableColumn::new("Scadenza", 10),
            TableColumn::numeric("Ritardo", 7),
            TableColumn::numeric("Residuo", 12),
            TableColumn::new("Gravità", 8),
        ],
    );
    for line in &report.lines {
        let cells = vec![
            short_id(line.obligation_id),
            line.counterparty_label.clone(),
            line.invoice_ref.clone().unwrap_or_default(),
            context.date(line.legal_due_date),
            format!("{} gg", line.days_late),
            context.money(line.residual_amount),
            line.severity.to_string(),
        ];
        if line.severity == AgingSeverity::Critical {
            lines.add_highlighted_row(cells);
        } else {
            lines.add_row(cells);
        }
    }
    TableRenderer::render(&lines);
    Ok(())
}

fn cmd_summary(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 0, 0, "summary")?;
    let threshold = context.config.liquidity_alert_threshold;
    let summary = SummaryService::position(
        &context.store,
        context.clock(),
        Some(threshold),
        context.deadline(),
    )?;

    output::section(format!(
        "Posizione al {}",
        context.date(summary.reference_date)
    ));
    output::two_column(&[
        ("Cassa", context.money(summary.cash_on_hand)),
        ("Crediti aperti", context.money(summary.receivables)),
        ("  di cui scaduti", context.money(summary.overdue_receivables)),
        ("Debiti aperti", context.money(summary.payables)),
        ("  di cui scaduti", context.money(summary.overdue_payables)),
        ("Posizione netta", context.money(summary.net_position())),
        ("Scadenze aperte", summary.open_obligations.to_string()),
    ]);
    if summary.below_alert_threshold {
        output::alert(format!(
            "Cassa sotto la soglia di alert di {}.",
            context.money(threshold)
        ));
    }
    Ok(())
}
