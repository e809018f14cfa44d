use cassa_core::public_api::api_compute_projection;
use cassa_domain::{ObligationKind, ProjectionResult, WeekSlice};

use crate::cli::core::{expect_args, CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::shell_context::short_id;
use crate::cli::table::{Table, TableColumn, TableRenderer};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "project",
            "Weekly liquidity projection",
            "project [days] [--json]",
            cmd_project,
        )
        .with_aliases(&["proiezione"]),
        CommandEntry::new(
            "week",
            "Obligations behind one projected week",
            "week <index> [days]",
            cmd_week,
        )
        .with_aliases(&["settimana"]),
    ]
}

fn cmd_project(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let as_json = args.contains(&"--json");
    let args: Vec<&str> = args.iter().copied().filter(|arg| *arg != "--json").collect();
    expect_args(&args, 0, 1, "project [days] [--json]")?;
    let horizon = horizon_arg(context, args.first().copied())?;
    let result = compute(context, horizon)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    output::section(format!(
        "Proiezione di liquidità: {} giorni dal {}",
        result.horizon_days,
        context.date(result.reference_date)
    ));
    output::two_column(&[
        ("Saldo iniziale", context.money(result.opening_balance)),
        ("Saldo finale", context.money(result.closing_balance())),
        (
            "Soglia alert",
            context.money(context.config.liquidity_alert_threshold),
        ),
    ]);

    let mut table = Table::new(
        None::<String>,
        vec![
            TableColumn::new("#", 2),
            TableColumn::new("Settimana", 16),
            TableColumn::new("Periodo", 13),
            TableColumn::numeric("Entrate", 12),
            TableColumn::numeric("Uscite", 12),
            TableColumn::numeric("Saldo", 14),
            TableColumn::new("", 6),
        ],
    );
    for week in &result.weeks {
        let cells = vec![
            week.index.to_string(),
            week.period_label.clone(),
            format!(
                "{}-{}",
                week.period_start.format("%d/%m"),
                week.period_end.format("%d/%m")
            ),
            context.money(week.inflow_total),
            context.money(week.outflow_total),
            context.money(week.projected_balance),
            week_flag(week).to_string(),
        ];
        if week.is_negative() {
            table.add_highlighted_row(cells);
        } else {
            table.add_row(cells);
        }
    }
    TableRenderer::render(&table);
    report_outcome(context, &result);
    Ok(())
}

fn cmd_week(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 1, 2, "week <index> [days]")?;
    let index: usize = args[0].parse().map_err(|_| {
        CommandError::InvalidArguments(format!("`{}` is not a week index", args[0]))
    })?;
    let horizon = horizon_arg(context, args.get(1).copied())?;
    let result = compute(context, horizon)?;
    let Some(week) = result.weeks.get(index) else {
        return Err(CommandError::InvalidArguments(format!(
            "Week {index} is outside the projection (0..={}).",
            result.weeks.len().saturating_sub(1)
        )));
    };

    output::section(format!(
        "{}: {} - {}",
        week.period_label,
        context.date(week.period_start),
        context.date(week.period_end)
    ));
    if week.detail_lines.is_empty() {
        output::info("Nessuna scadenza in questa settimana.");
    } else {
        let mut table = Table::new(
            None::<String>,
            vec![
                TableColumn::new("ID", 8),
                TableColumn::new("Data", 10),
                TableColumn::new("Tipo", 4),
                TableColumn::new("Controparte", 20),
                TableColumn::new("Fattura", 10),
                TableColumn::numeric("Residuo", 12),
                TableColumn::new("", 7),
            ],
        );
        for line in &week.detail_lines {
            table.add_row(vec![
                short_id(line.obligation_id),
                context.date(line.effective_date),
                line.kind.to_string(),
                line.counterparty_label.clone(),
                line.invoice_ref.clone().unwrap_or_default(),
                context.money(line.kind.signed(line.residual_amount)),
                if line.past_due { "scaduta" } else { "" }.to_string(),
            ]);
        }
        TableRenderer::render(&table);
    }
    output::two_column(&[
        ("Netto", context.money(week.net_change)),
        ("Saldo", context.money(week.projected_balance)),
    ]);
    Ok(())
}

fn compute(context: &ShellContext, horizon: i64) -> Result<ProjectionResult, CommandError> {
    let options = context.projection_options();
    Ok(api_compute_projection(
        &context.store,
        context.clock(),
        horizon,
        &options,
    )?)
}

fn horizon_arg(context: &ShellContext, arg: Option<&str>) -> Result<i64, CommandError> {
    match arg {
        None => Ok(context.config.horizon_days),
        Some(raw) => raw.parse().map_err(|_| {
            CommandError::InvalidArguments(format!(
                "`{raw}` is not a positive number of days"
            ))
        }),
    }
}

fn week_flag(week: &WeekSlice) -> &'static str {
    if week.is_negative() {
        "NEG"
    } else if week.below_threshold {
        "SOGLIA"
    } else {
        ""
    }
}

fn report_outcome(context: &ShellContext, result: &ProjectionResult) {
    if let Some(week) = result.first_shortfall() {
        output::alert(format!(
            "Attenzione: rischio liquidità. Saldo negativo dalla settimana {} ({}): {}",
            week.index,
            week.period_label,
            context.money(week.projected_balance)
        ));
    }

    let below = result
        .weeks_below_threshold()
        .filter(|week| !week.is_negative())
        .count();
    if below > 0 {
        output::warning(format!(
            "{below} settimane sotto la soglia di {}.",
            context.money(context.config.liquidity_alert_threshold)
        ));
    }

    if result.has_anomalies() {
        output::warning(format!(
            "{} scadenze escluse dalla proiezione:",
            result.anomalies.len()
        ));
        for anomaly in &result.anomalies {
            output::info(format!("  {} {}", short_id(anomaly.obligation_id), anomaly.kind));
        }
    }

    let past_due: usize = result
        .weeks
        .first()
        .map(|week| {
            week.detail_lines
                .iter()
                .filter(|line| line.past_due && line.kind == ObligationKind::Outflow)
                .count()
        })
        .unwrap_or(0);
    if past_due > 0 {
        output::hint(format!(
            "{past_due} pagamenti scaduti conteggiati nella prima settimana; usa `week 0` per il dettaglio."
        ));
    }
}
