use cassa_core::{public_api::parse_amount, ObligationStore};
use cassa_domain::account::opening_balance;

use crate::cli::core::{expect_args, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::cli::table::{Table, TableColumn, TableRenderer};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "account",
            "Create a bank account or update its balance",
            "account <name> <balance>",
            cmd_account,
        )
        .with_aliases(&["conto"]),
        CommandEntry::new(
            "accounts",
            "List active bank accounts",
            "accounts",
            cmd_accounts,
        )
        .with_aliases(&["conti"]),
        CommandEntry::new(
            "backup",
            "Snapshot the obligation store",
            "backup [note]",
            cmd_backup,
        ),
        CommandEntry::new(
            "backups",
            "List store snapshots, newest first",
            "backups",
            cmd_backups,
        ),
        CommandEntry::new(
            "restore",
            "Replace the store with a snapshot",
            "restore <name>",
            cmd_restore,
        ),
    ]
}

fn cmd_account(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 2, 2, "account <name> <balance>")?;
    let balance = parse_amount(args[1])?;
    let account = context.store.set_account_balance(args[0], balance)?;
    output::success(format!(
        "Saldo di {} impostato a {}.",
        account.bank_name,
        context.money(account.current_balance)
    ));
    Ok(())
}

fn cmd_accounts(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 0, 0, "accounts")?;
    let accounts = context.store.list_active_accounts(context.deadline())?;
    if accounts.is_empty() {
        output::info("Nessun conto attivo. Usa `account <nome> <saldo>`.");
        return Ok(());
    }

    let mut table = Table::new(
        Some("Conti attivi"),
        vec![
            TableColumn::new("Banca", 20),
            TableColumn::new("IBAN", 27),
            TableColumn::numeric("Saldo", 14),
        ],
    );
    for account in &accounts {
        table.add_row(vec![
            account.bank_name.clone(),
            account.iban.clone().unwrap_or_default(),
            context.money(account.current_balance),
        ]);
    }
    TableRenderer::render(&table);
    output::two_column(&[("Totale cassa", context.money(opening_balance(&accounts)))]);
    Ok(())
}

fn cmd_backup(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let note = (!args.is_empty()).then(|| args.join(" "));
    let info = context.store.backup(note.as_deref())?;
    output::success(format!("Backup creato: {}", info.name));
    Ok(())
}

fn cmd_backups(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 0, 0, "backups")?;
    let backups = context.store.list_backups()?;
    if backups.is_empty() {
        output::info("Nessun backup presente.");
        return Ok(());
    }

    let mut table = Table::new(
        Some("Backup"),
        vec![
            TableColumn::new("Nome", 36),
            TableColumn::new("Creato", 16),
            TableColumn::numeric("Byte", 8),
        ],
    );
    for backup in &backups {
        table.add_row(vec![
            backup.name.clone(),
            backup
                .created_at
                .map(|at| at.format("%d/%m/%Y %H:%M").to_string())
                .unwrap_or_else(|| "-".into()),
            backup.size_bytes.to_string(),
        ]);
    }
    TableRenderer::render(&table);
    Ok(())
}

fn cmd_restore(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    expect_args(args, 1, 1, "restore <name>")?;
    let snapshot = context.store.restore_backup(args[0])?;
    context.pending_match = None;
    output::success(format!(
        "Ripristinato {}: {} conti, {} scadenze.",
        args[0],
        snapshot.accounts.len(),
        snapshot.obligations.len()
    ));
    Ok(())
}
