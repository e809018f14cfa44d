use std::path::PathBuf;

use cassa_config::{Config, Theme};
use cassa_core::public_api::parse_amount;
use cassa_storage_json::{JsonObligationStore, StorePaths};

use crate::cli::core::{expect_args, CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;

const USAGE: &str = "config [set <key> <value> | backup [note] | backups | restore <name>]";

const KEYS: &[&str] = &[
    "locale",
    "currency",
    "theme",
    "color",
    "horizon",
    "threshold",
    "timeout",
    "retries",
    "data_dir",
];

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![CommandEntry::new(
        "config",
        "Show or change preferences",
        USAGE,
        cmd_config,
    )]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args.first().map(|sub| sub.to_ascii_lowercase()).as_deref() {
        None | Some("show") => {
            show(context);
            Ok(())
        }
        Some("set") => {
            expect_args(args, 3, 3, "config set <key> <value>")?;
            set(context, args[1], args[2])
        }
        Some("backup") => {
            let note = (args.len() > 1).then(|| args[1..].join(" "));
            let name = context
                .config_manager
                .backup(&context.config, note.as_deref())?;
            output::success(format!("Backup configurazione: {name}"));
            Ok(())
        }
        Some("backups") => {
            let names = context.config_manager.list_backups()?;
            if names.is_empty() {
                output::info("Nessun backup di configurazione.");
            }
            for name in names {
                output::info(format!("  {name}"));
            }
            Ok(())
        }
        Some("restore") => {
            expect_args(args, 2, 2, "config restore <name>")?;
            let restored = context.config_manager.restore(args[1])?;
            replace(context, restored)?;
            output::success(format!("Configurazione ripristinata da {}.", args[1]));
            Ok(())
        }
        Some(_) => Err(CommandError::InvalidArguments(format!("Usage: {USAGE}"))),
    }
}

fn show(context: &ShellContext) {
    let config = &context.config;
    output::section("Configurazione");
    output::two_column(&[
        ("locale", config.locale.clone()),
        ("currency", config.currency.clone()),
        ("theme", config.theme.to_string()),
        ("color", config.ui_color_enabled.to_string()),
        ("horizon", format!("{} giorni", config.horizon_days)),
        ("threshold", context.money(config.liquidity_alert_threshold)),
        ("timeout", format!("{} ms", config.store_timeout_ms)),
        ("retries", config.settlement_retry_attempts.to_string()),
        (
            "data_dir",
            context.store.paths().data_file.display().to_string(),
        ),
    ]);
}

fn set(context: &mut ShellContext, key: &str, value: &str) -> CommandResult {
    let mut updated = context.config.clone();
    apply(&mut updated, key, value)?;
    updated.validate()?;
    context.config_manager.save(&updated)?;
    replace(context, updated)?;
    output::success(format!("{key} aggiornato."));
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<(), CommandError> {
    let invalid = |what: &str| CommandError::InvalidArguments(format!("`{value}` is not {what}"));
    match key.to_ascii_lowercase().as_str() {
        "locale" => config.locale = value.to_string(),
        "currency" => config.currency = value.to_ascii_uppercase(),
        "theme" => config.theme = Theme::parse(value),
        "color" => {
            config.ui_color_enabled = match value.to_ascii_lowercase().as_str() {
                "on" | "true" | "yes" | "si" => true,
                "off" | "false" | "no" => false,
                _ => return Err(invalid("on or off")),
            }
        }
        "horizon" => config.horizon_days = value.parse().map_err(|_| invalid("a number of days"))?,
        "threshold" => config.liquidity_alert_threshold = parse_amount(value)?,
        "timeout" => {
            config.store_timeout_ms = value.parse().map_err(|_| invalid("milliseconds"))?
        }
        "retries" => {
            config.settlement_retry_attempts =
                value.parse().map_err(|_| invalid("a retry count"))?
        }
        "data_dir" => {
            config.data_dir = match value {
                "" | "default" => None,
                path => Some(PathBuf::from(path)),
            }
        }
        other => {
            return Err(CommandError::InvalidArguments(format!(
                "Unknown key `{other}`. Keys: {}",
                KEYS.join(", ")
            )))
        }
    }
    Ok(())
}

/// Swaps in a new configuration, reopening the store when its root moved.
fn replace(context: &mut ShellContext, config: Config) -> CommandResult {
    if config.data_dir != context.config.data_dir {
        let root = context.data_root(&config);
        context.store = JsonObligationStore::new(StorePaths::under(&root))?;
        context.pending_match = None;
    }
    context.config = config;
    context.apply_config();
    Ok(())
}
