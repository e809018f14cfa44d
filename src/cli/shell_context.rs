//! Shared runtime state for CLI interactions and command execution.

use std::{collections::HashMap, env, path::PathBuf, sync::Arc};

use rust_decimal::Decimal;
use uuid::Uuid;

use cassa_config::{Config, ConfigManager};
use cassa_core::{
    format::{CurrencyFormatter, DateFormatter, ItalianFormatter},
    time::parse_date,
    Clock, Deadline, FixedClock, ObligationStore, ProjectionOptions,
};
use cassa_domain::Obligation;
use cassa_storage_json::{JsonObligationStore, StorePaths};

use super::{
    commands,
    core::CommandError,
    matching::PendingReconciliation,
    output::{self, OutputPreferences},
    registry::{CommandEntry, CommandRegistry},
    system_clock::SystemClock,
};
use crate::errors::CliError;

/// Overrides the data and configuration root.
pub const HOME_ENV: &str = "CASSA_HOME";
/// Pins the shell to a calendar day (`YYYY-MM-DD`).
pub const TODAY_ENV: &str = "CASSA_TODAY";

/// Shortest id prefix accepted in place of a full obligation id.
const MIN_ID_PREFIX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub store: JsonObligationStore,
    pub clock: Arc<dyn Clock>,
    pub formatter: ItalianFormatter,
    pub config_manager: ConfigManager,
    pub config: Config,
    /// Root used for the store when `data_dir` is not configured.
    pub base_dir: PathBuf,
    pub pending_match: Option<PendingReconciliation>,
    pub last_command: Option<String>,
    pub running: bool,
}

impl ShellContext {
    /// Builds the context from `CASSA_HOME` and `CASSA_TODAY`.
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let base = match env::var_os(HOME_ENV) {
            Some(home) => PathBuf::from(home),
            None => Config::default().resolve_data_dir(),
        };
        Self::with_base_dir(mode, base, clock_from_env()?)
    }

    pub fn with_base_dir(
        mode: CliMode,
        base: PathBuf,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let config_manager = ConfigManager::with_base_dir(base.clone())?;
        let config = config_manager.load()?;
        output::set_preferences(OutputPreferences::from_config(&config));

        let data_root = config.data_dir.clone().unwrap_or_else(|| base.clone());
        let store = JsonObligationStore::new(StorePaths::under(&data_root))?;
        tracing::debug!(data = %data_root.display(), "obligation store opened");

        Ok(Self {
            mode,
            registry,
            store,
            clock,
            formatter: ItalianFormatter::for_currency(&config.currency),
            config_manager,
            config,
            base_dir: base,
            pending_match: None,
            last_command: None,
            running: true,
        })
    }

    pub fn prompt(&self) -> String {
        "cassa> ".to_string()
    }

    /// Every accepted command word paired with its usage line.
    pub fn command_usages(&self) -> Vec<(&'static str, &'static str)> {
        self.registry
            .list()
            .into_iter()
            .flat_map(|entry| {
                std::iter::once(entry.name)
                    .chain(entry.aliases.iter().copied())
                    .map(move |key| (key, entry.usage))
            })
            .collect()
    }

    pub fn history_path(&self) -> PathBuf {
        self.base_dir.join("history.txt")
    }

    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn deadline(&self) -> Deadline {
        Deadline::from_millis(Some(self.config.store_timeout_ms))
    }

    pub fn projection_options(&self) -> ProjectionOptions {
        ProjectionOptions::default()
            .with_alert_threshold(self.config.liquidity_alert_threshold)
            .with_read_timeout_ms(self.config.store_timeout_ms)
    }

    pub fn money(&self, amount: Decimal) -> String {
        self.formatter.format_amount(amount)
    }

    pub fn date(&self, date: chrono::NaiveDate) -> String {
        self.formatter.format_date(date)
    }

    /// Re-applies presentation settings after the configuration changed.
    pub fn apply_config(&mut self) {
        self.formatter = ItalianFormatter::for_currency(&self.config.currency);
        output::set_preferences(OutputPreferences::from_config(&self.config));
    }

    pub fn data_root(&self, config: &Config) -> PathBuf {
        config
            .data_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.clone())
    }

    pub fn counterparty_labels(&self) -> Result<HashMap<Uuid, String>, CommandError> {
        let counterparties = self.store.list_counterparties(self.deadline())?;
        Ok(cassa_core::counterparty_labels(&counterparties))
    }

    /// Resolves a full id or an unambiguous prefix of at least four characters.
    pub fn resolve_obligation(&self, token: &str) -> Result<Obligation, CommandError> {
        let token = token.trim().to_ascii_lowercase();
        if let Ok(id) = Uuid::parse_str(&token) {
            return Ok(self.store.get_obligation(id)?);
        }
        if token.len() < MIN_ID_PREFIX {
            return Err(CommandError::InvalidArguments(format!(
                "`{token}` is too short; give at least {MIN_ID_PREFIX} characters of the id"
            )));
        }

        let snapshot = self.store.snapshot()?;
        let mut matches = snapshot
            .obligations
            .into_iter()
            .filter(|obligation| obligation.id.to_string().starts_with(&token));
        match (matches.next(), matches.next()) {
            (Some(obligation), None) => Ok(obligation),
            (None, _) => Err(CommandError::InvalidArguments(format!(
                "No obligation id starts with `{token}`."
            ))),
            (Some(_), Some(_)) => Err(CommandError::InvalidArguments(format!(
                "`{token}` matches more than one obligation; use a longer prefix."
            ))),
        }
    }
}

fn clock_from_env() -> Result<Arc<dyn Clock>, CliError> {
    match env::var(TODAY_ENV) {
        Ok(value) if !value.trim().is_empty() => {
            let today = parse_date(&value)
                .map_err(|_| CliError::Input(format!("{TODAY_ENV} must be YYYY-MM-DD, got `{value}`")))?;
            Ok(Arc::new(FixedClock::new(today)))
        }
        _ => Ok(Arc::new(SystemClock)),
    }
}

/// First eight characters of an id, enough to address it from the shell.
pub fn short_id(id: Uuid) -> String {
    id.to_string().chars().take(8).collect()
}
