//! Command dispatch, error reporting and argument helpers.

use std::io;

use strsim::levenshtein;

use cassa_config::ConfigError;
use cassa_core::{storage::StoreError, CoreError};

use super::output;
pub use super::shell_context::{CliMode, ShellContext};
pub use crate::errors::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Continue,
    Exit,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("Could not serialize the result: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("exit requested")]
    ExitRequested,
}

impl From<StoreError> for CommandError {
    fn from(err: StoreError) -> Self {
        CommandError::Core(CoreError::from(err))
    }
}

impl ShellContext {
    pub(crate) fn dispatch(
        &mut self,
        command: &str,
        raw: &str,
        args: &[&str],
    ) -> Result<LoopControl, CommandError> {
        if let Some(handler) = self.registry.handler(command) {
            match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            }
        } else {
            self.suggest_command(raw);
            Ok(LoopControl::Continue)
        }
    }

    pub(crate) fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{input}`. Type `help` to see available commands."
        ));

        let needle = input.to_lowercase();
        let best = self
            .registry
            .keys()
            .map(|key| (levenshtein(key, &needle), key))
            .min_by_key(|(distance, _)| *distance);

        if let Some((distance, name)) = best {
            if distance <= 3 {
                output::info(format!("Suggestion: `{name}`?"));
            }
        }
    }

    pub(crate) fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            CommandError::Core(core) => {
                output::error(&core);
                if let Some(hint) = core_hint(&core) {
                    output::hint(hint);
                }
            }
            other => output::error(other),
        }
        Ok(())
    }
}

fn core_hint(err: &CoreError) -> Option<&'static str> {
    match err {
        CoreError::ObligationNotFound(_) => Some("Use `list` to see open obligations and their ids."),
        CoreError::UpstreamUnavailable(_) | CoreError::UpstreamTimeout => {
            Some("Nothing was changed. Retry once the store is reachable.")
        }
        CoreError::ConcurrencyConflict { .. } => {
            Some("Another update landed first. Run the command again on fresh data.")
        }
        CoreError::Overpayment { .. } => Some("Settle at most the residual amount."),
        CoreError::InvalidArgument(_) => Some("Use `help <command>` for usage details."),
        CoreError::PersistenceFailure(_) => None,
    }
}

/// Checks the argument count against `min..=max`, reporting `usage` otherwise.
pub(crate) fn expect_args(
    args: &[&str],
    min: usize,
    max: usize,
    usage: &str,
) -> Result<(), CommandError> {
    if args.len() < min || args.len() > max {
        return Err(CommandError::InvalidArguments(format!("Usage: {usage}")));
    }
    Ok(())
}
