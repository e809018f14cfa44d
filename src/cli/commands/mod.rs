pub mod config;
pub mod obligation;
pub mod projection;
pub mod reconcile;
pub mod report;
pub mod store;
pub mod system;

use crate::cli::registry::{CommandEntry, CommandRegistry};

const ROOT_COMMAND_ORDER: &[&str] = &[
    "project",
    "week",
    "list",
    "add",
    "settle",
    "reschedule",
    "site",
    "match",
    "sweep",
    "aging",
    "summary",
    "account",
    "accounts",
    "backup",
    "backups",
    "restore",
    "config",
    "help",
    "version",
    "exit",
];

pub(crate) fn all_entries() -> Vec<CommandEntry> {
    let mut commands = Vec::new();
    commands.extend(projection::definitions());
    commands.extend(obligation::definitions());
    commands.extend(reconcile::definitions());
    commands.extend(report::definitions());
    commands.extend(store::definitions());
    commands.extend(config::definitions());
    commands.extend(system::definitions());
    commands
}

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    let mut entries = all_entries();
    entries.sort_by_key(|entry| {
        ROOT_COMMAND_ORDER
            .iter()
            .position(|name| entry.name.eq_ignore_ascii_case(name))
            .unwrap_or(ROOT_COMMAND_ORDER.len())
    });
    for entry in entries {
        registry.register(entry);
    }
}
