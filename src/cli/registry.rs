use std::collections::HashMap;

use crate::cli::core::CommandResult;
use crate::cli::shell_context::ShellContext;

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

pub struct CommandEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    /// Alternative spellings accepted at the prompt, e.g. Italian names.
    pub aliases: &'static [&'static str],
    pub handler: CommandHandler,
}

impl CommandEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            aliases: &[],
            handler,
        }
    }

    pub const fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }
}

/// Commands in registration order, addressable by name or alias.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
    lookup: HashMap<&'static str, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `entry`; a later entry with the same name or alias shadows the earlier one.
    pub fn register(&mut self, entry: CommandEntry) {
        let index = self.entries.len();
        for key in std::iter::once(entry.name).chain(entry.aliases.iter().copied()) {
            if let Some(previous) = self.lookup.insert(key, index) {
                tracing::debug!(key, previous, "command key re-registered");
            }
        }
        self.entries.push(entry);
    }

    pub fn get(&self, key: &str) -> Option<&CommandEntry> {
        self.lookup.get(key).map(|index| &self.entries[*index])
    }

    pub fn list(&self) -> Vec<&CommandEntry> {
        self.entries.iter().collect()
    }

    /// Names and aliases, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries
            .iter()
            .flat_map(|entry| std::iter::once(entry.name).chain(entry.aliases.iter().copied()))
    }

    pub fn handler(&self, key: &str) -> Option<CommandHandler> {
        self.get(key).map(|entry| entry.handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut ShellContext, _: &[&str]) -> CommandResult {
        Ok(())
    }

    #[test]
    fn aliases_resolve_to_the_primary_entry() {
        let mut registry = CommandRegistry::new();
        registry.register(CommandEntry::new("project", "", "", noop).with_aliases(&["proiezione"]));
        registry.register(CommandEntry::new("summary", "", "", noop));

        assert_eq!(registry.get("proiezione").map(|entry| entry.name), Some("project"));
        let names: Vec<_> = registry.list().iter().map(|entry| entry.name).collect();
        assert_eq!(names, vec!["project", "summary"]);
        assert_eq!(
            registry.keys().collect::<Vec<_>>(),
            vec!["project", "proiezione", "summary"]
        );
        assert!(registry.handler("riepilogo").is_none());
    }
}
