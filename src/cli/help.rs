use crate::cli::output;
use crate::cli::registry::{CommandEntry, CommandRegistry};
use crate::cli::table::{Table, TableColumn, TableRenderer};

pub fn print_overview(registry: &CommandRegistry) {
    let mut table = Table::new(
        Some("Available commands"),
        vec![TableColumn::new("Command", 12), TableColumn::new("Description", 30)],
    );
    for entry in registry.list() {
        table.add_row(vec![entry.name, entry.description]);
    }
    TableRenderer::render(&table);
    output::hint("Use `help <command>` for usage details.");
}

pub fn print_command(entry: &CommandEntry) {
    output::section(format!("Help: {}", entry.name));
    let mut rows = vec![
        ("description", entry.description.to_string()),
        ("usage", entry.usage.to_string()),
    ];
    if !entry.aliases.is_empty() {
        rows.push(("aliases", entry.aliases.join(", ")));
    }
    output::two_column(&rows);
}
