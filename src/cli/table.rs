use colored::Colorize;

use crate::cli::output::current_preferences;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Declarative description of a table column. `width` is a minimum; columns
/// grow to fit their widest cell.
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub header: String,
    pub width: usize,
    pub align: Align,
}

impl TableColumn {
    pub fn new(header: impl Into<String>, width: usize) -> Self {
        Self {
            header: header.into(),
            width,
            align: Align::Left,
        }
    }

    /// Right-aligned column, used for amounts.
    pub fn numeric(header: impl Into<String>, width: usize) -> Self {
        Self {
            align: Align::Right,
            ..Self::new(header, width)
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub highlighted: bool,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub title: Option<String>,
    pub columns: Vec<TableColumn>,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn new<T: Into<String>>(title: Option<T>, columns: Vec<TableColumn>) -> Self {
        Self {
            title: title.map(|value| value.into()),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn add_row<S: Into<String>>(&mut self, cells: Vec<S>) {
        self.push(cells, false);
    }

    /// Adds a row rendered in the alert color.
    pub fn add_highlighted_row<S: Into<String>>(&mut self, cells: Vec<S>) {
        self.push(cells, true);
    }

    fn push<S: Into<String>>(&mut self, cells: Vec<S>, highlighted: bool) {
        self.rows.push(TableRow {
            cells: cells.into_iter().map(|value| value.into()).collect(),
            highlighted,
        });
    }

    fn column_widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.cells.get(idx))
                    .map(|cell| cell.chars().count())
                    .chain([column.width, column.header.chars().count()])
                    .max()
                    .unwrap_or(column.width)
            })
            .collect()
    }

    /// Plain-text rendering, one string per line, without colors.
    pub fn render_lines(&self) -> Vec<String> {
        let widths = self.column_widths();
        let mut lines = Vec::new();
        if let Some(title) = &self.title {
            lines.push(title.clone());
        }
        if self.columns.is_empty() {
            return lines;
        }

        let headers: Vec<&str> = self.columns.iter().map(|col| col.header.as_str()).collect();
        lines.push(self.format_cells(&headers, &widths));
        let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        lines.push("-".repeat(total.max(1)));
        for row in &self.rows {
            let cells: Vec<&str> = row.cells.iter().map(String::as_str).collect();
            lines.push(self.format_cells(&cells, &widths));
        }
        lines
    }

    fn format_cells(&self, cells: &[&str], widths: &[usize]) -> String {
        let mut line = String::new();
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                line.push_str("  ");
            }
            let cell = cells.get(idx).copied().unwrap_or("");
            let width = widths[idx];
            match column.align {
                Align::Left => line.push_str(&format!("{cell:<width$}")),
                Align::Right => line.push_str(&format!("{cell:>width$}")),
            }
        }
        line.trim_end().to_string()
    }
}

pub struct TableRenderer;

impl TableRenderer {
    pub fn render(table: &Table) {
        let prefs = current_preferences();
        let lines = table.render_lines();
        let header_offset = usize::from(table.title.is_some());
        for (idx, line) in lines.iter().enumerate() {
            if idx < header_offset || (idx == header_offset && !prefs.plain_mode) {
                println!("{}", line.bold());
                continue;
            }
            let row_index = idx.checked_sub(header_offset + 2);
            let highlighted = row_index
                .and_then(|row| table.rows.get(row))
                .is_some_and(|row| row.highlighted);
            if highlighted {
                println!("{}", line.bright_red());
            } else {
                println!("{line}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_grow_and_amounts_align_right() {
        let mut table = Table::new(
            Some("Settimane"),
            vec![TableColumn::new("Sett.", 3), TableColumn::numeric("Saldo", 5)],
        );
        table.add_row(vec!["0", "10.000,00 €"]);
        table.add_highlighted_row(vec!["1", "-2,00 €"]);

        let lines = table.render_lines();
        assert_eq!(lines[0], "Settimane");
        assert_eq!(lines[1], "Sett.        Saldo");
        assert_eq!(lines[3], "0      10.000,00 €");
        assert_eq!(lines[4], "1          -2,00 €");
    }
}
