use crate::storage::{DbStats, Overview};
use crate::ui::output::human_bytes;
use tabled::{Table, Tabled, settings::Style};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn overview_table(overview: &Overview) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Files", overview.file_count);
    builder.add_row("Lines", overview.total_lines);
    builder.add_row("Size", human_bytes(overview.total_size));
    builder.add_row("Functions", overview.function_count);
    for (kind, count) in &overview.todos {
        builder.add_row(kind, count);
    }
    builder.build()
}

pub fn db_stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Files", stats.files);
    builder.add_row("Functions", stats.functions);
    builder.add_row("Dependencies", stats.dependencies);
    builder.add_row("Markers", stats.todos);
    builder.add_row("Commits", stats.commits);
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_empty_table() {
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_overview_table_lists_marker_kinds() {
        let overview = Overview {
            file_count: 3,
            total_size: 2048,
            total_lines: 120,
            function_count: 9,
            todos: BTreeMap::from([("FIXME".to_string(), 1), ("TODO".to_string(), 4)]),
        };
        let table = overview_table(&overview);
        assert!(table.contains("Metric"));
        assert!(table.contains("2.0 KB"));
        assert!(table.contains("FIXME"));
        assert!(table.contains("TODO"));
    }
}
