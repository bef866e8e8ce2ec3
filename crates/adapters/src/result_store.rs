/// Materialized rows of one query, as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub truncated: bool,
}

impl ResultTable {
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers,
            rows,
            truncated: false,
        }
    }
}

/// A stored result split into fixed-size pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedResult {
    table: ResultTable,
    page_size: usize,
}

impl PagedResult {
    #[must_use]
    pub fn new(table: ResultTable, page_size: usize) -> Self {
        Self {
            table,
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub fn table(&self) -> &ResultTable {
        &self.table
    }

    /// An empty result still has one (empty) page.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.table.rows.len().div_ceil(self.page_size).max(1)
    }

    #[must_use]
    pub fn clamp(&self, requested: i64) -> usize {
        let last = self.page_count() - 1;
        usize::try_from(requested.max(0)).map_or(last, |index| index.min(last))
    }

    #[must_use]
    pub fn render_page(&self, index: usize) -> Vec<String> {
        let index = index.min(self.page_count() - 1);
        let start = index * self.page_size;
        let rows = self
            .table
            .rows
            .iter()
            .skip(start)
            .take(self.page_size)
            .collect::<Vec<_>>();

        let mut lines = render_table(&self.table.headers, &rows);
        let mut footer = format!(
            "page {}/{} ({} rows",
            index + 1,
            self.page_count(),
            self.table.rows.len()
        );
        if self.table.truncated {
            footer.push_str(", truncated");
        }
        footer.push(')');
        lines.push(footer);
        lines
    }
}

fn render_table(headers: &[String], rows: &[&Vec<String>]) -> Vec<String> {
    let columns = rows
        .iter()
        .map(|row| row.len())
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);
    if columns == 0 {
        return Vec::new();
    }

    let mut widths = vec![0_usize; columns];
    for (column, header) in headers.iter().enumerate() {
        widths[column] = widths[column].max(header.chars().count());
    }
    for row in rows {
        for (column, value) in row.iter().enumerate() {
            widths[column] = widths[column].max(value.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(headers, &widths));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in rows {
        lines.push(render_row(row, &widths));
    }
    lines
}

fn render_row(values: &[String], widths: &[usize]) -> String {
    widths
        .iter()
        .enumerate()
        .map(|(column, width)| {
            let value = values.get(column).map_or("", String::as_str);
            format!("{value:<width$}")
        })
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}
