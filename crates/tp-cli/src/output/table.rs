//! Plain aligned text tables.

/// Widest a cell may grow before it is truncated.
const MAX_CELL: usize = 60;

/// Headers, rows, and free-form lines printed under the rows.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub footer: Vec<String>,
}

impl Table {
    #[must_use]
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            ..Self::default()
        }
    }

    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn note(&mut self, line: impl Into<String>) {
        self.footer.push(line.into());
    }

    /// Render with columns padded to their widest cell. Numeric cells are
    /// right-aligned.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + self.footer.len() + 2);
        if self.rows.is_empty() {
            lines.push("(no rows)".to_string());
        } else {
            let widths: Vec<usize> = self
                .headers
                .iter()
                .enumerate()
                .map(|(index, header)| {
                    self.rows
                        .iter()
                        .filter_map(|row| row.get(index))
                        .map(|cell| cell.chars().count().min(MAX_CELL))
                        .max()
                        .unwrap_or(0)
                        .max(header.len())
                })
                .collect();

            let header_line = self
                .headers
                .iter()
                .zip(&widths)
                .map(|(header, width)| pad(header, *width, false))
                .collect::<Vec<_>>()
                .join("  ");
            lines.push(header_line.trim_end().to_string());
            lines.push("-".repeat(header_line.trim_end().chars().count()));

            for row in &self.rows {
                let line = widths
                    .iter()
                    .enumerate()
                    .map(|(index, width)| {
                        let cell = truncate(row.get(index).map_or("-", String::as_str), *width);
                        let numeric = looks_numeric(&cell);
                        pad(&cell, *width, numeric)
                    })
                    .collect::<Vec<_>>()
                    .join("  ");
                lines.push(line.trim_end().to_string());
            }
        }
        if !self.footer.is_empty() {
            lines.push(String::new());
            lines.extend(self.footer.iter().cloned());
        }
        lines.join("\n")
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn looks_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|ch| ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.'))
}

fn pad(value: &str, width: usize, right: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(value.chars().count()));
    if right {
        format!("{fill}{value}")
    } else {
        format!("{value}{fill}")
    }
}
