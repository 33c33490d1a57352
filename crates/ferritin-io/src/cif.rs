//! mmCIF category tables for header records that pdbtbx does not keep.
//!
//! Handles `loop_` tables and single-row `_category.item value` blocks, quoted
//! values and `;` text fields. Only what the header readers need.

/// One category, as columns (item names without the category prefix) and rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CifTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CifTable {
    pub(crate) fn column(&self, item: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == item)
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// All values of one item, in row order.
    pub(crate) fn values<'a>(&'a self, item: &str) -> Option<impl Iterator<Item = &'a str>> {
        let index = self.column(item)?;
        Some(self.rows.iter().map(move |row| row[index].as_str()))
    }
}

/// `?` and `.` mark unknown and inapplicable values.
pub(crate) fn is_null(value: &str) -> bool {
    matches!(value, "?" | ".")
}

/// The table for `category` (e.g. `_pdbx_poly_seq_scheme`), in loop or single-row form.
pub(crate) fn read_category(document: &str, category: &str) -> Option<CifTable> {
    read_loop(document, category).or_else(|| read_single_row(document, category))
}

fn read_loop(document: &str, category: &str) -> Option<CifTable> {
    let prefix = format!("{}.", category);
    let mut lines = document.lines().peekable();

    while let Some(line) = lines.next() {
        if line.trim() != "loop_" {
            continue;
        }
        if !lines
            .peek()
            .is_some_and(|next| next.trim_start().starts_with(&prefix))
        {
            continue;
        }

        let mut columns = Vec::new();
        while let Some(item) = lines
            .peek()
            .and_then(|next| next.trim().strip_prefix(&prefix))
        {
            columns.push(item.to_string());
            lines.next();
        }

        let mut tokens = Vec::new();
        while let Some(&row) = lines.peek() {
            if let Some(first) = row.strip_prefix(';') {
                lines.next();
                tokens.push(text_field(first, &mut lines));
                continue;
            }
            let trimmed = row.trim();
            if trimmed.starts_with(['#', '_']) || trimmed.starts_with("loop_") || trimmed.starts_with("data_") {
                break;
            }
            tokens.extend(tokenize(trimmed));
            lines.next();
        }

        let rows = tokens
            .chunks_exact(columns.len())
            .map(<[String]>::to_vec)
            .collect();
        return Some(CifTable { columns, rows });
    }
    None
}

fn read_single_row(document: &str, category: &str) -> Option<CifTable> {
    let prefix = format!("{}.", category);
    let mut table = CifTable::default();
    let mut row = Vec::new();
    for line in document.lines() {
        let Some(rest) = line.trim().strip_prefix(&prefix) else {
            continue;
        };
        let mut tokens = tokenize(rest).into_iter();
        if let (Some(item), Some(value)) = (tokens.next(), tokens.next()) {
            table.columns.push(item);
            row.push(value);
        }
    }
    if row.is_empty() {
        return None;
    }
    table.rows.push(row);
    Some(table)
}

/// Collect a `;`-delimited text field; `first` is the remainder of the opening line.
fn text_field<'a, I: Iterator<Item = &'a str>>(
    first: &str,
    lines: &mut std::iter::Peekable<I>,
) -> String {
    let mut value = first.to_string();
    for line in lines.by_ref() {
        if line.starts_with(';') {
            break;
        }
        value.push('\n');
        value.push_str(line);
    }
    value.trim().to_string()
}

/// Split a line into values. Quotes close only when followed by whitespace.
fn tokenize(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        if chars[i] == '#' {
            break;
        }
        let quote = chars[i];
        if quote == '\'' || quote == '"' {
            let start = i + 1;
            let mut end = start;
            while end < chars.len()
                && !(chars[end] == quote && chars.get(end + 1).map_or(true, |c| c.is_whitespace()))
            {
                end += 1;
            }
            tokens.push(chars[start..end.min(chars.len())].iter().collect());
            i = end + 1;
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
        }
    }
    tokens
}
