use std::fmt::Write as _;

/// Renders rows as left-aligned columns separated by two spaces, with a dashed
/// rule under the header. Control characters inside cells become spaces.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let clean = |cell: &str| -> String {
        cell.chars()
            .map(|ch| if ch.is_control() { ' ' } else { ch })
            .collect()
    };
    let headers: Vec<String> = headers.iter().map(|h| clean(h.as_str())).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().take(headers.len()).map(|c| clean(c.as_str())).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count().max(1)).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut output = String::new();
    for line in std::iter::once(&headers).chain(std::iter::once(&rule)).chain(&rows) {
        let mut rendered = String::new();
        for (idx, (cell, width)) in line.iter().zip(widths.iter().copied()).enumerate() {
            if idx > 0 {
                rendered.push_str("  ");
            }
            let _ = write!(rendered, "{cell:<width$}");
        }
        let _ = writeln!(output, "{}", rendered.trim_end());
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}
