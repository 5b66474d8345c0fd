//! Column layout for table events.
//!
//! Tables are laid out by `comfy-table`: no borders, a dashed rule under the
//! headings and two spaces between columns. Widths are measured in visible
//! characters, so values painted with [`Color::paint`](crate::Color::paint)
//! line up with plain ones.

use comfy_table::Table;

/// Only the line under the header is drawn.
const HEADER_RULE_ONLY: &str = "     -             ";

/// Render headings, a rule and rows as aligned text, one line per row.
///
/// Headings and rows may differ in length; the column count is the longest
/// of them and every cell counts towards its column's width.
pub fn render(headings: &[String], rows: &[Vec<String>]) -> String {
    let columns = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headings.len()))
        .max()
        .unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let mut table = Table::new();
    table.load_preset(HEADER_RULE_ONLY);
    if !headings.is_empty() {
        table.set_header(headings.iter().map(String::as_str).collect::<Vec<_>>());
    }
    for row in rows {
        table.add_row(row.iter().map(String::as_str).collect::<Vec<_>>());
    }
    for (i, column) in table.column_iter_mut().enumerate() {
        let right = if i + 1 < columns { 2 } else { 0 };
        column.set_padding((0, right));
    }

    let mut out = String::new();
    for line in table.lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use pretty_assertions::assert_eq;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn test_widths_cover_headings_and_all_rows() {
        let headings = strings(&["Id", "Status"]);
        let rows = vec![strings(&["1", "online"]), strings(&["22", "off"])];
        let text = render(&headings, &rows);
        let lines = lines(&text);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Id  Status");
        assert!(!lines[1].is_empty());
        assert!(lines[1].chars().all(|c| c == '-'));
        assert_eq!(lines[2], "1   online");
        assert_eq!(lines[3], "22  off");
    }

    #[test]
    fn test_ragged_rows_widen_the_table() {
        let headings = strings(&["Id", "Status"]);
        let rows = vec![strings(&["1", "x"]), strings(&["12345", "y", "extra"])];
        let text = render(&headings, &rows);
        let lines = lines(&text);
        assert_eq!(lines[0], "Id     Status");
        assert_eq!(lines[2], "1      x");
        assert_eq!(lines[3], "12345  y       extra");
    }

    #[test]
    fn test_ansi_escapes_are_invisible() {
        let painted = Color::Green.paint("online");
        let rows = vec![vec![painted, "1".to_string()], strings(&["off", "22"])];
        let text = render(&strings(&["Status", "Id"]), &rows);
        let lines = lines(&text);
        assert_eq!(lines[0], "Status  Id");
        assert!(lines[2].contains("online"));
        assert!(lines[2].ends_with("  1"));
        assert_eq!(lines[3], "off     22");
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(render(&[], &[]), "");
    }
}
