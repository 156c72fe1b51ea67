//! Markdown tables and message splitting.
//!
//! Replies that exceed the platform's message length are split on line
//! boundaries; tables pad their columns so the monospace block lines up.

/// The platform message length ceiling, minus markdown overhead.
pub const MSG_LIMIT: usize = 1985;

/// Format rows as a padded monospace table.
///
/// With `header` set, the first row is underlined with dashes. The table
/// is wrapped in a code fence with `prefix` ahead of it.
pub fn format_table(rows: &[Vec<String>], header: bool, prefix: &str) -> String {
    if rows.is_empty() {
        return prefix.to_string();
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (ind, cell) in row.iter().enumerate() {
            widths[ind] = widths[ind].max(cell.chars().count());
        }
    }

    let render = |row: &Vec<String>| -> String {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(ind, cell)| format!("{cell:<width$}", width = widths[ind]))
            .collect();
        cells.join(" | ").trim_end().to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (ind, row) in rows.iter().enumerate() {
        lines.push(render(row));
        if header && ind == 0 {
            let total: usize = widths.iter().sum::<usize>() + 3 * (columns.saturating_sub(1));
            lines.push("-".repeat(total));
        }
    }

    format!("{prefix}```\n{}\n```", lines.join("\n"))
}

/// Split `text` into chunks under `limit`, breaking on newlines.
///
/// A single line longer than the limit is hard-split; the common case is
/// many short lines packed greedily.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    for line in text.split('\n') {
        let mut line = line;
        // Hard-split pathological lines.
        while line.len() > limit {
            let (head, tail) = line.split_at(floor_char_boundary(line, limit));
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            parts.push(head.to_string());
            line = tail;
        }

        let needed = line.len() + if current.is_empty() { 0 } else { 1 };
        if current.len() + needed > limit && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pads_columns() {
        let rows = vec![
            vec!["Name".to_string(), "Merits".to_string()],
            vec!["Alice".to_string(), "700".to_string()],
            vec!["Bo".to_string(), "12000".to_string()],
        ];
        let table = format_table(&rows, true, "__Top__\n");
        assert!(table.starts_with("__Top__\n```"));
        assert!(table.contains("Name  | Merits"));
        assert!(table.contains("Alice | 700"));
        assert!(table.contains("Bo    | 12000"));
        assert!(table.contains("-------"));
    }

    #[test]
    fn short_text_is_one_part() {
        assert_eq!(split_message("hello", MSG_LIMIT), vec!["hello"]);
    }

    #[test]
    fn long_text_splits_on_lines() {
        let text = (0..100).map(|i| format!("line number {i}")).collect::<Vec<_>>().join("\n");
        let parts = split_message(&text, 200);
        assert!(parts.len() > 1);
        assert!(parts.iter().all(|p| p.len() <= 200));
        // Nothing lost.
        assert_eq!(parts.join("\n"), text);
    }

    #[test]
    fn pathological_line_is_hard_split() {
        let text = "x".repeat(450);
        let parts = split_message(&text, 200);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts.concat(), text);
    }
}
