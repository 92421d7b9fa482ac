/// Width of the attached terminal. `COLUMNS` wins over detection so piped
/// output and tests get a stable layout.
pub fn terminal_columns() -> Option<usize> {
    if let Some(cols) = std::env::var("COLUMNS")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|c| *c > 0)
    {
        return Some(cols);
    }
    terminal_size::terminal_size().map(|(terminal_size::Width(w), _)| w as usize)
}

/// Render rows as aligned columns separated by two spaces. The last column
/// is left unpadded so long excerpts do not drag trailing whitespace.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| display_len(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_len(cell));
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    let header = format_row(headers, &widths);
    let rule = "─".repeat(display_len(&header));
    lines.push(header);
    lines.push(rule);
    for row in rows {
        lines.push(format_row(row, &widths));
    }
    lines.join("\n")
}

fn format_row(row: &[String], widths: &[usize]) -> String {
    let last = row.len().min(widths.len()).saturating_sub(1);
    let mut out = String::new();
    for (i, (cell, width)) in row.iter().zip(widths.iter()).enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        if i == last {
            out.push_str(cell);
        } else {
            out.push_str(&pad_field(cell, *width));
        }
    }
    out
}

/// Right-pad a field to `target` visible characters.
pub fn pad_field(display: &str, target: usize) -> String {
    let padding = target.saturating_sub(display_len(display));
    format!("{display}{}", " ".repeat(padding))
}

/// Truncate text to a width, appending an ellipsis when needed.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if text.chars().count() <= max_width {
        return text.to_string();
    }
    if max_width == 1 {
        return "…".to_string();
    }
    let mut out: String = text.chars().take(max_width - 1).collect();
    out.push('…');
    out
}

/// Visible length of a string, ignoring ANSI escape sequences.
pub fn display_len(s: &str) -> usize {
    let mut len = 0;
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
            continue;
        }
        len += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 6), "hello…");
        assert_eq!(truncate_with_ellipsis("hello", 1), "…");
        assert_eq!(truncate_with_ellipsis("hello", 0), "");
    }

    #[test]
    fn test_display_len_ignores_ansi() {
        assert_eq!(display_len("\x1b[1;31mred\x1b[0m"), 3);
        assert_eq!(display_len("plain"), 5);
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let headers = vec!["#".to_string(), "Title".to_string()];
        let rows = vec![
            vec!["7".to_string(), "Synth".to_string()],
            vec!["12".to_string(), "Bot".to_string()],
        ];
        let out = render_table(&headers, &rows);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "#   Title");
        assert_eq!(lines[2], "7   Synth");
        assert_eq!(lines[3], "12  Bot");
    }
}
