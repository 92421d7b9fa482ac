use yansi::Paint;

use crate::markdown::callout_marker;

/// Line styles used when coloring Markdown in the terminal.
#[derive(Clone, Copy)]
enum Style {
    Heading,
    Bullet,
    Quote,
    Callout,
    Rule,
    Code,
}

/// Style Markdown line by line. Without color the input comes back unchanged
/// so plain output stays byte-stable.
pub fn render_markdown(input: &str, use_color: bool) -> String {
    if !use_color {
        return input.to_string();
    }

    let mut rendered = String::new();
    let mut in_code_block = false;

    for segment in input.split_inclusive('\n') {
        let (line, newline) = match segment.strip_suffix('\n') {
            Some(stripped) => (stripped, "\n"),
            None => (segment, ""),
        };
        let trimmed = line.trim_start();

        let styled = if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            paint(line, Style::Code)
        } else if in_code_block {
            paint(line, Style::Code)
        } else if trimmed.starts_with('#') {
            paint(line, Style::Heading)
        } else if let Some(rest) = trimmed.strip_prefix('>') {
            if callout_marker(rest).is_some() {
                paint(line, Style::Callout)
            } else {
                paint(line, Style::Quote)
            }
        } else if is_bullet(trimmed) {
            paint(line, Style::Bullet)
        } else if matches!(trimmed, "---" | "***" | "___") {
            paint(line, Style::Rule)
        } else {
            highlight_inline_code(line)
        };

        rendered.push_str(&styled);
        rendered.push_str(newline);
    }

    rendered
}

fn is_bullet(trimmed: &str) -> bool {
    ["- ", "* ", "+ "].iter().any(|m| trimmed.starts_with(m))
}

pub fn highlight_inline_code(line: &str) -> String {
    if !line.contains('`') {
        return line.to_string();
    }
    let mut out = String::new();
    let mut rest = line;

    while let Some(start) = rest.find('`') {
        let (before, after_tick) = rest.split_at(start);
        out.push_str(before);
        let after_tick = &after_tick[1..];
        match after_tick.find('`') {
            Some(end) => {
                let (code, after) = after_tick.split_at(end);
                out.push('`');
                out.push_str(&Paint::blue(code).to_string());
                out.push('`');
                rest = &after[1..];
            }
            None => {
                out.push('`');
                out.push_str(after_tick);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

fn paint(text: &str, style: Style) -> String {
    match style {
        Style::Heading => Paint::cyan(text).bold().to_string(),
        Style::Bullet => Paint::yellow(text).bold().to_string(),
        Style::Quote => Paint::new(text).italic().to_string(),
        Style::Callout => Paint::magenta(text).bold().to_string(),
        Style::Rule => Paint::new(text).dim().to_string(),
        Style::Code => Paint::blue(text).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_is_unchanged() {
        let md = "# Title\n- item\n> [!NOTE] hi\n";
        assert_eq!(render_markdown(md, false), md);
    }

    #[test]
    fn test_colored_keeps_text_and_lines() {
        let md = "# Title\n```\ncode\n```\nuse `x` here";
        let out = render_markdown(md, true);
        assert!(out.contains("Title"));
        assert!(out.contains("code"));
        assert_eq!(out.lines().count(), md.lines().count());
        assert!(out.len() > md.len());
    }

    #[test]
    fn test_highlight_inline_code_unterminated() {
        assert_eq!(highlight_inline_code("a `b"), "a `b");
        assert_eq!(highlight_inline_code("plain"), "plain");
    }
}
