use crate::shared::table::terminal_columns;
use std::error::Error;
use std::io::{self, Write};

mod content;

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Command,
    Environment,
    Guide,
}

impl Section {
    fn label(self) -> &'static str {
        match self {
            Section::Command => "Commands",
            Section::Environment => "Environment",
            Section::Guide => "Guides",
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) struct HelpFlag<'a> {
    pub name: &'a str,
    pub desc: &'a str,
}

#[derive(Clone, Copy)]
pub(crate) struct HelpTopic<'a> {
    pub name: &'a str,
    pub summary: &'a str,
    pub usage: &'a str,
    pub details: &'a [&'a str],
    pub flags: &'a [HelpFlag<'a>],
    pub aliases: &'a [&'a str],
    pub section: Section,
    pub examples: &'a [&'a str],
}

#[derive(Clone, Copy)]
pub(crate) struct HelpBook<'a> {
    pub title: &'a str,
    pub usage: &'a str,
    pub topics: &'a [HelpTopic<'a>],
    pub footer: &'a [&'a str],
}

impl<'a> HelpBook<'a> {
    fn find(&self, name: &str) -> Option<&HelpTopic<'a>> {
        self.topics.iter().find(|topic| {
            topic.name.eq_ignore_ascii_case(name)
                || topic.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
        })
    }

    fn in_section(&self, section: Section) -> impl Iterator<Item = &HelpTopic<'a>> {
        self.topics.iter().filter(move |t| t.section == section)
    }
}

/// Print the overview, or one topic when named.
pub(crate) fn run(args: Vec<String>) -> Result<(), Box<dyn Error>> {
    let lines = render(args.first().map(String::as_str));
    let mut stdout = io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }
    Ok(())
}

pub(crate) fn render(topic: Option<&str>) -> Vec<String> {
    let book = content::book();
    let width = terminal_columns().unwrap_or(96).clamp(64, 120);
    let printer = HelpPrinter::new(width);

    match topic {
        None => printer.render_overview(&book),
        Some(name) => match book.find(name) {
            Some(entry) => printer.render_topic(&book, entry),
            None => {
                eprintln!("Unknown help topic: {name}");
                printer.render_overview(&book)
            }
        },
    }
}

struct HelpPrinter {
    width: usize,
}

impl HelpPrinter {
    fn new(width: usize) -> Self {
        Self { width }
    }

    fn rows(&self, book: &HelpBook<'_>, section: Section) -> Vec<(String, String)> {
        book.in_section(section)
            .map(|t| {
                let label = if section == Section::Guide { t.name } else { t.usage };
                (label.to_string(), t.summary.to_string())
            })
            .collect()
    }

    fn render_overview(&self, book: &HelpBook<'_>) -> Vec<String> {
        let mut out = vec![book.title.to_string(), format!("usage: {}", book.usage), String::new()];
        for section in [Section::Command, Section::Environment, Section::Guide] {
            out.extend(self.render_block(section.label(), &self.rows(book, section)));
        }
        out.extend(self.render_footer(book));
        out
    }

    fn render_topic(&self, book: &HelpBook<'_>, topic: &HelpTopic<'_>) -> Vec<String> {
        let mut out = vec![
            format!("{}: {}", topic.name, topic.summary),
            format!("usage: {}", topic.usage),
        ];
        if !topic.aliases.is_empty() {
            out.push(format!("aliases: {}", topic.aliases.join(", ")));
        }
        out.push(String::new());

        for line in topic.details {
            out.extend(self.wrap(line, self.width));
        }
        if !topic.details.is_empty() {
            out.push(String::new());
        }

        let flags: Vec<(String, String)> = topic
            .flags
            .iter()
            .map(|f| (f.name.to_string(), f.desc.to_string()))
            .collect();
        out.extend(self.render_block("Options", &flags));

        if !topic.examples.is_empty() {
            out.push("Examples:".to_string());
            for ex in topic.examples {
                for l in self.wrap(ex, self.width.saturating_sub(2)) {
                    out.push(format!("  {l}"));
                }
            }
            out.push(String::new());
        }

        out.extend(self.render_footer(book));
        out
    }

    fn render_footer(&self, book: &HelpBook<'_>) -> Vec<String> {
        book.footer.iter().flat_map(|line| self.wrap(line, self.width)).collect()
    }

    fn render_block(&self, title: &str, rows: &[(String, String)]) -> Vec<String> {
        if rows.is_empty() {
            return Vec::new();
        }
        let min_desc = self.width / 2;
        let mut label_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0).min(38);
        if label_width + 4 + min_desc > self.width {
            label_width = self.width.saturating_sub(min_desc + 4);
        }
        let desc_width = self.width.saturating_sub(2 + label_width + 2).max(min_desc);

        let mut out = vec![format!("{title}:")];
        for (label, desc) in rows {
            let label_lines = self.wrap(label, label_width);
            let desc_lines = self.wrap(desc, desc_width);
            for idx in 0..label_lines.len().max(desc_lines.len()) {
                let l = label_lines.get(idx).map(String::as_str).unwrap_or("");
                let d = desc_lines.get(idx).map(String::as_str).unwrap_or("");
                out.push(format!("  {l:label_width$}  {d}").trim_end().to_string());
            }
        }
        out.push(String::new());
        out
    }

    fn wrap(&self, text: &str, width: usize) -> Vec<String> {
        let mut out = Vec::new();
        let mut line = String::new();
        for word in text.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
            } else if line.len() + 1 + word.len() <= width {
                line.push(' ');
                line.push_str(word);
            } else {
                out.push(std::mem::take(&mut line));
                line.push_str(word);
            }
        }
        if !line.is_empty() || out.is_empty() {
            out.push(line);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overview_lists_every_command() {
        let text = render(None).join("\n");
        for cmd in ["build", "list", "view", "render", "note", "token", "cache", "path", "help"] {
            assert!(text.contains(&format!("folio {cmd}")), "missing {cmd}");
        }
        assert!(text.contains("FOLIO_DIR"));
    }

    #[test]
    fn test_topic_lookup_by_alias() {
        let text = render(Some("filters")).join("\n");
        assert!(text.starts_with("build:"));
    }

    #[test]
    fn test_wrap_respects_width() {
        let printer = HelpPrinter::new(64);
        let lines = printer.wrap("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
        assert_eq!(printer.wrap("", 10), vec![String::new()]);
    }
}
