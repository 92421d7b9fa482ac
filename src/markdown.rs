//! Markdown to sanitized HTML.
//!
//! Each input line is classified (blank, fence, heading, quote, list item,
//! rule, raw HTML, text) and runs of the same class are grouped into blocks.
//! HTML in the input, block or inline, is left for the sanitizer, so
//! rendering already-rendered output returns it unchanged.

use ammonia::Builder;
use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::Regex;
use std::sync::LazyLock;

/// Tags that open a raw HTML block when they start a line.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "pre", "blockquote", "hr",
    "table", "details", "section", "article", "figure", "img", "picture", "audio", "video",
];

static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:<!--.*?-->|</?[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?>)")
        .expect("inline tag pattern")
});
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").expect("entity pattern")
});

/// GitHub-style alert kinds recognised inside block quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callout {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl Callout {
    const ALL: [Callout; 5] = [
        Callout::Note,
        Callout::Tip,
        Callout::Important,
        Callout::Warning,
        Callout::Caution,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Callout::Note => "NOTE",
            Callout::Tip => "TIP",
            Callout::Important => "IMPORTANT",
            Callout::Warning => "WARNING",
            Callout::Caution => "CAUTION",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Callout::Note => "Note",
            Callout::Tip => "Tip",
            Callout::Important => "Important",
            Callout::Warning => "Warning",
            Callout::Caution => "Caution",
        }
    }

    fn class(self) -> &'static str {
        match self {
            Callout::Note => "callout-note",
            Callout::Tip => "callout-tip",
            Callout::Important => "callout-important",
            Callout::Warning => "callout-warning",
            Callout::Caution => "callout-caution",
        }
    }

    fn parse(tag: &str) -> Option<Callout> {
        Callout::ALL
            .into_iter()
            .find(|c| c.tag().eq_ignore_ascii_case(tag))
    }
}

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Blank,
    Fence(&'a str),
    Heading(usize, &'a str),
    Quote(&'a str),
    Item(&'a str),
    Rule,
    Html(&'a str),
    Text(&'a str),
}

#[derive(Debug, PartialEq)]
enum Block<'a> {
    Heading(usize, &'a str),
    Paragraph(Vec<&'a str>),
    List(Vec<&'a str>),
    Quote(Vec<&'a str>),
    Callout(Callout, Vec<&'a str>),
    Code(&'a str, Vec<&'a str>),
    Rule,
    Html(Vec<&'a str>),
}

/// Render Markdown text into a sanitized HTML fragment. Empty input yields an
/// empty string.
pub fn render(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }
    let html = parse_blocks(markdown)
        .iter()
        .map(render_block)
        .collect::<Vec<_>>()
        .join("\n");
    sanitize(&html).trim().to_string()
}

/// Strip script-capable markup and force every link to open in a new
/// browsing context without opener or referrer.
pub fn sanitize(html: &str) -> String {
    let mut builder = Builder::default();
    builder
        .add_tag_attributes("pre", &["data-lang"])
        .add_tag_attributes("div", &["data-callout"])
        .add_allowed_classes(
            "div",
            &[
                "callout",
                "callout-note",
                "callout-tip",
                "callout-important",
                "callout-warning",
                "callout-caution",
            ],
        )
        .add_allowed_classes("p", &["callout-title"])
        .add_tags(&["audio", "video", "source", "picture"])
        .add_tag_attributes("audio", &["src", "controls", "preload"])
        .add_tag_attributes("video", &["src", "controls", "preload", "poster", "width", "height"])
        .add_tag_attributes("source", &["src", "srcset", "type", "media"])
        .set_tag_attribute_value("a", "target", "_blank")
        .set_tag_attribute_value("img", "loading", "lazy")
        .link_rel(Some("noopener noreferrer"));
    builder.clean(html).to_string()
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if let Some(lang) = trimmed.strip_prefix("```") {
        return Line::Fence(lang.trim());
    }
    if let Some(heading) = heading(trimmed) {
        return heading;
    }
    if let Some(rest) = trimmed.strip_prefix('>') {
        return Line::Quote(rest.strip_prefix(' ').unwrap_or(rest));
    }
    if is_rule(trimmed) {
        return Line::Rule;
    }
    for marker in ["* ", "- ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Line::Item(rest.trim());
        }
    }
    if let Some(tag) = html_block_tag(trimmed) {
        return Line::Html(tag);
    }
    Line::Text(trimmed)
}

fn heading(trimmed: &str) -> Option<Line<'_>> {
    let level = trimmed.bytes().take_while(|b| *b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(Line::Heading(level, rest.trim()))
}

fn is_rule(trimmed: &str) -> bool {
    ["---", "***", "___"].iter().any(|marker| {
        let c = marker.as_bytes()[0];
        trimmed.len() >= 3 && trimmed.bytes().all(|b| b == c)
    })
}

fn html_block_tag(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix('<')?;
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    let name = &rest[..end];
    let next = rest[end..].chars().next();
    let terminated = matches!(next, None | Some('>') | Some('/')) || next.is_some_and(char::is_whitespace);
    if terminated && BLOCK_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name)) {
        Some(name)
    } else {
        None
    }
}

fn parse_blocks(input: &str) -> Vec<Block<'_>> {
    let lines: Vec<&str> = input.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        match classify(lines[i]) {
            Line::Blank => i += 1,
            Line::Fence(lang) => {
                let start = i + 1;
                let mut end = start;
                while end < lines.len() && !lines[end].trim_start().starts_with("```") {
                    end += 1;
                }
                blocks.push(Block::Code(lang, lines[start..end].to_vec()));
                // skip the closing fence; an unclosed fence runs to the end
                i = end + 1;
            }
            Line::Heading(level, text) => {
                blocks.push(Block::Heading(level, text));
                i += 1;
            }
            Line::Rule => {
                blocks.push(Block::Rule);
                i += 1;
            }
            Line::Quote(_) => i = parse_quotes(&lines, i, &mut blocks),
            Line::Item(_) => {
                let mut items = Vec::new();
                while let Some(Line::Item(text)) = lines.get(i).copied().map(classify) {
                    items.push(text);
                    i += 1;
                }
                blocks.push(Block::List(items));
            }
            Line::Html(tag) => {
                let end = html_block_end(&lines, i, tag);
                blocks.push(Block::Html(lines[i..end].to_vec()));
                i = end;
            }
            Line::Text(_) => {
                let mut text = Vec::new();
                while let Some(Line::Text(t)) = lines.get(i).copied().map(classify) {
                    text.push(t);
                    i += 1;
                }
                blocks.push(Block::Paragraph(text));
            }
        }
    }
    blocks
}

/// A raw block runs to the line that closes its opening tag, or to the next
/// blank line when the tag is never closed.
fn html_block_end(lines: &[&str], start: usize, tag: &str) -> usize {
    let closing = format!("</{}>", tag.to_ascii_lowercase());
    if let Some(offset) = lines[start..]
        .iter()
        .position(|l| l.trim_end().to_ascii_lowercase().ends_with(&closing))
    {
        return start + offset + 1;
    }
    lines[start..]
        .iter()
        .position(|l| l.trim().is_empty())
        .map_or(lines.len(), |offset| start + offset)
}

fn parse_quotes<'a>(lines: &[&'a str], mut i: usize, blocks: &mut Vec<Block<'a>>) -> usize {
    let mut plain: Vec<&'a str> = Vec::new();

    while let Some(Line::Quote(text)) = lines.get(i).copied().map(classify) {
        i += 1;
        let Some((kind, rest)) = callout_marker(text) else {
            plain.push(text);
            continue;
        };
        if !plain.is_empty() {
            blocks.push(Block::Quote(std::mem::take(&mut plain)));
        }
        if !rest.is_empty() {
            blocks.push(Block::Callout(kind, vec![rest]));
            continue;
        }
        // a bare marker line absorbs the quote lines that follow it
        let mut body = Vec::new();
        while let Some(Line::Quote(t)) = lines.get(i).copied().map(classify) {
            if callout_marker(t).is_some() {
                break;
            }
            body.push(t);
            i += 1;
        }
        blocks.push(Block::Callout(kind, body));
    }

    if !plain.is_empty() {
        blocks.push(Block::Quote(plain));
    }
    i
}

/// Split `[!TAG] rest` into the callout kind and the remaining text.
pub(crate) fn callout_marker(text: &str) -> Option<(Callout, &str)> {
    let rest = text.trim_start().strip_prefix("[!")?;
    let close = rest.find(']')?;
    let kind = Callout::parse(&rest[..close])?;
    Some((kind, rest[close + 1..].trim()))
}

fn render_block(block: &Block<'_>) -> String {
    match block {
        Block::Heading(level, text) => format!("<h{level}>{}</h{level}>", inline(text)),
        Block::Paragraph(lines) => paragraphs(lines),
        Block::List(items) => {
            let mut out = String::from("<ul>");
            for item in items {
                out.push_str(&format!("\n<li>{}</li>", inline(item)));
            }
            out.push_str("\n</ul>");
            out
        }
        Block::Quote(lines) => format!("<blockquote>{}</blockquote>", paragraphs(lines)),
        Block::Callout(kind, lines) => format!(
            "<div class=\"callout {}\" data-callout=\"{}\"><p class=\"callout-title\">{}</p>{}</div>",
            kind.class(),
            kind.tag(),
            kind.title(),
            paragraphs(lines)
        ),
        Block::Code(lang, lines) => {
            let code = encode_text(&lines.join("\n")).into_owned();
            if lang.is_empty() {
                format!("<pre><code>{code}</code></pre>")
            } else {
                format!(
                    "<pre data-lang=\"{}\"><code>{code}</code></pre>",
                    encode_double_quoted_attribute(lang)
                )
            }
        }
        Block::Rule => "<hr>".to_string(),
        Block::Html(lines) => lines.join("\n"),
    }
}

/// Group lines into paragraphs at empty lines; single newlines become breaks.
fn paragraphs(lines: &[&str]) -> String {
    lines
        .split(|l| l.trim().is_empty())
        .filter(|group| !group.is_empty())
        .map(|group| {
            let body = group
                .iter()
                .map(|l| inline(l.trim()))
                .collect::<Vec<_>>()
                .join("<br>\n");
            format!("<p>{body}</p>")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut plain_start = 0;
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        let span = match rest.as_bytes()[0] {
            b'`' => code_span(rest),
            b'<' => html_tag(rest),
            b'!' if rest[1..].starts_with('[') => image(rest),
            b'[' => link(rest),
            b'*' | b'_' => emphasis(text, i),
            _ => None,
        };
        match span {
            Some((consumed, html)) => {
                out.push_str(&escape_plain(&text[plain_start..i]));
                out.push_str(&html);
                i += consumed;
                plain_start = i;
            }
            None => i += rest.chars().next().map_or(1, char::len_utf8),
        }
    }
    out.push_str(&escape_plain(&text[plain_start..]));
    out
}

/// Inline tags go through verbatim and are left to the sanitizer.
fn html_tag(rest: &str) -> Option<(usize, String)> {
    let tag = INLINE_TAG.find(rest)?;
    Some((tag.end(), tag.as_str().to_string()))
}

/// Escape text between spans. Existing entities are kept as written.
fn escape_plain(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, c) in text.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if !ENTITY.is_match(&text[idx..]) => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

fn code_span(rest: &str) -> Option<(usize, String)> {
    let ticks = rest.bytes().take_while(|b| *b == b'`').count();
    let fence = &rest[..ticks];
    let close = rest[ticks..].find(fence)?;
    let code = rest[ticks..ticks + close].trim();
    if code.is_empty() {
        return None;
    }
    Some((ticks * 2 + close, format!("<code>{}</code>", encode_text(code))))
}

/// Parse `[text](url)` at the start of `rest`. Link text may hold balanced
/// brackets.
fn link_parts(rest: &str) -> Option<(&str, &str, usize)> {
    let mut depth = 0usize;
    let mut text_end = None;
    for (idx, c) in rest.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    text_end = Some(idx);
                    break;
                }
            }
            _ => {}
        }
    }
    let text_end = text_end?;
    let after = rest[text_end + 1..].strip_prefix('(')?;
    let close = after.find(')')?;
    let target = after[..close].split_whitespace().next()?;
    Some((&rest[1..text_end], target, text_end + 2 + close + 1))
}

fn link(rest: &str) -> Option<(usize, String)> {
    let (text, url, consumed) = link_parts(rest)?;
    Some((
        consumed,
        format!(
            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
            encode_double_quoted_attribute(url),
            inline(text)
        ),
    ))
}

fn image(rest: &str) -> Option<(usize, String)> {
    let (alt, url, consumed) = link_parts(&rest[1..])?;
    Some((
        consumed + 1,
        format!(
            "<img src=\"{}\" alt=\"{}\" loading=\"lazy\">",
            encode_double_quoted_attribute(url),
            encode_double_quoted_attribute(alt)
        ),
    ))
}

fn emphasis(text: &str, start: usize) -> Option<(usize, String)> {
    let delim = text.as_bytes()[start];
    if delim == b'_' && text[..start].chars().next_back().is_some_and(char::is_alphanumeric) {
        return None;
    }
    let run = run_length(text, start, delim);
    if run >= 3 {
        if let Some(close) = closing_run(text, start + 3, delim, 3) {
            let inner = &text[start + 3..close];
            return Some((
                close + 3 - start,
                format!("<em><strong>{}</strong></em>", inline(inner)),
            ));
        }
    }
    if run >= 2 {
        if let Some(close) = closing_run(text, start + 2, delim, 2) {
            let inner = &text[start + 2..close];
            return Some((close + 2 - start, format!("<strong>{}</strong>", inline(inner))));
        }
        return None;
    }
    let close = closing_run(text, start + 1, delim, 1)?;
    let inner = &text[start + 1..close];
    Some((close + 1 - start, format!("<em>{}</em>", inline(inner))))
}

fn run_length(text: &str, at: usize, delim: u8) -> usize {
    text.as_bytes()[at..].iter().take_while(|b| **b == delim).count()
}

/// Find the closing delimiter run for emphasis content starting at `from`.
/// A single delimiter only closes on a run of exactly one.
fn closing_run(text: &str, from: usize, delim: u8, width: usize) -> Option<usize> {
    let content = &text[from..];
    if content.is_empty() || content.starts_with(char::is_whitespace) {
        return None;
    }
    let bytes = text.as_bytes();
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] != delim {
            j += 1;
            continue;
        }
        let run = run_length(text, j, delim);
        let closes = if width == 1 { run == 1 } else { run >= width };
        let word_follows = delim == b'_'
            && text[j + run..].chars().next().is_some_and(char::is_alphanumeric);
        if closes && j > from && !word_follows {
            return Some(j);
        }
        j += run;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(render(""), "");
        assert_eq!(render("  \n\n "), "");
    }

    #[test]
    fn test_bare_text_is_wrapped_in_paragraph() {
        assert_eq!(render("hello there"), "<p>hello there</p>");
    }

    #[test]
    fn test_single_newlines_become_breaks() {
        let html = render("one\ntwo\n\nthree");
        assert!(html.contains("<p>one<br>\ntwo</p>"));
        assert!(html.contains("<p>three</p>"));
    }

    #[test]
    fn test_bold_and_italic() {
        assert!(render("**bold**").contains("<strong>bold</strong>"));
        assert!(render("__bold__").contains("<strong>bold</strong>"));
        assert!(render("*it*").contains("<em>it</em>"));
        assert!(render("_it_").contains("<em>it</em>"));
    }

    #[test]
    fn test_triple_delimiters_are_bold_italic() {
        assert!(render("***x***").contains("<em><strong>x</strong></em>"));
        assert!(render("___x___").contains("<em><strong>x</strong></em>"));
        assert!(!render("a ***b c*** d").contains('*'));
    }

    #[test]
    fn test_nested_emphasis() {
        let html = render("**bold *inner* tail**");
        assert!(html.contains("<strong>bold <em>inner</em> tail</strong>"));
        let html = render("*a **b** c*");
        assert!(html.contains("<em>a <strong>b</strong> c</em>"));
    }

    #[test]
    fn test_underscores_inside_words_stay_literal() {
        assert_eq!(render("snake_case_name"), "<p>snake_case_name</p>");
    }

    #[test]
    fn test_headings_all_levels() {
        assert_eq!(render("# Title"), "<h1>Title</h1>");
        assert_eq!(render("###### Deep"), "<h6>Deep</h6>");
        assert_eq!(render("####### seven"), "<p>####### seven</p>");
        assert_eq!(render("#tag"), "<p>#tag</p>");
    }

    #[test]
    fn test_callout_then_plain_quote_line() {
        let html = render("> [!NOTE] hello\n> plain");
        assert!(html.contains("data-callout=\"NOTE\""));
        assert!(html.contains("class=\"callout callout-note\""));
        assert!(html.contains("<p>hello</p></div>"));
        assert!(html.contains("<blockquote><p>plain</p></blockquote>"));
    }

    #[test]
    fn test_bare_callout_marker_absorbs_following_lines() {
        let html = render("> [!WARNING]\n> careful\n> now");
        assert!(html.contains("data-callout=\"WARNING\""));
        assert!(html.contains("<p>careful<br>\nnow</p></div>"));
        assert!(!html.contains("<blockquote>"));
    }

    #[test]
    fn test_unknown_callout_tag_is_plain_quote() {
        let html = render("> [!FOO] x");
        assert!(html.contains("<blockquote><p>[!FOO] x</p></blockquote>"));
    }

    #[test]
    fn test_fenced_code_keeps_language_and_escapes() {
        let html = render("```rust\nfn main() {}\n\nlet x = 1 < 2;\n```");
        assert!(html.contains("<pre data-lang=\"rust\"><code>fn main() {}\n\nlet x = 1 &lt; 2;</code></pre>"));
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let html = render("```\n# not a heading");
        assert!(html.contains("<pre><code># not a heading</code></pre>"));
    }

    #[test]
    fn test_inline_code_is_not_processed() {
        let html = render("use `**raw**` here");
        assert!(html.contains("<code>**raw**</code>"));
        assert!(!html.contains("<strong>"));
    }

    #[test]
    fn test_link_opens_new_context_without_opener() {
        let html = render("[text](http://x)");
        assert!(html.contains("href=\"http://x\""));
        assert!(html.contains("target=\"_blank\""));
        assert!(html.contains("rel=\"noopener noreferrer\""));
        assert!(html.contains(">text</a>"));
    }

    #[test]
    fn test_link_text_with_brackets() {
        let html = render("[see [1] here](http://x)");
        assert!(html.contains(">see [1] here</a>"));
    }

    #[test]
    fn test_image_is_lazy() {
        let html = render("![cover](http://img/a.png)");
        assert!(html.contains("src=\"http://img/a.png\""));
        assert!(html.contains("alt=\"cover\""));
        assert!(html.contains("loading=\"lazy\""));
    }

    #[test]
    fn test_adjacent_items_share_one_list() {
        let html = render("* one\n* two\n\ntext\n\n- three");
        assert_eq!(html.matches("<ul>").count(), 2);
        assert!(html.contains("<ul>\n<li>one</li>\n<li>two</li>\n</ul>"));
        assert!(html.contains("<li>three</li>"));
    }

    #[test]
    fn test_nested_items_flatten_to_one_level() {
        let html = render("* a\n  * b\n    * c");
        assert_eq!(html.matches("<ul>").count(), 1);
        assert_eq!(html.matches("<li>").count(), 3);
    }

    #[test]
    fn test_script_and_handlers_are_stripped() {
        let html = render("<div onclick=\"evil()\">hi<script>alert(1)</script></div>");
        assert!(!html.contains("onclick"));
        assert!(!html.contains("<script"));
        assert!(html.contains("hi"));

        let html = render("[x](javascript:alert(1))");
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn test_inline_html_is_kept() {
        let html = render("para with <b>x</b> and H<sub>2</sub>O<br>done");
        assert!(html.contains("<b>x</b>"));
        assert!(html.contains("<sub>2</sub>"));
        assert!(html.contains("<br>"));
    }

    #[test]
    fn test_inline_script_is_stripped() {
        let html = render("hi <script>alert(1)</script> <span onclick=\"evil()\">there</span>");
        assert!(!html.contains("script"));
        assert!(!html.contains("alert"));
        assert!(!html.contains("onclick"));
        assert!(html.contains("there"));
    }

    #[test]
    fn test_image_tag_line_is_lazy() {
        let html = render("<img width=\"300\" src=\"https://x/a.png\">");
        assert!(html.contains("<img"));
        assert!(html.contains("src=\"https://x/a.png\""));
        assert!(html.contains("loading=\"lazy\""));
        assert!(!html.contains("&lt;img"));
    }

    #[test]
    fn test_stray_angle_brackets_and_ampersands_are_escaped() {
        let html = render("1 < 2 & 3 > 2 &amp; <https://x>");
        assert!(html.contains("1 &lt; 2 &amp; 3 &gt; 2 &amp; &lt;https://x&gt;"));
    }

    #[test]
    fn test_horizontal_rule() {
        assert!(render("above\n\n---\n\nbelow").contains("<hr>"));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let doc = "# Title\n\nSome **bold** text\nwith a [link](https://example.com).\n\n\
                   > [!TIP] use it\n> quoted\n\n* one\n* two\n\n```sh\necho hi\n\necho bye\n```\n\n---\n\n\
                   ![pic](https://example.com/a.png)";
        let once = render(doc);
        let twice = render(&once);
        assert_eq!(once, twice);
    }
}
