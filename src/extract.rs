use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::Regex;
use std::sync::LazyLock;

use crate::shared::table::truncate_with_ellipsis;

static AUDIO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)https?://[^\s)\]]+\.(?:mp3|wav|ogg|m4a)\b").expect("audio url pattern")
});
static COVER_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[[^\]]*\]\((https?://[^\s)]+)\)").expect("cover image pattern")
});
static REPO_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\((https?://github\.com/[^\s)]+)\)").expect("repo link pattern")
});
static CODE_LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```(\w+)").expect("code language pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLink {
    pub text: String,
    pub url: String,
}

/// Flatten Markdown to readable text: markup, images and code blocks dropped,
/// whitespace collapsed.
pub fn plain_text(markdown: &str) -> String {
    let mut text = String::new();
    let mut skip_depth = 0usize;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::Image { .. } | Tag::CodeBlock(_)) => skip_depth += 1,
            Event::End(TagEnd::Image | TagEnd::CodeBlock) => {
                skip_depth = skip_depth.saturating_sub(1);
            }
            Event::Text(t) | Event::Code(t) if skip_depth == 0 => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => text.push(' '),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain-text preview limited to `max_chars` characters.
pub fn excerpt(markdown: &str, max_chars: usize) -> String {
    truncate_with_ellipsis(&plain_text(markdown), max_chars)
}

pub fn audio_url(body: &str) -> Option<String> {
    AUDIO_URL.find(body).map(|m| m.as_str().to_string())
}

pub fn cover_image(body: &str) -> Option<String> {
    COVER_IMAGE
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn repo_links(body: &str) -> Vec<RepoLink> {
    REPO_LINK
        .captures_iter(body)
        .map(|c| RepoLink { text: c[1].to_string(), url: c[2].to_string() })
        .collect()
}

/// Languages named on opening code fences, first occurrence order.
pub fn code_languages(body: &str) -> Vec<String> {
    let mut langs: Vec<String> = Vec::new();
    for cap in CODE_LANGUAGE.captures_iter(body) {
        let lang = cap[1].to_lowercase();
        if !langs.contains(&lang) {
            langs.push(lang);
        }
    }
    langs
}
