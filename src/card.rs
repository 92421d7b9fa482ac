use chrono::Datelike;
use html_escape::{encode_double_quoted_attribute, encode_text};
use url::Url;

use crate::extract::{self, RepoLink};
use crate::item::{Category, ContentItem, SectionKind};
use crate::markdown;
use crate::tags::{label_color, tag_style};

const EXCERPT_CHARS: usize = 140;

/// The attribute a filter button is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    Category(Category),
    /// Zero-based month of the creation date (January = 0).
    Month(u32),
}

impl Discriminator {
    pub fn attribute(&self) -> &'static str {
        match self {
            Discriminator::Category(_) => "data-category",
            Discriminator::Month(_) => "data-month",
        }
    }

    pub fn value(&self) -> String {
        match self {
            Discriminator::Category(c) => c.as_str().to_string(),
            Discriminator::Month(m) => m.to_string(),
        }
    }

    pub fn matches(&self, filter: &str) -> bool {
        filter == crate::filter::ALL || self.value().eq_ignore_ascii_case(filter.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBadge {
    pub name: String,
    pub class: Option<&'static str>,
    pub icon: Option<&'static str>,
    pub color: (u8, u8, u8),
}

impl TagBadge {
    pub fn to_html(&self) -> String {
        let (r, g, b) = self.color;
        let class = match self.class {
            Some(extra) => format!("tag-label {extra}"),
            None => "tag-label".to_string(),
        };
        let icon = self
            .icon
            .map(|i| format!("<i class=\"{i}\"></i>"))
            .unwrap_or_default();
        format!(
            "<span class=\"{class}\" style=\"--tag-color: #{r:02x}{g:02x}{b:02x}\">{icon}{}</span>",
            encode_text(&self.name)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub body_html: String,
    pub excerpt: String,
    pub badges: Vec<TagBadge>,
    pub date: String,
    pub comments: u64,
    pub author: Option<String>,
    pub discriminator: Option<Discriminator>,
    pub audio: Option<String>,
    pub cover: Option<String>,
    pub languages: Vec<String>,
    pub repo_links: Vec<RepoLink>,
    pub visible: bool,
}

/// Build a card for `item` shown under `section_label`. Never fails: absent
/// body or labels render as empty parts.
pub fn build(item: &ContentItem, section_label: &str) -> Card {
    let body = item.body_text();
    let section = SectionKind::from_label(section_label);

    let discriminator = match section {
        Some(SectionKind::Project) => Some(Discriminator::Category(Category::from_labels(&item.labels))),
        Some(SectionKind::Note) => Some(Discriminator::Month(item.created_at.month0())),
        None => None,
    };

    let badges = item
        .labels
        .iter()
        .filter(|l| !l.name.is_empty() && !l.is(section_label))
        .map(|l| {
            let style = tag_style(&l.name);
            TagBadge {
                name: l.name.clone(),
                class: style.map(|s| s.class),
                icon: style.map(|s| s.icon),
                color: label_color(l),
            }
        })
        .collect();

    let category = match discriminator {
        Some(Discriminator::Category(c)) => Some(c),
        _ => None,
    };
    let audio = match category {
        Some(Category::Audio) => extract::audio_url(body),
        _ => None,
    };
    let (languages, repo_links) = match category {
        Some(Category::Code) => (extract::code_languages(body), extract::repo_links(body)),
        _ => (Vec::new(), Vec::new()),
    };

    Card {
        id: item.id,
        number: item.number,
        title: item.title.clone(),
        url: item.url.clone(),
        body_html: markdown::render(body),
        excerpt: extract::excerpt(body, EXCERPT_CHARS),
        badges,
        date: item.created_at.format("%d %b, %Y").to_string(),
        comments: item.comments,
        author: item.author().map(str::to_string),
        discriminator,
        audio,
        cover: extract::cover_image(body).filter(|_| category == Some(Category::Audio)),
        languages,
        repo_links,
        visible: true,
    }
}

impl Card {
    pub fn to_html(&self) -> String {
        let mut out = String::from("<details class=\"home-dropdown\"");
        if let Some(d) = &self.discriminator {
            out.push_str(&format!(" {}=\"{}\"", d.attribute(), d.value()));
        }
        if !self.visible {
            out.push_str(" hidden");
        }
        out.push_str(">\n");

        out.push_str("<summary class=\"home-dropdown-summary\">");
        out.push_str(&format!(
            "<div class=\"dropdown-header-content\"><span class=\"dropdown-title\">{}</span></div>",
            encode_text(&self.title)
        ));
        let badges: String = self.badges.iter().map(TagBadge::to_html).collect();
        out.push_str(&format!(
            "<div class=\"dropdown-right-content\"><span class=\"dropdown-subtitle\">{badges}</span></div>"
        ));
        out.push_str("</summary>\n");

        out.push_str("<div class=\"home-dropdown-content\">\n");
        if let Some(cover) = &self.cover {
            out.push_str(&format!(
                "<img src=\"{}\" alt=\"Cover art\" class=\"cover-art\" loading=\"lazy\">\n",
                encode_double_quoted_attribute(cover)
            ));
        }
        out.push_str("<div class=\"markdown-body\">");
        out.push_str(&self.body_html);
        out.push_str("</div>\n");
        if let Some(audio) = &self.audio {
            out.push_str(&format!(
                "<audio controls preload=\"none\" src=\"{}\"></audio>\n",
                encode_double_quoted_attribute(audio)
            ));
        }

        out.push_str("<div class=\"card-footer\">");
        out.push_str(&format!("<span class=\"card-date\">{}</span>", encode_text(&self.date)));
        out.push_str(&format!(
            "<span class=\"card-comments\"><i class=\"far fa-comment\"></i>{}</span>",
            self.comments
        ));
        if let Some(author) = &self.author {
            out.push_str(&format!(
                "<span class=\"card-author\"><i class=\"fas fa-user\"></i>{}</span>",
                encode_text(author)
            ));
        }
        if !self.languages.is_empty() {
            let langs: String = self
                .languages
                .iter()
                .map(|l| format!("<span class=\"lang-badge\">{}</span>", encode_text(l)))
                .collect();
            out.push_str(&format!("<div class=\"card-tags\">{langs}</div>"));
        }
        let mut links: Vec<String> = self
            .repo_links
            .iter()
            .map(|l| {
                format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\"><i class=\"fab fa-github\"></i>{}</a>",
                    encode_double_quoted_attribute(&l.url),
                    encode_text(&l.text)
                )
            })
            .collect();
        if let Some(url) = web_url(&self.url) {
            links.push(format!(
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\"><i class=\"fas fa-external-link-alt\"></i></a>",
                encode_double_quoted_attribute(url.as_str())
            ));
        }
        if !links.is_empty() {
            out.push_str(&format!("<div class=\"card-links\">{}</div>", links.concat()));
        }
        out.push_str("</div>\n</div>\n</details>");
        out
    }
}

// Only http(s) links are emitted outside the sanitized body.
fn web_url(raw: &str) -> Option<Url> {
    Url::parse(raw.trim())
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
}
