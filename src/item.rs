use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One label attached to an upstream record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawLabel")]
pub struct Label {
    pub name: String,
    pub color: Option<String>,
}

// Upstream sends label objects; hand-written fixtures and older cache files
// may carry bare names.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Name(String),
    Object {
        #[serde(default)]
        name: String,
        #[serde(default)]
        color: Option<String>,
    },
}

impl From<RawLabel> for Label {
    fn from(raw: RawLabel) -> Self {
        match raw {
            RawLabel::Name(name) => Label { name, color: None },
            RawLabel::Object { name, color } => Label { name, color },
        }
    }
}

impl Label {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), color: None }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub login: String,
}

/// A displayable content record sourced from an upstream issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    #[serde(default)]
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(rename = "html_url", default)]
    pub url: String,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub user: Option<Author>,
    #[serde(default, skip_serializing)]
    pull_request: Option<serde_json::Value>,
}

impl ContentItem {
    pub fn new(
        id: u64,
        title: &str,
        body: &str,
        labels: &[&str],
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            number: id,
            title: title.to_string(),
            body: Some(body.to_string()),
            created_at,
            labels: labels.iter().map(|l| Label::new(l)).collect(),
            url: String::new(),
            comments: 0,
            user: None,
            pull_request: None,
        }
    }

    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str()).filter(|l| !l.is_empty())
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.is(name))
    }

    /// The issues endpoint also lists pull requests; those are not content.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// The fixed category set for project items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Code,
    Audio,
    Other,
}

impl Category {
    /// Precedence order used when an item carries more than one category label.
    pub const ALL: [Category; 3] = [Category::Code, Category::Audio, Category::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Code => "code",
            Category::Audio => "audio",
            Category::Other => "other",
        }
    }

    pub fn parse(name: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Total mapping from a label set to a category; unmatched sets are `Other`.
    pub fn from_labels(labels: &[Label]) -> Category {
        Category::ALL
            .into_iter()
            .find(|c| labels.iter().any(|l| l.is(c.as_str())))
            .unwrap_or(Category::Other)
    }
}

/// The two label-scoped content sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Project,
    Note,
}

impl SectionKind {
    pub const ALL: [SectionKind; 2] = [SectionKind::Project, SectionKind::Note];

    pub fn label(self) -> &'static str {
        match self {
            SectionKind::Project => "project",
            SectionKind::Note => "note",
        }
    }

    pub fn container_id(self) -> &'static str {
        match self {
            SectionKind::Project => "project-container",
            SectionKind::Note => "notes-container",
        }
    }

    pub fn page_id(self) -> &'static str {
        match self {
            SectionKind::Project => "projects",
            SectionKind::Note => "notes",
        }
    }

    pub fn from_label(label: &str) -> Option<SectionKind> {
        SectionKind::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(label.trim()))
    }

    pub fn fallback(self, now: DateTime<Utc>) -> Vec<ContentItem> {
        match self {
            SectionKind::Project => fallback_projects(now),
            SectionKind::Note => fallback_notes(now),
        }
    }
}

pub fn fallback_projects(now: DateTime<Utc>) -> Vec<ContentItem> {
    vec![
        ContentItem::new(
            1,
            "p0kks.me",
            "This portfolio website. Built with plain HTML, CSS and JavaScript.",
            &["project", "code"],
            now,
        ),
        ContentItem::new(
            2,
            "Discord Bot",
            "A custom Discord bot for a community server, built with Node.js. It provides various utility commands, moderation tools, and fun features.",
            &["project", "code"],
            now,
        ),
        ContentItem::new(
            3,
            "Cover Song",
            "Peder Elias - Cover Song. A cover song project.",
            &["project", "audio", "cover"],
            now,
        ),
        ContentItem::new(
            4,
            "Ambient Music",
            "A collection of short, experimental ambient tracks. Exploring textures and soundscapes.",
            &["project", "audio", "original"],
            now,
        ),
        ContentItem::new(
            5,
            "Reaper Configuration",
            "My personal configuration for the Reaper DAW, including themes, scripts, and settings.",
            &["project", "other"],
            now,
        ),
    ]
}

pub fn fallback_notes(now: DateTime<Utc>) -> Vec<ContentItem> {
    vec![
        ContentItem::new(
            1,
            "My first note",
            "This is my first note. I can write anything here.",
            &["note", "thoughts"],
            now,
        ),
        ContentItem::new(
            2,
            "Another note",
            "This is another note. I can use markdown here.",
            &["note", "insights"],
            now,
        ),
    ]
}
