//! Owned model of the rendered portfolio document.
//!
//! Sections, nav buttons, filter buttons and card containers carry the same
//! `data-*` attributes a browser script would query. The filter controller
//! and the navigator mutate this model; [`Page::to_html`] serialises it.

use html_escape::{encode_double_quoted_attribute, encode_text};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::card::Card;
use crate::filter::ALL;
use crate::item::{Category, SectionKind};
use crate::nav::DEFAULT_SECTION;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("unknown section: {0}")]
    UnknownSection(String),
    #[error("unknown container: {0}")]
    UnknownContainer(String),
    #[error("unknown filter {value:?} for section {section}")]
    UnknownFilter { section: String, value: String },
    #[error("filters for section {0} are not attached")]
    NotAttached(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavButton {
    pub target: String,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterButton {
    /// Section label the button belongs to (`data-section`).
    pub section: String,
    /// Value compared with card discriminators (`data-filter`).
    pub value: String,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Empty,
    Error,
}

/// Shown above fallback cards when a section could not be filled upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub section: SectionKind,
    pub repo_name: String,
    pub repo_url: String,
}

impl StatusMessage {
    pub fn headline(&self) -> String {
        match self.kind {
            StatusKind::Empty => format!("No GitHub {}s found.", self.section.label()),
            StatusKind::Error => format!("Unable to load {}s.", self.section.label()),
        }
    }

    pub fn to_html(&self) -> String {
        let link = format!(
            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{} repository</a>",
            encode_double_quoted_attribute(&self.repo_url),
            encode_text(&self.repo_name)
        );
        let hint = match self.kind {
            StatusKind::Empty => format!(
                "Create issues with the \"{}\" label in the {link}.",
                self.section.label()
            ),
            StatusKind::Error => format!("Make sure the {link} exists."),
        };
        format!(
            "<p class=\"status-message\">{} <br><small>{hint}</small></p>\n<p class=\"status-lead\">Example {}s:</p>",
            self.headline(),
            self.section.label()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub id: String,
    pub section: SectionKind,
    pub cards: Vec<Card>,
    pub status: Option<StatusMessage>,
    /// True until the container is first filled.
    pub loading: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageSection {
    pub id: String,
    pub title: String,
    pub active: bool,
    pub filters: Vec<FilterButton>,
    pub container: Option<Container>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub title: String,
    pub nav: Vec<NavButton>,
    pub sections: Vec<PageSection>,
    pub(crate) attached: BTreeSet<String>,
}

fn filter_button(section: SectionKind, value: &str, label: &str) -> FilterButton {
    FilterButton {
        section: section.label().to_string(),
        value: value.to_string(),
        label: label.to_string(),
        active: value == ALL,
    }
}

fn content_section(kind: SectionKind, title: &str, filters: Vec<FilterButton>) -> PageSection {
    PageSection {
        id: kind.page_id().to_string(),
        title: title.to_string(),
        active: false,
        filters,
        container: Some(Container {
            id: kind.container_id().to_string(),
            section: kind,
            cards: Vec::new(),
            status: None,
            loading: true,
        }),
    }
}

impl Page {
    /// The fixed portfolio layout: home, projects (category filters) and
    /// notes (month filters), with the default section active.
    pub fn portfolio(title: &str) -> Self {
        let mut project_filters = vec![filter_button(SectionKind::Project, ALL, "All")];
        project_filters.extend(Category::ALL.iter().map(|c| {
            let mut label = c.as_str().to_string();
            label[..1].make_ascii_uppercase();
            filter_button(SectionKind::Project, c.as_str(), &label)
        }));

        let mut note_filters = vec![filter_button(SectionKind::Note, ALL, "All")];
        note_filters.extend(
            MONTHS
                .iter()
                .enumerate()
                .map(|(i, m)| filter_button(SectionKind::Note, &i.to_string(), m)),
        );

        let sections = vec![
            PageSection {
                id: "home".to_string(),
                title: "Home".to_string(),
                active: false,
                filters: Vec::new(),
                container: None,
            },
            content_section(SectionKind::Project, "Projects", project_filters),
            content_section(SectionKind::Note, "Notes", note_filters),
        ];
        let nav = sections
            .iter()
            .map(|s| NavButton { target: s.id.clone(), label: s.title.clone(), active: false })
            .collect();

        let mut page = Page {
            title: title.to_string(),
            nav,
            sections,
            attached: BTreeSet::new(),
        };
        page.set_active(DEFAULT_SECTION);
        page
    }

    pub(crate) fn set_active(&mut self, id: &str) {
        for section in &mut self.sections {
            section.active = section.id == id;
        }
        for button in &mut self.nav {
            button.active = button.target == id;
        }
    }

    pub fn active_section(&self) -> Option<&str> {
        self.sections.iter().find(|s| s.active).map(|s| s.id.as_str())
    }

    pub fn section(&self, id: &str) -> Option<&PageSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn container(&self, id: &str) -> Result<&Container, PageError> {
        self.sections
            .iter()
            .filter_map(|s| s.container.as_ref())
            .find(|c| c.id == id)
            .ok_or_else(|| PageError::UnknownContainer(id.to_string()))
    }

    pub fn container_mut(&mut self, id: &str) -> Result<&mut Container, PageError> {
        self.sections
            .iter_mut()
            .filter_map(|s| s.container.as_mut())
            .find(|c| c.id == id)
            .ok_or_else(|| PageError::UnknownContainer(id.to_string()))
    }

    /// Replace a container's cards wholesale.
    pub fn fill(
        &mut self,
        container_id: &str,
        cards: Vec<Card>,
        status: Option<StatusMessage>,
    ) -> Result<(), PageError> {
        let container = self.container_mut(container_id)?;
        container.cards = cards;
        container.status = status;
        container.loading = false;
        Ok(())
    }

    /// Filter buttons whose `data-section` equals `section_label`.
    pub fn filter_buttons(&self, section_label: &str) -> impl Iterator<Item = &FilterButton> {
        self.sections
            .iter()
            .flat_map(|s| s.filters.iter())
            .filter(move |b| b.section == section_label)
    }

    pub(crate) fn filter_buttons_mut(
        &mut self,
        section_label: &str,
    ) -> impl Iterator<Item = &mut FilterButton> {
        self.sections
            .iter_mut()
            .flat_map(|s| s.filters.iter_mut())
            .filter(move |b| b.section == section_label)
    }

    pub fn is_attached(&self, section_label: &str) -> bool {
        self.attached.contains(section_label)
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
        out.push_str(&format!("<title>{}</title>\n", encode_text(&self.title)));
        out.push_str("<link rel=\"stylesheet\" href=\"style.css\">\n</head>\n<body>\n");

        out.push_str("<nav class=\"main-nav\">\n");
        for button in &self.nav {
            out.push_str(&format!(
                "<button class=\"nav-btn{}\" data-target=\"{}\" aria-pressed=\"{}\">{}</button>\n",
                if button.active { " active" } else { "" },
                encode_double_quoted_attribute(&button.target),
                button.active,
                encode_text(&button.label)
            ));
        }
        out.push_str("</nav>\n<main>\n");

        for section in &self.sections {
            out.push_str(&section_html(section));
        }

        out.push_str("</main>\n</body>\n</html>\n");
        out
    }
}

fn section_html(section: &PageSection) -> String {
    let mut out = format!(
        "<section id=\"{}\" class=\"page{}\">\n<h2>{}</h2>\n",
        encode_double_quoted_attribute(&section.id),
        if section.active { " active" } else { "" },
        encode_text(&section.title)
    );

    if !section.filters.is_empty() {
        out.push_str("<div class=\"filter-buttons\">\n");
        for b in &section.filters {
            out.push_str(&format!(
                "<button class=\"filter-btn{}\" data-section=\"{}\" data-filter=\"{}\" aria-pressed=\"{}\">{}</button>\n",
                if b.active { " active" } else { "" },
                encode_double_quoted_attribute(&b.section),
                encode_double_quoted_attribute(&b.value),
                b.active,
                encode_text(&b.label)
            ));
        }
        out.push_str("</div>\n");
    }

    if let Some(container) = &section.container {
        out.push_str(&format!(
            "<div id=\"{}\" class=\"card-grid\">\n",
            encode_double_quoted_attribute(&container.id)
        ));
        if container.loading {
            out.push_str(&format!(
                "<p class=\"status-message\">Loading {}s...</p>\n",
                container.section.label()
            ));
        }
        if let Some(status) = &container.status {
            out.push_str(&status.to_html());
            out.push('\n');
        }
        for card in &container.cards {
            out.push_str(&card.to_html());
            out.push('\n');
        }
        out.push_str("</div>\n");
    }

    out.push_str("</section>\n");
    out
}
