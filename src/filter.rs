use tracing::debug;

use crate::item::SectionKind;
use crate::page::{Page, PageError};

/// Filter value that shows every card.
pub const ALL: &str = "all";

/// Bind the filter buttons of `section_label` to the cards currently in its
/// container. Safe to call after every re-render: the binding is replaced and
/// the active button's filter is applied to the new cards.
pub fn attach(page: &mut Page, section_label: &str) -> Result<(), PageError> {
    let kind = SectionKind::from_label(section_label)
        .ok_or_else(|| PageError::UnknownSection(section_label.to_string()))?;
    page.container(kind.container_id())?;

    page.attached.insert(section_label.to_string());
    let active = page
        .filter_buttons(section_label)
        .find(|b| b.active)
        .map(|b| b.value.clone())
        .unwrap_or_else(|| ALL.to_string());
    debug!(section = section_label, filter = %active, "filters attached");
    apply(page, kind, &active)
}

/// Handle a click on the button with `value`: it becomes the only active
/// button and cards whose discriminator does not match are hidden.
pub fn click(page: &mut Page, section_label: &str, value: &str) -> Result<(), PageError> {
    if !page.is_attached(section_label) {
        return Err(PageError::NotAttached(section_label.to_string()));
    }
    let kind = SectionKind::from_label(section_label)
        .ok_or_else(|| PageError::UnknownSection(section_label.to_string()))?;
    let value = value.trim();
    if !page.filter_buttons(section_label).any(|b| b.value == value) {
        return Err(PageError::UnknownFilter {
            section: section_label.to_string(),
            value: value.to_string(),
        });
    }

    for button in page.filter_buttons_mut(section_label) {
        button.active = button.value == value;
    }
    apply(page, kind, value)
}

fn apply(page: &mut Page, kind: SectionKind, value: &str) -> Result<(), PageError> {
    let container = page.container_mut(kind.container_id())?;
    for card in &mut container.cards {
        card.visible = match &card.discriminator {
            Some(d) => d.matches(value),
            None => value == ALL,
        };
    }
    Ok(())
}

/// Visible card count for a section's container.
pub fn visible_count(page: &Page, kind: SectionKind) -> usize {
    page.container(kind.container_id())
        .map(|c| c.cards.iter().filter(|card| card.visible).count())
        .unwrap_or(0)
}
