use tracing::debug;

use crate::page::{Page, PageError};

/// Section shown before any navigation.
pub const DEFAULT_SECTION: &str = "home";

/// Make `section_id` the only visible section and sync the nav buttons.
pub fn activate(page: &mut Page, section_id: &str) -> Result<(), PageError> {
    let id = section_id.trim();
    if page.section(id).is_none() {
        return Err(PageError::UnknownSection(id.to_string()));
    }
    page.set_active(id);
    debug!(section = id, "section activated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_count(page: &Page) -> (usize, usize) {
        (
            page.sections.iter().filter(|s| s.active).count(),
            page.nav.iter().filter(|b| b.active).count(),
        )
    }

    #[test]
    fn test_default_section_active() {
        let page = Page::portfolio("site");
        assert_eq!(page.active_section(), Some(DEFAULT_SECTION));
        assert_eq!(active_count(&page), (1, 1));
    }

    #[test]
    fn test_activate_moves_in_lockstep() {
        let mut page = Page::portfolio("site");
        activate(&mut page, "notes").unwrap();
        assert_eq!(page.active_section(), Some("notes"));
        assert_eq!(active_count(&page), (1, 1));
        let button = page.nav.iter().find(|b| b.active).unwrap();
        assert_eq!(button.target, "notes");
    }

    #[test]
    fn test_unknown_section_keeps_current() {
        let mut page = Page::portfolio("site");
        activate(&mut page, "projects").unwrap();
        assert!(activate(&mut page, "gallery").is_err());
        assert_eq!(page.active_section(), Some("projects"));
    }
}
