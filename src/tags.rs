use crate::item::{ContentItem, Label};

/// Normalize a user-supplied tag to a bare label name.
pub fn normalize_tag(t: &str) -> String {
    t.trim().trim_start_matches('#').trim().to_string()
}

/// Check if an item carries all required tags (case-insensitive).
pub fn item_has_tags(item: &ContentItem, tags: &[String]) -> bool {
    tags.iter().all(|t| item.has_label(t))
}

/// Normalize and deduplicate a list of tags, keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags.iter().map(|t| normalize_tag(t)) {
        if !tag.is_empty() && !out.iter().any(|o| o.eq_ignore_ascii_case(&tag)) {
            out.push(tag);
        }
    }
    out
}

/// Badge styling for a label: an extra CSS class and a Font Awesome icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagStyle {
    pub class: &'static str,
    pub icon: &'static str,
}

/// Known labels get a dedicated class and icon; `cover` and `original` match
/// as substrings so variants like `cover-song` pick them up.
pub fn tag_style(name: &str) -> Option<TagStyle> {
    let lname = name.to_lowercase();
    let style = |class, icon| Some(TagStyle { class, icon });
    match lname.as_str() {
        "audio" => style("tag-label-audio", "fas fa-volume-up"),
        "code" => style("tag-label-code", "fas fa-code"),
        "web" => style("tag-label-web", "fas fa-globe"),
        l if l.contains("cover") => style("tag-label-cover", "fas fa-microphone-alt"),
        l if l.contains("original") => style("tag-label-original", "fas fa-star"),
        "note" => style("tag-label-note", "fas fa-file-alt"),
        "thoughts" => style("tag-label-thoughts", "fas fa-comment-alt"),
        "insights" => style("tag-label-insights", "fas fa-lightbulb"),
        "project" => style("tag-label-project", "fas fa-folder-open"),
        _ => None,
    }
}

/// Parse an upstream hex colour such as `ededed` or `#1d76db`.
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Colour for a label: the upstream colour when known, else a palette pick.
pub fn label_color(label: &Label) -> (u8, u8, u8) {
    label
        .color
        .as_deref()
        .and_then(parse_hex_color)
        .unwrap_or_else(|| color_for_tag(&label.name))
}

/// Hash a tag for deterministic color selection
pub fn hash_tag(tag: &str) -> u64 {
    let mut h: u64 = 5381;
    for b in tag.to_lowercase().bytes() {
        h = (h.wrapping_shl(5)).wrapping_add(h) ^ u64::from(b);
    }
    h
}

/// Get color for a tag based on hash
pub fn color_for_tag(tag: &str) -> (u8, u8, u8) {
    const PALETTE: &[(u8, u8, u8)] = &[
        (137, 180, 250),
        (166, 227, 161),
        (249, 226, 175),
        (245, 194, 231),
        (255, 169, 167),
        (148, 226, 213),
        (198, 160, 246),
        (240, 198, 198),
        (181, 232, 224),
        (183, 189, 248),
        (255, 214, 165),
        (179, 255, 171),
        (196, 181, 255),
        (186, 225, 255),
        (255, 199, 190),
        (168, 237, 255),
    ];
    let h = hash_tag(tag);
    PALETTE[(h as usize) % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("#audio"), "audio");
        assert_eq!(normalize_tag("  code  "), "code");
        assert_eq!(normalize_tag("#"), "");
    }

    #[test]
    fn test_normalize_tags_dedupes_case_insensitively() {
        let tags = vec!["Audio".to_string(), "#audio".to_string(), "cover".to_string()];
        assert_eq!(normalize_tags(tags), vec!["Audio", "cover"]);
    }

    #[test]
    fn test_item_has_tags() {
        let item = ContentItem::new(1, "t", "b", &["project", "Audio"], Utc::now());
        assert!(item_has_tags(&item, &[]));
        assert!(item_has_tags(&item, &["audio".to_string()]));
        assert!(!item_has_tags(&item, &["audio".to_string(), "code".to_string()]));
    }

    #[test]
    fn test_tag_style_mapping() {
        assert_eq!(tag_style("Audio").unwrap().icon, "fas fa-volume-up");
        assert_eq!(tag_style("cover-song").unwrap().class, "tag-label-cover");
        assert_eq!(tag_style("original").unwrap().class, "tag-label-original");
        assert!(tag_style("misc").is_none());
    }

    #[test]
    fn test_label_color_prefers_upstream() {
        let label = Label { name: "x".to_string(), color: Some("1d76db".to_string()) };
        assert_eq!(label_color(&label), (0x1d, 0x76, 0xdb));
        let bare = Label::new("x");
        assert_eq!(label_color(&bare), color_for_tag("x"));
        assert_eq!(parse_hex_color("zzzzzz"), None);
    }

    #[test]
    fn test_color_for_tag_consistent() {
        assert_eq!(color_for_tag("todo"), color_for_tag("TODO"));
        assert_ne!(hash_tag("todo"), hash_tag("work"));
    }
}
