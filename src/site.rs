use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::card;
use crate::fetch::{ContentFetcher, FetchError, RepoRef, Transport};
use crate::filter;
use crate::item::{ContentItem, SectionKind};
use crate::page::{Page, PageError, StatusKind, StatusMessage};

/// What one section ended up showing.
#[derive(Debug)]
pub struct SectionOutcome {
    pub kind: SectionKind,
    pub items: Vec<ContentItem>,
    pub status: Option<StatusMessage>,
    pub error: Option<FetchError>,
}

impl SectionOutcome {
    pub fn is_fallback(&self) -> bool {
        self.status.is_some()
    }
}

/// Turn a fetch result into displayable items. Empty results and every
/// error class degrade to the fixed example set plus a status message.
pub fn resolve(
    kind: SectionKind,
    result: Result<Vec<ContentItem>, FetchError>,
    repo: &RepoRef,
    now: DateTime<Utc>,
) -> SectionOutcome {
    let status = |status_kind| StatusMessage {
        kind: status_kind,
        section: kind,
        repo_name: repo.name.clone(),
        repo_url: repo.issues_page(),
    };
    match result {
        Ok(items) if !items.is_empty() => SectionOutcome { kind, items, status: None, error: None },
        Ok(_) => {
            info!(section = kind.label(), "no upstream items; using examples");
            SectionOutcome {
                kind,
                items: kind.fallback(now),
                status: Some(status(StatusKind::Empty)),
                error: None,
            }
        }
        Err(err) => {
            warn!(section = kind.label(), %err, "fetch failed; using examples");
            SectionOutcome {
                kind,
                items: kind.fallback(now),
                status: Some(status(StatusKind::Error)),
                error: Some(err),
            }
        }
    }
}

/// Render an outcome into its container and re-bind that section's filters.
pub fn populate(page: &mut Page, outcome: &SectionOutcome) -> Result<(), PageError> {
    let label = outcome.kind.label();
    let cards = outcome.items.iter().map(|i| card::build(i, label)).collect();
    page.fill(outcome.kind.container_id(), cards, outcome.status.clone())?;
    filter::attach(page, label)
}

/// Build the whole portfolio page. Both sections are fetched concurrently
/// and each falls back on its own.
pub fn load<T: Transport>(
    fetcher: &mut ContentFetcher<T>,
    now: DateTime<Utc>,
) -> Result<(Page, Vec<SectionOutcome>), PageError> {
    let repo = fetcher.repo().clone();
    let labels = SectionKind::ALL.map(SectionKind::label);
    let results = fetcher.fetch_sections(&labels);

    let mut page = Page::portfolio(&repo.name);
    let mut outcomes = Vec::with_capacity(labels.len());
    for (kind, result) in SectionKind::ALL.into_iter().zip(results) {
        let outcome = resolve(kind, result, &repo, now);
        populate(&mut page, &outcome)?;
        outcomes.push(outcome);
    }
    Ok((page, outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Response;
    use serde_json::json;

    struct StubTransport {
        notes: Option<String>,
    }

    impl Transport for StubTransport {
        fn get(&self, url: &str, _token: Option<&str>) -> Result<Response, FetchError> {
            if url.contains("labels=note") {
                if let Some(body) = &self.notes {
                    return Ok(Response::ok(body));
                }
            }
            Err(FetchError::Network("connection refused".to_string()))
        }

        fn post_json(
            &self,
            _url: &str,
            _token: Option<&str>,
            _body: &serde_json::Value,
        ) -> Result<Response, FetchError> {
            Err(FetchError::Network("read only".to_string()))
        }
    }

    fn repo() -> RepoRef {
        RepoRef {
            api_base: "http://api.test".to_string(),
            web_base: "https://github.com".to_string(),
            owner: "p0kks".to_string(),
            name: "p0kks.me".to_string(),
        }
    }

    fn fetcher(notes: Option<serde_json::Value>) -> ContentFetcher<StubTransport> {
        ContentFetcher::new(StubTransport { notes: notes.map(|n| n.to_string()) }, repo())
    }

    #[test]
    fn test_project_failure_renders_fixed_examples() {
        let notes = json!([{
            "id": 10, "title": "Real note", "body": "hi",
            "created_at": "2024-02-01T00:00:00Z", "labels": ["note"]
        }]);
        let mut f = fetcher(Some(notes));
        let (page, outcomes) = load(&mut f, Utc::now()).unwrap();

        let projects = page.container("project-container").unwrap();
        let titles: Vec<&str> = projects.cards.iter().map(|c| c.title.as_str()).collect();
        let expected: Vec<String> =
            crate::item::fallback_projects(Utc::now()).into_iter().map(|i| i.title).collect();
        assert_eq!(titles, expected);
        assert_eq!(projects.status.as_ref().unwrap().kind, StatusKind::Error);
        assert!(outcomes[0].error.is_some());

        let notes = page.container("notes-container").unwrap();
        assert_eq!(notes.cards.len(), 1);
        assert_eq!(notes.cards[0].title, "Real note");
        assert!(notes.status.is_none());
    }

    #[test]
    fn test_empty_result_uses_examples_with_empty_status() {
        let mut f = fetcher(Some(json!([])));
        let (page, outcomes) = load(&mut f, Utc::now()).unwrap();
        let notes = page.container("notes-container").unwrap();
        assert_eq!(notes.cards.len(), 2);
        assert_eq!(notes.status.as_ref().unwrap().kind, StatusKind::Empty);
        assert!(outcomes[1].is_fallback());
        assert!(outcomes[1].error.is_none());
    }

    #[test]
    fn test_filters_bound_after_load() {
        let mut f = fetcher(None);
        let (mut page, _) = load(&mut f, Utc::now()).unwrap();
        assert!(page.is_attached("project"));
        assert!(page.is_attached("note"));
        filter::click(&mut page, "project", "audio").unwrap();
        assert_eq!(filter::visible_count(&page, SectionKind::Project), 2);
        assert!(page.to_html().contains("Unable to load projects."));
    }

    #[test]
    fn test_malformed_payload_falls_back() {
        let outcome = resolve(
            SectionKind::Note,
            Err(serde_json::from_str::<Vec<ContentItem>>("{").unwrap_err().into()),
            &repo(),
            Utc::now(),
        );
        assert_eq!(outcome.items.len(), 2);
        assert!(matches!(outcome.error, Some(FetchError::Payload(_))));
    }
}
