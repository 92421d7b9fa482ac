use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, LINK};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::LazyLock;
use std::thread;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{Clock, IssueCache, SystemClock};
use crate::item::ContentItem;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const PER_PAGE: &str = "100";

static NEXT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).expect("link header pattern")
});

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(Box<reqwest::Error>),
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream returned HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("a token is required to create content; run `folio token set <value>`")]
    MissingToken,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(Box::new(err))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl FetchError {
    /// Build a status error, keeping the server's `message` when the body is JSON.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty());
        FetchError::Status { status, message }
    }
}

/// The parts of an HTTP response the fetcher cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub link: Option<String>,
    pub body: String,
}

impl Response {
    pub fn ok(body: &str) -> Self {
        Self { status: 200, link: None, body: body.to_string() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP seam so the fetcher can be driven without a network.
pub trait Transport: Sync {
    fn get(&self, url: &str, token: Option<&str>) -> Result<Response, FetchError>;
    fn post_json(
        &self,
        url: &str,
        token: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<Response, FetchError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn read(resp: reqwest::blocking::Response) -> Result<Response, FetchError> {
        let status = resp.status().as_u16();
        let link = resp
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text()?;
        Ok(Response { status, link, body })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, token: Option<&str>) -> Result<Response, FetchError> {
        let mut req = self.client.get(url).header(ACCEPT, GITHUB_ACCEPT);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Self::read(req.send()?)
    }

    fn post_json(
        &self,
        url: &str,
        token: Option<&str>,
        body: &serde_json::Value,
    ) -> Result<Response, FetchError> {
        let mut req = self.client.post(url).header(ACCEPT, GITHUB_ACCEPT).json(body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Self::read(req.send()?)
    }
}

/// Where the content lives upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub api_base: String,
    pub web_base: String,
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn issues_endpoint(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.api_base.trim_end_matches('/'),
            self.owner,
            self.name
        )
    }

    /// Human-facing link to the issue list, used in fallback messages.
    pub fn issues_page(&self) -> String {
        format!(
            "{}/{}/{}/issues",
            self.web_base.trim_end_matches('/'),
            self.owner,
            self.name
        )
    }

    /// The upstream "new issue" form, pre-filled. Used when no token is set.
    pub fn new_issue_url(
        &self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<Url, url::ParseError> {
        let base = format!("{}/new", self.issues_page());
        Url::parse_with_params(
            &base,
            &[("title", title), ("body", body), ("labels", &labels.join(","))],
        )
    }
}

pub fn next_link(header: &str) -> Option<String> {
    NEXT_LINK.captures(header).map(|c| c[1].to_string())
}

/// Fetch every page starting at `first_url`, following `rel="next"` links.
/// Pull requests are dropped; the result is sorted newest first.
fn fetch_pages<T: Transport + ?Sized>(
    transport: &T,
    token: Option<&str>,
    first_url: &str,
) -> Result<Vec<ContentItem>, FetchError> {
    let mut items = Vec::new();
    let mut visited = HashSet::new();
    let mut next = Some(first_url.to_string());

    while let Some(url) = next.take() {
        if !visited.insert(url.clone()) {
            warn!(%url, "pagination loop detected; stopping");
            break;
        }
        debug!(%url, "fetching page");
        let resp = transport.get(&url, token)?;
        if !resp.is_success() {
            return Err(FetchError::from_status(resp.status, &resp.body));
        }
        let page: Vec<ContentItem> = serde_json::from_str(&resp.body)?;
        items.extend(page.into_iter().filter(|i| !i.is_pull_request()));
        next = resp.link.as_deref().and_then(next_link);
    }

    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(items)
}

pub struct ContentFetcher<T: Transport> {
    transport: T,
    repo: RepoRef,
    token: Option<String>,
    cache: IssueCache,
    clock: Box<dyn Clock>,
}

impl<T: Transport> ContentFetcher<T> {
    pub fn new(transport: T, repo: RepoRef) -> Self {
        Self {
            transport,
            repo,
            token: None,
            cache: IssueCache::default(),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_cache(mut self, cache: IssueCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn cache(&self) -> &IssueCache {
        &self.cache
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// The exact query for a label; also the cache key.
    pub fn query_url(&self, label: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            &self.repo.issues_endpoint(),
            &[
                ("labels", label),
                ("state", "open"),
                ("sort", "created"),
                ("direction", "desc"),
                ("per_page", PER_PAGE),
            ],
        )
    }

    pub fn fetch_by_label(&mut self, label: &str) -> Result<Vec<ContentItem>, FetchError> {
        let key = self.query_url(label)?.to_string();
        if let Some(entry) = self.cache.get(&key, self.clock.now()) {
            debug!(label, "cache hit");
            return Ok(entry.data.clone());
        }
        debug!(label, "cache miss");
        let items = fetch_pages(&self.transport, self.token.as_deref(), &key)?;
        info!(label, count = items.len(), "fetched items");
        self.cache.put(&key, items.clone(), self.clock.now());
        Ok(items)
    }

    /// Fetch several labels at once. Cache hits are answered here; misses run
    /// concurrently and each label succeeds or fails on its own.
    pub fn fetch_sections(
        &mut self,
        labels: &[&str],
    ) -> Vec<Result<Vec<ContentItem>, FetchError>> {
        let now = self.clock.now();
        let mut results: Vec<Option<Result<Vec<ContentItem>, FetchError>>> =
            (0..labels.len()).map(|_| None).collect();
        let mut misses: Vec<(usize, String)> = Vec::new();

        for (idx, label) in labels.iter().enumerate() {
            match self.query_url(label) {
                Err(err) => results[idx] = Some(Err(err.into())),
                Ok(url) => {
                    let key = url.to_string();
                    match self.cache.get(&key, now) {
                        Some(entry) => {
                            debug!(label, "cache hit");
                            results[idx] = Some(Ok(entry.data.clone()));
                        }
                        None => misses.push((idx, key)),
                    }
                }
            }
        }

        let transport = &self.transport;
        let token = self.token.as_deref();
        let fetched: Vec<(usize, String, Result<Vec<ContentItem>, FetchError>)> =
            thread::scope(|scope| {
                let handles: Vec<_> = misses
                    .into_iter()
                    .map(|(idx, key)| {
                        let url = key.clone();
                        let handle =
                            scope.spawn(move || fetch_pages(transport, token, &url));
                        (idx, key, handle)
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|(idx, key, handle)| {
                        let result = handle.join().unwrap_or_else(|_| {
                            Err(FetchError::Network("fetch worker panicked".to_string()))
                        });
                        (idx, key, result)
                    })
                    .collect()
            });

        for (idx, key, result) in fetched {
            if let Ok(items) = &result {
                self.cache.put(&key, items.clone(), self.clock.now());
            }
            results[idx] = Some(result);
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(FetchError::Network("no result".to_string()))))
            .collect()
    }

    /// Create a new upstream record. Requires a token; clears the cache on success.
    pub fn create_item(
        &mut self,
        title: &str,
        body: &str,
        labels: &[String],
    ) -> Result<ContentItem, FetchError> {
        let token = self.token.as_deref().ok_or(FetchError::MissingToken)?;
        let payload = json!({ "title": title, "body": body, "labels": labels });
        let resp = self
            .transport
            .post_json(&self.repo.issues_endpoint(), Some(token), &payload)?;
        if !resp.is_success() {
            return Err(FetchError::from_status(resp.status, &resp.body));
        }
        let item: ContentItem = serde_json::from_str(&resp.body)?;
        self.cache.clear();
        info!(number = item.number, "created item; cache cleared");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct ScriptedTransport {
        pages: HashMap<String, Response>,
        calls: Mutex<Vec<String>>,
        posts: Mutex<Vec<serde_json::Value>>,
    }

    impl ScriptedTransport {
        fn new(pages: Vec<(String, Response)>) -> Self {
            Self {
                pages: pages.into_iter().collect(),
                calls: Mutex::new(Vec::new()),
                posts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Transport for ScriptedTransport {
        fn get(&self, url: &str, _token: Option<&str>) -> Result<Response, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Network(format!("no route to {url}")))
        }

        fn post_json(
            &self,
            _url: &str,
            _token: Option<&str>,
            body: &serde_json::Value,
        ) -> Result<Response, FetchError> {
            self.posts.lock().unwrap().push(body.clone());
            let mut created = body.clone();
            created["id"] = json!(99);
            created["number"] = json!(12);
            created["created_at"] = json!("2024-06-01T00:00:00Z");
            Ok(Response { status: 201, link: None, body: created.to_string() })
        }
    }

    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())))
        }

        fn advance(&self, secs: i64) {
            let mut now = self.0.lock().unwrap();
            *now += TimeDelta::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn repo() -> RepoRef {
        RepoRef {
            api_base: "http://api.test".to_string(),
            web_base: "http://web.test".to_string(),
            owner: "o".to_string(),
            name: "r".to_string(),
        }
    }

    fn first_url(label: &str) -> String {
        format!(
            "http://api.test/repos/o/r/issues?labels={label}&state=open&sort=created&direction=desc&per_page=100"
        )
    }

    fn issue(id: u64, day: u32, labels: &[&str]) -> serde_json::Value {
        json!({
            "id": id,
            "number": id,
            "title": format!("item {id}"),
            "body": "text",
            "created_at": format!("2024-03-{day:02}T00:00:00Z"),
            "labels": labels,
            "html_url": format!("http://web.test/o/r/issues/{id}"),
        })
    }

    fn page(issues: Vec<serde_json::Value>, next: Option<&str>) -> Response {
        Response {
            status: 200,
            link: next.map(|n| format!("<{n}>; rel=\"next\", <http://api.test/last>; rel=\"last\"")),
            body: serde_json::Value::Array(issues).to_string(),
        }
    }

    #[test]
    fn test_query_url_carries_constant_params() {
        let fetcher = ContentFetcher::new(ScriptedTransport::new(vec![]), repo());
        assert_eq!(fetcher.query_url("project").unwrap().as_str(), first_url("project"));
    }

    #[test]
    fn test_follows_next_links_until_absent() {
        let transport = ScriptedTransport::new(vec![
            (first_url("note"), page(vec![issue(3, 20, &["note"]), issue(2, 15, &["note"])], Some("http://api.test/p2"))),
            ("http://api.test/p2".to_string(), page(vec![issue(1, 10, &["note"])], Some("http://api.test/p3"))),
            ("http://api.test/p3".to_string(), page(vec![issue(0, 5, &["note"])], None)),
        ]);
        let mut fetcher = ContentFetcher::new(transport, repo());
        let items = fetcher.fetch_by_label("note").unwrap();
        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 2, 1, 0]);
        assert_eq!(fetcher.transport().calls().len(), 3);
    }

    #[test]
    fn test_results_sorted_newest_first_and_prs_skipped() {
        let mut pr = issue(9, 30, &["project"]);
        pr["pull_request"] = json!({"url": "x"});
        let transport = ScriptedTransport::new(vec![(
            first_url("project"),
            page(vec![issue(1, 2, &["project"]), pr, issue(2, 25, &["project"])], None),
        )]);
        let mut fetcher = ContentFetcher::new(transport, repo());
        let items = fetcher.fetch_by_label("project").unwrap();
        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(items.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn test_pagination_loop_is_cut() {
        let transport = ScriptedTransport::new(vec![(
            first_url("note"),
            page(vec![issue(1, 1, &["note"])], Some(&first_url("note"))),
        )]);
        let mut fetcher = ContentFetcher::new(transport, repo());
        let items = fetcher.fetch_by_label("note").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(fetcher.transport().calls().len(), 1);
    }

    #[test]
    fn test_cache_hit_within_ttl_and_refetch_after() {
        let clock = ManualClock::new();
        let transport =
            ScriptedTransport::new(vec![(first_url("note"), page(vec![issue(1, 1, &["note"])], None))]);
        let mut fetcher = ContentFetcher::new(transport, repo())
            .with_cache(IssueCache::new(TimeDelta::seconds(300)))
            .with_clock(Box::new(clock.clone()));

        let first = fetcher.fetch_by_label("note").unwrap();
        clock.advance(120);
        let second = fetcher.fetch_by_label("note").unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.transport().calls().len(), 1);

        clock.advance(300);
        fetcher.fetch_by_label("note").unwrap();
        assert_eq!(fetcher.transport().calls().len(), 2);
    }

    #[test]
    fn test_status_error_carries_message() {
        let transport = ScriptedTransport::new(vec![(
            first_url("project"),
            Response {
                status: 403,
                link: None,
                body: r#"{"message": "API rate limit exceeded"}"#.to_string(),
            },
        )]);
        let mut fetcher = ContentFetcher::new(transport, repo());
        match fetcher.fetch_by_label("project") {
            Err(FetchError::Status { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message.as_deref(), Some("API rate limit exceeded"));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(fetcher.cache().is_empty());
    }

    #[test]
    fn test_status_error_without_json_body() {
        let err = FetchError::from_status(502, "<html>bad gateway</html>");
        assert!(matches!(err, FetchError::Status { status: 502, message: None }));
        assert_eq!(err.to_string(), "upstream returned HTTP 502: no message");
    }

    #[test]
    fn test_malformed_payload_is_payload_error() {
        let transport =
            ScriptedTransport::new(vec![(first_url("note"), Response::ok(r#"{"not": "a list"}"#))]);
        let mut fetcher = ContentFetcher::new(transport, repo());
        assert!(matches!(fetcher.fetch_by_label("note"), Err(FetchError::Payload(_))));
    }

    #[test]
    fn test_fetch_sections_fail_independently() {
        let transport = ScriptedTransport::new(vec![(
            first_url("note"),
            page(vec![issue(1, 1, &["note"])], None),
        )]);
        let mut fetcher = ContentFetcher::new(transport, repo());
        let results = fetcher.fetch_sections(&["project", "note"]);
        assert!(matches!(results[0], Err(FetchError::Network(_))));
        assert_eq!(results[1].as_ref().unwrap().len(), 1);
        assert_eq!(fetcher.cache().len(), 1);

        let again = fetcher.fetch_sections(&["note"]);
        assert!(again[0].is_ok());
        assert_eq!(fetcher.transport().calls().len(), 2);
    }

    #[test]
    fn test_create_requires_token() {
        let mut fetcher = ContentFetcher::new(ScriptedTransport::new(vec![]), repo());
        let err = fetcher.create_item("t", "b", &["note".to_string()]).unwrap_err();
        assert!(matches!(err, FetchError::MissingToken));
    }

    #[test]
    fn test_create_posts_and_clears_cache() {
        let transport =
            ScriptedTransport::new(vec![(first_url("note"), page(vec![issue(1, 1, &["note"])], None))]);
        let mut fetcher =
            ContentFetcher::new(transport, repo()).with_token(Some("secret".to_string()));
        fetcher.fetch_by_label("note").unwrap();
        assert_eq!(fetcher.cache().len(), 1);

        let created = fetcher
            .create_item("Hello", "body", &["note".to_string(), "thoughts".to_string()])
            .unwrap();
        assert_eq!(created.number, 12);
        assert!(created.has_label("thoughts"));
        assert!(fetcher.cache().is_empty());
        let posts = fetcher.transport().posts.lock().unwrap().clone();
        assert_eq!(posts[0]["title"], "Hello");
    }

    #[test]
    fn test_new_issue_url_is_prefilled() {
        let url = repo()
            .new_issue_url("A title", "x & y", &["note".to_string(), "ideas".to_string()])
            .unwrap();
        assert!(url.as_str().starts_with("http://web.test/o/r/issues/new?"));
        let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["title"], "A title");
        assert_eq!(pairs["body"], "x & y");
        assert_eq!(pairs["labels"], "note,ideas");
    }

    #[test]
    fn test_next_link_parsing() {
        let header = r#"<https://api.github.com/x?page=2>; rel="next", <https://api.github.com/x?page=5>; rel="last""#;
        assert_eq!(next_link(header).as_deref(), Some("https://api.github.com/x?page=2"));
        assert_eq!(next_link(r#"<https://a/x?page=1>; rel="prev""#), None);
    }
}
