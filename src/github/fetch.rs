use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use super::link;
use super::rate::RateGovernor;
use super::{FetchError, RepoContext, API_ROOT};

/// Field carrying the embedded, paginated list on a single-resource page
/// (a commit detail's file list).
const EMBEDDED_LIST_FIELD: &str = "files";

/// Field confirming two single-resource pages describe the same resource.
const IDENTITY_FIELD: &str = "sha";

/// One fetched page: parsed payload, continuation URL from the `Link`
/// header, and rate-limit header state when present.
#[derive(Debug, Clone)]
pub struct Page {
    pub value: Value,
    pub next: Option<String>,
    /// (remaining calls, reset unix epoch)
    pub rate: Option<(u64, u64)>,
}

/// Seam between pagination logic and the wire. The production transport
/// is reqwest; tests script pages through a fake.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, token: &str) -> Result<Page, FetchError>;
}

/// reqwest-backed transport issuing authenticated GETs against the
/// GitHub REST API.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, token: &str) -> Result<Page, FetchError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", "pr-history")
            .header("Accept", "application/vnd.github.v3+json")
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        let next = response
            .headers()
            .get("link")
            .and_then(|v| v.to_str().ok())
            .and_then(link::next_url);
        let remaining = header_u64(&response, "x-ratelimit-remaining");
        let reset = header_u64(&response, "x-ratelimit-reset");
        let rate = remaining.zip(reset);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http { status, body });
        }

        let value = response.json().await?;
        Ok(Page { value, next, rate })
    }
}

fn header_u64(response: &reqwest::Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// How continuation pages merge into the accumulated result, decided once
/// from the first page's shape.
#[derive(Debug)]
enum PageMode {
    /// Top-level list: continuation pages are further list chunks,
    /// concatenated in arrival order.
    List,
    /// Single resource whose embedded `files` list is windowed across
    /// pages. Every continuation page must repeat the first page's
    /// identity value; `files` chunks are concatenated, all other fields
    /// keep the first page's values.
    Embedded { identity: Option<String> },
}

impl PageMode {
    fn of(first: &Value) -> Self {
        match first {
            Value::Array(_) => PageMode::List,
            _ => PageMode::Embedded {
                identity: first
                    .get(IDENTITY_FIELD)
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
        }
    }
}

/// Issues one logical GET against the GitHub API, transparently following
/// `Link: rel="next"` continuations and merging pages into a single JSON
/// value.
///
/// HTTP failures are surfaced immediately and never retried here; the
/// rate governor is fed header state from every page so bulk loops can
/// pause before exhaustion.
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    governor: Arc<RateGovernor>,
}

impl Fetcher {
    pub fn new(governor: Arc<RateGovernor>) -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()), governor)
    }

    pub fn with_transport(transport: Arc<dyn Transport>, governor: Arc<RateGovernor>) -> Self {
        Self { transport, governor }
    }

    /// Fetch `endpoint` and every continuation page, returning the merged
    /// payload. `endpoint` is either a path under this repo's API root
    /// ("pulls?state=all") or an absolute URL a previous response handed
    /// back (a commit detail URL).
    #[instrument(skip(self, ctx), fields(owner = %ctx.owner, repo = %ctx.repo))]
    pub async fn fetch(&self, ctx: &RepoContext, endpoint: &str) -> Result<Value, FetchError> {
        let url = resolve_url(ctx, endpoint);

        let first = self.get_page(ctx, &url).await?;
        let mode = PageMode::of(&first.value);
        let mut accumulated = first.value;
        let mut next = first.next;
        let mut pages = 1u32;

        while let Some(continuation) = next {
            let page = self.get_page(ctx, &continuation).await?;
            merge_page(&mode, &mut accumulated, page.value)?;
            next = page.next;
            pages += 1;
        }

        debug!(pages, "fetch complete");
        Ok(accumulated)
    }

    async fn get_page(&self, ctx: &RepoContext, url: &str) -> Result<Page, FetchError> {
        let page = self.transport.get(url, ctx.token()).await?;
        if let Some((remaining, reset)) = page.rate {
            self.governor.observe(remaining, reset);
        }
        Ok(page)
    }
}

fn resolve_url(ctx: &RepoContext, endpoint: &str) -> String {
    if endpoint.starts_with(API_ROOT) {
        endpoint.to_string()
    } else {
        format!("{API_ROOT}{}/{}/{}", ctx.owner, ctx.repo, endpoint)
    }
}

/// Fold one continuation page into the accumulated value.
fn merge_page(mode: &PageMode, accumulated: &mut Value, page: Value) -> Result<(), FetchError> {
    match mode {
        PageMode::List => {
            let chunk = match page {
                Value::Array(items) => items,
                other => {
                    return Err(FetchError::PageShape(format!(
                        "list continuation page is not an array: {other}"
                    )))
                }
            };
            match accumulated {
                Value::Array(items) => items.extend(chunk),
                // Mode was resolved from an array first page.
                _ => unreachable!("list mode implies an array accumulator"),
            }
        }
        PageMode::Embedded { identity } => {
            let actual = page
                .get(IDENTITY_FIELD)
                .and_then(Value::as_str)
                .map(str::to_string);
            if identity.is_none() || actual != *identity {
                return Err(FetchError::PaginationIdentityMismatch {
                    expected: identity.clone(),
                    actual,
                });
            }

            let chunk = match page.get(EMBEDDED_LIST_FIELD) {
                Some(Value::Array(items)) => items.clone(),
                _ => {
                    return Err(FetchError::PageShape(format!(
                        "continuation page carries no {EMBEDDED_LIST_FIELD} array"
                    )))
                }
            };
            match accumulated.get_mut(EMBEDDED_LIST_FIELD) {
                Some(Value::Array(items)) => items.extend(chunk),
                _ => {
                    return Err(FetchError::PageShape(format!(
                        "first page carries no {EMBEDDED_LIST_FIELD} array"
                    )))
                }
            }
        }
    }
    Ok(())
}
