pub mod types;

pub use types::{Commit, FileChange, PullRequest};

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::cache::{CacheError, CacheStore};
use crate::github::{FetchError, Fetcher, RateGovernor, RepoContext};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("pull request #{number} was not found")]
    PrNotFound { number: u64 },

    #[error("unexpected GitHub payload: {0}")]
    Payload(String),
}

/// Orchestrates the Paginated Fetcher and the Cache Store into complete
/// pull-request records: {PR → commits → changed files}.
///
/// Two entry points with deliberately different persistence behavior:
/// `fetch_all` rebuilds the whole repository history and writes it in one
/// shot only after every PR assembled cleanly; `fetch_one` fetches a
/// single missing PR and folds it into the existing file. A mid-assembly
/// failure on either path writes nothing.
pub struct Assembler {
    fetcher: Fetcher,
    cache: CacheStore,
    governor: Arc<RateGovernor>,
}

impl Assembler {
    pub fn new(cache: CacheStore) -> Self {
        let governor = Arc::new(RateGovernor::new());
        Self {
            fetcher: Fetcher::new(governor.clone()),
            cache,
            governor,
        }
    }

    #[cfg(test)]
    fn with_parts(fetcher: Fetcher, cache: CacheStore, governor: Arc<RateGovernor>) -> Self {
        Self {
            fetcher,
            cache,
            governor,
        }
    }

    /// Return the full cached history, assembling it from the API when the
    /// cache has never been written. A populated cache is trusted as-is;
    /// there is no staleness check or partial refresh.
    #[instrument(skip(self, ctx), fields(owner = %ctx.owner, repo = %ctx.repo))]
    pub async fn fetch_all(&self, ctx: &RepoContext) -> Result<Vec<PullRequest>, HistoryError> {
        if let Some(cached) = self.cache.load(&ctx.owner, &ctx.repo)? {
            info!(count = cached.len(), "serving pull requests from cache");
            return Ok(cached);
        }

        info!("cache miss, listing all pull requests");
        let listing = self.fetcher.fetch(ctx, "pulls?state=all").await?;
        let items = into_array(listing, "pull request listing")?;

        let mut records = Vec::new();
        for item in &items {
            self.governor.pause_if_needed().await;
            let record = self.assemble_pr(ctx, item).await?;
            // A PR whose commits were all pruned carries nothing to review.
            if record.commits.is_empty() {
                debug!(number = record.number, "skipping PR with no reviewable changes");
                continue;
            }
            records.push(record);
        }

        self.cache.save_all(&ctx.owner, &ctx.repo, &records)?;
        info!(count = records.len(), "assembled pull request history");
        Ok(records)
    }

    /// Return one pull request, from cache when present, otherwise by
    /// fetching exactly that PR and appending it to the cache. Never
    /// triggers a full-repository scan.
    #[instrument(skip(self, ctx), fields(owner = %ctx.owner, repo = %ctx.repo, pr = number))]
    pub async fn fetch_one(
        &self,
        ctx: &RepoContext,
        number: u64,
    ) -> Result<PullRequest, HistoryError> {
        if let Some(cached) = self.cache.load(&ctx.owner, &ctx.repo)? {
            if let Some(hit) = cached.into_iter().find(|r| r.number == number) {
                info!("serving pull request from cache");
                return Ok(hit);
            }
        }

        info!("cache miss, fetching single pull request");
        let detail = self
            .fetcher
            .fetch(ctx, &format!("pulls/{number}"))
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    HistoryError::PrNotFound { number }
                } else {
                    HistoryError::Fetch(err)
                }
            })?;

        // The explicitly requested PR is persisted even when pruning
        // leaves it with no commits.
        let record = self.assemble_pr(ctx, &detail).await?;
        self.cache.append_one(&ctx.owner, &ctx.repo, record.clone())?;
        Ok(record)
    }

    /// Build one record from a PR object (a listing element or a single-PR
    /// detail — both carry the same fields used here).
    async fn assemble_pr(
        &self,
        ctx: &RepoContext,
        pr: &Value,
    ) -> Result<PullRequest, HistoryError> {
        let number = get_u64(pr, "number")?;
        let title = get_str(pr, "title")?.to_string();
        let body = pr.get("body").and_then(Value::as_str).map(str::to_string);
        let commits_url = get_str(pr, "commits_url")?.to_string();

        debug!(number, "fetching commit list");
        let listing = self.fetcher.fetch(ctx, &commits_url).await?;
        let items = into_array(listing, "commit listing")?;

        let mut commits = Vec::new();
        for item in &items {
            let message = item
                .get("commit")
                .and_then(|c| c.get("message"))
                .and_then(Value::as_str)
                .ok_or_else(|| HistoryError::Payload("commit without message".to_string()))?
                .to_string();
            let detail_url = get_str(item, "url")?;

            let detail = self.fetcher.fetch(ctx, detail_url).await?;
            let files = match detail.get("files") {
                Some(Value::Array(files)) => retained_files(files),
                _ => {
                    return Err(HistoryError::Payload(
                        "commit detail without files array".to_string(),
                    ))
                }
            };

            // Commits with no retained files carry nothing to review.
            if !files.is_empty() {
                commits.push(Commit { message, files });
            }
        }

        debug!(number, commits = commits.len(), "assembled pull request");
        Ok(PullRequest {
            number,
            title,
            body,
            commits,
        })
    }
}

/// Keep only files with an actual change and textual patch; binary and
/// rename-only entries carry no patch and are dropped.
fn retained_files(files: &[Value]) -> Vec<FileChange> {
    files
        .iter()
        .filter_map(|file| {
            let changes = file.get("changes").and_then(Value::as_u64).unwrap_or(0);
            if changes == 0 {
                return None;
            }
            let filename = file.get("filename").and_then(Value::as_str)?;
            let patch = file.get("patch").and_then(Value::as_str)?;
            Some(FileChange {
                filename: filename.to_string(),
                patch: patch.to_string(),
            })
        })
        .collect()
}

fn into_array(value: Value, what: &str) -> Result<Vec<Value>, HistoryError> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(HistoryError::Payload(format!("{what} is not an array"))),
    }
}

fn get_str<'a>(value: &'a Value, field: &str) -> Result<&'a str, HistoryError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| HistoryError::Payload(format!("missing string field {field}")))
}

fn get_u64(value: &Value, field: &str) -> Result<u64, HistoryError> {
    value
        .get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| HistoryError::Payload(format!("missing integer field {field}")))
}
