pub mod fetch;
pub mod link;
pub mod rate;

pub use fetch::Fetcher;
pub use rate::RateGovernor;

use thiserror::Error;

/// Root of GitHub's per-repository REST API. Endpoints already under this
/// root (commit URLs returned by listing calls) are used verbatim;
/// anything else is joined beneath `{root}{owner}/{repo}/`.
pub const API_ROOT: &str = "https://api.github.com/repos/";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("pagination identity mismatch: first page {expected:?}, continuation page {actual:?}")]
    PaginationIdentityMismatch {
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("unexpected page shape: {0}")]
    PageShape(String),

    #[error("GitHub token not found in config or environment")]
    MissingToken,
}

impl FetchError {
    /// True when the failure was an HTTP 404, which callers treat as
    /// "resource does not exist" rather than an unexpected fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FetchError::Http { status, .. } if *status == reqwest::StatusCode::NOT_FOUND
        )
    }
}

/// Immutable identity of one repository plus the credential used to reach
/// it. Built once per run and threaded through every request; no component
/// reads ambient environment state.
#[derive(Debug, Clone)]
pub struct RepoContext {
    pub owner: String,
    pub repo: String,
    token: String,
}

impl RepoContext {
    /// Fails fast when the token is empty so a misconfigured run dies
    /// before its first network call.
    pub fn new(owner: String, repo: String, token: String) -> Result<Self, FetchError> {
        if token.is_empty() {
            return Err(FetchError::MissingToken);
        }
        Ok(Self { owner, repo, token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_requires_token() {
        let err = RepoContext::new("org".to_string(), "repo".to_string(), String::new());
        assert!(matches!(err, Err(FetchError::MissingToken)));
    }

    #[test]
    fn test_context_holds_identity() {
        let ctx =
            RepoContext::new("org".to_string(), "repo".to_string(), "t0ken".to_string()).unwrap();
        assert_eq!(ctx.owner, "org");
        assert_eq!(ctx.repo, "repo");
        assert_eq!(ctx.token(), "t0ken");
    }

    #[test]
    fn test_not_found_discrimination() {
        let not_found = FetchError::Http {
            status: reqwest::StatusCode::NOT_FOUND,
            body: String::new(),
        };
        let server_err = FetchError::Http {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        };
        assert!(not_found.is_not_found());
        assert!(!server_err.is_not_found());
    }
}
