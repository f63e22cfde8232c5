use serde::{Deserialize, Serialize};

/// One assembled pull request: metadata plus the full commit/file tree.
///
/// This is the shape persisted to the cache file (a top-level JSON array
/// of these), so changing field names here changes the on-disk format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number, unique within one repository's cache
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR description; GitHub returns null for an empty body
    pub body: Option<String>,
    /// Commits in the order the listing endpoint returned them
    /// (chronological, oldest first)
    pub commits: Vec<Commit>,
}

/// A single commit within a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit message
    pub message: String,
    /// Changed files in the order the commit detail endpoint returned them
    pub files: Vec<FileChange>,
}

/// A changed file that survived filtering: non-zero change count and a
/// textual patch. Binary and rename-only changes carry no patch and are
/// dropped during assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    /// Path of the file within the repository
    pub filename: String,
    /// Unified-diff patch text for this file
    pub patch: String,
}
