//! Public GitHub REST payload types (subset used by the pipeline).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pull request metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    pub html_url: String,
    pub head: GitRef,
    pub base: GitRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One side of a pull request (head or base).
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    #[serde(rename = "ref")]
    pub r#ref: String,
    pub sha: String,
}

/// One changed file of a pull request, as returned by the list-files
/// endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrFile {
    pub filename: String,
    pub status: String,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
    #[serde(default)]
    pub changes: u32,
    #[serde(default)]
    pub patch: Option<String>,
    #[serde(default)]
    pub previous_filename: Option<String>,
}

/// One file to write in a commit.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub path: String,
    pub content: String,
}

/// Inputs for a tree-API commit of several files at once.
#[derive(Debug, Clone)]
pub struct CommitFilesRequest {
    /// Branch whose head ref will be advanced.
    pub branch: String,
    /// Commit the new tree is based on and parented to.
    pub base_sha: String,
    pub message: String,
    pub files: Vec<NewFile>,
}

/// Core rate-limit snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub remaining: u64,
    /// Unix timestamp at which the window resets.
    pub reset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pull_request_deserializes_from_rest_payload() {
        let raw = r#"{
            "number": 42,
            "title": "Add totals",
            "body": null,
            "state": "open",
            "html_url": "https://github.com/acme/shop/pull/42",
            "head": { "ref": "feature/totals", "sha": "abc123" },
            "base": { "ref": "main", "sha": "def456" },
            "created_at": "2026-08-01T10:00:00Z",
            "updated_at": "2026-08-02T11:30:00Z"
        }"#;

        let pr: PullRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(pr.number, 42);
        assert_eq!(pr.head.r#ref, "feature/totals");
        assert_eq!(pr.base.sha, "def456");
        assert!(pr.body.is_none());
    }

    #[test]
    fn pr_file_tolerates_missing_patch_and_rename_fields() {
        let raw = r#"{ "filename": "assets/logo.png", "status": "added" }"#;
        let file: PrFile = serde_json::from_str(raw).unwrap();
        assert_eq!(file.filename, "assets/logo.png");
        assert!(file.patch.is_none());
        assert!(file.previous_filename.is_none());
        assert_eq!(file.additions, 0);
    }
}
