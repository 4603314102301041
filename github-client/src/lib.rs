//! GitHub REST v3 client for the test-generation pipeline.
//!
//! Endpoints used (as of 2026):
//!   * GET   /repos/{owner}/{repo}/pulls/{number}
//!   * GET   /repos/{owner}/{repo}/pulls/{number}/files
//!   * GET   /repos/{owner}/{repo}/contents/{path}?ref={ref}
//!   * GET   /repos/{owner}/{repo}/commits/{ref}
//!   * POST  /repos/{owner}/{repo}/git/blobs | trees | commits | refs
//!   * PATCH /repos/{owner}/{repo}/git/refs/heads/{branch}
//!   * POST  /repos/{owner}/{repo}/pulls
//!   * POST  /repos/{owner}/{repo}/issues/{number}/comments
//!   * GET   /rate_limit
//!
//! Every remote call goes through an exponential-backoff retry wrapper that
//! re-issues only rate-limit (429) and server (5xx) failures.

pub mod errors;
pub mod types;

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::errors::{GithubClientError, GithubClientResult, GithubProviderError};
use crate::types::{CommitFilesRequest, PrFile, PullRequest, RateLimit};

const DEFAULT_BASE_API: &str = "https://api.github.com";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const USER_AGENT: &str = concat!("testgen-backend/", env!("CARGO_PKG_VERSION"));

/// GitHub HTTP client wrapper bound to one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String,
    token: String, // full header value: "Bearer <token>"
    owner: String,
    repo: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl GitHubClient {
    /// Constructs a client for `owner/repo` with its own HTTP instance.
    pub fn new(token: &str, owner: &str, repo: &str) -> GithubClientResult<Self> {
        if owner.trim().is_empty() || repo.trim().is_empty() {
            return Err(GithubClientError::Validation(
                "owner and repo must be non-empty".to_string(),
            ));
        }
        debug!(owner, repo, "creating GitHubClient");

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_api: DEFAULT_BASE_API.to_string(),
            token: format!("Bearer {token}"),
            owner: owner.to_string(),
            repo: repo.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Overrides the API root, for GitHub Enterprise installations.
    pub fn with_base_api(mut self, base_api: impl Into<String>) -> Self {
        self.base_api = base_api.into();
        self
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.base_api, self.owner, self.repo, path
        )
    }

    /// Retry wrapper with exponential backoff.
    ///
    /// Attempt `n` (zero-based) sleeps `retry_delay * 2^n` before the next
    /// try. Non-retryable errors propagate immediately.
    async fn with_retry<T>(
        &self,
        operation: &str,
        f: impl AsyncFn() -> GithubClientResult<T>,
    ) -> GithubClientResult<T> {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    let delay = self.retry_delay * 2u32.pow(attempt);
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_retryable() {
                        error!(
                            operation,
                            retries = self.max_retries,
                            error = %err,
                            "operation failed after retries"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Fetches pull request metadata.
    pub async fn get_pull_request(&self, number: u64) -> GithubClientResult<PullRequest> {
        self.with_retry("get_pull_request", async || {
            let url = self.repo_url(&format!("pulls/{number}"));
            debug!(%url, "fetching pull request");

            let pr: PullRequest = self
                .http
                .get(&url)
                .header("Authorization", &self.token)
                .header("Accept", "application/vnd.github+json")
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok(pr)
        })
        .await
    }

    /// Lists all changed files of a pull request, unified diffs included.
    pub async fn list_pull_request_files(&self, number: u64) -> GithubClientResult<Vec<PrFile>> {
        self.with_retry("list_pull_request_files", async || {
            let url = self.repo_url(&format!("pulls/{number}/files?per_page=100"));
            debug!(%url, "fetching pull request files");

            // NOTE: ignores pagination beyond 100 files; can be extended later.
            let files: Vec<PrFile> = self
                .http
                .get(&url)
                .header("Authorization", &self.token)
                .header("Accept", "application/vnd.github+json")
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok(files)
        })
        .await
    }

    /// Fetches decoded file content at a specific ref.
    ///
    /// Uses the raw media type, so the provider sends plain text and no
    /// base64 round trip is needed.
    pub async fn get_file_contents(&self, git_ref: &str, path: &str) -> GithubClientResult<String> {
        self.with_retry("get_file_contents", async || {
            let url = self.repo_url(&format!("contents/{path}"));
            debug!(%url, git_ref, "fetching file contents");

            let resp = self
                .http
                .get(&url)
                .query(&[("ref", git_ref)])
                .header("Authorization", &self.token)
                .header("Accept", "application/vnd.github.v3.raw")
                .send()
                .await?
                .error_for_status()?;

            // Directories ignore the raw media type and come back as JSON.
            let is_json = resp
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.contains("application/json"));
            if is_json {
                return Err(GithubProviderError::InvalidResponse(format!(
                    "{path} is not a file"
                ))
                .into());
            }

            Ok(resp.text().await?)
        })
        .await
    }

    /// Checks whether a file exists at a specific ref. A 404 is a regular
    /// `false`, not an error.
    pub async fn file_exists(&self, git_ref: &str, path: &str) -> GithubClientResult<bool> {
        self.with_retry("file_exists", async || {
            let url = self.repo_url(&format!("contents/{path}"));

            let resp = self
                .http
                .get(&url)
                .query(&[("ref", git_ref)])
                .header("Authorization", &self.token)
                .header("Accept", "application/vnd.github+json")
                .send()
                .await?;

            if resp.status().as_u16() == 404 {
                return Ok(false);
            }
            resp.error_for_status()?;
            Ok(true)
        })
        .await
    }

    /// Commits multiple files in a single commit via the git data API:
    /// base commit -> blobs -> tree -> commit -> ref update.
    pub async fn commit_files(&self, req: &CommitFilesRequest) -> GithubClientResult<String> {
        self.with_retry("commit_files", async || {
            debug!(
                branch = %req.branch,
                files = req.files.len(),
                "committing files"
            );

            let base: CommitResponse = self
                .get_json(&self.repo_url(&format!("commits/{}", req.base_sha)))
                .await?;
            let base_tree_sha = base.commit.tree.sha;

            let mut tree_items = Vec::with_capacity(req.files.len());
            for file in &req.files {
                let blob: ShaObject = self
                    .post_json(
                        &self.repo_url("git/blobs"),
                        &BlobCreate {
                            content: &file.content,
                            encoding: "utf-8",
                        },
                    )
                    .await?;
                tree_items.push(TreeItem {
                    path: &file.path,
                    mode: "100644",
                    r#type: "blob",
                    sha: blob.sha,
                });
            }

            let tree: ShaObject = self
                .post_json(
                    &self.repo_url("git/trees"),
                    &TreeCreate {
                        base_tree: &base_tree_sha,
                        tree: tree_items,
                    },
                )
                .await?;

            let commit: ShaObject = self
                .post_json(
                    &self.repo_url("git/commits"),
                    &CommitCreate {
                        message: &req.message,
                        tree: &tree.sha,
                        parents: vec![&req.base_sha],
                    },
                )
                .await?;

            let url = self.repo_url(&format!("git/refs/heads/{}", req.branch));
            self.http
                .patch(&url)
                .header("Authorization", &self.token)
                .header("Accept", "application/vnd.github+json")
                .json(&RefUpdate { sha: &commit.sha })
                .send()
                .await?
                .error_for_status()?;

            Ok(commit.sha)
        })
        .await
    }

    /// Creates a branch at the current head of `base_ref` and returns the
    /// sha it points to.
    pub async fn create_branch(
        &self,
        branch_name: &str,
        base_ref: &str,
    ) -> GithubClientResult<String> {
        self.with_retry("create_branch", async || {
            debug!(branch_name, base_ref, "creating branch");

            let qualified = if base_ref.starts_with("refs/") {
                base_ref.trim_start_matches("refs/").to_string()
            } else {
                format!("heads/{base_ref}")
            };
            let base: RefObject = self
                .get_json(&self.repo_url(&format!("git/ref/{qualified}")))
                .await?;

            let _: ShaObject = self
                .post_json(
                    &self.repo_url("git/refs"),
                    &RefCreate {
                        r#ref: &format!("refs/heads/{branch_name}"),
                        sha: &base.object.sha,
                    },
                )
                .await?;
            Ok(base.object.sha)
        })
        .await
    }

    /// Opens a pull request from `head` into `base`.
    pub async fn create_pull_request(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> GithubClientResult<PullRequest> {
        self.with_retry("create_pull_request", async || {
            debug!(head, base, "creating pull request");
            self.post_json(
                &self.repo_url("pulls"),
                &PullCreate {
                    title,
                    body,
                    head,
                    base,
                },
            )
            .await
        })
        .await
    }

    /// Posts a plain issue comment on a pull request.
    pub async fn comment_pr(&self, number: u64, body: &str) -> GithubClientResult<()> {
        self.with_retry("comment_pr", async || {
            debug!(number, "posting pull request comment");
            let url = self.repo_url(&format!("issues/{number}/comments"));
            self.http
                .post(&url)
                .header("Authorization", &self.token)
                .header("Accept", "application/vnd.github+json")
                .json(&IssueCommentCreate { body })
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        })
        .await
    }

    /// Current core rate-limit snapshot. Not retried: it is itself the
    /// signal consulted when budgeting calls.
    pub async fn get_rate_limit(&self) -> GithubClientResult<RateLimit> {
        let url = format!("{}/rate_limit", self.base_api);
        let resp: RateLimitResponse = self.get_json(&url).await?;
        Ok(RateLimit {
            remaining: resp.rate.remaining,
            reset: resp.rate.reset,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> GithubClientResult<T> {
        let value = self
            .http
            .get(url)
            .header("Authorization", &self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(value)
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        payload: &impl Serialize,
    ) -> GithubClientResult<T> {
        let value = self
            .http
            .post(url)
            .header("Authorization", &self.token)
            .header("Accept", "application/vnd.github+json")
            .json(payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(value)
    }
}

/// Splits "owner/repo" into components or returns a validation error.
pub fn split_owner_repo(slug: &str) -> GithubClientResult<(String, String)> {
    let mut parts = slug.split('/');
    let owner = parts.next().unwrap_or("").trim();
    let repo = parts.next().unwrap_or("").trim();

    if owner.is_empty() || repo.is_empty() || parts.next().is_some() {
        return Err(GithubClientError::Validation(format!(
            "invalid repository slug '{slug}', expected 'owner/repo'"
        )));
    }

    Ok((owner.to_string(), repo.to_string()))
}

/// Commit lookup response (subset).
#[derive(Debug, Deserialize)]
struct CommitResponse {
    commit: CommitInner,
}

#[derive(Debug, Deserialize)]
struct CommitInner {
    tree: ShaObject,
}

#[derive(Debug, Deserialize)]
struct ShaObject {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    object: ShaObject,
}

#[derive(Debug, Serialize)]
struct BlobCreate<'a> {
    content: &'a str,
    encoding: &'a str,
}

#[derive(Debug, Serialize)]
struct TreeItem<'a> {
    path: &'a str,
    mode: &'a str,
    r#type: &'a str,
    sha: String,
}

#[derive(Debug, Serialize)]
struct TreeCreate<'a> {
    base_tree: &'a str,
    tree: Vec<TreeItem<'a>>,
}

#[derive(Debug, Serialize)]
struct CommitCreate<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct RefUpdate<'a> {
    sha: &'a str,
}

#[derive(Debug, Serialize)]
struct RefCreate<'a> {
    r#ref: &'a str,
    sha: &'a str,
}

#[derive(Debug, Serialize)]
struct PullCreate<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Debug, Serialize)]
struct IssueCommentCreate<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    rate: RateInner,
}

#[derive(Debug, Deserialize)]
struct RateInner {
    remaining: u64,
    reset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_owner_repo_accepts_two_segments_only() {
        assert_eq!(
            split_owner_repo("acme/shop").unwrap(),
            ("acme".to_string(), "shop".to_string())
        );
        assert!(split_owner_repo("acme").is_err());
        assert!(split_owner_repo("acme/shop/extra").is_err());
        assert!(split_owner_repo("/shop").is_err());
    }

    #[test]
    fn tree_item_serializes_with_literal_type_key() {
        let item = TreeItem {
            path: "src/__tests__/utils.test.ts",
            mode: "100644",
            r#type: "blob",
            sha: "abc".to_string(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "blob");
        assert_eq!(json["mode"], "100644");
    }
}
