//! End-to-end pipeline: pull request -> test targets -> generated tests ->
//! commit / PR / comment.

use thiserror::Error;
use tracing::{info, warn};

use github_client::errors::{GithubClientError, GithubProviderError};
use github_client::types::{CommitFilesRequest, NewFile, PrFile};
use github_client::GitHubClient;
use llm_testgen_service::prompts::test_generation::TestGenerationContext;
use llm_testgen_service::{LlmModelConfig, LlmTestgenError, TestGenerator};
use test_target_engine::errors::CapabilityError;
use test_target_engine::{
    ChangedFile, ExtractorConfig, RepoFiles, TestTarget, extract_test_targets, locate,
};

use crate::config::{CommitStrategy, ConfigError, TestgenConfig, TestLocation};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    GitHub(#[from] GithubClientError),

    #[error(transparent)]
    Engine(#[from] test_target_engine::Error),

    #[error(transparent)]
    Llm(#[from] LlmTestgenError),

    #[error("missing GitHub token: pass --token or set GITHUB_TOKEN")]
    MissingToken,
}

/// What one pipeline run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub targets_found: usize,
    pub tests_generated: usize,
    pub files_committed: usize,
    pub commit_sha: Option<String>,
    pub created_pr: Option<u64>,
}

/// Adapter exposing the GitHub client as the engine's repository
/// capability.
struct GitHubFiles<'a> {
    client: &'a GitHubClient,
}

impl RepoFiles for GitHubFiles<'_> {
    async fn fetch_content(&self, git_ref: &str, path: &str) -> Result<String, CapabilityError> {
        self.client
            .get_file_contents(git_ref, path)
            .await
            .map_err(|err| match err {
                GithubClientError::Provider(GithubProviderError::NotFound) => {
                    CapabilityError::NotFound(path.to_string())
                }
                other => CapabilityError::Transport(other.to_string()),
            })
    }

    async fn file_exists(&self, git_ref: &str, path: &str) -> Result<bool, CapabilityError> {
        self.client
            .file_exists(git_ref, path)
            .await
            .map_err(|err| CapabilityError::Transport(err.to_string()))
    }
}

/// Runs the whole pipeline for one pull request.
pub async fn run(
    owner: &str,
    repo: &str,
    pr_number: u64,
    token_override: Option<&str>,
    config: &TestgenConfig,
) -> Result<RunSummary, PipelineError> {
    let token = token_override
        .map(str::to_string)
        .or_else(|| config.github_token.clone())
        .ok_or(PipelineError::MissingToken)?;
    let client = GitHubClient::new(&token, owner, repo)?;

    let pr = client.get_pull_request(pr_number).await?;
    let head_ref = pr.head.r#ref.clone();
    info!(
        pr = pr_number,
        head = %head_ref,
        title = %pr.title,
        "analyzing pull request"
    );

    let pr_files = client.list_pull_request_files(pr_number).await?;
    let changed: Vec<ChangedFile> = pr_files.iter().map(to_changed_file).collect();

    let extractor_config = ExtractorConfig {
        include_patterns: config.include_patterns.clone(),
        exclude_patterns: config.exclude_patterns.clone(),
        test_directory: config.test_directory.clone(),
    };
    let store = GitHubFiles { client: &client };
    let mut targets = extract_test_targets(&store, &head_ref, &changed, &extractor_config).await?;

    if targets.len() > config.max_tests_per_pr {
        warn!(
            found = targets.len(),
            cap = config.max_tests_per_pr,
            "capping targets for this pull request"
        );
        targets.truncate(config.max_tests_per_pr);
    }

    let mut summary = RunSummary {
        targets_found: targets.len(),
        ..RunSummary::default()
    };
    if targets.is_empty() {
        info!("no test targets found, nothing to do");
        return Ok(summary);
    }

    let mut model_cfg =
        LlmModelConfig::for_provider(config.provider_or_default(), config.api_key.clone());
    if let Some(model) = &config.model {
        model_cfg.model = model.clone();
    }
    model_cfg.max_tokens = config.max_tokens;
    model_cfg.temperature = config.temperature;
    let generator = TestGenerator::new(model_cfg, config.max_fix_attempts)?
        .with_fix_temperature(config.fix_temperature);

    // path -> content; two targets from the same source file share one
    // output file, their suites concatenated
    let mut outputs: Vec<NewFile> = Vec::new();
    for target in &targets {
        let existing_content = match &target.existing_test_file {
            Some(path) => match client.get_file_contents(&head_ref, path).await {
                Ok(content) => Some(content),
                Err(err) => {
                    warn!(test_file = %path, error = %err, "could not fetch existing test file");
                    None
                }
            },
            None => None,
        };

        let ctx = TestGenerationContext {
            target,
            framework: config.framework,
            existing_test_content: existing_content.as_deref(),
            related_functions: &[],
        };
        let generated = match generator.generate_test(&ctx).await {
            Ok(generated) => generated,
            Err(err) => {
                warn!(
                    function = %target.function_name,
                    error = %err,
                    "skipping target after generation failure"
                );
                continue;
            }
        };

        let path = output_path(target, config);
        match outputs.iter_mut().find(|f| f.path == path) {
            Some(existing) => {
                existing.content.push_str("\n\n");
                existing.content.push_str(&generated.test_code);
            }
            None => outputs.push(NewFile {
                path,
                content: generated.test_code,
            }),
        }
        summary.tests_generated += 1;
    }

    if outputs.is_empty() {
        warn!("no tests could be generated");
        return Ok(summary);
    }
    summary.files_committed = outputs.len();

    if config.enable_auto_commit {
        let message = format!(
            "test: add generated tests for PR #{pr_number}\n\n\
             Covers {} function(s) across {} file(s).",
            summary.tests_generated,
            outputs.len()
        );

        match config.commit_strategy {
            CommitStrategy::Direct => {
                let sha = client
                    .commit_files(&CommitFilesRequest {
                        branch: head_ref.clone(),
                        base_sha: pr.head.sha.clone(),
                        message,
                        files: outputs,
                    })
                    .await?;
                info!(%sha, branch = %head_ref, "committed generated tests");
                summary.commit_sha = Some(sha);
            }
            CommitStrategy::BranchPr => {
                let branch = format!("testgen/pr-{pr_number}");
                let base_sha = client.create_branch(&branch, &head_ref).await?;
                let sha = client
                    .commit_files(&CommitFilesRequest {
                        branch: branch.clone(),
                        base_sha,
                        message,
                        files: outputs,
                    })
                    .await?;
                let title = format!("Generated tests for #{pr_number}");
                let body = format!(
                    "Unit tests generated for the functions changed in #{pr_number}."
                );
                let new_pr = client
                    .create_pull_request(&title, &body, &branch, &head_ref)
                    .await?;
                info!(%sha, branch = %branch, pr = new_pr.number, "opened test PR");
                summary.commit_sha = Some(sha);
                summary.created_pr = Some(new_pr.number);
            }
        }
    }

    if config.enable_pr_comments {
        let body = comment_body(&summary, &targets);
        if let Err(err) = client.comment_pr(pr_number, &body).await {
            warn!(error = %err, "failed to post summary comment");
        }
    }

    Ok(summary)
}

fn to_changed_file(file: &PrFile) -> ChangedFile {
    ChangedFile {
        filename: file.filename.clone(),
        status: file.status.clone(),
        additions: file.additions,
        deletions: file.deletions,
        patch: file.patch.clone(),
        previous_filename: file.previous_filename.clone(),
    }
}

/// Output path for a target's generated tests: the discovered existing
/// test file when there is one, otherwise a derived path honoring the
/// configured location and directory.
fn output_path(target: &TestTarget, config: &TestgenConfig) -> String {
    if let Some(existing) = &target.existing_test_file {
        return existing.clone();
    }

    let source = &target.file_path;
    let base = locate::base_name(source);
    let suffix = match locate::extension_class(source) {
        "tsx" => ".test.tsx",
        "jsx" => ".test.jsx",
        "ts" => ".test.ts",
        _ => ".test.js",
    };

    match config.test_location {
        TestLocation::CoLocated => {
            let dir = source.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
            if dir.is_empty() {
                format!("{base}{suffix}")
            } else {
                format!("{dir}/{base}{suffix}")
            }
        }
        TestLocation::Separate => format!("{}/{base}{suffix}", config.test_directory),
    }
}

fn comment_body(summary: &RunSummary, targets: &[TestTarget]) -> String {
    let mut body = format!(
        "## Generated tests\n\n\
         Found **{}** changed function(s), generated tests for **{}**.\n",
        summary.targets_found, summary.tests_generated
    );
    for target in targets {
        body.push_str(&format!(
            "- `{}` ({}) in `{}`\n",
            target.function_name, target.function_type, target.file_path
        ));
    }
    if let Some(sha) = &summary.commit_sha {
        body.push_str(&format!("\nCommitted as `{sha}`."));
    }
    if let Some(pr) = summary.created_pr {
        body.push_str(&format!(" See #{pr}."));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_target_engine::FunctionKind;

    fn target(file_path: &str, existing: Option<&str>) -> TestTarget {
        TestTarget {
            file_path: file_path.to_string(),
            function_name: "f".to_string(),
            function_type: FunctionKind::Function,
            start_line: 1,
            end_line: 3,
            code: String::new(),
            context: String::new(),
            existing_test_file: existing.map(str::to_string),
            changed_ranges: Vec::new(),
        }
    }

    #[test]
    fn existing_test_file_wins_over_derivation() {
        let cfg = TestgenConfig::default();
        let t = target("src/utils.ts", Some("src/__tests__/utils.test.ts"));
        assert_eq!(output_path(&t, &cfg), "src/__tests__/utils.test.ts");
    }

    #[test]
    fn separate_location_places_tests_under_the_test_directory() {
        let cfg = TestgenConfig::default();
        let t = target("src/nested/view.tsx", None);
        assert_eq!(output_path(&t, &cfg), "__tests__/view.test.tsx");
    }

    #[test]
    fn co_located_tests_sit_next_to_the_source() {
        let cfg = TestgenConfig {
            test_location: TestLocation::CoLocated,
            ..TestgenConfig::default()
        };
        assert_eq!(
            output_path(&target("src/utils.ts", None), &cfg),
            "src/utils.test.ts"
        );
        assert_eq!(output_path(&target("root.js", None), &cfg), "root.test.js");
    }
}
