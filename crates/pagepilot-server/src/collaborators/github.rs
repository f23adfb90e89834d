use super::{COLLABORATOR_TIMEOUT, error_message};
use crate::config::GithubSettings;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use pagepilot_agent::{FileChange, FileCommit, RepositoryEditor, ToolError};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tracing::info;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const SERVICE: &str = "github";
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";

/// Commits single-file changes through the repository contents API.
#[derive(Clone)]
pub struct GithubRepositoryEditor {
    http: reqwest::Client,
    base_url: String,
    token: String,
    owner: String,
    repo: String,
    default_branch: String,
}

impl fmt::Debug for GithubRepositoryEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubRepositoryEditor")
            .field("base_url", &self.base_url)
            .field("repository", &format!("{}/{}", self.owner, self.repo))
            .field("default_branch", &self.default_branch)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ExistingFile {
    sha: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    content: CommittedContent,
    commit: CommitInfo,
}

#[derive(Deserialize)]
struct CommittedContent {
    path: String,
}

#[derive(Deserialize)]
struct CommitInfo {
    sha: String,
}

impl GithubRepositoryEditor {
    pub fn new(settings: &GithubSettings, base_url: Option<String>) -> Result<Self, ToolError> {
        let Some((owner, repo)) = settings.repository.split_once('/') else {
            return Err(ToolError::collaborator(
                SERVICE,
                format!("repository '{}' is not owner/name", settings.repository),
            ));
        };
        let http = reqwest::Client::builder()
            .timeout(COLLABORATOR_TIMEOUT)
            .build()
            .map_err(|error| ToolError::collaborator(SERVICE, error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            token: settings.token.clone(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            default_branch: settings.branch.clone(),
        })
    }

    fn contents_url(&self, path: &str) -> Result<Url, ToolError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| ToolError::collaborator(SERVICE, format!("bad API URL: {error}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ToolError::collaborator(SERVICE, "API URL cannot carry a path"))?;
            segments.pop_if_empty().extend([
                "repos",
                self.owner.as_str(),
                self.repo.as_str(),
                "contents",
            ]);
            segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
        }
        Ok(url)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header(USER_AGENT, "pagepilot")
            .header(ACCEPT, "application/vnd.github+json")
            .header(API_VERSION_HEADER, API_VERSION)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ToolError> {
        self.request(builder)
            .send()
            .await
            .map_err(|error| ToolError::collaborator(SERVICE, error.without_url().to_string()))
    }

    async fn current_sha(&self, url: &Url, branch: &str) -> Result<Option<String>, ToolError> {
        let response = self
            .send(self.http.get(url.clone()).query(&[("ref", branch)]))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let existing: ExistingFile = response.json().await.map_err(|error| {
                    ToolError::collaborator(SERVICE, error.without_url().to_string())
                })?;
                Ok(Some(existing.sha))
            }
            status => Err(failure(status, response).await),
        }
    }
}

async fn failure(status: StatusCode, response: Response) -> ToolError {
    let body = response.text().await.unwrap_or_default();
    ToolError::collaborator(
        SERVICE,
        error_message(&body, &format!("HTTP {}", status.as_u16())),
    )
}

#[async_trait]
impl RepositoryEditor for GithubRepositoryEditor {
    async fn commit_file(&self, change: FileChange) -> Result<FileCommit, ToolError> {
        let branch = change
            .branch
            .unwrap_or_else(|| self.default_branch.clone());
        let url = self.contents_url(&change.path)?;
        let sha = self.current_sha(&url, &branch).await?;

        let mut body = json!({
            "message": change.commit_message,
            "content": STANDARD.encode(change.content.as_bytes()),
            "branch": branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        let response = self.send(self.http.put(url).json(&body)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(failure(status, response).await);
        }
        let committed: CommitResponse = response
            .json()
            .await
            .map_err(|error| ToolError::collaborator(SERVICE, error.without_url().to_string()))?;
        info!(
            path = %committed.content.path,
            branch = %branch,
            commit = %committed.commit.sha,
            "committed repository file"
        );
        Ok(FileCommit {
            path: committed.content.path,
            branch,
            commit_sha: committed.commit.sha,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> GithubRepositoryEditor {
        GithubRepositoryEditor::new(
            &GithubSettings {
                token: "ghp_test".to_string(),
                repository: "acme/site".to_string(),
                branch: "main".to_string(),
            },
            Some("https://github.example/api/v3/".to_string()),
        )
        .expect("editor builds")
    }

    #[test]
    fn contents_url_encodes_each_path_segment() {
        let url = editor()
            .contents_url("docs/release notes.md")
            .expect("url builds");
        assert_eq!(
            url.as_str(),
            "https://github.example/api/v3/repos/acme/site/contents/docs/release%20notes.md"
        );
    }

    #[test]
    fn debug_output_hides_token() {
        assert!(!format!("{:?}", editor()).contains("ghp_test"));
    }
}
