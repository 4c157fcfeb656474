//! GitHub REST implementation of the remote hosting boundary
//!
//! Uses a personal access token for the REST calls and the same token as
//! the push credential. The authenticated login is resolved once and
//! cached for delete calls and push credentials.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::{RemoteError, RemoteHost, RemoteRepo, Visibility};
use crate::config::RemoteConfig;
use crate::secrets::SecretString;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const USER_AGENT: &str = "fabricate";
const PAGE_SIZE: usize = 100;

pub struct GitHubClient {
    config: RemoteConfig,
    token: SecretString,
    client: reqwest::Client,
    login: OnceCell<String>,
}

/// Repository shape returned by the GitHub API
#[derive(Debug, Deserialize)]
struct ApiRepo {
    name: String,
    full_name: String,
    clone_url: String,
    private: bool,
    #[serde(default)]
    description: Option<String>,
}

impl From<ApiRepo> for RemoteRepo {
    fn from(repo: ApiRepo) -> Self {
        RemoteRepo {
            name: repo.name,
            full_name: repo.full_name,
            url: repo.clone_url,
            private: repo.private,
            description: repo.description,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

impl GitHubClient {
    pub fn new(config: RemoteConfig, token: SecretString) -> Self {
        Self {
            config,
            token,
            client: reqwest::Client::new(),
            login: OnceCell::new(),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        self.client
            .request(method, url)
            .bearer_auth(self.token.unsecure())
            .header("accept", GITHUB_ACCEPT)
            .header("user-agent", USER_AGENT)
    }

    /// Login of the token's account, fetched once
    async fn login(&self) -> Result<String, RemoteError> {
        self.login
            .get_or_try_init(|| async {
                let response = self
                    .request(reqwest::Method::GET, "/user")
                    .send()
                    .await
                    .map_err(|e| RemoteError::Network(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(error_for(response).await);
                }
                let user: ApiUser = response
                    .json()
                    .await
                    .map_err(|e| RemoteError::Api(e.to_string()))?;
                Ok(user.login)
            })
            .await
            .cloned()
    }

    /// Best-effort topic assignment; creation already succeeded, so a
    /// failure here only warns.
    async fn set_topics(&self, full_name: &str, topics: &[String]) {
        if topics.is_empty() {
            return;
        }
        let result = self
            .request(
                reqwest::Method::PUT,
                &format!("/repos/{}/topics", full_name),
            )
            .json(&json!({ "names": topics }))
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(repo = full_name, status = %response.status(), "failed to set topics");
            }
            Err(e) => warn!(repo = full_name, error = %e, "failed to set topics"),
        }
    }
}

#[async_trait]
impl RemoteHost for GitHubClient {
    fn name(&self) -> &str {
        "github"
    }

    async fn create_repository(
        &self,
        name: &str,
        description: &str,
        visibility: Visibility,
        topics: &[String],
    ) -> Result<RemoteRepo, RemoteError> {
        let response = self
            .request(reqwest::Method::POST, "/user/repos")
            .json(&json!({
                "name": name,
                "description": description,
                "private": visibility.is_private(),
                "auto_init": false,
            }))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        let repo: ApiRepo = response
            .json()
            .await
            .map_err(|e| RemoteError::Api(e.to_string()))?;
        debug!(repo = %repo.full_name, "created remote repository");

        self.set_topics(&repo.full_name, topics).await;
        Ok(repo.into())
    }

    async fn push(
        &self,
        local_dir: &Path,
        repo: &RemoteRepo,
        branch: &str,
    ) -> Result<(), RemoteError> {
        let login = self.login().await?;
        let token = self.token.unsecure().to_string();
        let url = repo.url.clone();
        let dir = local_dir.to_path_buf();
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);

        // libgit2 pushes are blocking; keep them off the async workers.
        let pushed = tokio::task::spawn_blocking(move || -> Result<(), git2::Error> {
            let repository = git2::Repository::open(&dir)?;
            let mut remote = match repository.find_remote("origin") {
                Ok(remote) => remote,
                Err(_) => repository.remote("origin", &url)?,
            };
            let mut callbacks = git2::RemoteCallbacks::new();
            callbacks.credentials(move |_url, username, _allowed| {
                git2::Cred::userpass_plaintext(username.unwrap_or(&login), &token)
            });
            let mut options = git2::PushOptions::new();
            options.remote_callbacks(callbacks);
            remote.push(&[refspec.as_str()], Some(&mut options))
        })
        .await;

        match pushed {
            Ok(Ok(())) => {
                debug!(repo = %repo.full_name, branch, "pushed repository");
                Ok(())
            }
            Ok(Err(e)) => Err(RemoteError::Push(e.to_string())),
            Err(e) => Err(RemoteError::Push(format!("push task failed: {}", e))),
        }
    }

    async fn delete_repository(&self, full_name: &str) -> Result<(), RemoteError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/repos/{}", full_name))
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(error_for(response).await);
        }
        debug!(repo = full_name, "deleted remote repository");
        Ok(())
    }

    async fn list_repositories(
        &self,
        prefix: Option<&str>,
    ) -> Result<Vec<RemoteRepo>, RemoteError> {
        let mut repos = Vec::new();
        let mut page = 1u32;
        loop {
            let response = self
                .request(reqwest::Method::GET, "/user/repos")
                .query(&[
                    ("per_page", PAGE_SIZE.to_string()),
                    ("page", page.to_string()),
                    ("affiliation", "owner".to_string()),
                ])
                .send()
                .await
                .map_err(|e| RemoteError::Network(e.to_string()))?;
            if !response.status().is_success() {
                return Err(error_for(response).await);
            }
            let batch: Vec<ApiRepo> = response
                .json()
                .await
                .map_err(|e| RemoteError::Api(e.to_string()))?;
            let batch_len = batch.len();
            repos.extend(batch.into_iter().map(RemoteRepo::from));
            if batch_len < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        if let Some(prefix) = prefix {
            repos.retain(|r| r.name.starts_with(prefix));
        }
        Ok(repos)
    }

    async fn check_health(&self) -> bool {
        self.login().await.is_ok()
    }
}

async fn error_for(response: reqwest::Response) -> RemoteError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        // GitHub reports secondary rate limits as 403 with an explanatory
        // body.
        403 if body.contains("rate limit") => RemoteError::RateLimitExceeded,
        401 | 403 => RemoteError::AuthenticationFailed(body),
        429 => RemoteError::RateLimitExceeded,
        s if s >= 500 => RemoteError::Unavailable(format!("status {}: {}", status, body)),
        _ => RemoteError::Api(format!("status {}: {}", status, body)),
    }
}
