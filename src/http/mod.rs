mod wire;

use crate::config::Config;
use crate::error::GatewayError;
use crate::models::{
    Branch, CodeHit, CombinedStatus, Comment, Commit, FileChange, FileWriteKind,
    FileWriteResult, Issue, MergeResult, PullRequest, Repository, UserHit,
};
use crate::pagination::{PageWindow, RawCollection};
use crate::schema::{CodeSearchSort, IssueSearchSort, UserSearchSort};
use crate::upstream::{
    FileWrite, IssueFilter, MergeRequest, NewIssue, NewPullRequest, NewRepository, PullFilter,
    PullUpdate, RepoRef, SearchQuery, Upstream,
};
use async_trait::async_trait;
use base64::Engine;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use wire::*;

/// Below this many remaining requests every response logs a warning.
const LOW_RATE_WATERMARK: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateMeta {
    pub remaining: Option<i64>,
    pub used: Option<i64>,
    /// Unix epoch seconds at which the budget resets.
    pub reset_epoch: Option<i64>,
}

impl RateMeta {
    pub fn reset_at(&self) -> Option<String> {
        self.reset_epoch
            .and_then(|epoch| chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0))
            .map(|t| t.to_rfc3339())
    }
}

pub fn build_client(cfg: &Config) -> anyhow::Result<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(USER_AGENT, HeaderValue::from_str(&cfg.user_agent)?);
    let client = Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()?;
    Ok(client)
}

fn auth_header(token: &str) -> anyhow::Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    value.set_sensitive(true);
    Ok(value)
}

pub fn extract_rate_from_rest(headers: &HeaderMap) -> RateMeta {
    let number = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
    };
    RateMeta {
        remaining: number("x-ratelimit-remaining"),
        used: number("x-ratelimit-used"),
        reset_epoch: number("x-ratelimit-reset"),
    }
}

/// Explicit wait requested by upstream: `Retry-After` seconds, or the time
/// left until the budget resets when it is exhausted.
pub fn retry_after_from(headers: &HeaderMap, rate: &RateMeta, now_epoch: i64) -> Option<Duration> {
    let header = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    if header.is_some() {
        return header;
    }
    match (rate.remaining, rate.reset_epoch) {
        (Some(0), Some(reset)) => Some(Duration::from_secs(reset.saturating_sub(now_epoch).max(0) as u64)),
        _ => None,
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<RawErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty());
    if let Some(m) = from_json {
        return m;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();
    }
    trimmed.chars().take(300).collect()
}

/// Classify a non-success REST response.
pub fn map_status_to_error(status: StatusCode, headers: &HeaderMap, body: &str) -> GatewayError {
    let message = error_message(status, body);
    let rate = extract_rate_from_rest(headers);
    let retry_after = retry_after_from(headers, &rate, chrono::Utc::now().timestamp());
    let rate_signalled = rate.remaining == Some(0)
        || headers.contains_key(RETRY_AFTER)
        || message.to_ascii_lowercase().contains("rate limit");
    match status {
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited {
            message,
            retry_after,
        },
        StatusCode::FORBIDDEN if rate_signalled => GatewayError::RateLimited {
            message,
            retry_after,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Permission { message },
        StatusCode::NOT_FOUND | StatusCode::GONE => GatewayError::NotFound { message },
        StatusCode::CONFLICT | StatusCode::METHOD_NOT_ALLOWED => GatewayError::Conflict { message },
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            GatewayError::TransientNetwork {
                message: format!("HTTP {}: {}", status.as_u16(), message),
            }
        }
        _ => GatewayError::Upstream {
            status: Some(status.as_u16()),
            message,
        },
    }
}

pub fn map_transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_decode() {
        return GatewayError::upstream(format!("malformed response: {}", e));
    }
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        return GatewayError::TransientNetwork {
            message: e.to_string(),
        };
    }
    GatewayError::upstream(e.to_string())
}

/// Percent-encode one URL path segment (slashes included).
pub fn encode_path_segment(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Percent-encode a repository file path, keeping its `/` separators.
pub fn encode_file_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(encode_path_segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn repo_path(repo: &RepoRef) -> String {
    format!(
        "/repos/{}/{}",
        encode_path_segment(&repo.owner),
        encode_path_segment(&repo.name)
    )
}

fn page_query(window: PageWindow) -> Vec<(&'static str, String)> {
    vec![
        ("page", window.page().to_string()),
        ("per_page", window.per_page().to_string()),
    ]
}

fn put_opt(map: &mut Map<String, Value>, key: &str, value: Option<impl Into<Value>>) {
    if let Some(v) = value {
        map.insert(key.to_string(), v.into());
    }
}

/// GitHub REST v3 implementation of [`Upstream`].
///
/// One shared `reqwest::Client`; each method performs exactly one request.
pub struct RestUpstream {
    client: Client,
    api_url: String,
    api_version: String,
    auth: Option<HeaderValue>,
}

impl RestUpstream {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let auth = cfg.token.as_deref().map(auth_header).transpose()?;
        Ok(Self {
            client: build_client(cfg)?,
            api_url: cfg.api_url.clone(),
            api_version: cfg.api_version.clone(),
            auth,
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.api_url, path);
        debug!("REST {} {}", method, url);
        let mut req = self
            .client
            .request(method.clone(), &url)
            .header("X-GitHub-Api-Version", &self.api_version)
            .header(
                ACCEPT,
                HeaderValue::from_static("application/vnd.github+json"),
            );
        if let Some(auth) = &self.auth {
            req = req.header(AUTHORIZATION, auth.clone());
        }
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(b) = body {
            req = req.json(&b);
        }

        let res = req.send().await.map_err(|e| {
            warn!("REST {} {} error sending request: {}", method, url, e);
            map_transport_error(e)
        })?;

        let status = res.status();
        let headers = res.headers().clone();
        let rate = extract_rate_from_rest(&headers);
        if let Some(remaining) = rate.remaining.filter(|r| *r < LOW_RATE_WATERMARK) {
            warn!(
                "GitHub rate limit nearly exhausted: remaining={} reset_at={}",
                remaining,
                rate.reset_at().unwrap_or_default()
            );
        }

        if status.is_success() {
            return res.json::<T>().await.map_err(map_transport_error);
        }
        let text = res.text().await.unwrap_or_default();
        debug!("REST {} {} -> {}", method, url, status);
        Err(map_status_to_error(status, &headers, &text))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        self.request(Method::GET, path, query, None).await
    }

    async fn search<R, T>(
        &self,
        kind: &str,
        q: &str,
        sort: Option<&'static str>,
        order: Option<&'static str>,
        window: PageWindow,
    ) -> Result<RawCollection<T>, GatewayError>
    where
        R: DeserializeOwned + Into<T>,
    {
        let mut query = vec![("q", q.to_string())];
        if let Some(s) = sort {
            query.push(("sort", s.to_string()));
        }
        if let Some(o) = order {
            query.push(("order", o.to_string()));
        }
        query.extend(page_query(window));
        let raw: RawSearch<R> = self.get(&format!("/search/{}", kind), &query).await?;
        Ok(RawCollection::Window {
            items: raw.items.into_iter().map(Into::into).collect(),
            total_count: Some(raw.total_count),
        })
    }
}

fn window_of<R: Into<T>, T>(raw: Vec<R>) -> RawCollection<T> {
    RawCollection::window(raw.into_iter().map(Into::into).collect())
}

#[async_trait]
impl Upstream for RestUpstream {
    async fn get_repository(&self, repo: &RepoRef) -> Result<Repository, GatewayError> {
        let raw: RawRepository = self.get(&repo_path(repo), &[]).await?;
        Ok(raw.into())
    }

    async fn create_repository(&self, repo: &NewRepository) -> Result<Repository, GatewayError> {
        let mut body = Map::new();
        body.insert("name".into(), repo.name.clone().into());
        put_opt(&mut body, "description", repo.description.clone());
        put_opt(&mut body, "private", repo.private);
        put_opt(&mut body, "auto_init", repo.auto_init);
        let raw: RawRepository = self
            .request(Method::POST, "/user/repos", &[], Some(Value::Object(body)))
            .await?;
        Ok(raw.into())
    }

    async fn create_fork(
        &self,
        repo: &RepoRef,
        organization: Option<&str>,
    ) -> Result<Repository, GatewayError> {
        let mut body = Map::new();
        put_opt(&mut body, "organization", organization);
        let raw: RawRepository = self
            .request(
                Method::POST,
                &format!("{}/forks", repo_path(repo)),
                &[],
                Some(Value::Object(body)),
            )
            .await?;
        Ok(raw.into())
    }

    async fn get_issue(&self, repo: &RepoRef, number: u64) -> Result<Issue, GatewayError> {
        let raw: RawIssue = self
            .get(&format!("{}/issues/{}", repo_path(repo), number), &[])
            .await?;
        Ok(raw.into())
    }

    async fn list_issues(
        &self,
        repo: &RepoRef,
        filter: &IssueFilter,
        window: PageWindow,
    ) -> Result<RawCollection<Issue>, GatewayError> {
        let mut query = vec![("state", filter.state.as_str().to_string())];
        if !filter.labels.is_empty() {
            query.push(("labels", filter.labels.join(",")));
        }
        if let Some(s) = filter.sort {
            query.push(("sort", s.as_str().to_string()));
        }
        if let Some(d) = filter.direction {
            query.push(("direction", d.as_str().to_string()));
        }
        if let Some(since) = &filter.since {
            query.push(("since", since.clone()));
        }
        query.extend(page_query(window));
        let raw: Vec<RawIssue> = self
            .get(&format!("{}/issues", repo_path(repo)), &query)
            .await?;
        Ok(window_of(raw))
    }

    async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<Issue, GatewayError> {
        let mut body = Map::new();
        body.insert("title".into(), issue.title.clone().into());
        put_opt(&mut body, "body", issue.body.clone());
        if !issue.assignees.is_empty() {
            body.insert("assignees".into(), issue.assignees.clone().into());
        }
        if !issue.labels.is_empty() {
            body.insert("labels".into(), issue.labels.clone().into());
        }
        put_opt(&mut body, "milestone", issue.milestone);
        let raw: RawIssue = self
            .request(
                Method::POST,
                &format!("{}/issues", repo_path(repo)),
                &[],
                Some(Value::Object(body)),
            )
            .await?;
        Ok(raw.into())
    }

    async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<Comment, GatewayError> {
        let raw: RawComment = self
            .request(
                Method::POST,
                &format!("{}/issues/{}/comments", repo_path(repo), number),
                &[],
                Some(serde_json::json!({ "body": body })),
            )
            .await?;
        Ok(raw.into())
    }

    async fn list_issue_comments(
        &self,
        repo: &RepoRef,
        number: u64,
        window: PageWindow,
    ) -> Result<RawCollection<Comment>, GatewayError> {
        let raw: Vec<RawComment> = self
            .get(
                &format!("{}/issues/{}/comments", repo_path(repo), number),
                &page_query(window),
            )
            .await?;
        Ok(window_of(raw))
    }

    async fn get_commit(&self, repo: &RepoRef, reference: &str) -> Result<Commit, GatewayError> {
        let raw: RawCommit = self
            .get(
                &format!("{}/commits/{}", repo_path(repo), encode_path_segment(reference)),
                &[],
            )
            .await?;
        Ok(raw.into())
    }

    async fn list_commits(
        &self,
        repo: &RepoRef,
        sha: Option<&str>,
        window: PageWindow,
    ) -> Result<RawCollection<Commit>, GatewayError> {
        let mut query = Vec::new();
        if let Some(s) = sha {
            query.push(("sha", s.to_string()));
        }
        query.extend(page_query(window));
        let raw: Vec<RawCommit> = self
            .get(&format!("{}/commits", repo_path(repo)), &query)
            .await?;
        Ok(window_of(raw))
    }

    async fn get_combined_status(
        &self,
        repo: &RepoRef,
        reference: &str,
    ) -> Result<CombinedStatus, GatewayError> {
        let raw: RawCombinedStatus = self
            .get(
                &format!(
                    "{}/commits/{}/status",
                    repo_path(repo),
                    encode_path_segment(reference)
                ),
                &[],
            )
            .await?;
        Ok(raw.into())
    }

    async fn get_branch(&self, repo: &RepoRef, name: &str) -> Result<Branch, GatewayError> {
        let raw: RawBranch = self
            .get(
                &format!("{}/branches/{}", repo_path(repo), encode_path_segment(name)),
                &[],
            )
            .await?;
        Ok(raw.into())
    }

    async fn list_branches(
        &self,
        repo: &RepoRef,
        window: PageWindow,
    ) -> Result<RawCollection<Branch>, GatewayError> {
        let raw: Vec<RawBranch> = self
            .get(&format!("{}/branches", repo_path(repo)), &page_query(window))
            .await?;
        Ok(window_of(raw))
    }

    async fn put_file(
        &self,
        repo: &RepoRef,
        write: &FileWrite,
    ) -> Result<FileWriteResult, GatewayError> {
        let mut body = Map::new();
        body.insert("message".into(), write.message.clone().into());
        body.insert(
            "content".into(),
            base64::engine::general_purpose::STANDARD
                .encode(write.content.as_bytes())
                .into(),
        );
        body.insert("branch".into(), write.branch.clone().into());
        put_opt(&mut body, "sha", write.sha.clone());
        let raw: RawContentWrite = self
            .request(
                Method::PUT,
                &format!("{}/contents/{}", repo_path(repo), encode_file_path(&write.path)),
                &[],
                Some(Value::Object(body)),
            )
            .await?;
        Ok(FileWriteResult {
            operation: if write.sha.is_some() {
                FileWriteKind::Updated
            } else {
                FileWriteKind::Created
            },
            path: raw.content.path,
            content_sha: raw.content.sha,
            commit_sha: raw.commit.sha,
            html_url: raw.content.html_url,
        })
    }

    async fn get_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<PullRequest, GatewayError> {
        let raw: RawPullRequest = self
            .get(&format!("{}/pulls/{}", repo_path(repo), number), &[])
            .await?;
        Ok(raw.into())
    }

    async fn create_pull_request(
        &self,
        repo: &RepoRef,
        pull: &NewPullRequest,
    ) -> Result<PullRequest, GatewayError> {
        let mut body = Map::new();
        body.insert("title".into(), pull.title.clone().into());
        body.insert("head".into(), pull.head.clone().into());
        body.insert("base".into(), pull.base.clone().into());
        put_opt(&mut body, "body", pull.body.clone());
        body.insert("draft".into(), pull.draft.into());
        body.insert(
            "maintainer_can_modify".into(),
            pull.maintainer_can_modify.into(),
        );
        let raw: RawPullRequest = self
            .request(
                Method::POST,
                &format!("{}/pulls", repo_path(repo)),
                &[],
                Some(Value::Object(body)),
            )
            .await?;
        Ok(raw.into())
    }

    async fn update_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
        update: &PullUpdate,
    ) -> Result<PullRequest, GatewayError> {
        let mut body = Map::new();
        put_opt(&mut body, "title", update.title.clone());
        put_opt(&mut body, "body", update.body.clone());
        put_opt(&mut body, "state", update.state.map(|s| s.as_str()));
        put_opt(&mut body, "base", update.base.clone());
        put_opt(&mut body, "maintainer_can_modify", update.maintainer_can_modify);
        let raw: RawPullRequest = self
            .request(
                Method::PATCH,
                &format!("{}/pulls/{}", repo_path(repo), number),
                &[],
                Some(Value::Object(body)),
            )
            .await?;
        Ok(raw.into())
    }

    async fn list_pull_requests(
        &self,
        repo: &RepoRef,
        filter: &PullFilter,
        window: PageWindow,
    ) -> Result<RawCollection<PullRequest>, GatewayError> {
        let mut query = vec![
            ("state", filter.state.as_str().to_string()),
            ("sort", filter.sort.as_str().to_string()),
            ("direction", filter.direction.as_str().to_string()),
        ];
        if let Some(h) = &filter.head {
            query.push(("head", h.clone()));
        }
        if let Some(b) = &filter.base {
            query.push(("base", b.clone()));
        }
        query.extend(page_query(window));
        let raw: Vec<RawPullRequest> = self
            .get(&format!("{}/pulls", repo_path(repo)), &query)
            .await?;
        Ok(window_of(raw))
    }

    async fn merge_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
        merge: &MergeRequest,
    ) -> Result<MergeResult, GatewayError> {
        let mut body = Map::new();
        body.insert("merge_method".into(), merge.merge_method.as_str().into());
        put_opt(&mut body, "commit_title", merge.commit_title.clone());
        put_opt(&mut body, "commit_message", merge.commit_message.clone());
        let raw: RawMerge = self
            .request(
                Method::PUT,
                &format!("{}/pulls/{}/merge", repo_path(repo), number),
                &[],
                Some(Value::Object(body)),
            )
            .await?;
        Ok(raw.into())
    }

    async fn list_pull_request_files(
        &self,
        repo: &RepoRef,
        number: u64,
        window: PageWindow,
    ) -> Result<RawCollection<FileChange>, GatewayError> {
        let raw: Vec<RawFile> = self
            .get(
                &format!("{}/pulls/{}/files", repo_path(repo), number),
                &page_query(window),
            )
            .await?;
        Ok(window_of(raw))
    }

    async fn search_issues(
        &self,
        query: &SearchQuery<IssueSearchSort>,
        window: PageWindow,
    ) -> Result<RawCollection<Issue>, GatewayError> {
        self.search::<RawIssue, Issue>(
            "issues",
            &query.q,
            query.sort.map(|s| s.as_str()),
            query.order.map(|o| o.as_str()),
            window,
        )
        .await
    }

    async fn search_repositories(
        &self,
        query: &SearchQuery<()>,
        window: PageWindow,
    ) -> Result<RawCollection<Repository>, GatewayError> {
        self.search::<RawRepository, Repository>(
            "repositories",
            &query.q,
            None,
            query.order.map(|o| o.as_str()),
            window,
        )
        .await
    }

    async fn search_code(
        &self,
        query: &SearchQuery<CodeSearchSort>,
        window: PageWindow,
    ) -> Result<RawCollection<CodeHit>, GatewayError> {
        self.search::<RawCodeHit, CodeHit>(
            "code",
            &query.q,
            query.sort.map(|s| s.as_str()),
            query.order.map(|o| o.as_str()),
            window,
        )
        .await
    }

    async fn search_users(
        &self,
        query: &SearchQuery<UserSearchSort>,
        window: PageWindow,
    ) -> Result<RawCollection<UserHit>, GatewayError> {
        self.search::<RawUserHit, UserHit>(
            "users",
            &query.q,
            query.sort.map(|s| s.as_str()),
            query.order.map(|o| o.as_str()),
            window,
        )
        .await
    }
}
