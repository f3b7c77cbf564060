// GitHub REST response shapes. Only the fields we render are decoded; the
// rest of each payload is dropped here so library-internal data never
// reaches the envelope.

use crate::models::{
    Branch, CodeHit, CombinedStatus, Comment, Commit, CommitStats, FileChange, GitRef, Issue,
    MergeResult, PullRequest, Repository, StatusCheck, UserHit,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RawUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct RawLabel {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawRepository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: RawUser,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
    pub description: Option<String>,
    pub html_url: String,
    #[serde(default)]
    pub clone_url: String,
    #[serde(default)]
    pub default_branch: String,
    #[serde(default)]
    pub stargazers_count: u64,
    pub language: Option<String>,
}

impl From<RawRepository> for Repository {
    fn from(r: RawRepository) -> Self {
        Repository {
            id: r.id,
            name: r.name,
            full_name: r.full_name,
            owner_login: r.owner.login,
            private: r.private,
            fork: r.fork,
            description: r.description,
            html_url: r.html_url,
            clone_url: r.clone_url,
            default_branch: r.default_branch,
            stargazers_count: r.stargazers_count,
            language: r.language,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawIssue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub body: Option<String>,
    pub user: Option<RawUser>,
    #[serde(default)]
    pub labels: Vec<RawLabel>,
    #[serde(default)]
    pub assignees: Vec<RawUser>,
    #[serde(default)]
    pub comments: u64,
    pub html_url: String,
    pub created_at: String,
    pub updated_at: String,
    pub closed_at: Option<String>,
    pub pull_request: Option<serde_json::Value>,
}

impl From<RawIssue> for Issue {
    fn from(i: RawIssue) -> Self {
        Issue {
            number: i.number,
            title: i.title,
            state: i.state,
            body: i.body,
            author_login: i.user.map(|u| u.login),
            labels: i.labels.into_iter().map(|l| l.name).collect(),
            assignees: i.assignees.into_iter().map(|u| u.login).collect(),
            comments: i.comments,
            html_url: i.html_url,
            created_at: i.created_at,
            updated_at: i.updated_at,
            closed_at: i.closed_at,
            is_pull_request: i.pull_request.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawComment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
    pub user: Option<RawUser>,
    pub html_url: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<RawComment> for Comment {
    fn from(c: RawComment) -> Self {
        Comment {
            id: c.id,
            body: c.body,
            author_login: c.user.map(|u| u.login),
            html_url: c.html_url,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    #[serde(default)]
    pub label: String,
}

impl From<RawRef> for GitRef {
    fn from(r: RawRef) -> Self {
        GitRef {
            ref_name: r.ref_name,
            sha: r.sha,
            label: r.label,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawPullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub body: Option<String>,
    #[serde(default)]
    pub draft: Option<bool>,
    // Absent from list responses; fall back to merged_at.
    pub merged: Option<bool>,
    pub mergeable: Option<bool>,
    #[serde(default)]
    pub maintainer_can_modify: bool,
    pub user: Option<RawUser>,
    pub head: RawRef,
    pub base: RawRef,
    pub html_url: String,
    pub created_at: String,
    pub updated_at: String,
    pub merged_at: Option<String>,
}

impl From<RawPullRequest> for PullRequest {
    fn from(p: RawPullRequest) -> Self {
        PullRequest {
            number: p.number,
            title: p.title,
            state: p.state,
            body: p.body,
            draft: p.draft.unwrap_or(false),
            merged: p.merged.unwrap_or(p.merged_at.is_some()),
            mergeable: p.mergeable,
            maintainer_can_modify: p.maintainer_can_modify,
            author_login: p.user.map(|u| u.login),
            head: p.head.into(),
            base: p.base.into(),
            html_url: p.html_url,
            created_at: p.created_at,
            updated_at: p.updated_at,
            merged_at: p.merged_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawFile {
    pub filename: String,
    pub status: String,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changes: u64,
    pub sha: Option<String>,
    pub patch: Option<String>,
}

impl From<RawFile> for FileChange {
    fn from(f: RawFile) -> Self {
        FileChange {
            filename: f.filename,
            status: f.status,
            additions: f.additions,
            deletions: f.deletions,
            changes: f.changes,
            sha: f.sha,
            patch: f.patch,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawSha {
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct RawGitAuthor {
    pub name: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawCommitDetail {
    pub message: String,
    pub author: Option<RawGitAuthor>,
}

#[derive(Debug, Deserialize)]
pub struct RawStats {
    pub additions: u64,
    pub deletions: u64,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct RawCommit {
    pub sha: String,
    #[serde(default)]
    pub html_url: String,
    pub commit: RawCommitDetail,
    pub author: Option<RawUser>,
    #[serde(default)]
    pub parents: Vec<RawSha>,
    pub stats: Option<RawStats>,
    #[serde(default)]
    pub files: Vec<RawFile>,
}

impl From<RawCommit> for Commit {
    fn from(c: RawCommit) -> Self {
        let (author_name, authored_at) = match c.commit.author {
            Some(a) => (a.name, a.date),
            None => (None, None),
        };
        Commit {
            sha: c.sha,
            message: c.commit.message,
            author_name,
            author_login: c.author.map(|u| u.login),
            authored_at,
            html_url: c.html_url,
            parents: c.parents.into_iter().map(|p| p.sha).collect(),
            stats: c.stats.map(|s| CommitStats {
                additions: s.additions,
                deletions: s.deletions,
                total: s.total,
            }),
            files: c.files.into_iter().map(FileChange::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawBranch {
    pub name: String,
    pub commit: RawSha,
    #[serde(default)]
    pub protected: bool,
}

impl From<RawBranch> for Branch {
    fn from(b: RawBranch) -> Self {
        Branch {
            name: b.name,
            sha: b.commit.sha,
            protected: b.protected,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawContentFile {
    pub path: String,
    pub sha: String,
    pub html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawContentWrite {
    pub content: RawContentFile,
    pub commit: RawSha,
}

#[derive(Debug, Deserialize)]
pub struct RawMerge {
    pub sha: Option<String>,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub message: String,
}

impl From<RawMerge> for MergeResult {
    fn from(m: RawMerge) -> Self {
        MergeResult {
            merged: m.merged,
            sha: m.sha,
            message: m.message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawStatus {
    pub context: String,
    pub state: String,
    pub description: Option<String>,
    pub target_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawCombinedStatus {
    pub state: String,
    pub sha: String,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub statuses: Vec<RawStatus>,
}

impl From<RawCombinedStatus> for CombinedStatus {
    fn from(s: RawCombinedStatus) -> Self {
        CombinedStatus {
            state: s.state,
            sha: s.sha,
            total_count: s.total_count,
            statuses: s
                .statuses
                .into_iter()
                .map(|st| StatusCheck {
                    context: st.context,
                    state: st.state,
                    description: st.description,
                    target_url: st.target_url,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawSearch<T> {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct RawRepoName {
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawCodeHit {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub sha: String,
    pub html_url: String,
    pub repository: RawRepoName,
}

impl From<RawCodeHit> for CodeHit {
    fn from(c: RawCodeHit) -> Self {
        CodeHit {
            name: c.name,
            path: c.path,
            sha: c.sha,
            repository: c.repository.full_name,
            html_url: c.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawUserHit {
    pub login: String,
    pub html_url: String,
    #[serde(rename = "type", default)]
    pub user_type: String,
    #[serde(default)]
    pub score: f64,
}

impl From<RawUserHit> for UserHit {
    fn from(u: RawUserHit) -> Self {
        UserHit {
            login: u.login,
            html_url: u.html_url,
            user_type: u.user_type,
            score: u.score,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawErrorBody {
    pub message: Option<String>,
}
