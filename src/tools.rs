use crate::pagination::{DEFAULT_PAGE, DEFAULT_PER_PAGE, MAX_PER_PAGE};
use crate::schema::{
    input_schema, CodeSearchSort, Direction, FieldSpec, IssueSearchSort, IssueSort, IssueState,
    MergeMethod, PullSort, PullState, PullUpdateState, UserSearchSort,
};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "github-ops-mcp";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// One registered tool: its name, a one-line description and its field contract.
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

impl ToolSpec {
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.into(),
            description: self.description.into(),
            input_schema: input_schema(self.fields),
        }
    }
}

const OWNER: FieldSpec =
    FieldSpec::text("owner", "Repository owner (user or organization)").required();
const REPO: FieldSpec = FieldSpec::text("repo", "Repository name").required();
const ISSUE_NUMBER: FieldSpec = FieldSpec::integer("issue_number", "Issue number")
    .required()
    .range(Some(1), None);
const PULL_NUMBER: FieldSpec = FieldSpec::integer("pull_number", "Pull request number")
    .required()
    .range(Some(1), None);
const PAGE: FieldSpec = FieldSpec::integer("page", "Page number, starting at 1 (default 1)")
    .range(Some(1), Some(u32::MAX as i64));
const PER_PAGE: FieldSpec = FieldSpec::integer("per_page", "Results per page, 1-100 (default 30)")
    .range(Some(1), Some(MAX_PER_PAGE as i64));
const QUERY: FieldSpec = FieldSpec::text("q", "Search query using GitHub search syntax").required();
const ORDER: FieldSpec = FieldSpec::choice("order", Direction::VALUES, "Sort order");

pub const PING: ToolSpec = ToolSpec {
    name: "ping",
    description: "Health check; echoes a message.",
    fields: &[FieldSpec::text("message", "Text to echo back")],
};

pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "get_issue",
        description: "Get a single issue by number",
        fields: &[OWNER, REPO, ISSUE_NUMBER],
    },
    ToolSpec {
        name: "add_issue_comment",
        description: "Add a comment to an issue",
        fields: &[
            OWNER,
            REPO,
            ISSUE_NUMBER,
            FieldSpec::text("body", "Comment text").required(),
        ],
    },
    ToolSpec {
        name: "search_issues",
        description: "Search issues and pull requests across GitHub",
        fields: &[
            QUERY,
            FieldSpec::choice("sort", IssueSearchSort::VALUES, "Sort field"),
            ORDER,
            PAGE,
            PER_PAGE,
        ],
    },
    ToolSpec {
        name: "create_issue",
        description: "Create a new issue",
        fields: &[
            OWNER,
            REPO,
            FieldSpec::text("title", "Issue title").required(),
            FieldSpec::text("body", "Issue body"),
            FieldSpec::text_list("assignees", "Logins to assign"),
            FieldSpec::text_list("labels", "Labels to apply"),
            FieldSpec::integer("milestone", "Milestone number").range(Some(1), None),
        ],
    },
    ToolSpec {
        name: "list_issues",
        description: "List issues in a repository",
        fields: &[
            OWNER,
            REPO,
            FieldSpec::choice("state", IssueState::VALUES, "Issue state (default open)"),
            FieldSpec::text_list("labels", "Only issues carrying all of these labels"),
            FieldSpec::choice("sort", IssueSort::VALUES, "Sort field"),
            FieldSpec::choice("direction", Direction::VALUES, "Sort direction"),
            FieldSpec::timestamp("since", "Only issues updated at or after this time"),
            PAGE,
            PER_PAGE,
        ],
    },
    ToolSpec {
        name: "get_issue_comments",
        description: "List comments on an issue",
        fields: &[OWNER, REPO, ISSUE_NUMBER, PAGE, PER_PAGE],
    },
    ToolSpec {
        name: "get_commit",
        description: "Get a single commit by SHA, branch or tag",
        fields: &[
            OWNER,
            REPO,
            FieldSpec::text("sha", "Commit SHA, branch or tag").required(),
        ],
    },
    ToolSpec {
        name: "list_commits",
        description: "List commits of a branch or starting at a SHA",
        fields: &[
            OWNER,
            REPO,
            FieldSpec::text("sha", "Branch name or SHA to start from"),
            PAGE,
            PER_PAGE,
        ],
    },
    ToolSpec {
        name: "list_branches",
        description: "List branches in a repository",
        fields: &[OWNER, REPO, PAGE, PER_PAGE],
    },
    ToolSpec {
        name: "create_or_update_file",
        description: "Create a file, or update it when `sha` of the current blob is given",
        fields: &[
            OWNER,
            REPO,
            FieldSpec::text("path", "File path inside the repository").required(),
            FieldSpec::text("content", "New file content (plain text)").required(),
            FieldSpec::text("message", "Commit message").required(),
            FieldSpec::text("branch", "Branch to commit to").required(),
            FieldSpec::text("sha", "Blob SHA of the file being replaced"),
        ],
    },
    ToolSpec {
        name: "create_repository",
        description: "Create a repository for the authenticated user",
        fields: &[
            FieldSpec::text("name", "Repository name").required(),
            FieldSpec::text("description", "Repository description"),
            FieldSpec::boolean("private", "Create as private"),
            FieldSpec::boolean("autoInit", "Initialize with a README"),
        ],
    },
    ToolSpec {
        name: "fork_repository",
        description: "Fork a repository to your account or an organization",
        fields: &[
            OWNER,
            REPO,
            FieldSpec::text("organization", "Organization to fork into"),
        ],
    },
    ToolSpec {
        name: "push_to_github",
        description: "Commit a local directory if it has no commits yet and push it to a remote",
        fields: &[
            FieldSpec::text("repo_path", "Local repository directory").required(),
            FieldSpec::text("remote_url", "URL used for the `origin` remote").required(),
            FieldSpec::text("branch", "Branch to push").required(),
            FieldSpec::text("commit_msg", "Message for the initial commit"),
        ],
    },
    ToolSpec {
        name: "get_pull_request",
        description: "Get a single pull request by number",
        fields: &[OWNER, REPO, PULL_NUMBER],
    },
    ToolSpec {
        name: "create_pull_request",
        description: "Open a new pull request",
        fields: &[
            OWNER,
            REPO,
            FieldSpec::text("title", "Pull request title").required(),
            FieldSpec::text("head", "Branch with the changes (`user:branch` for forks)").required(),
            FieldSpec::text("base", "Branch to merge into").required(),
            FieldSpec::text("body", "Pull request description"),
            FieldSpec::boolean("draft", "Open as a draft (default false)"),
            FieldSpec::boolean(
                "maintainer_can_modify",
                "Allow maintainers to push to the head branch (default true)",
            ),
        ],
    },
    ToolSpec {
        name: "update_pull_request",
        description: "Update title, body, state, base or maintainer access of a pull request",
        fields: &[
            OWNER,
            REPO,
            PULL_NUMBER,
            FieldSpec::text("title", "New title"),
            FieldSpec::text("body", "New description"),
            FieldSpec::choice("state", PullUpdateState::VALUES, "New state"),
            FieldSpec::text("base", "New base branch"),
            FieldSpec::boolean("maintainer_can_modify", "Allow maintainers to push"),
        ],
    },
    ToolSpec {
        name: "list_pull_requests",
        description: "List pull requests in a repository",
        fields: &[
            OWNER,
            REPO,
            FieldSpec::choice("state", PullState::VALUES, "Pull request state (default open)"),
            FieldSpec::text("head", "Filter by head `user:branch`"),
            FieldSpec::text("base", "Filter by base branch"),
            FieldSpec::choice("sort", PullSort::VALUES, "Sort field (default created)"),
            FieldSpec::choice("direction", Direction::VALUES, "Sort direction (default desc)"),
            PAGE,
            PER_PAGE,
        ],
    },
    ToolSpec {
        name: "merge_pull_request",
        description: "Merge a pull request",
        fields: &[
            OWNER,
            REPO,
            PULL_NUMBER,
            FieldSpec::text("commit_title", "Title of the merge commit"),
            FieldSpec::text("commit_message", "Extra detail for the merge commit"),
            FieldSpec::choice("merge_method", MergeMethod::VALUES, "Merge method (default merge)"),
        ],
    },
    ToolSpec {
        name: "get_pull_request_files",
        description: "List files changed by a pull request",
        fields: &[OWNER, REPO, PULL_NUMBER, PAGE, PER_PAGE],
    },
    ToolSpec {
        name: "get_pull_request_status",
        description: "Combined commit status of a pull request's head commit",
        fields: &[OWNER, REPO, PULL_NUMBER],
    },
    ToolSpec {
        name: "search_repositories",
        description: "Search repositories",
        fields: &[QUERY, PAGE, PER_PAGE],
    },
    ToolSpec {
        name: "search_code",
        description: "Search code across repositories",
        fields: &[
            QUERY,
            FieldSpec::choice("sort", CodeSearchSort::VALUES, "Sort field"),
            ORDER,
            PAGE,
            PER_PAGE,
        ],
    },
    ToolSpec {
        name: "search_users",
        description: "Search users",
        fields: &[
            QUERY,
            FieldSpec::choice("sort", UserSearchSort::VALUES, "Sort field"),
            ORDER,
            PAGE,
            PER_PAGE,
        ],
    },
];

/// Look up a tool by name; `ping` only resolves when enabled.
pub fn find_tool(name: &str, enable_ping: bool) -> Option<&'static ToolSpec> {
    if name == PING.name {
        return enable_ping.then_some(&PING);
    }
    TOOLS.iter().find(|t| t.name == name)
}

pub fn tool_descriptors(enable_ping: bool) -> Vec<ToolDescriptor> {
    let ping = enable_ping.then_some(&PING);
    ping.into_iter().chain(TOOLS).map(ToolSpec::descriptor).collect()
}

fn default_page() -> u32 {
    DEFAULT_PAGE
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_true() -> bool {
    true
}

fn default_commit_msg() -> String {
    "Initial commit".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PingInput {
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PingOutput {
    pub message: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GetIssueInput {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AddIssueCommentInput {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub body: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchIssuesInput {
    pub q: String,
    pub sort: Option<IssueSearchSort>,
    pub order: Option<Direction>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateIssueInput {
    pub owner: String,
    pub repo: String,
    pub title: String,
    pub body: Option<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub milestone: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListIssuesInput {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<String>,
    pub sort: Option<IssueSort>,
    pub direction: Option<Direction>,
    pub since: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GetIssueCommentsInput {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GetCommitInput {
    pub owner: String,
    pub repo: String,
    pub sha: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListCommitsInput {
    pub owner: String,
    pub repo: String,
    pub sha: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListBranchesInput {
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateOrUpdateFileInput {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub content: String,
    pub message: String,
    pub branch: String,
    pub sha: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateRepositoryInput {
    pub name: String,
    pub description: Option<String>,
    pub private: Option<bool>,
    #[serde(rename = "autoInit")]
    pub auto_init: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForkRepositoryInput {
    pub owner: String,
    pub repo: String,
    pub organization: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PushInput {
    pub repo_path: String,
    pub remote_url: String,
    pub branch: String,
    #[serde(default = "default_commit_msg")]
    pub commit_msg: String,
}

/// Shared by the tools addressing one pull request without extra options.
#[derive(Debug, Deserialize, Clone)]
pub struct PullNumberInput {
    pub owner: String,
    pub repo: String,
    pub pull_number: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreatePullRequestInput {
    pub owner: String,
    pub repo: String,
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default = "default_true")]
    pub maintainer_can_modify: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdatePullRequestInput {
    pub owner: String,
    pub repo: String,
    pub pull_number: u64,
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<PullUpdateState>,
    pub base: Option<String>,
    pub maintainer_can_modify: Option<bool>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListPullRequestsInput {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub state: PullState,
    pub head: Option<String>,
    pub base: Option<String>,
    #[serde(default)]
    pub sort: PullSort,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MergePullRequestInput {
    pub owner: String,
    pub repo: String,
    pub pull_number: u64,
    pub commit_title: Option<String>,
    pub commit_message: Option<String>,
    #[serde(default)]
    pub merge_method: MergeMethod,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PullFilesInput {
    pub owner: String,
    pub repo: String,
    pub pull_number: u64,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchRepositoriesInput {
    pub q: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchCodeInput {
    pub q: String,
    pub sort: Option<CodeSearchSort>,
    pub order: Option<Direction>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchUsersInput {
    pub q: String,
    pub sort: Option<UserSearchSort>,
    pub order: Option<Direction>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}
