use super::Gateway;
use crate::error::GatewayError;
use crate::models::{Comment, Issue};
use crate::pagination::PageWindow;
use crate::tools::{
    AddIssueCommentInput, CreateIssueInput, GetIssueCommentsInput, GetIssueInput, ListIssuesInput,
};
use crate::upstream::{IssueFilter, NewIssue};

pub(super) async fn get_issue(gw: &Gateway, input: GetIssueInput) -> Result<Issue, GatewayError> {
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let handle = gw.resolver().resolve_issue(&repo, input.issue_number).await?;
    Ok(handle.issue)
}

pub(super) async fn add_issue_comment(
    gw: &Gateway,
    input: AddIssueCommentInput,
) -> Result<Comment, GatewayError> {
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let issue = gw.resolver().resolve_issue(&repo, input.issue_number).await?;
    gw.retry()
        .run("create issue comment", || {
            gw.upstream()
                .create_issue_comment(&repo.reference, issue.number, &input.body)
        })
        .await
}

pub(super) async fn create_issue(
    gw: &Gateway,
    input: CreateIssueInput,
) -> Result<Issue, GatewayError> {
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let issue = NewIssue {
        title: input.title,
        body: input.body,
        assignees: input.assignees,
        labels: input.labels,
        milestone: input.milestone,
    };
    gw.retry()
        .run("create issue", || gw.upstream().create_issue(&repo.reference, &issue))
        .await
}

pub(super) async fn list_issues(
    gw: &Gateway,
    input: ListIssuesInput,
) -> Result<Vec<Issue>, GatewayError> {
    let window = PageWindow::new(input.page, input.per_page)?;
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let filter = IssueFilter {
        state: input.state,
        labels: input.labels,
        sort: input.sort,
        direction: input.direction,
        since: input.since,
    };
    gw.list("list issues", window, || {
        gw.upstream().list_issues(&repo.reference, &filter, window)
    })
    .await
}

pub(super) async fn get_issue_comments(
    gw: &Gateway,
    input: GetIssueCommentsInput,
) -> Result<Vec<Comment>, GatewayError> {
    let window = PageWindow::new(input.page, input.per_page)?;
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let issue = gw.resolver().resolve_issue(&repo, input.issue_number).await?;
    gw.list("list issue comments", window, || {
        gw.upstream()
            .list_issue_comments(&repo.reference, issue.number, window)
    })
    .await
}
