use super::Gateway;
use crate::error::GatewayError;
use crate::models::{CombinedStatus, FileChange, MergeResult, PullRequest};
use crate::pagination::PageWindow;
use crate::tools::{
    CreatePullRequestInput, ListPullRequestsInput, MergePullRequestInput, PullFilesInput,
    PullNumberInput, UpdatePullRequestInput,
};
use crate::upstream::{MergeRequest, NewPullRequest, PullFilter, PullUpdate};
use log::info;

pub(super) async fn get_pull_request(
    gw: &Gateway,
    input: PullNumberInput,
) -> Result<PullRequest, GatewayError> {
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let handle = gw.resolver().resolve_pull(&repo, input.pull_number).await?;
    Ok(handle.pull)
}

pub(super) async fn create_pull_request(
    gw: &Gateway,
    input: CreatePullRequestInput,
) -> Result<PullRequest, GatewayError> {
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let pull = NewPullRequest {
        title: input.title,
        head: input.head,
        base: input.base,
        body: input.body,
        draft: input.draft,
        maintainer_can_modify: input.maintainer_can_modify,
    };
    gw.retry()
        .run("create pull request", || {
            gw.upstream().create_pull_request(&repo.reference, &pull)
        })
        .await
}

pub(super) async fn update_pull_request(
    gw: &Gateway,
    input: UpdatePullRequestInput,
) -> Result<PullRequest, GatewayError> {
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let pull = gw.resolver().resolve_pull(&repo, input.pull_number).await?;
    let update = PullUpdate {
        title: input.title,
        body: input.body,
        state: input.state,
        base: input.base,
        maintainer_can_modify: input.maintainer_can_modify,
    };
    gw.retry()
        .run("update pull request", || {
            gw.upstream()
                .update_pull_request(&repo.reference, pull.number, &update)
        })
        .await
}

pub(super) async fn list_pull_requests(
    gw: &Gateway,
    input: ListPullRequestsInput,
) -> Result<Vec<PullRequest>, GatewayError> {
    let window = PageWindow::new(input.page, input.per_page)?;
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let filter = PullFilter {
        state: input.state,
        head: input.head,
        base: input.base,
        sort: input.sort,
        direction: input.direction,
    };
    gw.list("list pull requests", window, || {
        gw.upstream()
            .list_pull_requests(&repo.reference, &filter, window)
    })
    .await
}

pub(super) async fn merge_pull_request(
    gw: &Gateway,
    input: MergePullRequestInput,
) -> Result<MergeResult, GatewayError> {
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let pull = gw.resolver().resolve_pull(&repo, input.pull_number).await?;
    let merge = MergeRequest {
        commit_title: input.commit_title,
        commit_message: input.commit_message,
        merge_method: input.merge_method,
    };
    let result = gw
        .retry()
        .run("merge pull request", || {
            gw.upstream()
                .merge_pull_request(&repo.reference, pull.number, &merge)
        })
        .await?;
    info!(
        "merge of {}#{} via {}: merged={}",
        repo.reference,
        pull.number,
        merge.merge_method.as_str(),
        result.merged
    );
    Ok(result)
}

pub(super) async fn get_pull_request_files(
    gw: &Gateway,
    input: PullFilesInput,
) -> Result<Vec<FileChange>, GatewayError> {
    let window = PageWindow::new(input.page, input.per_page)?;
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let pull = gw.resolver().resolve_pull(&repo, input.pull_number).await?;
    gw.list("list pull request files", window, || {
        gw.upstream()
            .list_pull_request_files(&repo.reference, pull.number, window)
    })
    .await
}

/// Combined status of the head commit as it is right now.
pub(super) async fn get_pull_request_status(
    gw: &Gateway,
    input: PullNumberInput,
) -> Result<CombinedStatus, GatewayError> {
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let pull = gw.resolver().resolve_pull(&repo, input.pull_number).await?;
    let head_sha = pull.pull.head.sha.as_str();
    gw.retry()
        .run("get combined status", || {
            gw.upstream().get_combined_status(&repo.reference, head_sha)
        })
        .await
}
