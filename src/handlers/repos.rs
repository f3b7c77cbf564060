use super::Gateway;
use crate::error::GatewayError;
use crate::models::{Branch, Commit, FileWriteResult, Repository};
use crate::pagination::PageWindow;
use crate::tools::{
    CreateOrUpdateFileInput, CreateRepositoryInput, ForkRepositoryInput, GetCommitInput,
    ListBranchesInput, ListCommitsInput,
};
use crate::upstream::{FileWrite, NewRepository};
use log::info;

pub(super) async fn get_commit(gw: &Gateway, input: GetCommitInput) -> Result<Commit, GatewayError> {
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let handle = gw.resolver().resolve_commit(&repo, &input.sha).await?;
    Ok(handle.commit)
}

pub(super) async fn list_commits(
    gw: &Gateway,
    input: ListCommitsInput,
) -> Result<Vec<Commit>, GatewayError> {
    let window = PageWindow::new(input.page, input.per_page)?;
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let sha = input.sha.as_deref();
    gw.list("list commits", window, || {
        gw.upstream().list_commits(&repo.reference, sha, window)
    })
    .await
}

pub(super) async fn list_branches(
    gw: &Gateway,
    input: ListBranchesInput,
) -> Result<Vec<Branch>, GatewayError> {
    let window = PageWindow::new(input.page, input.per_page)?;
    let repo = gw.repo(&input.owner, &input.repo).await?;
    gw.list("list branches", window, || {
        gw.upstream().list_branches(&repo.reference, window)
    })
    .await
}

/// Without `sha` the file is created; with it, the blob it names is replaced.
/// A stale `sha` comes back from upstream as a conflict.
pub(super) async fn create_or_update_file(
    gw: &Gateway,
    input: CreateOrUpdateFileInput,
) -> Result<FileWriteResult, GatewayError> {
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let write = FileWrite {
        path: input.path,
        content: input.content,
        message: input.message,
        branch: input.branch,
        sha: input.sha.filter(|s| !s.trim().is_empty()),
    };
    let result = gw
        .retry()
        .run("write file", || gw.upstream().put_file(&repo.reference, &write))
        .await?;
    info!(
        "{:?} {} in {} on {}",
        result.operation, result.path, repo.reference, write.branch
    );
    Ok(result)
}

pub(super) async fn create_repository(
    gw: &Gateway,
    input: CreateRepositoryInput,
) -> Result<Repository, GatewayError> {
    let new_repo = NewRepository {
        name: input.name,
        description: input.description,
        private: input.private,
        auto_init: input.auto_init,
    };
    gw.retry()
        .run("create repository", || gw.upstream().create_repository(&new_repo))
        .await
}

pub(super) async fn fork_repository(
    gw: &Gateway,
    input: ForkRepositoryInput,
) -> Result<Repository, GatewayError> {
    let repo = gw.repo(&input.owner, &input.repo).await?;
    let organization = input.organization.as_deref();
    gw.retry()
        .run("fork repository", || {
            gw.upstream().create_fork(&repo.reference, organization)
        })
        .await
}
