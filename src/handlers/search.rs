use super::Gateway;
use crate::error::GatewayError;
use crate::models::{CodeHit, Issue, Repository, SearchResults, UserHit};
use crate::pagination::{Page, PageWindow};
use crate::tools::{SearchCodeInput, SearchIssuesInput, SearchRepositoriesInput, SearchUsersInput};
use crate::upstream::SearchQuery;

fn with_total<T>(page: Page<T>) -> SearchResults<T> {
    SearchResults {
        total_count: page.total_count.unwrap_or(page.items.len() as u64),
        items: page.items,
    }
}

/// Issues and pull requests matching `q`, as a plain ordered array.
pub(super) async fn search_issues(
    gw: &Gateway,
    input: SearchIssuesInput,
) -> Result<Vec<Issue>, GatewayError> {
    let window = PageWindow::new(input.page, input.per_page)?;
    let query = SearchQuery {
        q: input.q,
        sort: input.sort,
        order: input.order,
    };
    gw.list("search issues", window, || {
        gw.upstream().search_issues(&query, window)
    })
    .await
}

pub(super) async fn search_repositories(
    gw: &Gateway,
    input: SearchRepositoriesInput,
) -> Result<SearchResults<Repository>, GatewayError> {
    let window = PageWindow::new(input.page, input.per_page)?;
    let query = SearchQuery {
        q: input.q,
        sort: None,
        order: None,
    };
    let page = gw
        .fetch_page("search repositories", window, || {
            gw.upstream().search_repositories(&query, window)
        })
        .await?;
    Ok(with_total(page))
}

pub(super) async fn search_code(
    gw: &Gateway,
    input: SearchCodeInput,
) -> Result<SearchResults<CodeHit>, GatewayError> {
    let window = PageWindow::new(input.page, input.per_page)?;
    let query = SearchQuery {
        q: input.q,
        sort: input.sort,
        order: input.order,
    };
    let page = gw
        .fetch_page("search code", window, || gw.upstream().search_code(&query, window))
        .await?;
    Ok(with_total(page))
}

pub(super) async fn search_users(
    gw: &Gateway,
    input: SearchUsersInput,
) -> Result<SearchResults<UserHit>, GatewayError> {
    let window = PageWindow::new(input.page, input.per_page)?;
    let query = SearchQuery {
        q: input.q,
        sort: input.sort,
        order: input.order,
    };
    let page = gw
        .fetch_page("search users", window, || gw.upstream().search_users(&query, window))
        .await?;
    Ok(with_total(page))
}
