//! Operation handlers and the [`Gateway`] that routes tool calls to them.
//!
//! Every call follows the same path: validate the raw arguments against the
//! tool's field list, decode them into the typed input, resolve, call the
//! upstream under retry, paginate listings and render one envelope.

mod issues;
mod pulls;
mod push;
mod repos;
mod search;

use crate::envelope::{render, ResultEnvelope};
use crate::error::GatewayError;
use crate::pagination::{paginate, Page, PageWindow, RawCollection};
use crate::resolver::{RepoHandle, Resolver};
use crate::retry::RetryPolicy;
use crate::schema::{decode, validate_args};
use crate::tools::{find_tool, tool_descriptors, PingInput, PingOutput, ToolDescriptor};
use crate::upstream::Upstream;
use crate::vcs::VersionControl;
use log::{debug, info};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

pub struct Gateway {
    upstream: Arc<dyn Upstream>,
    vcs: Arc<dyn VersionControl>,
    retry: RetryPolicy,
    enable_ping: bool,
}

impl Gateway {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        vcs: Arc<dyn VersionControl>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            upstream,
            vcs,
            retry,
            enable_ping: false,
        }
    }

    pub fn with_ping(mut self, enabled: bool) -> Self {
        self.enable_ping = enabled;
        self
    }

    pub fn tools(&self) -> Vec<ToolDescriptor> {
        tool_descriptors(self.enable_ping)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        find_tool(name, self.enable_ping).is_some()
    }

    pub(crate) fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self.upstream.as_ref(), &self.retry)
    }

    pub(crate) fn upstream(&self) -> &dyn Upstream {
        self.upstream.as_ref()
    }

    pub(crate) fn vcs(&self) -> &dyn VersionControl {
        self.vcs.as_ref()
    }

    pub(crate) fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub(crate) async fn repo(&self, owner: &str, name: &str) -> Result<RepoHandle, GatewayError> {
        self.resolver().resolve(owner, name).await
    }

    /// Fetch one listing under retry and cut it down to `window`.
    pub(crate) async fn fetch_page<T, F, Fut>(
        &self,
        label: &str,
        window: PageWindow,
        op: F,
    ) -> Result<Page<T>, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RawCollection<T>, GatewayError>>,
    {
        let raw = self.retry.run(label, op).await?;
        paginate(raw, window).await
    }

    pub(crate) async fn list<T, F, Fut>(
        &self,
        label: &str,
        window: PageWindow,
        op: F,
    ) -> Result<Vec<T>, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RawCollection<T>, GatewayError>>,
    {
        Ok(self.fetch_page(label, window, op).await?.into_items())
    }

    /// Run one tool end to end. Never fails: every outcome is an envelope.
    pub async fn invoke(&self, name: &str, args: Value) -> ResultEnvelope {
        let outcome = match find_tool(name, self.enable_ping) {
            None => Err(GatewayError::validation(
                "name",
                format!("unknown tool `{name}`"),
            )),
            Some(spec) => match validate_args(spec.fields, &args) {
                Ok(()) => self.dispatch(name, args).await,
                Err(e) => Err(e),
            },
        };
        match &outcome {
            Ok(_) => debug!("tool {} succeeded", name),
            Err(e) => info!("tool {} failed [{}]: {}", name, e.code(), e),
        }
        render(outcome)
    }

    async fn dispatch(&self, name: &str, args: Value) -> Result<Value, GatewayError> {
        macro_rules! route {
            ($handler:path) => {{
                let input = decode(args)?;
                let out = $handler(self, input).await?;
                Ok(serde_json::to_value(out)?)
            }};
        }
        match name {
            "ping" => {
                let input: PingInput = decode(args)?;
                let message = input.message.unwrap_or_else(|| "pong".to_string());
                Ok(serde_json::to_value(PingOutput { message })?)
            }
            "get_issue" => route!(issues::get_issue),
            "add_issue_comment" => route!(issues::add_issue_comment),
            "create_issue" => route!(issues::create_issue),
            "list_issues" => route!(issues::list_issues),
            "get_issue_comments" => route!(issues::get_issue_comments),
            "get_commit" => route!(repos::get_commit),
            "list_commits" => route!(repos::list_commits),
            "list_branches" => route!(repos::list_branches),
            "create_or_update_file" => route!(repos::create_or_update_file),
            "create_repository" => route!(repos::create_repository),
            "fork_repository" => route!(repos::fork_repository),
            "push_to_github" => route!(push::push_to_github),
            "get_pull_request" => route!(pulls::get_pull_request),
            "create_pull_request" => route!(pulls::create_pull_request),
            "update_pull_request" => route!(pulls::update_pull_request),
            "list_pull_requests" => route!(pulls::list_pull_requests),
            "merge_pull_request" => route!(pulls::merge_pull_request),
            "get_pull_request_files" => route!(pulls::get_pull_request_files),
            "get_pull_request_status" => route!(pulls::get_pull_request_status),
            "search_issues" => route!(search::search_issues),
            "search_repositories" => route!(search::search_repositories),
            "search_code" => route!(search::search_code),
            "search_users" => route!(search::search_users),
            other => Err(GatewayError::validation(
                "name",
                format!("unknown tool `{other}`"),
            )),
        }
    }
}
