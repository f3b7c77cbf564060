mod cli;

use github_ops_mcp::config::Config;
use github_ops_mcp::http::RestUpstream;
use github_ops_mcp::vcs::GitCli;
use github_ops_mcp::{server, Gateway};
use log::{info, warn};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("github-ops-mcp {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let cfg = Config::from_env().map_err(anyhow::Error::msg)?;
    if cfg.token.is_none() {
        warn!("GITHUB_TOKEN is not set; requests are unauthenticated and heavily rate limited");
    }
    info!("upstream {} (api version {})", cfg.api_url, cfg.api_version);

    let upstream = Arc::new(RestUpstream::new(&cfg)?);
    let vcs = Arc::new(GitCli::new(&cfg.git_bin));
    let gateway = Gateway::new(upstream, vcs, cfg.retry_policy()).with_ping(cfg.enable_ping);

    server::run_stdio_server(Arc::new(gateway), cfg.call_timeout()).await
}
