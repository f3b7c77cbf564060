use assert_cmd::Command;
use httpmock::{Method::GET, MockServer};
use std::io::Write;

fn run_with_env(req: &serde_json::Value, envs: &[(&str, &str)]) -> anyhow::Result<serde_json::Value> {
    let mut cmd = Command::cargo_bin("github-ops-mcp")?;
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let input = serde_json::to_string(req)?;
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .write_stdin({
            let mut b = Vec::new();
            writeln!(b, "{}", input)?;
            b
        })
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone())?;
    Ok(serde_json::from_str(output.trim())?)
}

fn call(id: i64, name: &str, arguments: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0", "method": "tools/call", "id": id,
        "params": {"name": name, "arguments": arguments}
    })
}

fn repo_json() -> serde_json::Value {
    serde_json::json!({
        "id": 1, "name": "r", "full_name": "o/r", "owner": {"login": "o"},
        "private": false, "fork": false, "html_url": "https://github.com/o/r",
        "clone_url": "https://github.com/o/r.git", "default_branch": "main"
    })
}

#[test]
fn success_envelope_is_wrapped_for_mcp() -> anyhow::Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r");
        then.status(200).json_body(repo_json());
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/branches");
        then.status(200)
            .json_body(serde_json::json!([{"name": "main", "commit": {"sha": "abc"}, "protected": true}]));
    });

    let out = run_with_env(
        &call(1, "list_branches", serde_json::json!({"owner": "o", "repo": "r"})),
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;
    let result = &out["result"];
    assert!(result.get("isError").is_none());
    assert_eq!(result["structuredContent"]["kind"], "success");
    assert_eq!(
        result["structuredContent"]["payload"],
        serde_json::json!([{"name": "main", "sha": "abc", "protected": true}])
    );
    // The text block carries the same envelope.
    let text: serde_json::Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap())?;
    assert_eq!(text, result["structuredContent"]);
    Ok(())
}

#[test]
fn failures_are_error_envelopes_not_rpc_errors() -> anyhow::Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/missing");
        then.status(404)
            .json_body(serde_json::json!({"message": "Not Found", "documentation_url": "https://docs.github.com"}));
    });

    let out = run_with_env(
        &call(2, "get_issue", serde_json::json!({"owner": "o", "repo": "missing", "issue_number": 1})),
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;
    assert!(out.get("error").is_none());
    let result = &out["result"];
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["kind"], "error");
    let message = result["structuredContent"]["message"].as_str().unwrap();
    assert!(message.starts_with("not found: repository o/missing"), "{message}");
    assert!(result["structuredContent"].get("payload").is_none());
    Ok(())
}

#[test]
fn validation_failures_name_the_field() -> anyhow::Result<()> {
    let server = MockServer::start();
    let any = server.mock(|when, then| {
        when.any_request();
        then.status(200).json_body(repo_json());
    });

    let out = run_with_env(
        &call(3, "get_issue", serde_json::json!({"owner": "o", "repo": "r", "issue_number": "7"})),
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;
    assert_eq!(out["result"]["isError"], true);
    assert_eq!(
        out["result"]["structuredContent"]["message"],
        "invalid parameter `issue_number`: expected an integer"
    );

    let out = run_with_env(
        &call(4, "create_issue", serde_json::json!({"owner": "o", "repo": "r", "title": "   "})),
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", server.base_url().as_str())],
    )?;
    assert_eq!(
        out["result"]["structuredContent"]["message"],
        "invalid parameter `title`: must not be empty"
    );
    any.assert_hits(0);
    Ok(())
}
