use assert_cmd::Command;
use std::io::Write;

fn run_lines(reqs: &[serde_json::Value], envs: &[(&str, &str)]) -> anyhow::Result<Vec<serde_json::Value>> {
    let mut cmd = Command::cargo_bin("github-ops-mcp")?;
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut input = Vec::new();
    for r in reqs {
        writeln!(input, "{}", serde_json::to_string(r)?)?;
    }
    let assert = cmd.arg("--log-level").arg("warn").write_stdin(input).assert().success();
    let output = String::from_utf8(assert.get_output().stdout.clone())?;
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(anyhow::Error::from))
        .collect()
}

fn by_id(resps: &[serde_json::Value], id: i64) -> &serde_json::Value {
    resps.iter().find(|r| r["id"] == id).expect("response for id")
}

#[test]
fn initialize_and_tools_list() -> anyhow::Result<()> {
    let resps = run_lines(
        &[
            serde_json::json!({"jsonrpc": "2.0", "method": "initialize", "id": 1, "params": {}}),
            serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            serde_json::json!({"jsonrpc": "2.0", "method": "tools/list", "id": 2}),
        ],
        &[],
    )?;
    // The notification gets no reply.
    assert_eq!(resps.len(), 2);

    let init = by_id(&resps, 1);
    assert!(init["result"]["protocolVersion"].is_string());
    assert_eq!(init["result"]["serverInfo"]["name"], "github-ops-mcp");
    assert!(init["result"]["capabilities"]["tools"].is_object());

    let tools = by_id(&resps, 2)["result"]["tools"].as_array().unwrap().clone();
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    for expected in [
        "get_issue",
        "list_issues",
        "create_or_update_file",
        "push_to_github",
        "list_pull_requests",
        "merge_pull_request",
        "search_code",
        "create_pull_request",
    ] {
        assert!(names.contains(&expected), "missing {expected}");
    }
    assert!(!names.contains(&"ping"));
    let get_issue = tools.iter().find(|t| t["name"] == "get_issue").unwrap();
    assert_eq!(
        get_issue["inputSchema"]["required"],
        serde_json::json!(["owner", "repo", "issue_number"])
    );
    Ok(())
}

#[test]
fn ping_tool_is_opt_in() -> anyhow::Result<()> {
    let call = serde_json::json!({
        "jsonrpc": "2.0", "method": "tools/call", "id": 1,
        "params": {"name": "ping", "arguments": {"message": "hello"}}
    });
    let off = run_lines(&[call.clone()], &[])?;
    assert_eq!(off[0]["error"]["code"], -32601);

    let on = run_lines(&[call], &[("GITHUB_MCP_ENABLE_PING", "1")])?;
    assert_eq!(on[0]["result"]["structuredContent"]["payload"]["message"], "hello");
    Ok(())
}

#[test]
fn rpc_errors_for_unknown_methods_tools_and_bad_params() -> anyhow::Result<()> {
    let resps = run_lines(
        &[
            serde_json::json!({"jsonrpc": "2.0", "method": "resources/list", "id": 1}),
            serde_json::json!({"jsonrpc": "2.0", "method": "tools/call", "id": 2, "params": {"name": "delete_everything"}}),
            serde_json::json!({"jsonrpc": "2.0", "method": "tools/call", "id": 3, "params": {"arguments": {}}}),
            serde_json::json!({"jsonrpc": "2.0", "method": "ping", "id": 4}),
        ],
        &[],
    )?;
    assert_eq!(by_id(&resps, 1)["error"]["code"], -32601);
    assert_eq!(by_id(&resps, 2)["error"]["code"], -32601);
    assert_eq!(by_id(&resps, 3)["error"]["code"], -32602);
    assert_eq!(by_id(&resps, 4)["result"], serde_json::json!({}));
    Ok(())
}

#[test]
fn parse_error_does_not_stop_the_server() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("github-ops-mcp")?;
    let input = "{not json\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\",\"id\":9}\n";
    let assert = cmd.arg("--log-level").arg("warn").write_stdin(input).assert().success();
    let out = String::from_utf8(assert.get_output().stdout.clone())?;
    let lines: Vec<serde_json::Value> = out
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["error"]["code"], -32700);
    assert_eq!(lines[1]["id"], 9);
    Ok(())
}

#[test]
fn content_length_requests_get_content_length_replies() -> anyhow::Result<()> {
    let body = r#"{"jsonrpc":"2.0","method":"initialize","id":1}"#;
    let input = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
    let mut cmd = Command::cargo_bin("github-ops-mcp")?;
    let assert = cmd.arg("--log-level").arg("warn").write_stdin(input).assert().success();
    let out = String::from_utf8(assert.get_output().stdout.clone())?;
    let (header, payload) = out.split_once("\r\n\r\n").expect("framed reply");
    let len: usize = header.trim_start_matches("Content-Length:").trim().parse()?;
    assert_eq!(len, payload.len());
    let v: serde_json::Value = serde_json::from_str(payload)?;
    assert!(v["result"]["protocolVersion"].is_string());
    Ok(())
}

#[test]
fn version_flag_prints_and_exits() -> anyhow::Result<()> {
    Command::cargo_bin("github-ops-mcp")?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::starts_with("github-ops-mcp "));
    Ok(())
}
