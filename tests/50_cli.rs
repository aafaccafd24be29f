mod common;

use std::path::Path;
use std::process::{Command, Output};

use anyhow::{Context, Result};
use serde_json::Value;

use common::start_server;

fn cardtrooper(config_dir: &Path, server: &str, args: &[&str]) -> Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_cardtrooper"))
        .env("CARDTROOPER_CLI_CONFIG_DIR", config_dir)
        .env("CARDTROOPER_SERVER", server)
        .env_remove("CARDTROOPER_PASSWORD")
        .arg("--json")
        .args(args)
        .output()
        .context("failed to run cardtrooper")
}

fn json_stdout(output: &Output) -> Result<Value> {
    anyhow::ensure!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[tokio::test]
async fn register_add_show_delete_logout() -> Result<()> {
    let server = start_server().await?;
    let dir = tempfile::tempdir()?;
    let base = server.base_url.as_str();

    let registered = json_stdout(&cardtrooper(dir.path(), base, &[
        "auth", "register", "kim_cli", "kim@example.com", "--password", "correct horse battery",
    ])?)?;
    assert_eq!(registered["success"], true);
    assert_eq!(registered["data"]["user"]["username"], "kim_cli");

    let added = json_stdout(&cardtrooper(dir.path(), base, &["cards", "add", "Corner Grocer", "4006-3813 33931"])?)?;
    assert_eq!(added["data"]["card_number"], "4006381333931");
    assert_eq!(added["data"]["offline"], false);

    let listed = json_stdout(&cardtrooper(dir.path(), base, &["cards", "list"])?)?;
    assert_eq!(listed["offline"], false);
    assert_eq!(listed["cards"].as_array().map(Vec::len), Some(1));

    let shown = json_stdout(&cardtrooper(dir.path(), base, &["cards", "show", "corner grocer"])?)?;
    assert_eq!(shown["symbology"], "code128");

    let deleted = json_stdout(&cardtrooper(dir.path(), base, &["cards", "delete", "Corner Grocer", "--yes"])?)?;
    assert_eq!(deleted["data"]["queued"], false);

    let empty = json_stdout(&cardtrooper(dir.path(), base, &["cards", "list"])?)?;
    assert_eq!(empty["cards"], Value::Array(vec![]));

    json_stdout(&cardtrooper(dir.path(), base, &["auth", "logout"])?)?;
    let status = json_stdout(&cardtrooper(dir.path(), base, &["auth", "status"])?)?;
    assert_eq!(status["authenticated"], false);
    assert!(!dir.path().join("session.json").exists());
    Ok(())
}

#[tokio::test]
async fn card_commands_require_login() -> Result<()> {
    let server = start_server().await?;
    let dir = tempfile::tempdir()?;

    let output = cardtrooper(dir.path(), &server.base_url, &["cards", "list"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not logged in"));

    let body: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "NOT_LOGGED_IN");
    Ok(())
}
