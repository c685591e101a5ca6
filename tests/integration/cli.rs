use assert_cmd::Command;
use clap::Parser;
use jsonapi_transformer::cli::{Cli, TransformCommand};
use jsonapi_transformer::config::EngineConfig;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str = r#"
link_marker = "t3://"

[records.page]
id_field = "uid"
attributes = ["title", "bodytext"]
relations = { children = { collection = true, target = "page" }, author = { target = "author" } }

[records.author]
attributes = ["name"]

[links]
"t3://page?uid=2" = "/about"
"#;

const INPUT: &str = r#"{
  "$type": "page",
  "uid": 1,
  "title": "Home",
  "bodytext": "<a href=\"t3://page?uid=2\">About us</a>",
  "author": {"$type": "author", "id": 7, "name": "Ada"},
  "children": [
    {"$type": "page", "uid": 2, "title": "About", "bodytext": "", "children": []}
  ]
}"#;

/// Parses `transform` arguments on their own.
#[derive(Parser)]
struct TransformArgs {
    #[command(flatten)]
    cmd: TransformCommand,
}

fn transform_command(args: &[&str]) -> TransformCommand {
    let argv = std::iter::once("transform").chain(args.iter().copied());
    TransformArgs::parse_from(argv).cmd
}

fn write_fixture(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let config = dir.join("config.toml");
    let input = dir.join("page.json");
    std::fs::write(&config, CONFIG).unwrap();
    std::fs::write(&input, INPUT).unwrap();
    (config, input)
}

#[tokio::test]
async fn test_transform_command_with_config_records() {
    let temp = TempDir::new().unwrap();
    let (config_path, input) = write_fixture(temp.path());
    let config = EngineConfig::load(Some(&config_path)).await.unwrap();

    let cmd = transform_command(&[input.to_str().unwrap(), "--include", "author,children"]);
    let output: serde_json::Value = serde_json::from_str(&cmd.run(config).await.unwrap()).unwrap();

    assert_eq!(output["id"], 1);
    assert_eq!(output["bodytext"], "<a href=\"/about\">About us</a>");
    assert_eq!(output["author"], serde_json::json!({"id": 7, "name": "Ada"}));
    assert_eq!(output["children"][0]["title"], "About");
    assert!(output["children"][0].get("children").is_none());
}

#[tokio::test]
async fn test_transform_command_without_nested_transformer() {
    let temp = TempDir::new().unwrap();
    let (config_path, input) = write_fixture(temp.path());
    let config = EngineConfig::load(Some(&config_path)).await.unwrap();

    let cmd = transform_command(&[input.to_str().unwrap(), "--all-includes", "--no-nested"]);
    let output: serde_json::Value = serde_json::from_str(&cmd.run(config).await.unwrap()).unwrap();

    assert_eq!(output["author"], serde_json::json!({"id": 7, "type": "author"}));
    assert_eq!(output["children"], serde_json::json!([{"id": 2, "type": "page"}]));
}

#[tokio::test]
async fn test_cli_execute_runs_config_command() {
    let temp = TempDir::new().unwrap();
    let (config_path, _) = write_fixture(temp.path());

    let cli = Cli::try_parse_from([
        "jsonapi-transformer",
        "--quiet",
        "--config",
        config_path.to_str().unwrap(),
        "config",
    ])
    .unwrap();
    cli.execute().await.unwrap();
}

#[tokio::test]
async fn test_cli_execute_reports_bad_config() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("config.toml");
    std::fs::write(&config_path, "[records.page]\nrelations = { parent = { target = \"missing\" } }").unwrap();
    let input = temp.path().join("in.json");
    std::fs::write(&input, "{}").unwrap();

    let cli = Cli::try_parse_from([
        "jsonapi-transformer",
        "--quiet",
        "--config",
        config_path.to_str().unwrap(),
        "transform",
        input.to_str().unwrap(),
    ])
    .unwrap();
    let error = cli.execute().await.unwrap_err();
    let context = jsonapi_transformer::core::user_friendly_error(error);
    assert!(context.message.contains("missing"));
}

#[test]
fn test_binary_transforms_stdin() {
    let temp = TempDir::new().unwrap();
    let (config_path, _) = write_fixture(temp.path());

    let mut cmd = Command::cargo_bin("jsonapi-transformer").unwrap();
    cmd.arg("--config")
        .arg(&config_path)
        .arg("transform")
        .arg("-")
        .write_stdin(r#"{"$type": "author", "id": 7, "name": "Ada"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"id":7,"name":"Ada"}"#));
}

#[test]
fn test_binary_reports_invalid_input_with_exit_code() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("broken.json");
    std::fs::write(&input, "[1, 2").unwrap();

    let mut cmd = Command::cargo_bin("jsonapi-transformer").unwrap();
    cmd.env_remove("JSONAPI_TRANSFORMER_CONFIG")
        .arg("--config")
        .arg(temp.path().join("none.toml"))
        .arg("transform")
        .arg(&input)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid JSON input"));
}
