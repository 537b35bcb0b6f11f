//! Integration tests for the minihost command line.

use std::ffi::OsStr;

use clap::Parser;
use minihost_cli::{build_host, render, CliArgs, Command, ExportMode, RenderScript};
use minihost_canvas::HostConfig;
use serde_json::Value;

fn write_script(dir: &std::path::Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("script.json");
    std::fs::write(&path, json).expect("write script");
    path
}

// ============================================================================
// Argument parsing
// ============================================================================

#[test]
fn test_parse_render_flags() {
    let args = CliArgs::try_parse_from([
        "minihost",
        "--temp-dir",
        "/tmp/out",
        "render",
        "scene.json",
        "--data-url",
    ])
    .expect("parse");
    assert!(matches!(
        args.command,
        Command::Render {
            data_url: true,
            queued: false,
            ..
        }
    ));
    let config = args.host_config().expect("config");
    assert_eq!(config.temp_dir, std::path::PathBuf::from("/tmp/out"));
}

#[test]
fn test_parse_rejects_unknown_scope() {
    let result = CliArgs::try_parse_from(["minihost", "auth", "--scope", "scope.telepathy"]);
    assert!(result.is_err());
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_render_to_temp_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = write_script(
        dir.path(),
        r##"{
            "width": 100,
            "height": 100,
            "ops": [
                {"op": "fillStyle", "color": "#ff0000"},
                {"op": "fillRect", "x": 0, "y": 0, "width": 50, "height": 50}
            ],
            "export": {"width": 50, "height": 50, "destWidth": 25, "destHeight": 25}
        }"##,
    );
    let out = dir.path().join("out");
    let args = CliArgs::try_parse_from([
        OsStr::new("minihost"),
        OsStr::new("--temp-dir"),
        out.as_os_str(),
        OsStr::new("render"),
        script.as_os_str(),
    ])
    .expect("parse");

    let output = minihost_cli::run(args).await.expect("render");
    let report: Value = serde_json::from_str(&output).expect("json");
    let path = report["tempFilePath"].as_str().expect("path");
    assert!(std::path::Path::new(path).starts_with(&out));
    assert!(std::path::Path::new(path).exists());
}

#[tokio::test]
async fn test_render_replays_touches() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = build_host(HostConfig::default().with_temp_dir(dir.path()), false);
    let script: RenderScript = serde_json::from_str(
        r#"{
            "width": 40,
            "height": 40,
            "preventDefault": true,
            "touches": [
                {"phase": "start", "id": "t1", "screenX": 10, "screenY": 10},
                {"phase": "move", "id": "t1", "screenX": 12, "screenY": 11},
                {"phase": "end", "id": "t1", "screenX": 12, "screenY": 11},
                {"phase": "end", "id": "t1", "screenX": 12, "screenY": 11}
            ]
        }"#,
    )
    .expect("script");

    let report = render(&host, &script, ExportMode::DataUrl)
        .await
        .expect("render");
    assert!(report
        .data_url
        .as_deref()
        .is_some_and(|uri| uri.starts_with("data:image/png;base64,")));

    let types: Vec<&str> = report
        .events
        .iter()
        .map(|e| e.event_type().as_str())
        .collect();
    assert_eq!(types, vec!["touchstart", "touchmove", "touchend"]);
    let end = report.events[2].as_touch().expect("touch event");
    assert!(end.touches.is_empty());
    assert!(report.events[0].is_default_prevented());
}

#[tokio::test]
async fn test_render_queued_export() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = build_host(HostConfig::default().with_temp_dir(dir.path()), false);
    let script: RenderScript = serde_json::from_str(
        r##"{"width": 8, "height": 8, "context": "webgl",
            "ops": [{"op": "clearColor", "color": "#00ff00"}, {"op": "clear"}],
            "export": {"fileType": "jpg", "quality": 0.9}}"##,
    )
    .expect("script");

    let report = render(&host, &script, ExportMode::Queued)
        .await
        .expect("render");
    let path = report.temp_file_path.expect("path");
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
}

#[tokio::test]
async fn test_render_rejects_op_for_other_context() {
    let dir = tempfile::tempdir().expect("tempdir");
    let host = build_host(HostConfig::default().with_temp_dir(dir.path()), false);
    let script: RenderScript =
        serde_json::from_str(r#"{"width": 4, "height": 4, "ops": [{"op": "clear"}]}"#)
            .expect("script");

    let err = render(&host, &script, ExportMode::Sync)
        .await
        .expect_err("clear on 2d");
    assert!(err.to_string().contains("requires a webgl context"));
}

#[tokio::test]
async fn test_info_prints_system_info() {
    let args = CliArgs::try_parse_from(["minihost", "info"]).expect("parse");
    let output = minihost_cli::run(args).await.expect("info");
    let info: Value = serde_json::from_str(&output).expect("json");
    assert!(info["windowWidth"].is_u64());
    assert!(info["SDKVersion"].is_string());
}

#[tokio::test]
async fn test_auth_denied_reports_message() {
    let args = CliArgs::try_parse_from(["minihost", "auth", "--scope", "scope.camera", "--deny"])
        .expect("parse");
    let output = minihost_cli::run(args).await.expect("auth");
    let report: Value = serde_json::from_str(&output).expect("json");
    assert_eq!(report["scope"], "scope.camera");
    assert!(report["errMsg"]
        .as_str()
        .is_some_and(|m| m.starts_with("authorize:fail")));
    assert_eq!(report["authSetting"]["scope.camera"], false);
}
