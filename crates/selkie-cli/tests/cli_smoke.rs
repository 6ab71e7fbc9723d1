use assert_cmd::prelude::*;
use std::fs;
use std::process::Command;

const MODEL: &str = r#"{
  "kind": "class",
  "entities": [
    { "code": "G", "kind": { "group": "package" } },
    { "code": "A", "kind": { "leaf": "class" }, "parent": "G" },
    { "code": "B", "kind": { "leaf": "class" } }
  ],
  "links": [ { "from": "A", "to": "B", "label": "owns" } ]
}"#;

const BROKEN: &str = r#"{
  "kind": "class",
  "entities": [
    { "code": "G", "kind": { "group": "namespace" }, "packed": true },
    { "code": "a", "kind": { "leaf": "class" }, "parent": "G" },
    { "code": "b", "kind": { "leaf": "class" } }
  ],
  "links": [ { "from": "b", "to": "G" } ]
}"#;

#[test]
fn cli_renders_svg_to_a_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let model = tmp.path().join("model.json");
    fs::write(&model, MODEL).expect("write model");
    let out = tmp.path().join("out.svg");

    let exe = assert_cmd::cargo_bin!("selkie");
    Command::new(exe)
        .args([
            "-o",
            out.to_string_lossy().as_ref(),
            model.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let svg = fs::read_to_string(&out).expect("read svg");
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(r#"data-entity="A""#));
    assert!(svg.contains(r#"data-entity="G""#));
}

#[test]
fn cli_prints_scene_json_with_config() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let model = tmp.path().join("model.json");
    fs::write(&model, MODEL).expect("write model");
    let config = tmp.path().join("config.json");
    fs::write(&config, r#"{ "font_size": 12 }"#).expect("write config");

    let exe = assert_cmd::cargo_bin!("selkie");
    let output = Command::new(exe)
        .args([
            "--format",
            "json",
            "--config",
            config.to_string_lossy().as_ref(),
            model.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run cli");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(value["metadata"]["entities"], 2);
    assert_eq!(value["scene"]["nodes"].as_array().map(Vec::len), Some(2));
    assert_eq!(value["scene"]["clusters"].as_array().map(Vec::len), Some(1));
}

#[test]
fn cli_writes_the_placeholder_and_fails_on_layout_errors() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let model = tmp.path().join("broken.json");
    fs::write(&model, BROKEN).expect("write model");
    let out = tmp.path().join("out.svg");

    let exe = assert_cmd::cargo_bin!("selkie");
    let output = Command::new(exe)
        .args([
            "-o",
            out.to_string_lossy().as_ref(),
            model.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run cli");
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invariant violation"));

    let svg = fs::read_to_string(&out).expect("read svg");
    assert!(svg.contains("Please report it at"));
}

#[test]
fn cli_rejects_unknown_flags() {
    let exe = assert_cmd::cargo_bin!("selkie");
    Command::new(exe).arg("--bogus").assert().code(2);
}
