//! `ptm` binary tests
//!
//! Runs the built binary against temporary directories and the bundled
//! type catalog.
//!
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const CATALOG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/types.toml");

fn ptm(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ptm"))
        .args(["--types", CATALOG, "--log-level", "warn"])
        .args(args)
        .output()
        .unwrap()
}

fn maven_dir(root: &Path) {
    fs::create_dir_all(root.join("src/main/java")).unwrap();
    fs::write(
        root.join("pom.xml"),
        "<project><artifactId>demo</artifactId><source>17</source></project>",
    )
    .unwrap();
    fs::write(root.join("src/main/java/App.java"), "class App {}").unwrap();
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_types_lists_catalog() {
    let output = ptm(&["types"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("blank (Blank)"));
    assert!(text.contains("maven (Maven) [primary, auto-detect]"));
    assert!(text.contains("* languageLevel"));
}

#[test]
fn test_resolve_json() {
    let dir = tempfile::tempdir().unwrap();
    maven_dir(dir.path());

    let output = ptm(&["resolve", dir.path().to_str().unwrap(), "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["project_type"], "maven");
    assert_eq!(rows[0]["attributes"]["languageLevel"]["values"][0], "17");
}

#[test]
fn test_estimate_text() {
    let dir = tempfile::tempdir().unwrap();
    maven_dir(dir.path());

    let output = ptm(&["estimate", dir.path().to_str().unwrap(), "--type", "maven"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("artifactId = demo (Estimated)"));
}

#[test]
fn test_estimate_unknown_type_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = ptm(&["estimate", dir.path().to_str().unwrap(), "--type", "gradle"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("gradle"));
}

#[test]
fn test_tree_with_detection() {
    let dir = tempfile::tempdir().unwrap();
    maven_dir(&dir.path().join("app"));
    fs::write(dir.path().join("README.md"), "hi").unwrap();

    let output = ptm(&["tree", dir.path().to_str().unwrap(), "--detect", "--depth", "1"]);
    assert!(output.status.success());
    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines, vec!["workspace", "  README.md", "  app/ (maven?)"]);
}
