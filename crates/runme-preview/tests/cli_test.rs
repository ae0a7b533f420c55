//! Integration tests for the runme-preview binary.

use std::process::{Command, Stdio};

fn runme_preview() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_runme-preview"));
    command.env("RUST_LOG", "off").stdin(Stdio::null());
    command
}

#[test]
fn test_help() {
    let output = runme_preview().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage: runme-preview"));
    assert!(stdout.contains("--force"));
}

#[test]
fn test_version() {
    let output = runme_preview().arg("-V").output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("runme-preview {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn test_complete() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("guide.md"), "# Guide").unwrap();
    std::fs::create_dir(dir.path().join("docs")).unwrap();

    let output = runme_preview()
        .arg("--complete")
        .arg("")
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "docs/\nguide.md\n");
}

#[test]
fn test_unsupported_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "plain text").unwrap();

    let output = runme_preview().arg(&notes).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: Unsupported file"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn test_unreadable_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    let output = runme_preview()
        .arg(dir.path().join("notes.md"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: Cannot read"));
}

#[test]
fn test_empty_stdin_fails() {
    let output = runme_preview().output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Buffer is empty"));
}

#[test]
fn test_unknown_option() {
    let output = runme_preview().arg("--frobnicate").output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown option"));
}
