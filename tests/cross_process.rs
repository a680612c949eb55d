//! Integration tests that drive the `docstore` binary as separate processes.
//!
//! These check that the lock excludes other processes, not only other
//! threads, and that edits made by one process are seen by the next holder.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};

use docstore::directives::Directives;
use docstore::storage::Storage;
use tempfile::TempDir;

/// Run docstore to completion.
fn run_docstore(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_docstore"))
        .args(args)
        .output()
        .expect("run docstore")
}

/// Start `docstore hold` and wait until it reports holding the lock.
fn spawn_holder(file: &Path, millis: u64) -> Child {
    let mut child = Command::new(env!("CARGO_BIN_EXE_docstore"))
        .arg("hold")
        .arg(file)
        .args(["--millis", &millis.to_string()])
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn docstore hold");

    let stdout = child.stdout.take().expect("child stdout");
    let mut line = String::new();
    BufReader::new(stdout)
        .read_line(&mut line)
        .expect("read child stdout");
    assert_eq!(line.trim(), "locked");

    child
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_child_process_blocks_parent() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("store.xml");
    let storage = Storage::new(&file);

    let mut child = spawn_holder(&file, 1500);

    assert!(!storage.try_lock().unwrap(), "child holds the lock");

    let status = run_docstore(&["status", file.to_str().unwrap()]);
    assert!(status.status.success());
    assert!(stdout_of(&status).starts_with("locked"));

    let started = Instant::now();
    storage.lock().unwrap();
    assert!(
        started.elapsed() >= Duration::from_millis(500),
        "lock() should have waited for the child"
    );
    storage.unlock().unwrap();

    assert!(child.wait().unwrap().success());

    let status = run_docstore(&["status", file.to_str().unwrap()]);
    assert_eq!(stdout_of(&status).trim(), "unlocked");
}

#[test]
fn test_child_edits_visible_to_parent() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("store.xml");
    let storage = Storage::new(&file);

    storage.lock().unwrap();
    storage
        .apply(&Directives::new().add("parent").set("first"))
        .unwrap();
    storage.unlock().unwrap();

    let output = run_docstore(&[
        "apply",
        file.to_str().unwrap(),
        r#"XPATH "/github"; ADD "test"; SET "hello, world";"#,
    ]);
    assert!(output.status.success(), "{:?}", output);

    storage.lock().unwrap();
    let doc = storage.xml().unwrap();
    storage.unlock().unwrap();

    assert_eq!(doc.xpath("/github/parent").unwrap(), vec!["first"]);
    assert_eq!(doc.xpath("/github/test/text()").unwrap(), vec!["hello, world"]);

    let query = run_docstore(&["query", file.to_str().unwrap(), "/github/test/text()"]);
    assert!(query.status.success());
    assert_eq!(stdout_of(&query), "hello, world\n");
}

#[test]
fn test_lock_timeout_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("store.xml");
    let config = temp_dir.path().join("docstore.yaml");
    std::fs::write(&config, "lock_timeout_ms: 100\n").unwrap();

    let storage = Storage::new(&file);
    storage.lock().unwrap();

    let output = run_docstore(&[
        "--config",
        config.to_str().unwrap(),
        "show",
        file.to_str().unwrap(),
    ]);
    storage.unlock().unwrap();

    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("timed out"));
}

#[test]
fn test_exit_codes() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("store.xml");
    let file = file.to_str().unwrap();

    let output = run_docstore(&["query", file, "/github["]);
    assert_eq!(output.status.code(), Some(2));

    let output = run_docstore(&["apply", file, "UP;"]);
    assert_eq!(output.status.code(), Some(2));

    let output = run_docstore(&["apply", file]);
    assert_eq!(output.status.code(), Some(1));

    std::fs::write(file, "<github>").unwrap();
    let output = run_docstore(&["show", file]);
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn test_show_prints_document() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("store.xml");
    let config = temp_dir.path().join("docstore.yaml");
    std::fs::write(&config, "xml_declaration: false\nroot_element: data\n").unwrap();

    let output = run_docstore(&[
        "show",
        file.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert_eq!(stdout_of(&output), "<data/>\n");
    assert!(!file.exists());
}
