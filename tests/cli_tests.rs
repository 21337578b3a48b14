use std::ffi::OsStr;
use std::process::{Command, Output};

mod fixtures;

use fixtures::*;

fn compile<S: AsRef<OsStr>>(args: &[S]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_compile"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_usage() {
    let ws = Workspace::new();
    let output = compile(&[&ws.input_dir(), &ws.output_dir()]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage: compile"));
}

#[test]
fn test_exit_codes() {
    let ws = Workspace::new();
    ws.write_script("greet.oud", GREET);
    let args = [ws.input_dir(), ws.output_dir(), ws.cache_dir()];

    let output = compile(&args);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("greet.oudh"));

    let output = compile(&args);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("All files are up to date"));

    ws.write_script("broken.oud", BROKEN);
    let output = compile(&args);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("broken.oud"));
    assert!(ws.config().cache_path().is_file());
}

#[test]
fn test_missing_input_directory() {
    let ws = Workspace::new();
    let missing = ws.root.path().join("missing");
    let output = compile(&[&missing, &ws.output_dir(), &ws.cache_dir()]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[test]
fn test_uncreatable_cache_directory() {
    let ws = Workspace::new();
    ws.write_script("greet.oud", GREET);
    let blocker = ws.root.path().join("blocker");
    std::fs::write(&blocker, "a file, not a directory").unwrap();
    let output = compile(&[ws.input_dir(), ws.output_dir(), blocker.join("cache")]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error with directory"));
}
