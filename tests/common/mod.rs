#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use assert_cmd::Command;
use once_cell::sync::Lazy;
use tempfile::TempDir;

pub const BIN: &str = "liquidity_core_cli";
pub const TODAY: &str = "2025-03-03";

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Fresh directory used as `CASSA_HOME`.
pub fn test_home() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

/// Script-mode CLI pinned to [`TODAY`] and rooted at `home`.
pub fn cli(home: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin(BIN).expect("binary exists");
    cmd.env("CASSA_CLI_SCRIPT", "1")
        .env("CASSA_HOME", home)
        .env("CASSA_TODAY", TODAY)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

/// Runs `script` and returns stdout.
pub fn run(home: &PathBuf, script: &str) -> String {
    let output = cli(home)
        .write_stdin(script.to_string())
        .output()
        .expect("run cli");
    assert!(output.status.success(), "cli failed: {output:?}");
    String::from_utf8(output.stdout).expect("utf8 stdout")
}

/// Short id printed by `add` ("Registrata scadenza <id> ...").
pub fn registered_id(stdout: &str) -> String {
    let line = stdout
        .lines()
        .find(|line| line.contains("Registrata scadenza"))
        .expect("registration line");
    line.split_whitespace()
        .skip_while(|word| *word != "scadenza")
        .nth(1)
        .expect("id after `scadenza`")
        .to_string()
}
