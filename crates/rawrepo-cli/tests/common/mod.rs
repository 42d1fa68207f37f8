#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output, Stdio};

/// Run the CLI against the repository at `root`.
pub fn run_cli(root: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rawrepo"));
    cmd.args(args);
    cmd.env("RAWREPO_ROOT", root);
    cmd.env("HOME", root.join("home"));
    cmd.env("XDG_DATA_HOME", root.join("home").join("data"));
    cmd.env_remove("RUST_LOG");
    cmd.stdin(Stdio::null());
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI and expect success, returning stdout.
pub fn run_cli_success(root: &Path, args: &[&str]) -> String {
    let output = run_cli(root, args);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Write `content` to a file under `root` and store it as a record.
pub fn put_record(root: &Path, id: &str, mimetype: &str, content: &str) {
    let file = root.join(format!("{}.txt", id.replace(':', "_")));
    std::fs::write(&file, content).unwrap();
    run_cli_success(
        root,
        &["record", "put", id, "--mimetype", mimetype, "--file", file.to_str().unwrap()],
    );
}
