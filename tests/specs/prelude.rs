//! Test helpers for behavioral specifications.
//!
//! Black-box harness that drives the `coven` CLI and, through it, a real
//! `covend` daemon process over its Unix-socket HTTP API, the same
//! spawn-the-real-binaries-and-assert-on-stdout shape the pack's own CLI
//! test suites use.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{Duration, Instant};

pub const POLL_INTERVAL_MS: u64 = 20;
pub const POLL_TIMEOUT_MS: u64 = 5_000;

/// Returns the path to a binary built alongside the test harness, checking
/// the llvm-cov target directory first so coverage runs resolve correctly.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

fn coven_binary() -> PathBuf {
    binary_path("coven")
}

pub fn covend_binary() -> PathBuf {
    binary_path("covend")
}

/// Create a CLI builder for `coven` commands against `workspace`.
pub fn coven(workspace: &Path) -> CliBuilder {
    CliBuilder::new(workspace)
}

/// High-level CLI builder for fluent test assertions.
pub struct CliBuilder {
    args: Vec<String>,
    workspace: PathBuf,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new(workspace: &Path) -> Self {
        Self {
            args: vec!["-C".to_string(), workspace.to_string_lossy().into_owned()],
            workspace: workspace.to_path_buf(),
            envs: vec![("COVEND_PATH".into(), covend_binary().to_string_lossy().into_owned())],
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.envs.push((key.to_string(), value.as_ref().to_string()));
        self
    }

    fn command(self) -> Command {
        let mut cmd = Command::new(coven_binary());
        cmd.args(&self.args).current_dir(&self.workspace);
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("coven should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("coven should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Parses stdout as the pretty-printed JSON `coven` prints for every
    /// data-bearing command.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout())
            .unwrap_or_else(|e| panic!("stdout was not JSON ({e}): {}", self.stdout()))
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{expected}'\nstdout: {stdout}"
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{expected}'\nstderr: {stderr}"
        );
        self
    }
}

/// Polls `condition` until it returns true or `POLL_TIMEOUT_MS` elapses.
pub fn wait_for<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    let timeout = Duration::from_millis(POLL_TIMEOUT_MS);
    let poll_interval = Duration::from_millis(POLL_INTERVAL_MS);
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

/// A temporary workspace: a git repository with one commit on `main`, plus
/// the `covend` lifecycle bound to it for the duration of the test.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    /// Creates a git repository with an initial commit on `main` — the
    /// worktree manager always branches task worktrees off a base branch
    /// that must already exist and have a head commit.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path();
        run(Command::new("git").arg("init").arg("-q").current_dir(path));
        run(Command::new("git")
            .args(["symbolic-ref", "HEAD", "refs/heads/main"])
            .current_dir(path));
        run(Command::new("git")
            .args(["config", "user.email", "coven-test@example.com"])
            .current_dir(path));
        run(Command::new("git")
            .args(["config", "user.name", "Coven Test"])
            .current_dir(path));
        std::fs::write(path.join("README.md"), "seed\n").expect("write seed file");
        run(Command::new("git").args(["add", "."]).current_dir(path));
        run(Command::new("git")
            .args(["commit", "-q", "-m", "initial commit"])
            .current_dir(path));
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn coven(&self) -> CliBuilder {
        coven(self.path())
    }

    /// Writes a file relative to the workspace root, creating parent
    /// directories as needed.
    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(full_path, content).expect("write file");
    }

    /// Writes an executable fake-agent script at `path` (relative to the
    /// workspace) that ignores its argv (the rendered prompt arrives as the
    /// final argument per spec.md §4.6) and prints `body` followed by exit
    /// code 0 — the minimal shape `ProcessAgentAdapter` expects (completion
    /// is the last JSON object in stdout).
    pub fn fake_agent(&self, path: impl AsRef<Path>, body: &str) -> PathBuf {
        let full_path = self.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        let script = format!("#!/bin/sh\n{body}\n");
        std::fs::write(&full_path, script).expect("write fake agent script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&full_path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&full_path, perms).unwrap();
        }
        full_path
    }

    /// Writes an executable script at `path` with the exact `body` given.
    /// The rendered prompt arrives as the script's final argv entry, not
    /// over stdin — `ProcessAgentAdapter` never closes a step's stdin (it
    /// stays open for a later question answer), so a script that wants to
    /// read a question's answer should `read -r` exactly once per answer it
    /// expects and then exit on its own; it must never block trying to read
    /// the prompt from stdin, since nothing is ever written there until a
    /// question is answered.
    pub fn raw_agent_script(&self, path: impl AsRef<Path>, body: &str) -> PathBuf {
        let full_path = self.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&full_path, body).expect("write agent script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&full_path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&full_path, perms).unwrap();
        }
        full_path
    }

    /// Writes `.coven/config.yaml` pointing `agent_command` at a fake agent
    /// script, with an otherwise-default configuration.
    pub fn configure_agent(&self, agent_path: &Path) {
        self.file(
            ".coven/config.yaml",
            &format!("agent_command: [\"{}\"]\n", agent_path.display()),
        );
    }

    pub fn daemon_start(&self) {
        self.coven().args(&["daemon", "start"]).passes();
    }

    /// Starts `covend` and immediately pauses its reconciliation loop
    /// (`coven session stop`), so ready tasks sit untouched instead of being
    /// auto-claimed and launched into a workflow — the shape most task/CRUD
    /// and matcher tests want, since they manipulate tasks directly and
    /// don't want the scheduler racing them for a claim.
    pub fn daemon_start_paused(&self) {
        self.daemon_start();
        self.coven().args(&["session", "stop"]).passes();
    }

    pub fn daemon_stop(&self) {
        let _ = self.coven().args(&["daemon", "stop"]).passes();
        wait_for(|| !self.socket_path().exists());
    }

    pub fn socket_path(&self) -> PathBuf {
        self.path().join(".coven/covend.sock")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.path().join(".coven/covend.pid")
    }

    /// Creates a task via `coven task create` and returns its id.
    pub fn create_task(&self, title: &str, extra_args: &[&str]) -> String {
        let mut args = vec!["task", "create", title];
        args.extend_from_slice(extra_args);
        self.coven()
            .args(&args)
            .passes()
            .json()
            .get("id")
            .and_then(|v| v.as_str())
            .expect("created task should have an id")
            .to_string()
    }

    /// Reads the task field `field` (a dotted JSON pointer segment) for
    /// `task_id` by shelling out to `coven task get`.
    pub fn task_status(&self, task_id: &str) -> String {
        self.coven()
            .args(&["task", "get", task_id])
            .passes()
            .json()
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    }

    pub fn workflow_for_task(&self, task_id: &str) -> Option<serde_json::Value> {
        let workflows = self.coven().args(&["workflow", "list"]).passes().json();
        workflows
            .as_array()?
            .iter()
            .find(|w| w.get("task_id").and_then(|v| v.as_str()) == Some(task_id))
            .cloned()
    }

    pub fn workflow_status_for_task(&self, task_id: &str) -> String {
        self.workflow_for_task(task_id)
            .and_then(|w| w.get("status").and_then(|v| v.as_str()).map(str::to_string))
            .unwrap_or_default()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let mut cmd = coven(self.path()).args(&["daemon", "stop"]).command();
        cmd.stdout(std::process::Stdio::null()).stderr(std::process::Stdio::null());
        let _ = cmd.status();
    }
}

fn run(cmd: &mut Command) {
    let status = cmd.status().expect("command should run");
    assert!(status.success(), "command failed: {cmd:?}");
}
