//! Running `ruff check` as a bounded child process.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time;

use crate::error::ScanError;

/// Per-invocation wall clock limit.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(100);

/// Stdout beyond this is dropped (and the JSON will fail to parse).
pub const MAX_STDOUT_BYTES: usize = 100 * 1024 * 1024;

const MAX_STDERR_BYTES: usize = 64 * 1024;

/// How long to wait for a killed child to be reaped.
const KILL_WAIT: Duration = Duration::from_secs(2);

/// Captured output of one finished invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
    pub truncated_stdout: bool,
}

pub type RunFut<'a> = Pin<Box<dyn Future<Output = Result<CheckOutput, ScanError>> + Send + 'a>>;

/// Runs `<binary> <args...>` in `cwd` and collects its output.
pub trait CheckRunner: Send + Sync {
    fn run<'a>(&'a self, binary: &'a Path, args: &'a [String], cwd: &'a Path) -> RunFut<'a>;
}

/// The real runner: a tokio child with piped output, a timeout and a kill guard.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    max_stdout_bytes: usize,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            timeout: CHECK_TIMEOUT,
            max_stdout_bytes: MAX_STDOUT_BYTES,
        }
    }
}

impl ProcessRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run_inner(
        &self,
        binary: &Path,
        args: &[String],
        cwd: &Path,
    ) -> Result<CheckOutput, ScanError> {
        let mut cmd = Command::new(binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .current_dir(cwd);

        #[cfg(unix)]
        set_new_session(&mut cmd);

        let child = cmd.spawn().map_err(|source| ScanError::Spawn {
            binary: binary.to_path_buf(),
            source,
        })?;
        let mut guard = ChildGuard::new(child);

        let stdout = guard
            .child_mut()
            .stdout
            .take()
            .ok_or(ScanError::StdioUnavailable("stdout"))?;
        let stderr = guard
            .child_mut()
            .stderr
            .take()
            .ok_or(ScanError::StdioUnavailable("stderr"))?;

        let stdout_task = tokio::spawn(read_to_end_limited(stdout, self.max_stdout_bytes));
        let stderr_task = tokio::spawn(read_to_end_limited(stderr, MAX_STDERR_BYTES));

        // Reaped children have no pid, so remember the group for later kills.
        let pgid = guard.child_mut().id();
        let deadline = time::Instant::now() + self.timeout;
        let timed_out = ScanError::TimedOut {
            secs: self.timeout.as_secs(),
        };

        let status = if let Ok(res) = time::timeout_at(deadline, guard.child_mut().wait()).await {
            res.map_err(ScanError::Wait)?
        } else {
            kill_tree(guard.child_mut());
            let _ = time::timeout(KILL_WAIT, guard.child_mut().wait()).await;
            guard.disarm();
            stdout_task.abort();
            stderr_task.abort();
            return Err(timed_out);
        };
        guard.disarm();

        // A background grandchild can hold the pipes open after the child exits.
        let readers = async { (stdout_task.await, stderr_task.await) };
        let (stdout, stderr) = if let Ok(joined) = time::timeout_at(deadline, readers).await {
            joined
        } else {
            kill_group(pgid);
            return Err(timed_out);
        };
        let (stdout, truncated_stdout) = stdout.unwrap_or_else(|_| (Vec::new(), false));
        let (stderr, _) = stderr.unwrap_or_else(|_| (Vec::new(), false));

        Ok(CheckOutput {
            stdout,
            stderr,
            exit_code: status.code(),
            truncated_stdout,
        })
    }
}

impl CheckRunner for ProcessRunner {
    fn run<'a>(&'a self, binary: &'a Path, args: &'a [String], cwd: &'a Path) -> RunFut<'a> {
        Box::pin(self.run_inner(binary, args, cwd))
    }
}

/// Kills the child (and its process group on Unix) if dropped while armed.
///
/// Covers cancellation of the owning future between spawn and reap.
struct ChildGuard {
    child: Child,
    armed: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child, armed: true }
    }

    fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.armed {
            kill_tree(&mut self.child);
            let _ = self.child.try_wait();
        }
    }
}

/// Kill the child and, on Unix, the process group it leads.
fn kill_tree(child: &mut Child) {
    kill_group(child.id());
    let _ = child.start_kill();
}

/// SIGKILL the process group led by `pgid`. No-op off Unix.
fn kill_group(pgid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pgid) = pgid.and_then(|pid| libc::pid_t::try_from(pid).ok()) {
            // SAFETY: killpg only signals; the group was created by set_new_session.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;
}

/// Put the child in its own session so a kill reaches anything it spawned.
#[cfg(unix)]
fn set_new_session(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // SAFETY: setsid is async-signal-safe and is the only call made in the forked child.
    unsafe {
        cmd.as_std_mut().pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

async fn read_to_end_limited<R: tokio::io::AsyncRead + Unpin + Send + 'static>(
    mut reader: R,
    max_bytes: usize,
) -> (Vec<u8>, bool) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 8192];
    let mut truncated = false;

    loop {
        let n = match reader.read(&mut tmp).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        let remaining = max_bytes.saturating_sub(buf.len());
        let take = remaining.min(n);
        buf.extend_from_slice(&tmp[..take]);
        if take < n {
            // Keep draining so the child never blocks on a full pipe.
            truncated = true;
        }
    }

    (buf, truncated)
}

/// Arguments for one `ruff check` invocation over `root`.
#[must_use]
pub fn check_args(flags: &[String], root: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "check".into(),
        "--quiet".into(),
        "--output-format=json".into(),
    ];
    args.extend(flags.iter().cloned());
    args.push(root.display().to_string());
    args
}

/// Directory to run in: the root itself, or its parent when the root is a file.
pub(crate) fn working_dir(root: &Path) -> PathBuf {
    if root.is_dir() {
        return root.to_path_buf();
    }
    root.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_args_order() {
        let args = check_args(
            &["--line-length=100".to_string(), "--select=E,F".to_string()],
            Path::new("/project"),
        );
        assert_eq!(
            args,
            vec![
                "check",
                "--quiet",
                "--output-format=json",
                "--line-length=100",
                "--select=E,F",
                "/project"
            ]
        );
    }

    #[test]
    fn working_dir_of_file_is_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.py");
        std::fs::write(&file, "").unwrap();
        assert_eq!(working_dir(&file), dir.path());
        assert_eq!(working_dir(dir.path()), dir.path());
    }

    #[tokio::test]
    async fn read_to_end_limited_truncates_but_drains() {
        let data = vec![b'x'; 20_000];
        let (buf, truncated) = read_to_end_limited(std::io::Cursor::new(data), 100).await;
        assert_eq!(buf.len(), 100);
        assert!(truncated);
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ProcessRunner::new();
        let err = runner
            .run(&dir.path().join("no-such-ruff"), &[], dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Spawn { .. }));
    }

    #[cfg(unix)]
    mod unix {
        use std::os::unix::fs::PermissionsExt;

        use super::*;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-ruff");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn captures_stdout_and_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let bin = script(dir.path(), "echo '[]'; echo oops >&2; exit 1");
            let out = ProcessRunner::new()
                .run(&bin, &[], dir.path())
                .await
                .unwrap();
            assert_eq!(out.stdout, b"[]\n");
            assert_eq!(out.stderr, b"oops\n");
            assert_eq!(out.exit_code, Some(1));
            assert!(!out.truncated_stdout);
        }

        #[tokio::test]
        async fn hung_process_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let bin = script(dir.path(), "sleep 30");
            let err = ProcessRunner::new()
                .with_timeout(Duration::from_millis(200))
                .run(&bin, &[], dir.path())
                .await
                .unwrap_err();
            assert!(matches!(err, ScanError::TimedOut { .. }));
        }

        #[tokio::test]
        async fn grandchild_holding_stdout_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let bin = script(dir.path(), "sleep 30 &\necho '[]'");
            let started = std::time::Instant::now();
            let err = ProcessRunner::new()
                .with_timeout(Duration::from_millis(300))
                .run(&bin, &[], dir.path())
                .await
                .unwrap_err();
            assert!(matches!(err, ScanError::TimedOut { .. }));
            assert!(started.elapsed() < Duration::from_secs(5));
        }
    }
}
