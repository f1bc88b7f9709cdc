//! Best-effort process termination by program name

use async_trait::async_trait;
use focus_host_api::{Capability, HostError, HostResult, ProcessTerminator};
use focus_util::AppId;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Kernel limit on `/proc/<pid>/comm` (excluding the newline)
const COMM_MAX_LEN: usize = 15;

/// Sends SIGTERM to every process whose program matches an app id
///
/// Matching compares the id against `comm` (truncated by the kernel) and
/// against the basename of `argv[0]`. The daemon's own pid is never
/// signalled. Processes that vanish or belong to another user are skipped
/// silently.
#[derive(Debug, Clone)]
pub struct ProcTerminator {
    proc_root: PathBuf,
    own_pid: i32,
}

impl ProcTerminator {
    pub fn new() -> Self {
        Self::with_proc_root("/proc")
    }

    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            own_pid: std::process::id() as i32,
        }
    }

    pub fn is_available(&self) -> bool {
        self.proc_root.is_dir()
    }

    /// Pids whose program matches `name`, excluding our own
    ///
    /// Reads `/proc` synchronously.
    pub fn find_pids(&self, name: &str) -> Vec<i32> {
        let Ok(entries) = std::fs::read_dir(&self.proc_root) else {
            return Vec::new();
        };

        let mut pids: Vec<i32> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str()?.parse::<i32>().ok())
            .filter(|pid| *pid != self.own_pid)
            .filter(|pid| process_matches(&self.proc_root.join(pid.to_string()), name))
            .collect();
        pids.sort_unstable();
        pids
    }
}

impl Default for ProcTerminator {
    fn default() -> Self {
        Self::new()
    }
}

fn process_matches(proc_dir: &Path, name: &str) -> bool {
    if let Ok(comm) = std::fs::read_to_string(proc_dir.join("comm")) {
        let truncated: String = name.chars().take(COMM_MAX_LEN).collect();
        if comm.trim_end() == truncated {
            return true;
        }
    }

    // argv is NUL separated; argv[0] may be a full path
    std::fs::read(proc_dir.join("cmdline"))
        .ok()
        .and_then(|cmdline| {
            let argv0 = cmdline.split(|b| *b == 0).next()?.to_vec();
            let argv0 = String::from_utf8(argv0).ok()?;
            Some(Path::new(&argv0).file_name()? == name)
        })
        .unwrap_or(false)
}

/// Send SIGTERM, treating a vanished or foreign process as success
pub fn terminate_pid(pid: i32) -> HostResult<()> {
    match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) | Err(Errno::EPERM) => {
            debug!(pid, "Process gone or not ours, skipping");
            Ok(())
        }
        Err(e) => Err(HostError::call_failed(
            Capability::Terminator,
            format!("SIGTERM to {} failed: {}", pid, e),
        )),
    }
}

#[async_trait]
impl ProcessTerminator for ProcTerminator {
    async fn kill(&self, id: &AppId) -> HostResult<()> {
        if id.is_empty() {
            return Ok(());
        }

        let scanner = self.clone();
        let name = id.as_str().to_string();
        let pids = tokio::task::spawn_blocking(move || scanner.find_pids(&name))
            .await
            .map_err(|e| HostError::call_failed(Capability::Terminator, e.to_string()))?;
        if pids.is_empty() {
            return Ok(());
        }

        info!(app_id = %id, count = pids.len(), "Terminating restricted app");
        let mut last_err = None;
        for pid in pids {
            if let Err(e) = terminate_pid(pid) {
                last_err = Some(e);
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn fake_proc(entries: &[(i32, &str, &str)]) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        for (pid, comm, argv0) in entries {
            let dir = root.path().join(pid.to_string());
            std::fs::create_dir(&dir).unwrap();
            std::fs::write(dir.join("comm"), format!("{}\n", comm)).unwrap();
            std::fs::write(dir.join("cmdline"), format!("{}\0--flag\0", argv0)).unwrap();
        }
        std::fs::create_dir(root.path().join("sys")).unwrap();
        root
    }

    #[test]
    fn matches_comm_and_argv0() {
        let root = fake_proc(&[
            (100, "game", "/opt/game/game"),
            (101, "bash", "/bin/bash"),
            (102, "python3", "/usr/bin/launcher"),
            (103, "game-server-wor", "/usr/bin/game-server-worker"),
        ]);
        let terminator = ProcTerminator::with_proc_root(root.path());

        assert_eq!(terminator.find_pids("game"), vec![100]);
        assert_eq!(terminator.find_pids("launcher"), vec![102]);
        assert_eq!(terminator.find_pids("game-server-worker"), vec![103]);
        assert!(terminator.find_pids("firefox").is_empty());
    }

    #[test]
    fn own_pid_is_never_matched() {
        let own = std::process::id() as i32;
        let root = fake_proc(&[(own, "focusd", "focusd")]);
        let terminator = ProcTerminator::with_proc_root(root.path());

        assert!(terminator.find_pids("focusd").is_empty());
    }

    #[test]
    fn vanished_process_is_not_an_error() {
        // Above any pid_max the kernel allows
        assert!(terminate_pid(i32::MAX).is_ok());
    }

    #[test]
    fn terminate_running_process() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();

        terminate_pid(child.id() as i32).unwrap();

        let status = child.wait().unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn kill_terminates_matched_process() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id() as i32;
        let root = fake_proc(&[(pid, "focus-test-prog", "/usr/bin/focus-test-prog")]);
        let terminator = ProcTerminator::with_proc_root(root.path());

        terminator
            .kill(&AppId::new("focus-test-prog"))
            .await
            .unwrap();

        let status = child.wait().unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn unknown_app_is_noop() {
        let root = fake_proc(&[]);
        let terminator = ProcTerminator::with_proc_root(root.path());
        assert!(terminator.kill(&AppId::new("nothing")).await.is_ok());
    }
}
