//! Synchronous external process invocation with combined log capture.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    #[error("empty command line")]
    EmptyCommand,
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}; log:\n{log}")]
    NonZeroExit {
        program: String,
        status: std::process::ExitStatus,
        log: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Observer handed the live child process for the duration of a run.
///
/// The sampler only reads; the invoker detaches it unconditionally on every
/// exit path.
pub trait ProcessMonitor {
    fn attach(&self, pid: u32);
    fn detach(&self);
}

/// Shared slot holding the PID of the currently running child, if any.
#[derive(Clone, Default)]
pub struct PidSlot(Arc<Mutex<Option<u32>>>);

impl PidSlot {
    pub fn current(&self) -> Option<u32> {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProcessMonitor for PidSlot {
    fn attach(&self, pid: u32) {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(pid);
    }

    fn detach(&self) {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

struct MonitorGuard<'a>(&'a dyn ProcessMonitor);

impl Drop for MonitorGuard<'_> {
    fn drop(&mut self) {
        self.0.detach();
    }
}

/// Run `argv` in `workdir`, appending interleaved stdout/stderr to the log
/// file, and block until the child exits.
///
/// A non-zero exit reads the full log back and returns it in the error.
pub fn run_logged(
    argv: &[String],
    workdir: &Path,
    log_path: &Path,
    monitor: Option<&dyn ProcessMonitor>,
) -> Result<(), ProcessError> {
    let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;
    log::info!("commandLine: {}", argv.join(" "));
    log::info!("logFile: {}", log_path.display());

    let log_out = OpenOptions::new().create(true).append(true).open(log_path)?;
    let log_err = log_out.try_clone()?;

    let mut child = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdout(Stdio::from(log_out))
        .stderr(Stdio::from(log_err))
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    let _guard = monitor.map(|m| {
        m.attach(child.id());
        MonitorGuard(m)
    });

    let status = child.wait()?;
    if !status.success() {
        let log = fs::read_to_string(log_path)
            .unwrap_or_else(|err| format!("<log unreadable: {err}>"));
        return Err(ProcessError::NonZeroExit {
            program: program.clone(),
            status,
            log,
        });
    }
    Ok(())
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[test]
    fn captures_both_streams_in_one_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("run.log");
        run_logged(
            &sh("echo to-stdout; echo to-stderr 1>&2"),
            dir.path(),
            &log_path,
            None,
        )
        .expect("run");
        let log = fs::read_to_string(&log_path).expect("log");
        assert!(log.contains("to-stdout"));
        assert!(log.contains("to-stderr"));
    }

    #[test]
    fn log_is_opened_for_append() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("run.log");
        fs::write(&log_path, "earlier run\n").expect("seed log");
        run_logged(&sh("echo later run"), dir.path(), &log_path, None).expect("run");
        let log = fs::read_to_string(&log_path).expect("log");
        assert!(log.starts_with("earlier run\n"));
        assert!(log.contains("later run"));
    }

    #[test]
    fn non_zero_exit_carries_the_log_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("run.log");
        let err = run_logged(&sh("echo boom; exit 3"), dir.path(), &log_path, None).unwrap_err();
        match err {
            ProcessError::NonZeroExit { status, log, .. } => {
                assert_eq!(status.code(), Some(3));
                assert!(log.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_command_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = run_logged(&[], dir.path(), &dir.path().join("run.log"), None).unwrap_err();
        assert!(matches!(err, ProcessError::EmptyCommand));
    }

    #[test]
    fn runs_in_the_requested_working_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("run.log");
        run_logged(&sh("pwd"), dir.path(), &log_path, None).expect("run");
        let log = fs::read_to_string(&log_path).expect("log");
        let canonical = dir.path().canonicalize().expect("canonicalize");
        assert!(log.trim().ends_with(canonical.to_str().expect("utf8 path")));
    }

    struct RecordingMonitor {
        attached: AtomicU32,
        detached: AtomicBool,
    }

    impl ProcessMonitor for RecordingMonitor {
        fn attach(&self, pid: u32) {
            self.attached.store(pid, Ordering::SeqCst);
        }

        fn detach(&self) {
            self.detached.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn monitor_is_attached_and_detached_even_on_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let monitor = RecordingMonitor {
            attached: AtomicU32::new(0),
            detached: AtomicBool::new(false),
        };
        let result = run_logged(
            &sh("exit 1"),
            dir.path(),
            &dir.path().join("run.log"),
            Some(&monitor),
        );
        assert!(result.is_err());
        assert_ne!(monitor.attached.load(Ordering::SeqCst), 0);
        assert!(monitor.detached.load(Ordering::SeqCst));
    }

    #[test]
    fn pid_slot_clears_after_the_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let slot = PidSlot::default();
        run_logged(
            &sh("true"),
            dir.path(),
            &dir.path().join("run.log"),
            Some(&slot),
        )
        .expect("run");
        assert_eq!(slot.current(), None);
    }
}
