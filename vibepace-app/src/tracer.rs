//! Traced-child lifecycle: fork, request tracing, single-step.
//!
//! The child requests `PTRACE_TRACEME`, stops itself, then execs the target
//! program. The parent resumes it one syscall-stop at a time via
//! [`TracedChild::step`], which is called once per pacing tick.

use std::ffi::CString;

use anyhow::{Context, Result};
use nix::sys::ptrace;
use nix::sys::signal::{raise, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{execvp, fork, ForkResult, Pid};
use tracing::info;

/// What the most recent single-step observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The child hit the next syscall-stop and is waiting to be resumed.
    Stopped,
    /// The child exited with this status code.
    Exited(i32),
    /// The child was terminated by this signal.
    Signaled(Signal),
}

/// A child process being syscall-stepped under ptrace.
#[derive(Debug)]
pub struct TracedChild {
    pid: Pid,
}

impl TracedChild {
    /// Fork and exec `command[0]` with the remaining arguments, traced.
    ///
    /// Returns once the child has stopped itself and is ready for the first
    /// [`step`](Self::step).
    pub fn spawn(command: &[String]) -> Result<Self> {
        // Argv is built before the fork so the child branch does no
        // allocation between fork and exec.
        let argv: Vec<CString> = command
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<std::result::Result<_, _>>()
            .context("command argument contains a NUL byte")?;

        match unsafe { fork() }.context("fork failed")? {
            ForkResult::Child => {
                if ptrace::traceme().is_err() {
                    std::process::exit(126);
                }
                if raise(Signal::SIGSTOP).is_err() {
                    std::process::exit(126);
                }

                // Does not return on success.
                let _ = execvp(&argv[0], &argv);
                eprintln!("vibepace: failed to launch '{}'", command[0]);
                std::process::exit(127);
            }
            ForkResult::Parent { child } => {
                // Wait for the child's self-inflicted SIGSTOP.
                waitpid(child, None).context("waiting for initial child stop")?;
                info!(pid = child.as_raw(), program = %command[0], "traced child ready");
                Ok(Self { pid: child })
            }
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Resume the child until its next syscall-stop and report what happened.
    pub fn step(&self) -> Result<StepOutcome> {
        ptrace::syscall(self.pid, None).context("resuming traced child")?;

        match waitpid(self.pid, None).context("waiting for traced child")? {
            WaitStatus::Exited(_, code) => Ok(StepOutcome::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Ok(StepOutcome::Signaled(signal)),
            _ => Ok(StepOutcome::Stopped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_interior_nul() {
        let err = TracedChild::spawn(&["tr\0ue".to_string()]).unwrap_err();
        assert!(err.to_string().contains("NUL"));
    }
}
