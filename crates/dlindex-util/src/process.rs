use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::errors::DlIndexError;
use crate::redact::Redactor;

/// Builder for constructing and executing external processes.
///
/// Provides a fluent API for setting program, arguments, environment variables, and working directory.
/// On unix each child leads its own process group. Dropping the future that
/// drives a run kills that whole group, so wrapping a run in
/// `tokio::time::timeout` also stops anything the child forked.
pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl CommandBuilder {
    /// Create a new builder for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// A builder that runs `script` through `sh -c`.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory for the child process.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(&self.env);
        if let Some(ref dir) = self.cwd {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);
        cmd.kill_on_drop(true);
        cmd
    }

    /// Execute the command, forwarding its stdout and stderr line by line
    /// through `redactor`, and return its exit status.
    pub async fn run_streaming(&self, redactor: &Redactor) -> Result<ExitStatus, DlIndexError> {
        let mut child = self
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DlIndexError::Generic {
                message: format!("Failed to start '{}': {e}", self.program),
            })?;

        let mut guard = GroupGuard {
            pgid: child.id(),
            forwarders: Vec::with_capacity(2),
        };
        if let Some(out) = child.stdout.take() {
            guard.forwarders.push(tokio::spawn(forward_lines(
                out,
                redactor.clone(),
                Target::Stdout,
            )));
        }
        if let Some(err) = child.stderr.take() {
            guard.forwarders.push(tokio::spawn(forward_lines(
                err,
                redactor.clone(),
                Target::Stderr,
            )));
        }

        let status = child.wait().await?;

        // Background jobs of the child may still hold the pipes open.
        for task in guard.forwarders.iter_mut() {
            if let Err(e) = task.await {
                tracing::warn!("Output forwarding for '{}' stopped: {e}", self.program);
            }
        }
        guard.disarm();
        Ok(status)
    }
}

/// Kills the child's process group and stops output forwarding unless the
/// run finished.
struct GroupGuard {
    pgid: Option<u32>,
    forwarders: Vec<JoinHandle<()>>,
}

impl GroupGuard {
    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        for task in &self.forwarders {
            task.abort();
        }
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => tracing::debug!("Killed process group {pgid}"),
        Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!("Failed to kill process group {pgid}: {e}"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

#[derive(Clone, Copy)]
enum Target {
    Stdout,
    Stderr,
}

/// Forward complete lines until EOF. Invalid UTF-8 is replaced, never fatal,
/// so the child never writes into a closed pipe.
async fn forward_lines<R: AsyncRead + Unpin>(reader: R, redactor: Redactor, target: Target) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to read child output: {e}");
                break;
            }
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        let raw = String::from_utf8_lossy(&buf);
        let line = redactor.redact(&raw);
        match target {
            Target::Stdout => println!("{line}"),
            Target::Stderr => eprintln!("{line}"),
        }
    }
}
