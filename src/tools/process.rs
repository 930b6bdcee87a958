//! Running external tools with a bounded wall-clock budget.

use crate::{GistError, Result};
use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Lines of stderr kept for the error message of a failed run.
const STDERR_TAIL_LINES: usize = 20;

/// Resolve an executable name or path. Bare names are looked up on `PATH`.
pub fn resolve_executable(program: &str) -> Result<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        if candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
        return Err(GistError::Config(format!(
            "Executable not found: {}",
            candidate.display()
        )));
    }
    which::which(program)
        .map_err(|e| {
            GistError::Config(format!("Executable '{}' not found on PATH: {}", program, e))
        })
}

fn forward_lines<R: Read + Send + 'static>(
    reader: R,
    label: String,
    keep_tail: bool,
) -> JoinHandle<VecDeque<String>> {
    std::thread::spawn(move || {
        let mut tail = VecDeque::new();
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            debug!("{}: {}", label, line);
            if keep_tail {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
        tail
    })
}

/// A fully argument-vectored command line. Nothing passes through a shell.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    label: String,
    program: PathBuf,
    args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(label: &str, program: &Path) -> Self {
        Self {
            label: label.to_string(),
            program: program.to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// `--flag value` pair
    pub fn opt<S: AsRef<OsStr>>(self, flag: &str, value: S) -> Self {
        self.arg(flag).arg(value)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run to completion, killing the process if it outlives `timeout`.
    pub fn run(&self, timeout: Duration) -> Result<()> {
        debug!("Running {:?} {:?}", self.program, self.args);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GistError::Tool {
                tool: self.label.clone(),
                message: format!("failed to start {}: {}", self.program.display(), e),
            })?;

        let stdout_handle = child
            .stdout
            .take()
            .map(|out| forward_lines(out, format!("{} [stdout]", self.label), false));
        let stderr_handle = child
            .stderr
            .take()
            .map(|err| forward_lines(err, format!("{} [stderr]", self.label), true));

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > timeout {
                        warn!(
                            "{} exceeded {}s, killing pid {}",
                            self.label,
                            timeout.as_secs(),
                            child.id()
                        );
                        child.kill().ok();
                        let _ = child.wait();
                        return Err(GistError::Timeout {
                            tool: self.label.clone(),
                            seconds: timeout.as_secs(),
                        });
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    return Err(GistError::Tool {
                        tool: self.label.clone(),
                        message: format!("failed to check process status: {}", e),
                    })
                }
            }
        };

        if let Some(handle) = stdout_handle {
            handle.join().ok();
        }
        let stderr_tail = stderr_handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let mut message = match status.code() {
                Some(code) => format!("exit status {}", code),
                None => "terminated by signal".to_string(),
            };
            if !stderr_tail.is_empty() {
                message.push_str(": ");
                message.push_str(&Vec::from(stderr_tail).join("\n"));
            }
            return Err(GistError::Tool {
                tool: self.label.clone(),
                message,
            });
        }

        debug!("{} finished in {:.1}s", self.label, start.elapsed().as_secs_f64());
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh", Path::new("/bin/sh")).arg("-c").arg(script)
    }

    #[test]
    fn test_successful_run() {
        assert!(sh("exit 0").run(Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_failure_carries_stderr_tail() {
        let err = sh("echo 'bad query' >&2; exit 3")
            .run(Duration::from_secs(10))
            .unwrap_err();
        match err {
            GistError::Tool { tool, message } => {
                assert_eq!(tool, "sh");
                assert!(message.contains("exit status 3"));
                assert!(message.contains("bad query"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_timeout_kills_process() {
        let err = sh("sleep 5").run(Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, GistError::Timeout { .. }));
    }

    #[test]
    fn test_missing_program() {
        let err = ToolCommand::new("nope", Path::new("/definitely/not/here"))
            .run(Duration::from_secs(1))
            .unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[test]
    fn test_resolve_executable() {
        assert!(resolve_executable("/bin/sh").is_ok());
        assert!(matches!(
            resolve_executable("/no/such/tool"),
            Err(GistError::Config(_))
        ));
    }
}
