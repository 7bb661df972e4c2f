//! Boundary to the external task engine.
//!
//! The registry only ever talks to the engine through [`TaskEngine`]: a
//! request naming the action and the mirrored task file, and a response with
//! the captured output. The default implementation shells out to the
//! task-master CLI with a bounded timeout.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::error::{Error, Result};

const POLL_INTERVAL_MS: u64 = 50;

/// What to ask the engine for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAction {
    /// Compute the next task to work on
    Next,
    /// Append a task generated from free text
    Add { prompt: String },
}

impl EngineAction {
    pub fn name(&self) -> &'static str {
        match self {
            EngineAction::Next => "next",
            EngineAction::Add { .. } => "add",
        }
    }

    /// Whether a successful run may have rewritten the task file
    pub fn mutates(&self) -> bool {
        matches!(self, EngineAction::Add { .. })
    }
}

#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub action: EngineAction,
    /// Task file the engine should operate on
    pub tasks_file: PathBuf,
    /// Working directory for the engine
    pub project_root: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct EngineResponse {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Anything that can serve engine requests
pub trait TaskEngine {
    /// Run a request. Implementations return `ExternalToolFailure` or
    /// `ExternalToolTimeout` when the engine does not succeed.
    fn run(&self, request: &EngineRequest) -> Result<EngineResponse>;
}

/// Task engine backed by a child process
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn command(&self, request: &EngineRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(request.action.name());
        if let EngineAction::Add { prompt } = &request.action {
            cmd.arg("--prompt").arg(prompt);
        }
        cmd.arg("--file")
            .arg(&request.tasks_file)
            .current_dir(&request.project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl TaskEngine for CommandEngine {
    fn run(&self, request: &EngineRequest) -> Result<EngineResponse> {
        tracing::debug!(
            program = %self.program,
            action = request.action.name(),
            file = %request.tasks_file.display(),
            "spawning task engine"
        );

        let mut child = match self.command(request).spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(program = %self.program, error = %err, "failed to spawn task engine");
                return Err(Error::ExternalToolFailure {
                    program: self.program.clone(),
                    code: None,
                });
            }
        };

        // Drain pipes on threads so a chatty engine cannot block on a full pipe
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + request.timeout;
        let timed_out = || {
            tracing::warn!(program = %self.program, "task engine timed out");
            Error::ExternalToolTimeout {
                program: self.program.clone(),
                secs: request.timeout.as_secs(),
            }
        };

        let Some(status) = wait_until(&mut child, deadline)? else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(timed_out());
        };

        // A leftover descendant can hold the pipes open after the engine exits
        let (Some(stdout), Some(stderr)) = (collect(&stdout, deadline), collect(&stderr, deadline))
        else {
            return Err(timed_out());
        };

        let response = EngineResponse {
            exit_code: status.code(),
            stdout,
            stderr,
        };

        if !status.success() {
            tracing::warn!(program = %self.program, code = ?status.code(), stderr = %response.stderr, "task engine failed");
            return Err(Error::ExternalToolFailure {
                program: self.program.clone(),
                code: status.code(),
            });
        }

        Ok(response)
    }
}

/// Poll until the child exits or the deadline passes (`None` on timeout)
fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Drained pipe contents, `None` if the pipe is still open at the deadline
fn collect(rx: &Receiver<String>, deadline: Instant) -> Option<String> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(dir: &TempDir, action: EngineAction, timeout: Duration) -> EngineRequest {
        EngineRequest {
            action,
            tasks_file: dir.path().join("tasks.json"),
            project_root: dir.path().to_path_buf(),
            timeout,
        }
    }

    fn sh(script: &str) -> CommandEngine {
        // `sh -c <script> <$0> <$1...>`: the engine arguments land in $1.. for the script
        CommandEngine::new("sh", vec!["-c".to_string(), script.to_string(), "engine".to_string()])
    }

    #[test]
    fn test_passes_action_and_file_arguments() {
        let dir = TempDir::new().unwrap();
        let engine = sh("echo \"$@\"");
        let response = engine
            .run(&request(
                &dir,
                EngineAction::Add {
                    prompt: "Fix login".to_string(),
                },
                Duration::from_secs(10),
            ))
            .unwrap();

        let expected = format!(
            "add --prompt Fix login --file {}",
            dir.path().join("tasks.json").display()
        );
        assert_eq!(response.stdout.trim(), expected);
        assert_eq!(response.exit_code, Some(0));
    }

    #[test]
    fn test_nonzero_exit_is_failure() {
        let dir = TempDir::new().unwrap();
        let err = sh("echo nope >&2; exit 3")
            .run(&request(&dir, EngineAction::Next, Duration::from_secs(10)))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ExternalToolFailure { code: Some(3), .. }
        ));
    }

    #[test]
    fn test_timeout_kills_engine() {
        let dir = TempDir::new().unwrap();
        let started = Instant::now();
        let err = sh("sleep 30")
            .run(&request(&dir, EngineAction::Next, Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, Error::ExternalToolTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[test]
    fn test_missing_program_is_failure() {
        let dir = TempDir::new().unwrap();
        let err = CommandEngine::new("tmw-definitely-not-a-program", Vec::new())
            .run(&request(&dir, EngineAction::Next, Duration::from_secs(1)))
            .unwrap_err();
        assert!(matches!(err, Error::ExternalToolFailure { code: None, .. }));
    }

    #[test]
    fn test_lingering_descendant_does_not_outlive_timeout() {
        let dir = TempDir::new().unwrap();
        let started = Instant::now();
        let err = sh("sleep 8 & echo hi")
            .run(&request(&dir, EngineAction::Next, Duration::from_secs(1)))
            .unwrap_err();
        assert!(matches!(err, Error::ExternalToolTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
