use crate::provider::invocation::build_invocation;
use crate::provider::{
    io_error, ExecutionOutcome, InvocationLog, ProviderError, ToolOptions, ToolRequest,
};
use std::io::{BufReader, Read};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const READER_GRACE: Duration = Duration::from_secs(2);

/// Anything that can turn a prompt into a successful tool execution.
pub trait PromptRunner {
    fn run_prompt(&self, prompt: &str) -> Result<ExecutionOutcome, ProviderError>;
}

/// Settings-bound runner for the external generation tool.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    pub binary: String,
    pub cwd: PathBuf,
    pub timeout: Duration,
    pub options: ToolOptions,
}

impl ToolRunner {
    pub fn request(&self, prompt: &str) -> ToolRequest {
        ToolRequest {
            binary: self.binary.clone(),
            cwd: self.cwd.clone(),
            prompt: prompt.to_string(),
            timeout: self.timeout,
            options: self.options.clone(),
        }
    }
}

impl PromptRunner for ToolRunner {
    fn run_prompt(&self, prompt: &str) -> Result<ExecutionOutcome, ProviderError> {
        run_tool(&self.request(prompt))
    }
}

/// Owns a spawned child until it has been reaped. The child leads its own
/// process group, so killing goes to the whole group and takes down anything
/// the tool forked. Dropping an unreaped guard kills the group and waits.
struct ChildGuard {
    child: Child,
    pgid: libc::pid_t,
    reaped: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        let pgid = child.id() as libc::pid_t;
        Self {
            child,
            pgid,
            reaped: false,
        }
    }

    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    fn kill_group(&mut self) {
        // SAFETY: killpg only sends a signal; pgid is the group this guard spawned.
        unsafe {
            libc::killpg(self.pgid, libc::SIGKILL);
        }
        if !self.reaped {
            let _ = self.child.kill();
        }
    }

    fn terminate(&mut self) -> std::io::Result<ExitStatus> {
        self.kill_group();
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            self.kill_group();
            let _ = self.child.wait();
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(stream: R, tx: Sender<Vec<u8>>) {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = [0_u8; 8192];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Drains a reader channel until its writer end closes or `deadline` passes.
/// A pipe held open by a stray descendant cannot stall the caller.
fn collect_output(rx: &Receiver<Vec<u8>>, deadline: Instant) -> String {
    let mut bytes = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

pub fn run_tool(request: &ToolRequest) -> Result<ExecutionOutcome, ProviderError> {
    let spec = build_invocation(request);
    let mut log = InvocationLog {
        command_form: spec.command_form(),
        working_directory: request.cwd.clone(),
        exit_code: None,
        timed_out: false,
        elapsed_ms: 0,
    };

    let mut command = Command::new(&spec.binary);
    command
        .current_dir(&request.cwd)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);

    let start = Instant::now();
    let child = match command.spawn() {
        Ok(child) => child,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProviderError::LaunchFailed {
                binary: spec.binary,
                log: Box::new(log),
            })
        }
        Err(err) => return Err(io_error(&request.cwd, err)),
    };
    let mut guard = ChildGuard::new(child);

    let stdout = guard
        .child
        .stdout
        .take()
        .ok_or_else(|| io_error(&request.cwd, std::io::Error::other("missing stdout pipe")))?;
    let stderr = guard
        .child
        .stderr
        .take()
        .ok_or_else(|| io_error(&request.cwd, std::io::Error::other("missing stderr pipe")))?;
    let (stdout_tx, stdout_rx) = mpsc::channel();
    let (stderr_tx, stderr_rx) = mpsc::channel();
    spawn_reader(stdout, stdout_tx);
    spawn_reader(stderr, stderr_tx);

    let (exit_status, timed_out) = loop {
        match guard.try_wait() {
            Ok(Some(status)) => break (status, false),
            Ok(None) => {
                if start.elapsed() > request.timeout {
                    let status = guard.terminate().map_err(|e| io_error(&request.cwd, e))?;
                    break (status, true);
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => return Err(io_error(&request.cwd, err)),
        }
    };

    // The tool itself is gone; clear out anything it left running in its group.
    guard.kill_group();
    let deadline = Instant::now() + READER_GRACE;
    let stdout = collect_output(&stdout_rx, deadline);
    let stderr = collect_output(&stderr_rx, deadline);
    let elapsed = start.elapsed();
    log.exit_code = exit_status.code();
    log.timed_out = timed_out;
    log.elapsed_ms = elapsed.as_millis() as u64;

    if timed_out {
        return Err(ProviderError::Timeout {
            binary: spec.binary,
            timeout_ms: request.timeout.as_millis() as u64,
            stdout,
            stderr,
            log: Box::new(log),
        });
    }

    if !exit_status.success() {
        return Err(ProviderError::ExecutionFailed {
            binary: spec.binary,
            exit_code: exit_status.code().unwrap_or(-1),
            stdout,
            stderr,
            log: Box::new(log),
        });
    }

    Ok(ExecutionOutcome {
        stdout,
        stderr,
        log,
    })
}
