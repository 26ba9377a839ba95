//! External compiler invocation
//!
//! Runs `<command> <args..> check <scratch-file>` for one document snapshot,
//! collecting stdout and stderr into a single size-capped buffer under a
//! wall-clock timeout. The child is killed on timeout or cancellation.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Appended to the collected output when the byte cap was hit
pub const TRUNCATION_NOTICE: &str = "[midori] output truncated";

/// Name prefix of scratch files; discovery skips files carrying it
pub const SCRATCH_PREFIX: &str = ".midori-check-";

/// One check invocation
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub command: String,
    pub args: Vec<String>,
    pub text: String,
    /// On-disk path of the document, used as the working directory's anchor
    pub document_path: Option<PathBuf>,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutput {
    pub output: String,
    pub truncated: bool,
    pub exit_code: Option<i32>,
    pub success: bool,
    /// File name of the scratch file the compiler was pointed at
    pub scratch_file_name: String,
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to prepare scratch file: {0}")]
    Scratch(#[source] io::Error),
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("check timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("check cancelled")]
    Cancelled,
    #[error("failed to wait for compiler: {0}")]
    Wait(#[source] io::Error),
}

/// Collects bytes up to a cap, remembering whether anything was dropped
struct CappedBuffer {
    bytes: Vec<u8>,
    cap: usize,
    truncated: bool,
}

impl CappedBuffer {
    fn new(cap: usize) -> Self {
        Self {
            bytes: Vec::new(),
            cap,
            truncated: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        let room = self.cap.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    fn finish(self) -> (String, bool) {
        let mut output = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(TRUNCATION_NOTICE);
            output.push('\n');
        }
        (output, self.truncated)
    }
}

/// Read `stream` to the end; bytes past the cap are read and dropped so the
/// child never blocks on a full pipe
async fn pump<R: AsyncRead + Unpin>(stream: Option<R>, buffer: &Mutex<CappedBuffer>) {
    let Some(mut stream) = stream else {
        return;
    };
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buffer.lock().push(&chunk[..n]),
            Err(e) => {
                debug!("[Check] output stream error: {}", e);
                break;
            }
        }
    }
}

enum Outcome {
    Exited(ExitStatus),
    WaitFailed(io::Error),
    TimedOut,
    Cancelled,
}

fn working_dir(document_path: Option<&Path>) -> Option<&Path> {
    document_path.and_then(Path::parent).filter(|dir| dir.is_dir())
}

/// Scratch copy of the document, placed beside it so relative imports
/// resolve. Untitled documents and unwritable directories use the temp dir.
fn scratch_file(document_path: Option<&Path>) -> io::Result<tempfile::NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX).suffix(".mdr");
    if let Some(dir) = working_dir(document_path) {
        match builder.tempfile_in(dir) {
            Ok(file) => return Ok(file),
            Err(e) => debug!(
                "[Diagnostics] cannot create scratch file in {}: {}",
                dir.display(),
                e
            ),
        }
    }
    builder.tempfile()
}

pub async fn run_check(
    request: &CheckRequest,
    cancel: &CancellationToken,
) -> Result<CheckOutput, CheckError> {
    let scratch =
        scratch_file(request.document_path.as_deref()).map_err(CheckError::Scratch)?;
    tokio::fs::write(scratch.path(), request.text.as_bytes())
        .await
        .map_err(CheckError::Scratch)?;
    let scratch_file_name = scratch
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut cmd = Command::new(&request.command);
    cmd.args(&request.args)
        .arg("check")
        .arg(scratch.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = working_dir(request.document_path.as_deref()) {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|source| CheckError::Spawn {
        command: request.command.clone(),
        source,
    })?;
    debug!(
        "[Check] started `{}` (pid {:?}) on {}",
        request.command,
        child.id(),
        scratch_file_name
    );

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let buffer = Mutex::new(CappedBuffer::new(request.max_output_bytes));

    let outcome = {
        let collect = async {
            tokio::join!(pump(stdout, &buffer), pump(stderr, &buffer));
            child.wait().await
        };
        tokio::select! {
            _ = cancel.cancelled() => Outcome::Cancelled,
            res = tokio::time::timeout(request.timeout, collect) => match res {
                Ok(Ok(status)) => Outcome::Exited(status),
                Ok(Err(e)) => Outcome::WaitFailed(e),
                Err(_) => Outcome::TimedOut,
            },
        }
    };

    if !matches!(outcome, Outcome::Exited(_)) {
        if let Err(e) = child.kill().await {
            debug!("[Check] kill failed: {}", e);
        }
    }

    match outcome {
        Outcome::Exited(status) => {
            let (output, truncated) = buffer.into_inner().finish();
            if truncated {
                warn!(
                    "[Check] output exceeded {} bytes and was truncated",
                    request.max_output_bytes
                );
            }
            debug!("[Check] `{}` exited with {:?}", request.command, status.code());
            Ok(CheckOutput {
                output,
                truncated,
                exit_code: status.code(),
                success: status.success(),
                scratch_file_name,
            })
        }
        Outcome::WaitFailed(e) => Err(CheckError::Wait(e)),
        Outcome::TimedOut => {
            warn!(
                "[Check] `{}` timed out after {}ms",
                request.command,
                request.timeout.as_millis()
            );
            Err(CheckError::Timeout(request.timeout))
        }
        Outcome::Cancelled => {
            debug!("[Check] `{}` cancelled", request.command);
            Err(CheckError::Cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capped_buffer_appends_notice_once() {
        let mut buffer = CappedBuffer::new(8);
        buffer.push(b"12345");
        buffer.push(b"6789");
        buffer.push(b"abc");
        let (output, truncated) = buffer.finish();
        assert!(truncated);
        assert!(output.starts_with("12345678\n"));
        assert_eq!(output.matches(TRUNCATION_NOTICE).count(), 1);
    }

    #[test]
    fn test_capped_buffer_under_cap() {
        let mut buffer = CappedBuffer::new(64);
        buffer.push(b"a.mdr:1:1: error: x\n");
        assert_eq!(buffer.finish(), ("a.mdr:1:1: error: x\n".to_string(), false));
    }

    #[cfg(unix)]
    fn shell(script: &str) -> CheckRequest {
        CheckRequest {
            command: "sh".to_string(),
            // $1 is "check", $2 the scratch file
            args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            text: "fn main() -> Int { 0 }\n".to_string(),
            document_path: None,
            timeout: Duration::from_secs(10),
            max_output_bytes: 64 * 1024,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_collects_stdout_and_stderr() {
        let request = shell(r#"echo "$2:1:4: error[MD1]: first"; echo "$1 on stderr" >&2; exit 1"#);
        let out = run_check(&request, &CancellationToken::new()).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.exit_code, Some(1));
        assert!(out.scratch_file_name.starts_with(SCRATCH_PREFIX));
        assert!(out.scratch_file_name.ends_with(".mdr"));
        assert!(out.output.contains(&format!("{}:1:4: error[MD1]: first", out.scratch_file_name)));
        assert!(out.output.contains("check on stderr"));
        assert!(!out.truncated);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compiler_sees_document_text() {
        let request = shell(r#"cat "$2""#);
        let out = run_check(&request, &CancellationToken::new()).await.unwrap();
        assert!(out.success);
        assert_eq!(out.output, request.text);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_large_output_is_truncated() {
        let mut request = shell("i=0; while [ $i -lt 3000 ]; do echo 'xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx'; i=$((i+1)); done");
        request.max_output_bytes = 64 * 1024;
        let out = run_check(&request, &CancellationToken::new()).await.unwrap();
        assert!(out.truncated);
        assert!(out.output.len() <= 64 * 1024 + TRUNCATION_NOTICE.len() + 2);
        assert_eq!(out.output.matches(TRUNCATION_NOTICE).count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let mut request = shell("sleep 5");
        request.timeout = Duration::from_millis(200);
        let started = std::time::Instant::now();
        let err = run_check(&request, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CheckError::Timeout(d) if d == Duration::from_millis(200)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation() {
        let request = shell("sleep 5");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let err = run_check(&request, &cancel).await.unwrap_err();
        assert!(matches!(err, CheckError::Cancelled));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_working_directory_follows_document() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut request = shell("pwd -P");
        request.document_path = Some(temp.path().join("main.mdr"));
        let out = run_check(&request, &CancellationToken::new()).await.unwrap();
        let expected = std::fs::canonicalize(temp.path()).unwrap();
        assert_eq!(out.output.trim(), expected.to_string_lossy());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_scratch_file_sits_beside_document() {
        let temp = tempfile::TempDir::new().unwrap();
        let root = std::fs::canonicalize(temp.path()).unwrap();
        std::fs::write(root.join("lib.mdr"), "pub fn helper() {}\n").unwrap();
        let mut request = shell(
            r#"[ -f "$(dirname "$2")/lib.mdr" ] || echo "$2:1:1: error: cannot read import"; dirname "$2""#,
        );
        request.document_path = Some(root.join("main.mdr"));

        let out = run_check(&request, &CancellationToken::new()).await.unwrap();
        assert!(!out.output.contains("cannot read import"));
        assert_eq!(out.output.trim(), root.to_string_lossy());

        // removed once the run is over
        let leftovers: Vec<_> = std::fs::read_dir(&root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(SCRATCH_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_untitled_document_uses_temp_dir() {
        let request = shell(r#"dirname "$2""#);
        let out = run_check(&request, &CancellationToken::new()).await.unwrap();
        let temp_dir = std::fs::canonicalize(std::env::temp_dir()).unwrap();
        let reported = std::fs::canonicalize(out.output.trim()).unwrap();
        assert_eq!(reported, temp_dir);
    }

    #[tokio::test]
    async fn test_missing_command() {
        let request = CheckRequest {
            command: "midori-command-that-does-not-exist".to_string(),
            args: Vec::new(),
            text: String::new(),
            document_path: None,
            timeout: Duration::from_secs(1),
            max_output_bytes: 1024,
        };
        let err = run_check(&request, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CheckError::Spawn { .. }));
    }
}
