//! Diagnostics orchestration
//!
//! One state machine per document URI:
//! `Idle -> Scheduled -> Running -> {Completed | Failed | TimedOut | Cancelled} -> Idle`.
//!
//! Every schedule call cancels the pending timer or running process for that
//! URI and starts a new generation. Results are published only while their
//! generation is current and the document version has not moved on, so a
//! stale run can never overwrite a newer one.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::output::{parse_check_output, ParseOptions};
use super::runner::{run_check, CheckError, CheckOutput, CheckRequest};
use crate::config::{SharedSettings, Settings};
use crate::protocol::{Diagnostic, DiagnosticSeverity, PublishDiagnostics};

/// Receives finished diagnostics
pub trait DiagnosticsSink: Send + Sync + 'static {
    fn publish(&self, params: PublishDiagnostics);
}

/// Forwards diagnostics over an unbounded channel
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PublishDiagnostics>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PublishDiagnostics>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DiagnosticsSink for ChannelSink {
    fn publish(&self, params: PublishDiagnostics) {
        if self.tx.send(params).is_err() {
            debug!("[Diagnostics] receiver dropped; discarding publication");
        }
    }
}

/// What caused a run to be scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Open,
    Save,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scheduled,
    Running,
}

/// How the most recent run for a document ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

struct Entry {
    generation: u64,
    version: i32,
    state: RunState,
    cancel: CancellationToken,
    last_outcome: Option<RunOutcome>,
}

struct Job {
    uri: String,
    generation: u64,
    version: i32,
    text: String,
    path: Option<PathBuf>,
    delay: Duration,
    cancel: CancellationToken,
}

struct Inner {
    settings: SharedSettings,
    sink: Arc<dyn DiagnosticsSink>,
    entries: Mutex<HashMap<String, Entry>>,
    next_generation: AtomicU64,
}

#[derive(Clone)]
pub struct DiagnosticsOrchestrator {
    inner: Arc<Inner>,
}

impl DiagnosticsOrchestrator {
    pub fn new(settings: SharedSettings, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                sink,
                entries: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Schedule a check of `text` at `version`. Returns false when the
    /// trigger is ignored (edits while run-on-type is off).
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(
        &self,
        uri: &str,
        version: i32,
        text: String,
        path: Option<PathBuf>,
        trigger: Trigger,
    ) -> bool {
        let (run_on_type, debounce_ms) = {
            let settings = self.inner.settings.read();
            (settings.run_on_type, settings.debounce_ms)
        };

        let mut entries = self.inner.entries.lock();
        if trigger == Trigger::Edit && !run_on_type {
            // the held result no longer matches the text; stop any run for it
            if let Some(entry) = entries.get_mut(uri) {
                entry.cancel.cancel();
                entry.state = RunState::Idle;
                entry.version = version;
            }
            return false;
        }

        let delay = match trigger {
            Trigger::Edit => Duration::from_millis(debounce_ms),
            Trigger::Open | Trigger::Save => Duration::ZERO,
        };
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        let last_outcome = match entries.get(uri) {
            Some(prev) => {
                prev.cancel.cancel();
                prev.last_outcome
            }
            None => None,
        };
        entries.insert(
            uri.to_string(),
            Entry {
                generation,
                version,
                state: RunState::Scheduled,
                cancel: cancel.clone(),
                last_outcome,
            },
        );
        drop(entries);

        debug!(
            "[Diagnostics] scheduled {} v{} ({:?}, delay {:?})",
            uri, version, trigger, delay
        );
        let job = Job {
            uri: uri.to_string(),
            generation,
            version,
            text,
            path,
            delay,
            cancel,
        };
        tokio::spawn(run_job(Arc::clone(&self.inner), job));
        true
    }

    /// Cancel any pending or running check and clear published diagnostics
    pub fn close(&self, uri: &str) {
        let mut entries = self.inner.entries.lock();
        if let Some(entry) = entries.remove(uri) {
            entry.cancel.cancel();
        }
        // published under the lock so no in-flight run can follow it
        self.inner.sink.publish(PublishDiagnostics {
            uri: uri.to_string(),
            version: None,
            diagnostics: Vec::new(),
        });
    }

    pub fn state(&self, uri: &str) -> RunState {
        self.inner
            .entries
            .lock()
            .get(uri)
            .map(|e| e.state)
            .unwrap_or(RunState::Idle)
    }

    pub fn last_outcome(&self, uri: &str) -> Option<RunOutcome> {
        self.inner.entries.lock().get(uri).and_then(|e| e.last_outcome)
    }

    /// Cancel every pending and running check
    pub fn shutdown(&self) {
        let mut entries = self.inner.entries.lock();
        for entry in entries.values() {
            entry.cancel.cancel();
        }
        entries.clear();
    }
}

impl Inner {
    /// Move the job's entry to `state` if the job is still current
    fn transition(&self, job: &Job, state: RunState) -> bool {
        let mut entries = self.entries.lock();
        match entries.get_mut(&job.uri) {
            Some(entry) if entry.generation == job.generation => {
                entry.state = state;
                true
            }
            _ => false,
        }
    }

    fn finish(&self, job: &Job, outcome: RunOutcome, diagnostics: Option<Vec<Diagnostic>>) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&job.uri) else {
            debug!("[Diagnostics] {} closed; dropping result", job.uri);
            return;
        };
        if entry.generation != job.generation {
            debug!(
                "[Diagnostics] dropping superseded result for {} v{}",
                job.uri, job.version
            );
            return;
        }
        entry.state = RunState::Idle;
        entry.last_outcome = Some(outcome);

        if entry.version != job.version {
            debug!(
                "[Diagnostics] dropping stale result for {} v{} (now v{})",
                job.uri, job.version, entry.version
            );
            return;
        }
        if let Some(diagnostics) = diagnostics {
            info!(
                "[Diagnostics] publishing {} diagnostic(s) for {} v{}",
                diagnostics.len(),
                job.uri,
                job.version
            );
            // published under the lock: a newer schedule cannot slip in between
            self.sink.publish(PublishDiagnostics {
                uri: job.uri.clone(),
                version: Some(job.version),
                diagnostics,
            });
        }
    }
}

async fn run_job(inner: Arc<Inner>, job: Job) {
    if !job.delay.is_zero() {
        tokio::select! {
            _ = job.cancel.cancelled() => return,
            _ = tokio::time::sleep(job.delay) => {}
        }
    }
    if job.cancel.is_cancelled() || !inner.transition(&job, RunState::Running) {
        return;
    }

    let settings = inner.settings.read().clone();
    let (outcome, diagnostics) = check_document(&settings, &job).await;
    inner.finish(&job, outcome, diagnostics);
}

async fn check_document(settings: &Settings, job: &Job) -> (RunOutcome, Option<Vec<Diagnostic>>) {
    if job.text.len() as u64 > settings.max_document_bytes {
        info!(
            "[Diagnostics] {} is {} bytes; skipping live check",
            job.uri,
            job.text.len()
        );
        let warning = Diagnostic::at_document_start(
            DiagnosticSeverity::Warning,
            format!(
                "Document is too large for live diagnostics ({} bytes, limit {} bytes). Save and run `{} check` manually, or raise midori.maxDocumentBytes.",
                job.text.len(),
                settings.max_document_bytes,
                settings.command
            ),
        );
        return (RunOutcome::Completed, Some(vec![warning]));
    }

    let request = CheckRequest {
        command: settings.command.clone(),
        args: settings.args.clone(),
        text: job.text.clone(),
        document_path: job.path.clone(),
        timeout: Duration::from_millis(settings.diagnostics_timeout_ms),
        max_output_bytes: settings.diagnostics_max_output_bytes as usize,
    };

    match run_check(&request, &job.cancel).await {
        Ok(output) => (
            RunOutcome::Completed,
            Some(diagnostics_from_output(settings, &job.text, &output)),
        ),
        Err(CheckError::Cancelled) => (RunOutcome::Cancelled, None),
        Err(CheckError::Timeout(limit)) => {
            let error = Diagnostic::at_document_start(
                DiagnosticSeverity::Error,
                format!(
                    "Midori check timed out after {} ms (midori.diagnosticsTimeoutMs).",
                    limit.as_millis()
                ),
            );
            (RunOutcome::TimedOut, Some(vec![error]))
        }
        Err(CheckError::Spawn { command, source }) => {
            let error = Diagnostic::at_document_start(
                DiagnosticSeverity::Error,
                format!(
                    "Unable to run the Midori compiler `{}`: {}. Install it or set midori.command to its path.",
                    command, source
                ),
            );
            (RunOutcome::Failed, Some(vec![error]))
        }
        Err(e) => {
            let error = Diagnostic::at_document_start(
                DiagnosticSeverity::Error,
                format!("Live diagnostics failed: {}", e),
            );
            (RunOutcome::Failed, Some(vec![error]))
        }
    }
}

fn diagnostics_from_output(settings: &Settings, text: &str, output: &CheckOutput) -> Vec<Diagnostic> {
    let mut diagnostics = parse_check_output(
        &output.output,
        text,
        ParseOptions {
            file_name: Some(&output.scratch_file_name),
            max_count: settings.diagnostics_max_count,
        },
    );

    if !output.success && diagnostics.is_empty() {
        let first_line = output
            .output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(|l| format!(": {}", l))
            .unwrap_or_default();
        let status = output
            .exit_code
            .map(|c| format!("exit code {}", c))
            .unwrap_or_else(|| "terminated by signal".to_string());
        diagnostics.push(Diagnostic::at_document_start(
            DiagnosticSeverity::Error,
            format!("Midori check failed ({}){}", status, first_line),
        ));
    }

    if output.truncated {
        diagnostics.push(Diagnostic::at_document_start(
            DiagnosticSeverity::Warning,
            format!(
                "Compiler output exceeded {} bytes and was truncated; some diagnostics may be missing (midori.diagnosticsMaxOutputBytes).",
                settings.diagnostics_max_output_bytes
            ),
        ));
    }
    diagnostics
}
