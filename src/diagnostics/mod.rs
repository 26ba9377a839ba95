//! Live diagnostics from the external Midori compiler

pub mod orchestrator;
pub mod output;
pub mod runner;

pub use orchestrator::{
    ChannelSink, DiagnosticsOrchestrator, DiagnosticsSink, RunOutcome, RunState, Trigger,
};
pub use output::{parse_check_output, parse_line, CompilerMessage, ParseOptions};
pub use runner::{
    run_check, CheckError, CheckOutput, CheckRequest, SCRATCH_PREFIX, TRUNCATION_NOTICE,
};
