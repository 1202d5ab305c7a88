//! Thin demonstration harness for the `codewright_rs` analysis core.
//!
//! This is not a product CLI: no subcommands, no colored/progress UI, no
//! report rendering. It builds an in-process [`AnalysisConfig`] for the
//! directory given on the command line (or `.` if none), runs the pipeline
//! once, and prints the resulting [`AnalysisResult`] as JSON on stdout.
//! Config-file loading and report rendering are external collaborators'
//! jobs, not this crate's.

use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use codewright_rs::core::pipeline::{AnalysisResult, ExternalInputs};
use codewright_rs::{run, AnalysisConfig, CoreError};

/// Map a finished run onto the exit-code contract (spec §6): 0 success, 1
/// configuration error, 2 partial failure (diagnostics recorded but the
/// pipeline still produced a result), 3 fatal I/O or crash.
fn exit_code_for(outcome: &Result<AnalysisResult, CoreError>) -> ExitCode {
    match outcome {
        Ok(result) if result.error_count == 0 => ExitCode::from(0),
        Ok(_) => ExitCode::from(2),
        Err(CoreError::Config { .. }) => ExitCode::from(1),
        Err(_) => ExitCode::from(3),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let root = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());

    let mut config = AnalysisConfig::default();
    config.roots.push(root);

    let cancellation = Arc::new(AtomicBool::new(false));
    let outcome = run(config, ExternalInputs::default(), cancellation).await;

    let code = exit_code_for(&outcome);
    match outcome {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("failed to serialize analysis result: {err}"),
        },
        Err(err) => eprintln!("analysis failed: {err}"),
    }
    code
}
