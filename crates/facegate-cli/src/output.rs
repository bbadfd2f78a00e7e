use std::io::{self, Write};

use serde::Serialize;
use serde_json::json;

use crate::cli::OutputMode;
use crate::doctor::{CheckStatus, DoctorOutcome};
use crate::errors::{AppError, AppResult};
use crate::faces::{EnrollmentOutcome, VerificationOutcome};

pub fn render_enroll(outcome: &EnrollmentOutcome, mode: OutputMode) -> AppResult<()> {
    match mode {
        OutputMode::Human => {
            println!(
                "Enrollment successful: fingerprint {} {} for user {}",
                outcome.fingerprint_id,
                if outcome.created { "created" } else { "replaced" },
                outcome.identity
            );
        }
        OutputMode::Json => write_json(&json!({
            "success": true,
            "identity": outcome.identity,
            "fingerprint_id": outcome.fingerprint_id,
            "created": outcome.created,
        }))?,
    }
    Ok(())
}

pub fn render_verify(outcome: &VerificationOutcome, mode: OutputMode) -> AppResult<()> {
    match mode {
        OutputMode::Human => {
            println!("{}", outcome.message);
            if outcome.auto_enrolled {
                println!("Fingerprint {} stored for user {}", outcome.fingerprint_id, outcome.identity);
            }
        }
        OutputMode::Json => write_json(outcome)?,
    }
    Ok(())
}

pub fn render_doctor(outcome: &DoctorOutcome, mode: OutputMode) -> AppResult<()> {
    match mode {
        OutputMode::Human => {
            for check in &outcome.checks {
                let label = match check.status {
                    CheckStatus::Pass => "PASS",
                    CheckStatus::Warn => "WARN",
                    CheckStatus::Fail => "FAIL",
                };
                println!("[{label}] {}: {}", check.name, check.message);
            }
            println!(
                "Doctor {}",
                if outcome.ok { "passed" } else { "found problems" }
            );
        }
        OutputMode::Json => write_json(outcome)?,
    }
    Ok(())
}

pub fn render_error(err: &AppError, mode: OutputMode) {
    match mode {
        OutputMode::Human => {
            eprintln!("{}", human_error(err));
        }
        OutputMode::Json => {
            let payload = json!({
                "success": false,
                "error": err.human_message(),
                "client_error": err.is_client_error(),
            });
            if let Ok(json) = serde_json::to_string(&payload) {
                println!("{json}");
            }
        }
    }
}

fn write_json<T: Serialize + ?Sized>(value: &T) -> AppResult<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let payload = serde_json::to_string(value)?;
    handle.write_all(payload.as_bytes())?;
    handle.write_all(b"\n")?;
    Ok(())
}

/// Error messages already carry their source, so one line covers the whole chain.
fn human_error(err: &AppError) -> String {
    format!("error: {}", err.human_message())
}
