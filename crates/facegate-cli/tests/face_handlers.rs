use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use facegate_cli::cli::{FaceArgs, OutputMode};
use facegate_cli::commands::{CommandHandler, EnrollHandler, VerifyHandler};
use facegate_cli::errors::AppError;
use facegate_cli::faces::{EnrollmentOutcome, VerificationOutcome};

fn sample_args() -> FaceArgs {
    FaceArgs {
        user: "alice".into(),
        image: PathBuf::from("captures/alice.png"),
        store_dir: Some(PathBuf::from("/var/lib/facegate/fingerprints")),
        config: None,
    }
}

fn verification(matched: bool, auto_enrolled: bool) -> VerificationOutcome {
    VerificationOutcome {
        identity: "alice".into(),
        matched,
        confidence: if matched { 0.9 } else { 0.05 },
        auto_enrolled,
        distance: (!auto_enrolled).then_some(3.2),
        message: "msg".into(),
        fingerprint_id: "fp-1".into(),
    }
}

#[test]
fn enroll_handler_renders_outcome_in_requested_mode() {
    let render_calls = Arc::new(Mutex::new(Vec::new()));
    let handler = EnrollHandler::with_dependencies(
        sample_args(),
        |args| {
            Ok(EnrollmentOutcome {
                identity: args.user.clone(),
                fingerprint_id: "fp-1".into(),
                created: true,
            })
        },
        {
            let render_calls = Arc::clone(&render_calls);
            move |outcome, mode| {
                render_calls
                    .lock()
                    .unwrap()
                    .push((outcome.identity.clone(), mode));
                Ok(())
            }
        },
    );

    let exit = handler.execute(OutputMode::Json, false).unwrap();
    assert_eq!(exit, ExitCode::SUCCESS);
    let calls = render_calls.lock().unwrap();
    assert_eq!(calls.as_slice(), &[("alice".to_string(), OutputMode::Json)]);
}

#[test]
fn enroll_handler_surfaces_run_errors() {
    let handler = EnrollHandler::with_dependencies(
        sample_args(),
        |_args| {
            Err(AppError::InvalidPayload {
                message: "boom".into(),
            })
        },
        |_outcome, _mode| panic!("render should not run"),
    );

    let err = handler.execute(OutputMode::Human, false).unwrap_err();
    match err {
        AppError::InvalidPayload { message } => assert_eq!(message, "boom"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn verify_handler_exit_code_follows_match() {
    for (matched, auto_enrolled, expected) in [
        (true, false, ExitCode::SUCCESS),
        (true, true, ExitCode::SUCCESS),
        (false, false, ExitCode::from(1)),
    ] {
        let renders = Arc::new(Mutex::new(0));
        let handler = VerifyHandler::with_dependencies(
            sample_args(),
            move |_args| Ok(verification(matched, auto_enrolled)),
            {
                let renders = Arc::clone(&renders);
                move |_outcome, _mode| {
                    *renders.lock().unwrap() += 1;
                    Ok(())
                }
            },
        );

        let exit = handler.execute(OutputMode::Human, false).unwrap();
        assert_eq!(exit, expected);
        assert_eq!(*renders.lock().unwrap(), 1);
    }
}

#[test]
fn verify_handler_propagates_internal_errors() {
    let handler = VerifyHandler::with_dependencies(
        sample_args(),
        |_args| Err(AppError::StoreUnavailable("disk detached".into())),
        |_outcome, _mode| Ok(()),
    );

    let err = handler.execute(OutputMode::Json, true).unwrap_err();
    assert!(!err.is_client_error());
    assert_eq!(err.exit_code(), ExitCode::from(1));
}
