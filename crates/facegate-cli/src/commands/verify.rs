use std::any::Any;
use std::process::ExitCode;

use crate::cli::{FaceArgs, OutputMode};
use crate::commands::CommandHandler;
use crate::errors::AppResult;
use crate::faces::{self, VerificationOutcome};
use crate::output::render_verify;

type VerifyRunner = dyn Fn(&FaceArgs) -> AppResult<VerificationOutcome> + Send + Sync;
type VerifyRenderer = dyn Fn(&VerificationOutcome, OutputMode) -> AppResult<()> + Send + Sync;

pub struct VerifyHandler {
    args: FaceArgs,
    run: Box<VerifyRunner>,
    render: Box<VerifyRenderer>,
}

impl VerifyHandler {
    pub fn new(args: FaceArgs) -> Self {
        Self::with_dependencies(args, faces::run_verify, render_verify)
    }

    pub fn with_dependencies(
        args: FaceArgs,
        run: impl Fn(&FaceArgs) -> AppResult<VerificationOutcome> + Send + Sync + 'static,
        render: impl Fn(&VerificationOutcome, OutputMode) -> AppResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            args,
            run: Box::new(run),
            render: Box::new(render),
        }
    }
}

impl CommandHandler for VerifyHandler {
    /// A face that does not match still renders its outcome, but exits with 1.
    fn execute(&self, mode: OutputMode, _verbose: bool) -> AppResult<ExitCode> {
        let outcome = (self.run)(&self.args)?;
        (self.render)(&outcome, mode)?;
        let exit = if outcome.matched {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        };
        Ok(exit)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
