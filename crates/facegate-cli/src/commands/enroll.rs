use std::any::Any;
use std::process::ExitCode;

use crate::cli::{FaceArgs, OutputMode};
use crate::commands::CommandHandler;
use crate::errors::AppResult;
use crate::faces::{self, EnrollmentOutcome};
use crate::output::render_enroll;

pub struct EnrollHandler {
    args: FaceArgs,
    run: Box<dyn Fn(&FaceArgs) -> AppResult<EnrollmentOutcome> + Send + Sync>,
    render: Box<dyn Fn(&EnrollmentOutcome, OutputMode) -> AppResult<()> + Send + Sync>,
}

impl EnrollHandler {
    pub fn new(args: FaceArgs) -> Self {
        Self::with_dependencies(args, faces::run_enroll, render_enroll)
    }

    pub fn with_dependencies(
        args: FaceArgs,
        run: impl Fn(&FaceArgs) -> AppResult<EnrollmentOutcome> + Send + Sync + 'static,
        render: impl Fn(&EnrollmentOutcome, OutputMode) -> AppResult<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            args,
            run: Box::new(run),
            render: Box::new(render),
        }
    }
}

impl CommandHandler for EnrollHandler {
    fn execute(&self, mode: OutputMode, _verbose: bool) -> AppResult<ExitCode> {
        let outcome = (self.run)(&self.args)?;
        (self.render)(&outcome, mode)?;
        Ok(ExitCode::SUCCESS)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
