use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "facegate",
    version,
    about = "Enroll and verify faces against the local fingerprint store"
)]
pub struct Cli {
    /// Emit machine-readable JSON instead of human text
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from(self.json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl From<bool> for OutputMode {
    fn from(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Store (or replace) the reference face for a user
    Enroll(FaceArgs),
    /// Compare a face against the stored reference, enrolling it if none exists
    Verify(FaceArgs),
    /// Check configuration and the fingerprint store
    Doctor(DoctorArgs),
}

#[derive(Debug, Clone, Args)]
pub struct FaceArgs {
    /// Identity the face belongs to
    #[arg(long)]
    pub user: String,

    /// Image file; `.b64` and `.txt` files are read as base64 payload text
    #[arg(long, value_name = "PATH")]
    pub image: PathBuf,

    /// Override the fingerprint store directory
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default locations
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct DoctorArgs {
    /// Read configuration from this file instead of the default locations
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
