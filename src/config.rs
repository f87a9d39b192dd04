use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "notesd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Grade-management sidecar speaking JSON lines on stdin/stdout", long_about = None)]
pub struct Args {
    /// Workspace directory to open at startup
    #[arg(long, env = "NOTESD_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "NOTESD_LOG_LEVEL", default_value = "info")]
    pub log_level: Level,

    /// Emit JSON log lines on stderr
    #[arg(long, env = "NOTESD_LOG_JSON")]
    pub log_json: bool,
}
