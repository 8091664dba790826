use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ac-cli")]
#[command(about = "Admin console runtime CLI")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Run one console line and exit.
    Exec(ExecArgs),
    /// Read console lines from stdin until `quit`.
    Console(ConsoleArgs),
    /// Load a configuration directory and report what it registers.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ExecArgs {
    #[arg(long = "config-dir")]
    pub(crate) config_dir: String,
    #[arg(long = "user")]
    pub(crate) user: Option<String>,
    pub(crate) line: String,
}

#[derive(Debug, Args)]
pub(crate) struct ConsoleArgs {
    #[arg(long = "config-dir")]
    pub(crate) config_dir: String,
    #[arg(long = "user")]
    pub(crate) user: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct CheckArgs {
    #[arg(long = "config-dir")]
    pub(crate) config_dir: String,
}
