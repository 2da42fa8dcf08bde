use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(name = "payslip-downloader")]
#[command(about = "Downloads payslips from the employee document portal", long_about = None)]
pub struct Cli {
    /// Folder holding default.ini and properties.ini
    #[arg(long, default_value = ".")]
    pub config_dir: PathBuf,

    /// Walk through the portal without downloading or copying anything
    #[arg(long)]
    pub dry_run: bool,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Commands {
    /// Log in, download every listed payslip and copy it to its destination (default)
    Run,
    /// Read a password from stdin and print a sealed value for login.password
    ///
    /// The value is bound to this host (its machine id, or the host name where
    /// there is none) and only opens on the machine that sealed it.
    SealPassword,
    /// Print the effective configuration with the password redacted
    PrintConfig,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Run)
    }

    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            dry_run: self.dry_run,
            headless: self.headless,
        }
    }
}
