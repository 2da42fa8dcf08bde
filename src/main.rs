use clap::Parser;
use std::process::ExitCode;

use payslip_downloader::app;
use payslip_downloader::cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    app::run(cli).await
}
