use anyhow::{Context, Result};
use std::io::BufRead;
use std::process::ExitCode;
use tracing::{error, info, warn};

use crate::browser::{Browser, WebDriverBrowser};
use crate::chromedriver_manager::ChromeDriverManager;
use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::crypto::PasswordCrypto;
use crate::download::ScratchDir;
use crate::error::RunError;
use crate::logging;
use crate::portal::{PortalSession, RunSummary};

/// Entry point behind `main`: every failure ends up here and is turned into
/// an exit code.
pub async fn run(cli: Cli) -> ExitCode {
    match cli.command() {
        Commands::Run => run_download(&cli).await,
        Commands::SealPassword => seal_password(),
        Commands::PrintConfig => print_config(&cli),
    }
}

async fn run_download(cli: &Cli) -> ExitCode {
    let config = match AppConfig::load(&cli.config_dir, &cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guards = match logging::init(&config.debug) {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.debug.dry_run {
        info!("dry-run enabled: nothing will be downloaded or copied");
    }

    match execute(&config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(report(&e)),
    }
}

/// Sets up the scratch folder, driver and browser, then hands over to
/// [`run_session`].
async fn execute(config: &AppConfig) -> Result<RunSummary> {
    let scratch = ScratchDir::new()?;

    let (driver_manager, server_url) = match config.webdriver_url() {
        Some(url) => (None, url.to_string()),
        None => {
            let manager = ChromeDriverManager::new(config.settings.chromedriver_path.as_deref())?;
            let url = manager.start_driver(config.settings.chromedriver_port).await?;
            (Some(manager), url)
        }
    };

    // On failure here the scratch folder and driver process go with their Drop impls.
    let browser = WebDriverBrowser::connect(&server_url, config.settings.headless, scratch.path())
        .await
        .context("Failed to start browser session")?;

    let outcome = run_session(&browser, config, scratch).await;

    if let Some(manager) = &driver_manager {
        manager.stop_driver().await;
    }
    outcome
}

/// Runs the portal workflow until it finishes, fails or Ctrl-C arrives, then
/// quits the browser and removes the scratch folder whatever the outcome.
pub async fn run_session<B: Browser + ?Sized>(
    browser: &B,
    config: &AppConfig,
    mut scratch: ScratchDir,
) -> Result<RunSummary> {
    let outcome = {
        let session = PortalSession::new(browser, config, &scratch);
        tokio::select! {
            result = session.run() => result,
            _ = tokio::signal::ctrl_c() => Err(RunError::Interrupted),
        }
    };

    if let Err(e) = browser.quit().await {
        warn!("failed to close browser: {}", e);
    }
    let closed = scratch.close();

    let summary = outcome?;
    closed?;
    Ok(summary)
}

/// Logs a failed run once and returns the process exit status.
pub fn report(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<RunError>() {
        Some(run_error) if run_error.is_timeout() => {
            error!("{}", run_error);
            run_error.exit_status()
        }
        Some(RunError::Interrupted) => {
            warn!("interrupted, cleaned up");
            RunError::Interrupted.exit_status()
        }
        Some(run_error) => {
            error!("run failed: {}", run_error);
            run_error.exit_status()
        }
        None => {
            error!("run failed: {:#}", e);
            1
        }
    }
}

fn seal_password() -> ExitCode {
    eprint!("Password: ");
    let mut line = String::new();
    if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
        eprintln!("Error: failed to read password: {}", e);
        return ExitCode::FAILURE;
    }

    match PasswordCrypto::seal_password(line.trim_end_matches(['\r', '\n'])) {
        Ok(sealed) => {
            println!("{}", sealed);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_config(cli: &Cli) -> ExitCode {
    let printed = AppConfig::load(&cli.config_dir, &cli.overrides())
        .and_then(|config| Ok(serde_json::to_string_pretty(&config.redacted())?));

    match printed {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
