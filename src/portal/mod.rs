pub mod selectors;

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::browser::{Browser, Selector};
use crate::config::AppConfig;
use crate::download::{ScratchDir, DOWNLOAD_POLL_INTERVAL};
use crate::error::RunResult;
use crate::materialize::Materializer;

/// Outcome of a completed run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Rows found in the document list.
    pub documents: usize,
    /// Files written to their destination, in row order.
    pub copied: Vec<PathBuf>,
}

/// Everything one run of the workflow works with: the browser, the loaded
/// configuration and the scratch download folder.
pub struct PortalSession<'a, B: Browser + ?Sized> {
    browser: &'a B,
    config: &'a AppConfig,
    scratch: &'a ScratchDir,
    poll_interval: Duration,
}

impl<'a, B: Browser + ?Sized> PortalSession<'a, B> {
    pub fn new(browser: &'a B, config: &'a AppConfig, scratch: &'a ScratchDir) -> Self {
        Self {
            browser,
            config,
            scratch,
            poll_interval: DOWNLOAD_POLL_INTERVAL,
        }
    }

    /// How often the scratch folder is checked while a download is pending.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn run(&self) -> RunResult<RunSummary> {
        info!("Step 1/4: opening {}", self.config.login.url);
        self.browser.goto(&self.config.login.url).await?;

        info!("Step 2/4: logging in");
        self.login().await?;

        info!("Step 3/4: selecting {} filter", self.config.period_filter());
        self.select_period_filter().await?;

        info!("Step 4/4: downloading payslips");
        let summary = self.download_payslips().await?;

        info!(
            "✅ Finished: {} document(s) listed, {} file(s) copied",
            summary.documents,
            summary.copied.len()
        );
        Ok(summary)
    }

    /// Fills in the login form and submits it. Whether the login worked only
    /// shows once the next page's elements fail to appear.
    pub async fn login(&self) -> RunResult<()> {
        info!("login");
        let login = &self.config.login;

        self.wait_for(&selectors::client_number_field()).await?;
        self.browser
            .send_keys(&selectors::client_number_field(), &login.client_number)
            .await?;
        self.browser
            .send_keys(&selectors::username_field(), &login.username)
            .await?;
        self.browser
            .send_keys(&selectors::password_field(), &login.password)
            .await?;
        self.browser.click(&selectors::login_button()).await?;

        debug!("login submitted, now at {}", self.browser.current_url().await?);
        Ok(())
    }

    /// Makes sure the document list only shows the configured period.
    ///
    /// Returns `true` when the filter had to be changed.
    pub async fn select_period_filter(&self) -> RunResult<bool> {
        self.wait_for(&selectors::module_menu()).await?;

        let search_period = &self.config.file.search_period;
        let label = self.browser.text(&selectors::filter_label()).await?;
        if label.contains(search_period.as_str()) {
            debug!("filter '{}' already matches period {}", label, search_period);
            return Ok(false);
        }

        debug!("filter '{}' does not match period {}, resetting", label, search_period);
        let close = selectors::filter_close();
        if self.browser.is_visible(&close).await? {
            self.browser.click(&close).await?;
        }

        self.browser.click(&selectors::filter_dropdown()).await?;
        self.browser
            .click(&selectors::filter_entry(self.config.period_filter()))
            .await?;
        Ok(true)
    }

    /// Downloads and copies every document in the list, one at a time.
    ///
    /// Rows are counted once up front; the list is expected to come back in
    /// the same order after each round trip to a document.
    pub async fn download_payslips(&self) -> RunResult<RunSummary> {
        let documents = self.browser.count(&selectors::document_rows()).await?;
        info!("{} document(s) listed", documents);

        let materializer = Materializer {
            template: &self.config.file.file_destination,
            rename: self.config.file.rename,
        };

        let mut summary = RunSummary {
            documents,
            copied: Vec::new(),
        };
        for index in 1..=documents {
            self.download_payslip(index).await?;

            if !self.config.debug.dry_run {
                summary.copied.push(materializer.materialize_latest(self.scratch)?);
            }
        }
        Ok(summary)
    }

    /// Opens row `index` (1-based), downloads its document unless this is a
    /// dry run, and navigates back to the list.
    pub async fn download_payslip(&self, index: usize) -> RunResult<()> {
        let row = selectors::document_row(index);
        self.wait_for(&row).await?;
        self.browser.click(&row).await?;

        let actions = selectors::actions_button();
        self.wait_for(&actions).await?;
        self.browser.click(&actions).await?;

        if self.config.debug.dry_run {
            debug!("dry-run enabled: skipped downloading file");
        } else {
            let baseline = self.scratch.completed_files()?.len();
            self.browser.click(&selectors::download_entry()).await?;
            info!("downloading file to {}", self.scratch.path().display());
            self.scratch
                .wait_for_new_file_every(baseline, self.config.download_timeout(), self.poll_interval)
                .await?;
        }

        self.browser.click(&selectors::breadcrumb_home()).await?;
        Ok(())
    }

    async fn wait_for(&self, selector: &Selector) -> RunResult<()> {
        self.browser
            .wait_for_visible(selector, self.config.wait_timeout())
            .await
    }
}
