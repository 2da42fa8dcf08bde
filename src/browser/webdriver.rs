use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use thirtyfour::prelude::*;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use super::{Browser, Selector};
use crate::error::RunResult;

const CONNECT_ATTEMPTS: u32 = 3;

/// Chrome session driven over the WebDriver protocol.
pub struct WebDriverBrowser {
    driver: WebDriver,
}

impl WebDriverBrowser {
    /// Starts a Chrome session whose downloads land in `download_dir`.
    pub async fn connect(server_url: &str, headless: bool, download_dir: &Path) -> Result<Self> {
        debug!("starting browser session, headless={}", headless);

        let mut caps = DesiredCapabilities::chrome();

        let mut chrome_args = vec![
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            "--window-size=1920,1080".to_string(),
        ];

        if headless {
            chrome_args.push("--headless".to_string());
        }

        for arg in chrome_args {
            caps.add_arg(&arg)?;
        }

        caps.add_experimental_option(
            "prefs",
            serde_json::json!({
                "download.default_directory": download_dir.to_string_lossy(),
                "download.prompt_for_download": false,
                "download.directory_upgrade": true,
            }),
        )?;

        let mut attempt = 1;
        loop {
            match WebDriver::new(server_url, caps.clone()).await {
                Ok(driver) => {
                    debug!("connected to WebDriver at {}", server_url);
                    return Ok(Self { driver });
                }
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    warn!("WebDriver connection attempt {}/{} failed: {}", attempt, CONNECT_ATTEMPTS, e);
                    attempt += 1;
                    sleep(Duration::from_millis(1000)).await;
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!(
                            "Failed to connect to WebDriver at {} after {} attempts",
                            server_url, CONNECT_ATTEMPTS
                        )
                    });
                }
            }
        }
    }

    fn by(selector: &Selector) -> By {
        match selector {
            Selector::Id(id) => By::Id(id.as_str()),
            Selector::XPath(xpath) => By::XPath(xpath.as_str()),
        }
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&self, url: &str) -> RunResult<()> {
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn is_visible(&self, selector: &Selector) -> RunResult<bool> {
        let elements = self.driver.find_all(Self::by(selector)).await?;
        match elements.first() {
            // Elements can go stale while the page re-renders.
            Some(element) => Ok(element.is_displayed().await.unwrap_or(false)),
            None => Ok(false),
        }
    }

    async fn click(&self, selector: &Selector) -> RunResult<()> {
        let element = self.driver.find(Self::by(selector)).await?;
        element.click().await?;
        Ok(())
    }

    async fn send_keys(&self, selector: &Selector, text: &str) -> RunResult<()> {
        let element = self.driver.find(Self::by(selector)).await?;
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    async fn text(&self, selector: &Selector) -> RunResult<String> {
        let element = self.driver.find(Self::by(selector)).await?;
        Ok(element.text().await?)
    }

    async fn count(&self, selector: &Selector) -> RunResult<usize> {
        Ok(self.driver.find_all(Self::by(selector)).await?.len())
    }

    async fn current_url(&self) -> RunResult<String> {
        Ok(self.driver.current_url().await?.to_string())
    }

    async fn quit(&self) -> RunResult<()> {
        // quit() consumes the handle
        let driver = self.driver.clone();
        driver.quit().await?;
        Ok(())
    }
}
