#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use payslip_downloader::browser::{Browser, Selector};
use payslip_downloader::config::{AppConfig, DebugConfig, FileConfig, LoginConfig, SettingsConfig};
use payslip_downloader::portal::selectors;
use payslip_downloader::RunResult;

/// In-memory stand-in for the portal: records what the workflow does and
/// drops a file into the download folder when the download entry is clicked.
pub struct FakeBrowser {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    visited: Vec<String>,
    clicks: Vec<String>,
    typed: Vec<(String, String)>,
    hidden: HashSet<String>,
    filter_label: String,
    close_visible: bool,
    rows: usize,
    download_dir: Option<PathBuf>,
    downloads: VecDeque<String>,
    quit: bool,
}

impl FakeBrowser {
    pub fn new(rows: usize, filter_label: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                rows,
                filter_label: filter_label.to_string(),
                ..Default::default()
            }),
        }
    }

    /// Files the portal hands out, in the order of download clicks.
    pub fn with_downloads(self, dir: &Path, names: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.download_dir = Some(dir.to_path_buf());
            state.downloads = names.iter().map(|n| n.to_string()).collect();
        }
        self
    }

    pub fn with_close_button(self) -> Self {
        self.state.lock().unwrap().close_visible = true;
        self
    }

    pub fn hide(self, selector: &Selector) -> Self {
        self.state.lock().unwrap().hidden.insert(selector.to_string());
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn clicked(&self, selector: &Selector) -> usize {
        let wanted = selector.to_string();
        self.clicks().iter().filter(|c| **c == wanted).count()
    }

    pub fn typed(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn has_quit(&self) -> bool {
        self.state.lock().unwrap().quit
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn goto(&self, url: &str) -> RunResult<()> {
        self.state.lock().unwrap().visited.push(url.to_string());
        Ok(())
    }

    async fn is_visible(&self, selector: &Selector) -> RunResult<bool> {
        let state = self.state.lock().unwrap();
        if *selector == selectors::filter_close() {
            return Ok(state.close_visible);
        }
        Ok(!state.hidden.contains(&selector.to_string()))
    }

    async fn click(&self, selector: &Selector) -> RunResult<()> {
        let mut state = self.state.lock().unwrap();
        state.clicks.push(selector.to_string());

        if *selector == selectors::download_entry() {
            if let (Some(dir), Some(name)) = (state.download_dir.clone(), state.downloads.pop_front()) {
                // Keeps creation times of consecutive downloads apart.
                std::thread::sleep(Duration::from_millis(25));
                std::fs::write(dir.join(name), b"%PDF-1.4").unwrap();
            }
        }
        Ok(())
    }

    async fn send_keys(&self, selector: &Selector, text: &str) -> RunResult<()> {
        self.state
            .lock()
            .unwrap()
            .typed
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn text(&self, selector: &Selector) -> RunResult<String> {
        assert_eq!(*selector, selectors::filter_label());
        Ok(self.state.lock().unwrap().filter_label.clone())
    }

    async fn count(&self, selector: &Selector) -> RunResult<usize> {
        assert_eq!(*selector, selectors::document_rows());
        Ok(self.state.lock().unwrap().rows)
    }

    async fn current_url(&self) -> RunResult<String> {
        Ok("https://portal.example/documents".to_string())
    }

    async fn quit(&self) -> RunResult<()> {
        self.state.lock().unwrap().quit = true;
        Ok(())
    }
}

pub fn test_config(destination: &str) -> AppConfig {
    AppConfig {
        debug: DebugConfig {
            log_folder: PathBuf::from("logs"),
            log_level: "DEBUG".to_string(),
            webdriver_log_level: "WARNING".to_string(),
            dry_run: false,
            logging_enabled: false,
            webdriver_logging_enabled: false,
        },
        login: LoginConfig {
            url: "https://portal.example/login".to_string(),
            client_number: "12345".to_string(),
            username: "jdoe".to_string(),
            password: "secret".to_string(),
        },
        file: FileConfig {
            file_destination: destination.to_string(),
            rename: true,
            search_period: "7".to_string(),
        },
        settings: SettingsConfig {
            wait_timeout: 0,
            download_timeout: 1,
            headless: true,
            webdriver_url: None,
            chromedriver_port: 9516,
            chromedriver_path: None,
        },
    }
}
