use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

const LATEST_RELEASE_URL: &str =
    "https://googlechromelabs.github.io/chrome-for-testing/LATEST_RELEASE_STABLE";
const READINESS_TIMEOUT_SECS: u64 = 15;

/// Provides a local chromedriver: finds or downloads the binary, runs it and
/// kills it again when dropped.
pub struct ChromeDriverManager {
    driver_path: PathBuf,
    process: Arc<Mutex<Option<Child>>>,
}

impl ChromeDriverManager {
    /// Uses `explicit_path` when given, otherwise the app's cache directory.
    pub fn new(explicit_path: Option<&Path>) -> Result<Self> {
        let driver_path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => ProjectDirs::from("com", "payslip", "payslip-downloader")
                .ok_or_else(|| anyhow::anyhow!("Could not determine cache directory"))?
                .cache_dir()
                .join(binary_name()),
        };

        Ok(Self {
            driver_path,
            process: Arc::new(Mutex::new(None)),
        })
    }

    pub fn driver_path(&self) -> &Path {
        &self.driver_path
    }

    pub async fn ensure_driver_available(&self) -> Result<()> {
        if !self.driver_path.exists() {
            info!("ChromeDriver not found at {}, downloading...", self.driver_path.display());
            self.download_chromedriver().await
                .context("Failed to download ChromeDriver. Please check your internet connection.")?;
        } else {
            debug!("ChromeDriver found at {}", self.driver_path.display());
        }
        Ok(())
    }

    /// Starts chromedriver on `port` and returns the URL to connect to.
    pub async fn start_driver(&self, port: u16) -> Result<String> {
        self.ensure_driver_available().await?;

        let url = format!("http://localhost:{}", port);
        let mut process_guard = self.process.lock().await;
        if process_guard.is_some() {
            debug!("ChromeDriver is already running on port {}", port);
            return Ok(url);
        }

        info!("Starting ChromeDriver on port {}...", port);
        let child = Command::new(&self.driver_path)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start ChromeDriver from {}. Make sure Chrome is installed.", self.driver_path.display()))?;

        *process_guard = Some(child);

        if !self.wait_for_readiness(&url, READINESS_TIMEOUT_SECS).await? {
            return Err(anyhow::anyhow!(
                "ChromeDriver failed to become ready within {} seconds. This might indicate a Chrome installation problem.",
                READINESS_TIMEOUT_SECS
            ));
        }

        debug!("ChromeDriver ready on port {}", port);
        Ok(url)
    }

    pub async fn stop_driver(&self) {
        let mut process_guard = self.process.lock().await;
        if let Some(mut child) = process_guard.take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!("ChromeDriver stopped");
        }
    }

    async fn download_chromedriver(&self) -> Result<()> {
        let platform = platform()
            .ok_or_else(|| anyhow::anyhow!("No ChromeDriver build for this platform; set settings.chromedriver_path"))?;

        let version = self.get_latest_version().await?;
        let download_url = download_url(&version, platform);
        info!("Downloading ChromeDriver {} from {}", version, download_url);

        let response = reqwest::get(&download_url).await?.error_for_status()?;
        let zip_data = response.bytes().await?;

        if let Some(parent) = self.driver_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let zip_path = std::env::temp_dir().join("chromedriver.zip");
        fs::write(&zip_path, zip_data)?;

        let file = fs::File::open(&zip_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut extracted = false;
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            // Archives nest the binary as chromedriver-<platform>/chromedriver[.exe]
            if file.name().ends_with(binary_name()) && !file.is_dir() {
                debug!("Extracting: {}", file.name());
                let mut outfile = fs::File::create(&self.driver_path)?;
                std::io::copy(&mut file, &mut outfile)?;
                extracted = true;
                break;
            }
        }

        let _ = fs::remove_file(&zip_path);

        if !extracted {
            return Err(anyhow::anyhow!("{} not found in downloaded archive", binary_name()));
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.driver_path, fs::Permissions::from_mode(0o755))?;
        }

        info!("ChromeDriver downloaded to {}", self.driver_path.display());
        Ok(())
    }

    async fn wait_for_readiness(&self, url: &str, timeout_secs: u64) -> Result<bool> {
        let client = reqwest::Client::new();
        let status_url = format!("{}/status", url);
        let timeout = tokio::time::Duration::from_secs(timeout_secs);
        let start = tokio::time::Instant::now();

        while start.elapsed() < timeout {
            if let Ok(response) = client.get(&status_url).send().await {
                if response.status().is_success() {
                    return Ok(true);
                }
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
        }

        Ok(false)
    }

    async fn get_latest_version(&self) -> Result<String> {
        let response = reqwest::get(LATEST_RELEASE_URL).await?.error_for_status()?;
        let version = response.text().await?.trim().to_string();
        debug!("Latest ChromeDriver version: {}", version);
        Ok(version)
    }
}

impl Drop for ChromeDriverManager {
    fn drop(&mut self) {
        // Best effort cleanup
        if let Ok(mut process_guard) = self.process.try_lock() {
            if let Some(mut child) = process_guard.take() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}

/// Chrome-for-Testing platform name for the running system.
fn platform() -> Option<&'static str> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("linux", "x86_64") => Some("linux64"),
        ("macos", "x86_64") => Some("mac-x64"),
        ("macos", "aarch64") => Some("mac-arm64"),
        ("windows", "x86_64") => Some("win64"),
        ("windows", "x86") => Some("win32"),
        _ => None,
    }
}

fn binary_name() -> &'static str {
    if cfg!(windows) {
        "chromedriver.exe"
    } else {
        "chromedriver"
    }
}

fn download_url(version: &str, platform: &str) -> String {
    format!(
        "https://storage.googleapis.com/chrome-for-testing-public/{}/{}/chromedriver-{}.zip",
        version, platform, platform
    )
}
