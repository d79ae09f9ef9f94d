//! CDP-driven browser fetcher.
//!
//! Drives Chrome/Chromium over the DevTools protocol via chromiumoxide.
//! One long-lived tab carries a category's listing session so in-page
//! pagination state survives between pages; every detail document opens in
//! a fresh tab that is closed before the HTML is handed back.

#[cfg(feature = "browser")]
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tracing::{debug, info};

use crate::error::FetchError;
use crate::fetch::PageFetcher;

/// Browser session options.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Run without a visible window.
    pub headless: bool,

    /// DevTools URL of an already-running Chrome (e.g. `ws://localhost:9222`).
    /// When set, no local browser is launched.
    pub remote_url: Option<String>,

    /// Page-load timeout in seconds.
    pub timeout_secs: u64,

    /// Extra Chrome arguments.
    pub chrome_args: Vec<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            remote_url: None,
            timeout_secs: 30,
            chrome_args: Vec::new(),
        }
    }
}

#[cfg(feature = "browser")]
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Settle time after an in-page pagination click; the Angular view swaps
/// rows without a navigation we could await.
#[cfg(feature = "browser")]
const RENDER_DELAY_MS: u64 = 1500;

#[cfg(feature = "browser")]
const READY_SCRIPT: &str = r#"
new Promise((resolve) => {
    if (document.readyState === 'complete') {
        resolve(true);
        return;
    }
    window.addEventListener('load', () => resolve(true), { once: true });
})
"#;

/// Clicks the first enabled next-page control, resolving to whether one
/// was found. The site renders the control as a span on some listing
/// views and as an anchor on others.
#[cfg(feature = "browser")]
const NEXT_PAGE_SCRIPT: &str = r#"
(() => {
    const snapshot = document.evaluate(
        "//span[text()='下一页'] | //a[text()='下一页'] | //a[contains(text(), '下一页')]",
        document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    for (let i = 0; i < snapshot.snapshotLength; i++) {
        const node = snapshot.snapshotItem(i);
        const cls = node.getAttribute('class') || '';
        if (cls.includes('disabled')) {
            continue;
        }
        node.click();
        return true;
    }
    return false;
})()
"#;

/// CDP-backed [`PageFetcher`].
#[cfg(feature = "browser")]
pub struct BrowserFetcher {
    options: BrowserOptions,
    browser: Option<Browser>,
    listing: Option<Page>,
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    pub fn new(options: BrowserOptions) -> Self {
        Self {
            options,
            browser: None,
            listing: None,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.options.timeout_secs)
    }

    fn find_chrome() -> Result<std::path::PathBuf, FetchError> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("found Chrome at {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        debug!("found Chrome in PATH: {}", path);
                        return Ok(std::path::PathBuf::from(path));
                    }
                }
            }
        }

        Err(FetchError::Browser(
            "Chrome/Chromium not found; install it or pass a remote DevTools URL".into(),
        ))
    }

    /// Launch or connect to a browser if not already running.
    async fn ensure_browser(&mut self) -> Result<(), FetchError> {
        if self.browser.is_some() {
            return Ok(());
        }

        if let Some(remote_url) = self.options.remote_url.clone() {
            return self.connect_remote(&remote_url).await;
        }

        info!("launching browser (headless={})", self.options.headless);

        let chrome_path = Self::find_chrome()?;
        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless, confusingly.
        if !self.options.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &self.options.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| FetchError::Browser(format!("browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(FetchError::browser)?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        self.browser = Some(browser);
        Ok(())
    }

    /// Connect to a remote Chrome instance via its /json/version endpoint.
    async fn connect_remote(&mut self, url: &str) -> Result<(), FetchError> {
        info!("connecting to remote browser at {}", url);

        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let client = reqwest::Client::new();
        let resp: serde_json::Value = client
            .get(&version_url)
            .send()
            .await
            .map_err(FetchError::browser)?
            .json()
            .await
            .map_err(FetchError::browser)?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FetchError::Browser("no webSocketDebuggerUrl in response".into()))?;

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: self.timeout(),
            ..Default::default()
        };

        let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(FetchError::browser)?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        self.browser = Some(browser);
        Ok(())
    }

    async fn new_page(&mut self) -> Result<Page, FetchError> {
        self.ensure_browser().await?;
        let browser = self.browser.as_ref().expect("browser ensured");
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(FetchError::browser)?;
        page.execute(
            SetUserAgentOverrideParams::builder()
                .user_agent(USER_AGENT)
                .build()
                .map_err(FetchError::Browser)?,
        )
        .await
        .map_err(FetchError::browser)?;
        Ok(page)
    }

    async fn navigate(&self, page: &Page, url: &str) -> Result<(), FetchError> {
        match tokio::time::timeout(self.timeout(), page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => return Err(FetchError::navigation(err)),
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    attempts: 1,
                })
            }
        }

        match tokio::time::timeout(self.timeout(), page.evaluate(READY_SCRIPT)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(FetchError::browser(err)),
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                attempts: 1,
            }),
        }
    }

    async fn listing_page(&mut self) -> Result<Page, FetchError> {
        if let Some(page) = self.listing.clone() {
            return Ok(page);
        }
        let page = self.new_page().await?;
        self.listing = Some(page.clone());
        Ok(page)
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn load(&mut self, url: &str) -> Result<(), FetchError> {
        let page = self.listing_page().await?;
        self.navigate(&page, url).await
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        let page = self.listing_page().await?;
        page.content().await.map_err(FetchError::browser)
    }

    async fn next_page(&mut self) -> Result<bool, FetchError> {
        let page = self.listing_page().await?;
        let clicked: bool = page
            .evaluate(NEXT_PAGE_SCRIPT)
            .await
            .map_err(FetchError::browser)?
            .into_value()
            .map_err(FetchError::browser)?;
        if clicked {
            tokio::time::sleep(Duration::from_millis(RENDER_DELAY_MS)).await;
        }
        Ok(clicked)
    }

    async fn fetch_detail(&mut self, url: &str) -> Result<String, FetchError> {
        let page = self.new_page().await?;

        // Capture before close so the tab is released on every path.
        let result = match self.navigate(&page, url).await {
            Ok(()) => page.content().await.map_err(FetchError::browser),
            Err(err) => Err(err),
        };

        if let Err(err) = page.close().await {
            debug!("detail tab close failed: {}", err);
        }

        result
    }
}

#[cfg(feature = "browser")]
impl Drop for BrowserFetcher {
    fn drop(&mut self) {
        self.listing = None;
        self.browser = None;
    }
}

#[cfg(all(test, feature = "browser"))]
mod tests {
    use super::*;

    #[test]
    fn test_next_page_xpath_covers_span_and_anchor_controls() {
        // The listing views are inconsistent about the element the
        // next-page control renders as; the click script must try both.
        let xpath = NEXT_PAGE_SCRIPT
            .lines()
            .find(|line| line.contains("下一页"))
            .expect("pagination xpath");
        assert!(xpath.contains("//span[text()='下一页']"));
        assert!(xpath.contains("//a[text()='下一页']"));
        assert!(xpath.contains("//a[contains(text(), '下一页')]"));
    }
}

/// Stub for builds without the `browser` feature.
#[cfg(not(feature = "browser"))]
pub struct BrowserFetcher {
    #[allow(dead_code)]
    options: BrowserOptions,
}

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn load(&mut self, _url: &str) -> Result<(), FetchError> {
        Err(FetchError::Browser(
            "browser support not compiled; rebuild with --features browser".into(),
        ))
    }

    async fn content(&mut self) -> Result<String, FetchError> {
        Err(FetchError::Browser(
            "browser support not compiled; rebuild with --features browser".into(),
        ))
    }

    async fn next_page(&mut self) -> Result<bool, FetchError> {
        Err(FetchError::Browser(
            "browser support not compiled; rebuild with --features browser".into(),
        ))
    }

    async fn fetch_detail(&mut self, _url: &str) -> Result<String, FetchError> {
        Err(FetchError::Browser(
            "browser support not compiled; rebuild with --features browser".into(),
        ))
    }
}
