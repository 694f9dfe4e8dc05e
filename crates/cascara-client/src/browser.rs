use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cascara_core::error::AppError;
use cascara_core::fetch::{FetchOutcome, StrategyId};
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;

/// Headless-browser fetch strategy using Chromium via the Chrome
/// DevTools Protocol.
///
/// Unlike [`super::HttpStrategy`], this renders JavaScript before
/// returning the HTML, which gets past client-side challenges and SPA
/// shells that defeat a plain HTTP fetch.
///
/// A single Chromium process is shared across all clones of this
/// struct; each fetch opens a new tab, grabs the rendered HTML, and
/// closes the tab.
#[derive(Clone)]
pub struct BrowserStrategy {
    id: StrategyId,
    browser: Arc<Browser>,
}

impl BrowserStrategy {
    /// Launches a headless Chromium browser.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$PATH` (or the
    /// default locations checked by `chromiumoxide`).
    pub async fn new() -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        // Snap-packaged Chromium exposes a wrapper that rejects standard
        // Chrome CLI flags (--headless, --disable-gpu, …).  We try to
        // locate the *real* binary buried inside the snap, falling back
        // to any other Chrome/Chromium the user may have installed.
        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            .build()
            .map_err(|e| AppError::ConfigError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::ConfigError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            id: StrategyId::from("browser"),
            browser: Arc::new(browser),
        })
    }

    /// True when a Chrome/Chromium binary can be found on this machine.
    /// Cheap enough to call per cascade rung.
    pub fn binary_available() -> bool {
        Self::find_chrome_binary().is_some() || which_in_path()
    }

    /// Tries to locate the real Chrome/Chromium binary.
    ///
    /// On systems where Chromium is installed via **snap**, the wrapper
    /// at `/snap/bin/chromium` strips unknown CLI flags, breaking
    /// headless mode. We look for the real binary inside the snap first,
    /// then fall back to well-known system paths. If nothing is found we
    /// return `None` and let `chromiumoxide` do its own lookup.
    fn find_chrome_binary() -> Option<PathBuf> {
        let candidates: &[&str] = &[
            // Snap (Ubuntu default)
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            // Flatpak
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            // Common apt / manual installs
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ];

        // Also honour an explicit override via env var.
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        candidates.iter().map(PathBuf::from).find(|p| p.exists())
    }

    pub fn id(&self) -> &StrategyId {
        &self.id
    }

    /// Navigates to the URL in a fresh tab and returns the rendered DOM.
    /// Navigation and render failures fold into the outcome.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> FetchOutcome {
        let started = Instant::now();

        // The page handle lives outside the timed future: if the timeout
        // drops the future mid-navigation the tab must still be closed.
        let opened = Arc::new(std::sync::Mutex::new(None));

        let result = tokio::time::timeout(timeout, {
            let opened = Arc::clone(&opened);
            async move {
                let page = self
                    .browser
                    .new_page(url)
                    .await
                    .map_err(|e| format!("failed to navigate to {url}: {e}"))?;
                *opened.lock().unwrap_or_else(|e| e.into_inner()) = Some(page.clone());

                // Wait until <body> is present — a minimal signal that the
                // page has rendered its main content.
                page.find_element("body")
                    .await
                    .map_err(|e| format!("page did not render body: {e}"))?;

                page.content()
                    .await
                    .map_err(|e| format!("failed to read page content: {e}"))
            }
        })
        .await;

        // Close the tab whether the fetch finished, errored, or timed
        // out. Spawned so a wedged tab cannot stall the cascade.
        if let Some(page) = opened.lock().unwrap_or_else(|e| e.into_inner()).take() {
            tokio::spawn(async move {
                let _ = page.close().await;
            });
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(Ok(html)) => FetchOutcome {
                strategy: self.id.clone(),
                // CDP does not surface the HTTP status of the main
                // document here; a rendered body stands in for 200.
                status_code: Some(200),
                body: html,
                elapsed_ms,
                error: None,
            },
            Ok(Err(message)) => FetchOutcome::failed(self.id.clone(), message, elapsed_ms),
            Err(_) => FetchOutcome::failed(
                self.id.clone(),
                format!("timed out after {}ms", timeout.as_millis()),
                elapsed_ms,
            ),
        }
    }
}

fn which_in_path() -> bool {
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| {
        ["google-chrome", "chromium", "chromium-browser", "chrome"]
            .iter()
            .any(|name| dir.join(name).exists())
    })
}
