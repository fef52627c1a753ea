use std::ffi::OsString;
use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::protocol::cdp::Network::CookieParam;
use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use tracing::{info, warn};

use keymill_core::config::BrowserConfig;
use keymill_core::cookies::CookieRecord;
use keymill_core::error::AutomationError;

/// One browser process driving one page. A session lives for a single
/// automation iteration; dropping it tears the Chrome process down, which
/// keeps resource growth bounded across a batch.
pub struct BrowserSession {
    // Process handle; held so the browser outlives the tab.
    #[allow(dead_code)]
    browser: Browser,
    tab: Arc<Tab>,
    config: BrowserConfig,
}

impl BrowserSession {
    pub fn launch(config: &BrowserConfig) -> Result<Self, AutomationError> {
        let mut extra_args: Vec<OsString> = Vec::new();

        // Required for running in Docker containers
        extra_args.push(OsString::from("--no-sandbox"));
        extra_args.push(OsString::from("--disable-dev-shm-usage"));
        extra_args.push(OsString::from("--disable-gpu"));

        let mut builder = LaunchOptionsBuilder::default();
        builder
            .headless(config.headless)
            .window_size(Some((1920, 1080)))
            .args(extra_args.iter().map(|a| a.as_ref()).collect());

        // Use CHROME_PATH env var if set (for Docker/custom installs)
        if let Ok(chrome_path) = std::env::var("CHROME_PATH") {
            builder.path(Some(std::path::PathBuf::from(chrome_path)));
        }

        let launch_options = builder
            .build()
            .map_err(|e| AutomationError::Browser(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| AutomationError::Browser(e.to_string()))?;

        let tab = browser
            .new_tab()
            .map_err(|e| AutomationError::Browser(e.to_string()))?;
        tab.set_default_timeout(Duration::from_secs(config.nav_timeout_secs));

        Ok(Self {
            browser,
            tab,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub async fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        info!("navigating to {}", url);

        self.tab
            .navigate_to(url)
            .map_err(|e| AutomationError::Browser(e.to_string()))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| AutomationError::Browser(e.to_string()))?;

        self.wait_until_idle().await;
        Ok(())
    }

    pub async fn reload(&self) -> Result<(), AutomationError> {
        self.tab
            .reload(false, None)
            .map_err(|e| AutomationError::Browser(e.to_string()))?;

        self.wait_until_idle().await;
        Ok(())
    }

    /// Quiescence heuristic: the page counts as settled once the rendered
    /// document stops changing between samples. Bounded; a page that never
    /// settles is handed back to the caller rather than failed, since the
    /// selectors themselves will report whether the content arrived.
    pub async fn wait_until_idle(&self) {
        let bound = Duration::from_secs(self.config.idle_timeout_secs);
        let started = Instant::now();
        let mut last_len = 0usize;

        loop {
            if started.elapsed() > bound {
                warn!("page never settled, continuing anyway");
                return;
            }

            let len = self.tab.get_content().map(|html| html.len()).unwrap_or(0);
            if len > 0 && len == last_len {
                return;
            }
            last_len = len;

            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    /// Evaluate a boolean probe; any evaluation failure reads as `false`.
    pub fn eval_bool(&self, expr: &str) -> bool {
        self.tab
            .evaluate(expr, false)
            .ok()
            .and_then(|result| result.value)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    pub fn eval_string(&self, expr: &str) -> Option<String> {
        self.tab
            .evaluate(expr, false)
            .ok()
            .and_then(|result| result.value)
            .and_then(|value| value.as_str().map(String::from))
    }

    pub fn current_url(&self) -> String {
        self.tab.get_url()
    }

    pub fn body_text(&self) -> Option<String> {
        self.eval_string("document.body ? document.body.innerText : ''")
    }

    /// Inject saved cookies into the browser. Cookies without a domain are
    /// skipped (CDP has nothing to scope them to) and `sameSite` is only
    /// passed through when it is a value the protocol understands.
    pub fn set_cookies(&self, cookies: &[CookieRecord]) -> Result<(), AutomationError> {
        let mut raw = Vec::new();
        for cookie in cookies {
            if cookie.domain.is_empty() {
                continue;
            }

            let mut value = serde_json::json!({
                "name": cookie.name,
                "value": cookie.value,
                "domain": cookie.domain,
                "path": cookie.path,
                "httpOnly": cookie.http_only,
                "secure": cookie.secure,
            });
            if cookie.expires > 0.0 {
                value["expires"] = serde_json::json!(cookie.expires);
            }
            if matches!(cookie.same_site.as_str(), "Strict" | "Lax" | "None") {
                value["sameSite"] = serde_json::json!(cookie.same_site);
            }
            raw.push(value);
        }

        if raw.is_empty() {
            return Err(AutomationError::CookieStore(
                "no cookies with a usable domain".to_string(),
            ));
        }

        let params: Vec<CookieParam> = serde_json::from_value(serde_json::Value::Array(raw))
            .map_err(|e| AutomationError::CookieStore(e.to_string()))?;

        self.tab
            .set_cookies(params)
            .map_err(|e| AutomationError::Browser(e.to_string()))?;
        Ok(())
    }

    /// Capture the session's cookies in the on-disk record shape.
    pub fn get_cookies(&self) -> Result<Vec<CookieRecord>, AutomationError> {
        let cookies = self
            .tab
            .get_cookies()
            .map_err(|e| AutomationError::Browser(e.to_string()))?;

        let value = serde_json::to_value(cookies)
            .map_err(|e| AutomationError::CookieStore(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| AutomationError::CookieStore(e.to_string()))
    }
}
