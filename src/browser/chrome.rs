// spider_chrome re-exports chromiumoxide API
use crate::browser::page::{
    ElementDescriptor, ElementInfo, ElementQuery, ExplorerPage, DIALOG_SELECTOR,
};
use crate::browser::probe::{MutationState, PROBE_READ_SCRIPT, PROBE_SCRIPT};
use crate::error::{ExplorerError, Result};
use crate::session::{SessionCookie, SessionFile};
use crate::snapshot::{extract_script, RawSnapshot};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const READY_TIMEOUT: Duration = Duration::from_secs(10);
const READY_POLL: Duration = Duration::from_millis(100);

/// Serializes the receiver element's descriptor to a JSON string.
const DESCRIBE_FN: &str = r#"function() {
    const r = this.getBoundingClientRect();
    const cs = window.getComputedStyle(this);
    const attr = (n) => this.getAttribute(n);
    return JSON.stringify({
        tag: this.tagName.toLowerCase(),
        role: attr('role'),
        text: ((this.innerText || this.value || '') + '').trim().slice(0, 200),
        label: attr('aria-label') || attr('title') || attr('placeholder'),
        className: typeof this.className === 'string' ? this.className : (attr('class') || ''),
        inputType: attr('type'),
        width: r.width,
        height: r.height,
        styledVisible: cs.visibility !== 'hidden' && cs.display !== 'none'
    });
}"#;

pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for Chrome browser
pub enum ConnectionMode {
    /// Launches a local Chrome with an isolated profile
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Connects to an existing Chrome on a debug port
    DebugPort(u16),
}

impl ChromeDriver {
    /// Helper method to get the current active page, excluding Chrome's new-tab-page
    async fn get_active_page(&self) -> Result<Page> {
        let pages = self
            .browser
            .pages()
            .await
            .map_err(|e| ExplorerError::PageUnavailable(e.to_string()))?;

        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        if let Some(page) = pages.last() {
            return Ok(page.clone());
        }

        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| ExplorerError::PageUnavailable(format!("Failed to create page: {}", e)))
    }

    /// Create new ChromeDriver with specified connection mode
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile directory per instance
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or_default();
                let temp_dir = std::env::temp_dir().join(format!("ui-explorer-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    ExplorerError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };
                config = config.user_data_dir(&temp_dir);

                // Linux AppArmor / container workaround
                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }
                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                }

                let config = config.build().map_err(|e| {
                    ExplorerError::LaunchFailed(format!(
                        "{}. \n\n\
                         Chrome not found. You can:\n\
                         - Install Chrome: https://www.google.com/chrome/\n\
                         - Ubuntu/Debian: sudo apt install chromium-browser\n\
                         - Or specify path: --chrome-path /path/to/chrome\n\
                         - Linux sandbox issue? Try: --no-sandbox",
                        e
                    ))
                })?;

                let (browser, mut handler) = Browser::launch(config)
                    .await
                    .map_err(|e| ExplorerError::LaunchFailed(e.to_string()))?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Drive browser events
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    ExplorerError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                         Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Drive browser events
                    }
                });

                (browser, None)
            }
        };

        Ok(Self { browser, temp_dir })
    }

    /// Get access to the current page for advanced operations
    pub async fn current_page(&self) -> Result<Page> {
        self.get_active_page().await
    }

    /// Import cookies from a session document into the browser.
    ///
    /// Returns how many cookies were handed to the browser. Entries without a
    /// domain cannot be scoped before navigation and are skipped.
    pub async fn import_cookies(&self, session: &SessionFile) -> Result<usize> {
        let mut params = Vec::new();
        for cookie in &session.cookies {
            match cookie_param(cookie) {
                Ok(param) => params.push(param),
                Err(e) => log::warn!("Skipping cookie {:?}: {}", cookie.name, e),
            }
        }
        if params.is_empty() {
            return Ok(0);
        }

        let count = params.len();
        let page = self.get_active_page().await?;
        page.set_cookies(params).await?;
        log::info!("🍪 Imported {} cookie(s)", count);
        Ok(count)
    }

    /// Export the current page's cookies as a session document.
    pub async fn export_cookies(&self) -> Result<SessionFile> {
        let page = self.get_active_page().await?;
        let mut cookies = Vec::new();
        for cookie in page.get_cookies().await? {
            let value = serde_json::to_value(&cookie)?;
            match serde_json::from_value::<SessionCookie>(value) {
                Ok(c) => cookies.push(c),
                Err(e) => log::debug!("Skipping unexportable cookie: {}", e),
            }
        }
        Ok(SessionFile { cookies })
    }

    /// Close the browser connection
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| ExplorerError::Other(e.to_string()))?;
        Ok(())
    }

    async fn wait_for_ready(&self, page: &Page) {
        let deadline = tokio::time::Instant::now() + READY_TIMEOUT;
        loop {
            let state = page
                .evaluate("document.readyState")
                .await
                .ok()
                .and_then(|r| r.into_value::<String>().ok());
            if matches!(state.as_deref(), Some("interactive") | Some("complete")) {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                log::warn!("Document not ready after {:?}, continuing", READY_TIMEOUT);
                return;
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }
}

fn cookie_param(cookie: &SessionCookie) -> Result<CookieParam> {
    let domain = cookie
        .domain
        .as_deref()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ExplorerError::Other("cookie has no domain".to_string()))?;
    let mut json = serde_json::json!({
        "name": cookie.name,
        "value": cookie.value,
        "domain": domain,
        "path": cookie.path.as_deref().unwrap_or("/"),
        "secure": cookie.secure,
        "httpOnly": cookie.http_only,
    });
    if let Some(expires) = cookie.persistent_expiry() {
        json["expires"] = serde_json::json!(expires);
    }
    if let Some(same_site) = &cookie.same_site {
        json["sameSite"] = serde_json::json!(canonical_same_site(same_site));
    }
    Ok(serde_json::from_value(json)?)
}

/// CDP expects `Strict`/`Lax`/`None`; storage-state files vary in casing.
fn canonical_same_site(value: &str) -> &str {
    match value.to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "lax" => "Lax",
        "none" => "None",
        _ => value,
    }
}

async fn describe(element: &Element) -> Result<ElementDescriptor> {
    let returns = element.call_js_fn(DESCRIBE_FN, false).await?;
    let raw = returns
        .result
        .value
        .as_ref()
        .and_then(|v| v.as_str())
        .ok_or_else(|| ExplorerError::ElementNotFound("element detached".to_string()))?;
    Ok(serde_json::from_str(raw)?)
}

#[async_trait]
impl ExplorerPage for ChromeDriver {
    type Handle = Arc<Element>;

    async fn navigate(&self, url: &str) -> Result<()> {
        log::info!("🌐 Navigating to {}", url);
        let page = self.get_active_page().await?;

        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| ExplorerError::NavigationFailed(format!("Invalid URL {}: {}", url, e)))?;

        let response = page.execute(params).await.map_err(|e| {
            let error_str = e.to_string();
            // "oneshot canceled" means the browser connection is gone
            if error_str.contains("oneshot canceled") {
                ExplorerError::NavigationFailed(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                ExplorerError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e))
            }
        })?;

        if let Some(error_text) = &response.result.error_text {
            return Err(ExplorerError::NavigationFailed(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        match tokio::time::timeout(NAVIGATION_TIMEOUT, page.wait_for_navigation()).await {
            Ok(Ok(_)) => log::debug!("Navigation settled"),
            Ok(Err(e)) => log::warn!("Could not wait for navigation: {}", e),
            Err(_) => {
                return Err(ExplorerError::Timeout(
                    NAVIGATION_TIMEOUT,
                    format!("waiting for {} to load", url),
                ))
            }
        }

        self.wait_for_ready(&page).await;
        Ok(())
    }

    async fn install_mutation_probe(&self) -> Result<()> {
        let page = self.get_active_page().await?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(PROBE_SCRIPT))
            .await?;
        page.evaluate(PROBE_SCRIPT)
            .await
            .map_err(|e| ExplorerError::Other(format!("Failed to install mutation probe: {}", e)))?;
        Ok(())
    }

    async fn mutation_state(&self) -> Result<MutationState> {
        let page = self.get_active_page().await?;
        let result = page
            .evaluate(PROBE_READ_SCRIPT)
            .await
            .map_err(|e| ExplorerError::Other(format!("Failed to read mutation probe: {}", e)))?;
        let state: Option<MutationState> = result
            .into_value()
            .map_err(|e| ExplorerError::Other(format!("Bad mutation probe payload: {}", e)))?;
        Ok(state.unwrap_or_default())
    }

    async fn raw_snapshot(&self) -> Result<RawSnapshot> {
        let page = self.get_active_page().await?;
        let result = page
            .evaluate(extract_script())
            .await
            .map_err(|e| ExplorerError::PageUnavailable(format!("Snapshot script failed: {}", e)))?;
        result
            .into_value()
            .map_err(|e| ExplorerError::PageUnavailable(format!("Bad snapshot payload: {}", e)))
    }

    async fn query(&self, query: ElementQuery) -> Result<Vec<ElementInfo<Self::Handle>>> {
        let page = self.get_active_page().await?;
        let elements = match query {
            ElementQuery::DialogControls => match page.find_element(DIALOG_SELECTOR).await {
                Ok(dialog) => dialog.find_elements(query.selector()).await?,
                Err(_) => Vec::new(),
            },
            _ => page.find_elements(query.selector()).await?,
        };

        let mut infos = Vec::with_capacity(elements.len());
        for element in elements {
            match describe(&element).await {
                Ok(descriptor) => infos.push(ElementInfo {
                    handle: Arc::new(element),
                    descriptor,
                }),
                // Detached between query and describe
                Err(e) => log::debug!("Skipping element: {}", e),
            }
        }
        Ok(infos)
    }

    async fn click(&self, handle: &Self::Handle) -> Result<()> {
        handle.click().await?;
        Ok(())
    }

    async fn set_value(&self, handle: &Self::Handle, value: &str) -> Result<()> {
        let function = format!(
            r#"function() {{
                this.focus();
                const proto = Object.getPrototypeOf(this);
                const desc = Object.getOwnPropertyDescriptor(proto, 'value');
                if (desc && desc.set) desc.set.call(this, {value});
                else this.value = {value};
                this.dispatchEvent(new Event('input', {{ bubbles: true }}));
                this.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }}"#,
            value = serde_json::to_string(value)?
        );
        let returns = handle.call_js_fn(function, false).await?;
        if let Some(details) = returns.exception_details {
            return Err(ExplorerError::Other(format!(
                "Setting value failed: {}",
                details.text
            )));
        }
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let page = self.get_active_page().await?;
        page.screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| ExplorerError::Other(format!("Failed to take screenshot: {}", e)))
    }

    async fn content(&self) -> Result<String> {
        let page = self.get_active_page().await?;
        page.content()
            .await
            .map_err(|e| ExplorerError::Other(e.to_string()))
    }

    async fn url(&self) -> Result<String> {
        let page = self.get_active_page().await?;
        page.url()
            .await
            .map_err(|e| ExplorerError::Other(e.to_string()))?
            .ok_or_else(|| ExplorerError::PageUnavailable("page has no URL".to_string()))
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}
