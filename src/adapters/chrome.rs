use crate::core::selection::SUBMISSION_GLOBAL;
use crate::core::{BrowserSession, SelectionPrompt, StatusSink};
use crate::domain::model::{FormSubmission, NetworkResponse, SelectionForm, StoredCookie};
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Network::events::ResponseReceivedEventParams;
use headless_chrome::protocol::cdp::Network::{
    CookieParam, GetResponseBody, GetResponseBodyReturnObject,
};
use headless_chrome::util::Timeout;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::{json, Value};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use url::Url;

/// 操作者可能需要很久才登入或送出表單，瀏覽器連線不能因閒置而關閉
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const WAIT_SLICE: Duration = Duration::from_secs(30);
const SUBMIT_POLL: Duration = Duration::from_millis(500);
const BODY_RETRY: BodyRetry = BodyRetry {
    delay: Duration::from_millis(250),
    limit: Duration::from_secs(120),
};
const RESPONSE_HANDLER: &str = "mastery-export";

const OVERLAY_SCRIPT: &str = r#"function (message) {
  var overlay = document.getElementById("__mastery_overlay");
  if (!message) {
    if (overlay) overlay.remove();
    return;
  }
  if (!overlay) {
    overlay = document.createElement("div");
    overlay.id = "__mastery_overlay";
    overlay.style.cssText = "position: fixed; top: 25px; left: 25px; font-size: 2rem; z-index: 9999; " +
      "background: rgba(72, 52, 212, 0.75); padding: 1rem; pointer-events: none; color: white;";
  }
  overlay.innerText = message;
  (document.body || document.documentElement).appendChild(overlay);
}"#;

#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    pub chrome_path: Option<PathBuf>,
    /// Only responses on these URL paths are forwarded to the session.
    pub watched_paths: Vec<String>,
}

/// A visible Chrome window driven over CDP. Serves as the browser session,
/// the status overlay and the host of the selection view.
pub struct ChromeSession {
    browser: Browser,
    tab: Arc<Tab>,
    responses: Mutex<mpsc::UnboundedReceiver<PendingResponse>>,
}

/// 回應標頭已到，內容要等 loadingFinished 之後才讀得到
struct PendingResponse {
    request_id: String,
    url: String,
    status: u16,
}

#[derive(Debug, Clone, Copy)]
struct BodyRetry {
    delay: Duration,
    limit: Duration,
}

/// headless_chrome 是同步 API；在 multi-thread runtime 上以 block_in_place 執行
fn blocking<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T> {
    tokio::task::block_in_place(f).map_err(ExportError::browser)
}

impl ChromeSession {
    pub fn launch(options: ChromeOptions) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(false)
            .path(options.chrome_path.clone())
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .args(vec![OsStr::new("--start-maximized")])
            .build()
            .map_err(ExportError::browser)?;

        let browser = Browser::new(launch_options).map_err(ExportError::browser)?;
        let tab = working_tab(&browser)?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let watched_paths = options.watched_paths;
        tab.register_response_handling(
            RESPONSE_HANDLER,
            Box::new(
                move |params: ResponseReceivedEventParams,
                      _fetch_body: &dyn Fn() -> anyhow::Result<GetResponseBodyReturnObject>| {
                    let url = params.response.url.clone();
                    let path = Url::parse(&url)
                        .map(|parsed| parsed.path().to_string())
                        .unwrap_or_default();
                    if !watched_paths.iter().any(|watched| *watched == path) {
                        return;
                    }

                    let status = u16::try_from(params.response.status).unwrap_or_default();
                    tracing::debug!("📥 Intercepted {} ({})", path, status);
                    let _ = sender.send(PendingResponse {
                        request_id: params.request_id,
                        url,
                        status,
                    });
                },
            ),
        )
        .map_err(ExportError::browser)?;

        tracing::info!("🌐 Browser launched");

        Ok(Self {
            browser,
            tab,
            responses: Mutex::new(receiver),
        })
    }
}

/// Reuses the window's first tab so no extra blank tab is left open.
fn working_tab(browser: &Browser) -> Result<Arc<Tab>> {
    let initial = browser
        .get_tabs()
        .lock()
        .ok()
        .and_then(|tabs| tabs.first().cloned());
    first_or_open(initial, || browser.new_tab().map_err(ExportError::browser))
}

fn first_or_open<T>(initial: Option<T>, open: impl FnOnce() -> Result<T>) -> Result<T> {
    match initial {
        Some(tab) => Ok(tab),
        None => open(),
    }
}

/// Polls until the body is readable. A body still unreadable after
/// `retry.limit` fails the run instead of leaving the wait open forever.
async fn read_body<F>(url: &str, retry: BodyRetry, mut fetch: F) -> Result<String>
where
    F: FnMut() -> Result<GetResponseBodyReturnObject> + Send,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match fetch() {
            Ok(content) if content.base_64_encoded => {
                return Err(ExportError::browser(format!("binary response body from {}", url)));
            }
            Ok(content) => return Ok(content.body),
            Err(e) if started.elapsed() >= retry.limit => {
                return Err(ExportError::browser(format!(
                    "response body of {} unreadable after {} attempt(s): {}",
                    url, attempt, e
                )));
            }
            Err(e) => {
                tracing::debug!("Body of {} not readable yet (attempt {}): {}", url, attempt, e);
            }
        }
        tokio::time::sleep(retry.delay).await;
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        tracing::debug!("Navigating to {}", url);
        blocking(|| {
            self.tab.navigate_to(url)?;
            match self.tab.wait_until_navigated() {
                Ok(_) => Ok(()),
                Err(e) if e.is::<Timeout>() => {
                    tracing::debug!("Navigation to {} still loading", url);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        })
    }

    async fn current_path(&self) -> Result<String> {
        let url = self.tab.get_url();
        Url::parse(&url)
            .map(|parsed| parsed.path().to_string())
            .map_err(|e| ExportError::browser(format!("unexpected page url {}: {}", url, e)))
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        blocking(|| loop {
            match self.tab.wait_for_element_with_custom_timeout(selector, WAIT_SLICE) {
                Ok(_) => return Ok(()),
                Err(e) if e.is::<Timeout>() => {
                    tracing::debug!("⏳ Still waiting for {}", selector);
                }
                Err(e) => return Err(e),
            }
        })
    }

    async fn click(&self, selector: &str) -> Result<()> {
        blocking(|| {
            self.tab.find_element(selector)?.click()?;
            Ok(())
        })
    }

    async fn next_response(&self) -> Result<NetworkResponse> {
        let pending = self
            .responses
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| ExportError::browser("response stream closed"))?;

        let body = read_body(&pending.url, BODY_RETRY, || {
            blocking(|| {
                self.tab.call_method(GetResponseBody {
                    request_id: pending.request_id.clone(),
                })
            })
        })
        .await?;

        Ok(NetworkResponse {
            url: pending.url,
            status: pending.status,
            body,
        })
    }

    async fn clear_responses(&self) {
        let mut responses = self.responses.lock().await;
        let mut dropped = 0;
        while responses.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!("Discarded {} stale response(s)", dropped);
        }
    }

    async fn cookies(&self) -> Result<Vec<StoredCookie>> {
        let cookies = blocking(|| self.tab.get_cookies())?;
        let cookies: Vec<StoredCookie> = serde_json::from_value(serde_json::to_value(cookies)?)?;
        Ok(cookies)
    }

    async fn set_cookies(&self, cookies: &[StoredCookie]) -> Result<()> {
        let params: Vec<CookieParam> = serde_json::from_value(Value::Array(
            cookies.iter().map(cookie_param_json).collect(),
        ))?;
        blocking(|| self.tab.set_cookies(params))?;
        tracing::debug!("Restored {} cookie(s)", cookies.len());
        Ok(())
    }
}

fn cookie_param_json(cookie: &StoredCookie) -> Value {
    let mut param = json!({
        "name": cookie.name,
        "value": cookie.value,
        "httpOnly": cookie.http_only,
        "secure": cookie.secure,
    });
    if let Some(domain) = &cookie.domain {
        param["domain"] = json!(domain);
    }
    if let Some(path) = &cookie.path {
        param["path"] = json!(path);
    }
    if let Some(same_site) = &cookie.same_site {
        param["sameSite"] = json!(same_site);
    }
    // session cookies carry a negative expiry
    if let Some(expires) = cookie.expires.filter(|expires| *expires > 0.0) {
        param["expires"] = json!(expires);
    }
    param
}

#[async_trait]
impl StatusSink for ChromeSession {
    async fn set_status(&self, message: &str) {
        if message.is_empty() {
            tracing::debug!("Status cleared");
        } else {
            tracing::info!("📣 {}", message);
        }

        let script = format!("({})({})", OVERLAY_SCRIPT, Value::from(message));
        if let Err(e) = blocking(|| self.tab.evaluate(&script, false)) {
            tracing::debug!("Overlay update failed: {}", e);
        }
    }
}

#[async_trait]
impl SelectionPrompt for ChromeSession {
    async fn prompt(&self, form: &SelectionForm) -> Result<FormSubmission> {
        let view = blocking(|| self.browser.new_tab())?;

        let write_page = format!(
            "document.open(); document.write({}); document.close();",
            Value::from(form.render_html())
        );
        blocking(|| {
            view.navigate_to("about:blank")?.wait_until_navigated()?;
            view.evaluate(&write_page, false)?;
            Ok(())
        })?;

        let poll = format!("JSON.stringify(window.{} || null)", SUBMISSION_GLOBAL);
        let submission: FormSubmission = loop {
            let result = blocking(|| view.evaluate(&poll, false))?;
            if let Some(Value::String(raw)) = result.value {
                if raw != "null" {
                    break serde_json::from_str(&raw)?;
                }
            }
            tokio::time::sleep(SUBMIT_POLL).await;
        };

        if let Err(e) = blocking(|| view.close(true)) {
            tracing::debug!("Selection view did not close cleanly: {}", e);
        }
        Ok(submission)
    }
}
