use crate::domain::model::{FormSubmission, NetworkResponse, SelectionForm, StoredCookie};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn dashboard_url(&self) -> &str;
    fn output_path(&self) -> &str;
}

/// The controlled browser. Waits never time out; they end when the awaited
/// element or response shows up, or when the session itself fails.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;
    async fn current_path(&self) -> Result<String>;
    async fn wait_for_selector(&self, selector: &str) -> Result<()>;
    async fn click(&self, selector: &str) -> Result<()>;
    /// Next intercepted response, in arrival order.
    async fn next_response(&self) -> Result<NetworkResponse>;
    /// Drops responses that arrived before this call.
    async fn clear_responses(&self);
    async fn cookies(&self) -> Result<Vec<StoredCookie>>;
    async fn set_cookies(&self, cookies: &[StoredCookie]) -> Result<()>;
}

/// One-way progress text; an empty message clears it. Best effort, never fails.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn set_status(&self, message: &str);
}

#[async_trait]
pub trait SelectionPrompt: Send + Sync {
    /// Shows the form in its own view and blocks until the operator submits it.
    async fn prompt(&self, form: &SelectionForm) -> Result<FormSubmission>;
}

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
    async fn sleep(&self, duration: Duration);
}
