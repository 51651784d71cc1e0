//! In-memory fakes for the ports, shared by the unit tests.

use crate::domain::model::{FormSubmission, NetworkResponse, SelectionForm, StoredCookie};
use crate::domain::ports::{BrowserSession, Clock, SelectionPrompt, StatusSink, Storage};
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, path: &str, data: &[u8]) {
        self.files.lock().await.insert(path.to_string(), data.to_vec());
    }

    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(path).cloned()
    }

    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.lock().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Storage for MemoryStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.get(path).await.ok_or_else(|| {
            ExportError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        self.insert(path, data).await;
        Ok(())
    }
}

/// Scripted browser: responses are handed out in push order and every call
/// is recorded as a short action string.
///
/// By default `clear_responses` keeps the queue, so pushed responses stand for
/// future traffic. With `dropping_cleared` the queue behaves like live traffic:
/// clearing discards whatever already arrived, and `respond_on_click` queues a
/// response only once its selector is clicked.
pub struct FakeSession {
    responses: std::sync::Mutex<VecDeque<NetworkResponse>>,
    on_click: std::sync::Mutex<HashMap<String, VecDeque<NetworkResponse>>>,
    drop_on_clear: bool,
    actions: std::sync::Mutex<Vec<String>>,
    path: std::sync::Mutex<String>,
    cookies: std::sync::Mutex<Vec<StoredCookie>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            responses: std::sync::Mutex::new(VecDeque::new()),
            on_click: std::sync::Mutex::new(HashMap::new()),
            drop_on_clear: false,
            actions: std::sync::Mutex::new(Vec::new()),
            path: std::sync::Mutex::new("/teacher/dashboard".to_string()),
            cookies: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_path(self, path: &str) -> Self {
        *self.path.lock().unwrap() = path.to_string();
        self
    }

    pub fn dropping_cleared(mut self) -> Self {
        self.drop_on_clear = true;
        self
    }

    pub fn push_response(&self, path: &str, status: u16, body: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .push_back(scripted_response(path, status, body));
    }

    /// Each click on `selector` releases the next response registered for it.
    pub fn respond_on_click(&self, selector: &str, path: &str, status: u16, body: serde_json::Value) {
        self.on_click
            .lock()
            .unwrap()
            .entry(selector.to_string())
            .or_default()
            .push_back(scripted_response(path, status, body));
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }

    pub fn stored_cookies(&self) -> Vec<StoredCookie> {
        self.cookies.lock().unwrap().clone()
    }

    fn record(&self, action: String) {
        self.actions.lock().unwrap().push(action);
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.record(format!("navigate {}", url));
        Ok(())
    }

    async fn current_path(&self) -> Result<String> {
        Ok(self.path.lock().unwrap().clone())
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        self.record(format!("wait {}", selector));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.record(format!("click {}", selector));
        let released = self
            .on_click
            .lock()
            .unwrap()
            .get_mut(selector)
            .and_then(|queued| queued.pop_front());
        if let Some(response) = released {
            self.responses.lock().unwrap().push_back(response);
        }
        Ok(())
    }

    async fn next_response(&self) -> Result<NetworkResponse> {
        self.record("next_response".to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ExportError::browser("no scripted response left"))
    }

    async fn clear_responses(&self) {
        self.record("clear_responses".to_string());
        if self.drop_on_clear {
            self.responses.lock().unwrap().clear();
        }
    }

    async fn cookies(&self) -> Result<Vec<StoredCookie>> {
        Ok(self.stored_cookies())
    }

    async fn set_cookies(&self, cookies: &[StoredCookie]) -> Result<()> {
        self.record(format!("set_cookies {}", cookies.len()));
        *self.cookies.lock().unwrap() = cookies.to_vec();
        Ok(())
    }
}

fn scripted_response(path: &str, status: u16, body: serde_json::Value) -> NetworkResponse {
    NetworkResponse {
        url: format!("https://www.khanacademy.org{}", path),
        status,
        body: body.to_string(),
    }
}

#[derive(Default)]
pub struct RecordingStatus {
    messages: std::sync::Mutex<Vec<String>>,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSink for RecordingStatus {
    async fn set_status(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Virtual clock; `sleep` returns at once and moves `now` forward.
pub struct FakeClock {
    now: std::sync::Mutex<DateTime<Local>>,
    sleeps: std::sync::Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: std::sync::Mutex::new(now),
            sleeps: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::from_std(duration).unwrap();
    }
}

pub struct FakePrompt {
    submission: FormSubmission,
    shown: std::sync::Mutex<Option<SelectionForm>>,
}

impl FakePrompt {
    pub fn new(submission: FormSubmission) -> Self {
        Self {
            submission,
            shown: std::sync::Mutex::new(None),
        }
    }

    pub fn shown_form(&self) -> Option<SelectionForm> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl SelectionPrompt for FakePrompt {
    async fn prompt(&self, form: &SelectionForm) -> Result<FormSubmission> {
        *self.shown.lock().unwrap() = Some(form.clone());
        Ok(self.submission.clone())
    }
}

pub fn class(id: &str, name: &str, topic: &str, students: u32) -> crate::core::ClassSummary {
    crate::core::ClassSummary {
        id: id.to_string(),
        display_name: name.to_string(),
        topic_label: topic.to_string(),
        student_count: students,
    }
}
