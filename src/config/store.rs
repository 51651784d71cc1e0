use crate::core::Storage;
use crate::domain::model::StoredCookie;
use crate::utils::error::Result;
use serde::de::DeserializeOwned;

pub const COOKIES_FILE: &str = "cookies.json";
pub const SELECTION_FILE: &str = "selectedClasses.json";

/// cookies.json 與 selectedClasses.json 的讀寫；缺檔或格式錯誤都視為空值
pub struct ConfigStore<S: Storage> {
    storage: S,
}

impl<S: Storage> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn load_cookies(&self) -> Vec<StoredCookie> {
        match self.load_json(COOKIES_FILE).await {
            Some(cookies) => cookies,
            None => {
                tracing::info!("No cookies found");
                Vec::new()
            }
        }
    }

    pub async fn save_cookies(&self, cookies: &[StoredCookie]) -> Result<()> {
        let data = serde_json::to_vec(cookies)?;
        self.storage.write_file(COOKIES_FILE, &data).await?;
        tracing::debug!("Saved {} cookie(s)", cookies.len());
        Ok(())
    }

    pub async fn load_selection(&self) -> Vec<String> {
        match self.load_json(SELECTION_FILE).await {
            Some(ids) => ids,
            None => {
                tracing::info!("No previous selection found");
                Vec::new()
            }
        }
    }

    pub async fn save_selection(&self, class_ids: &[String]) -> Result<()> {
        let data = serde_json::to_vec(class_ids)?;
        self.storage.write_file(SELECTION_FILE, &data).await?;
        Ok(())
    }

    async fn load_json<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let data = match self.storage.read_file(path).await {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("Could not read {}: {}", path, e);
                return None;
            }
        };

        match serde_json::from_slice(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("⚠️ Ignoring unreadable {}: {}", path, e);
                None
            }
        }
    }
}
