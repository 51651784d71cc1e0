use crate::core::BrowserSession;
use crate::domain::model::NetworkResponse;
use crate::utils::error::Result;

/// 阻塞直到出現符合條件的回應，沒有逾時；不符合的回應直接丟棄
pub async fn await_response<F>(session: &dyn BrowserSession, matches: F) -> Result<NetworkResponse>
where
    F: Fn(&NetworkResponse) -> bool + Send,
{
    loop {
        let response = session.next_response().await?;
        if matches(&response) {
            return Ok(response);
        }
        tracing::trace!("Skipping response {} ({})", response.url, response.status);
    }
}

pub fn path_is(path: &str) -> impl Fn(&NetworkResponse) -> bool + Send + '_ {
    move |response| response.path().as_deref() == Some(path)
}
