use crate::config::store::ConfigStore;
use crate::core::events::{await_response, path_is};
use crate::core::{BrowserSession, ClassSummary, StatusSink, Storage};
use crate::domain::payload::{ClassListData, GraphqlResponse};
use crate::utils::error::Result;

pub const ROSTER_PATH: &str = "/api/internal/graphql/getClassList";
pub const LOGIN_PATH: &str = "/login";
pub const LOGIN_PROMPT: &str = "Please login to Khan Academy";

pub struct RosterDiscovery<'a, S: Storage> {
    session: &'a dyn BrowserSession,
    status: &'a dyn StatusSink,
    store: &'a ConfigStore<S>,
}

impl<'a, S: Storage> RosterDiscovery<'a, S> {
    pub fn new(
        session: &'a dyn BrowserSession,
        status: &'a dyn StatusSink,
        store: &'a ConfigStore<S>,
    ) -> Self {
        Self {
            session,
            status,
            store,
        }
    }

    /// 開啟儀表板並等待名冊回應；若被導向登入頁，提示操作者手動登入後繼續等待
    pub async fn discover(&self, dashboard_url: &str) -> Result<Vec<ClassSummary>> {
        self.session.clear_responses().await;
        self.session.navigate(dashboard_url).await?;

        if self.session.current_path().await? == LOGIN_PATH {
            tracing::warn!("🔐 Session is not authenticated, waiting for manual login");
            self.status.set_status(LOGIN_PROMPT).await;
        }

        tracing::info!("⏳ Waiting for class list response");
        let response = await_response(self.session, path_is(ROSTER_PATH)).await?;

        // 登入成功後立即刷新 cookies，供下次執行使用
        let cookies = self.session.cookies().await?;
        self.store.save_cookies(&cookies).await?;

        let roster = parse_roster(&response.body)?;
        tracing::info!("📋 Discovered {} class(es)", roster.len());
        Ok(roster)
    }
}

pub fn parse_roster(body: &str) -> Result<Vec<ClassSummary>> {
    let payload: GraphqlResponse<ClassListData> = serde_json::from_str(body)?;

    let mut classes: Vec<ClassSummary> = payload
        .data
        .coach
        .student_lists
        .into_iter()
        .map(|list| ClassSummary {
            id: list.signup_code,
            display_name: list.name,
            topic_label: list
                .topics
                .iter()
                .map(|topic| topic.title.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            student_count: list.count_students,
        })
        .collect();

    sort_roster(&mut classes);
    Ok(classes)
}

/// Topic first, then name.
pub fn sort_roster(classes: &mut [ClassSummary]) {
    classes.sort_by(|a, b| {
        a.topic_label
            .cmp(&b.topic_label)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
}
