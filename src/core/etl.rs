use crate::config::store::ConfigStore;
use crate::core::extractor::MasteryExtractor;
use crate::core::report::ReportSynthesizer;
use crate::core::roster::RosterDiscovery;
use crate::core::schedule::ScheduledStartGate;
use crate::core::selection::SelectionNegotiator;
use crate::core::{
    BrowserSession, Clock, ConfigProvider, RunOutcome, SelectionPrompt, StatusSink, Storage,
};
use crate::utils::error::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const SAVED_PAUSE: Duration = Duration::from_millis(2500);
const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// The live collaborators of one run. The same browser object usually backs
/// the session, the status overlay and the selection view.
#[derive(Clone)]
pub struct Collaborators {
    pub session: Arc<dyn BrowserSession>,
    pub status: Arc<dyn StatusSink>,
    pub prompt: Arc<dyn SelectionPrompt>,
    pub clock: Arc<dyn Clock>,
}

pub struct ExportEngine<S: Storage, C: ConfigProvider> {
    collaborators: Collaborators,
    config_store: ConfigStore<S>,
    output: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ExportEngine<S, C> {
    pub fn new(collaborators: Collaborators, config_store: ConfigStore<S>, output: S, config: C) -> Self {
        Self {
            collaborators,
            config_store,
            output,
            config,
        }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let session = self.collaborators.session.as_ref();
        let status = self.collaborators.status.as_ref();
        let prompt = self.collaborators.prompt.as_ref();
        let clock = self.collaborators.clock.as_ref();

        tracing::info!("🚀 Starting mastery export");

        let cookies = self.config_store.load_cookies().await;
        if !cookies.is_empty() {
            if let Err(e) = session.set_cookies(&cookies).await {
                tracing::warn!("⚠️ Could not restore {} cookie(s): {}", cookies.len(), e);
            }
        }

        // 1. 名冊
        let roster = RosterDiscovery::new(session, status, &self.config_store)
            .discover(self.config.dashboard_url())
            .await?;

        // 2. 選班與排程
        let selection = SelectionNegotiator::new(prompt, clock, &self.config_store)
            .negotiate(&roster)
            .await?;

        if selection.selected_class_ids.is_empty() {
            tracing::info!("No classes selected, nothing to export");
            for remaining in (1..=5).rev() {
                status
                    .set_status(&format!("No classes selected. Closing in {}...", remaining))
                    .await;
                clock.sleep(COUNTDOWN_TICK).await;
            }
            return Ok(RunOutcome::NothingSelected);
        }

        // 3. 等待排程時間
        ScheduledStartGate::new(clock, status)
            .wait(selection.scheduled_instant)
            .await;

        // 4. 逐班擷取
        tracing::info!("🔎 Extracting {} class(es)", selection.selected_class_ids.len());
        let rows = MasteryExtractor::new(session, status)
            .extract_selection(&roster, &selection)
            .await?;

        // 5. 產生報表
        status.set_status("Saving file...").await;
        let bytes = ReportSynthesizer::new().to_bytes(&rows)?;
        let file_name = format!("{}.xlsx", clock.now().format(OUTPUT_TIMESTAMP_FORMAT));
        self.output.write_file(&file_name, &bytes).await?;

        let path = Path::new(self.config.output_path())
            .join(&file_name)
            .display()
            .to_string();
        tracing::info!("📁 Report written to {} ({} bytes)", path, bytes.len());

        status.set_status(&format!("OK: Saved to {}", path)).await;
        clock.sleep(SAVED_PAUSE).await;

        for remaining in (0..=5).rev() {
            status
                .set_status(&format!("Closing in {} second(s)...", remaining))
                .await;
            clock.sleep(COUNTDOWN_TICK).await;
        }

        Ok(RunOutcome::Saved {
            path,
            classes: rows.len(),
            students: rows.iter().map(|row| row.students.len()).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::store::{COOKIES_FILE, SELECTION_FILE};
    use crate::core::extractor::MASTERY_PATH;
    use crate::core::roster::ROSTER_PATH;
    use crate::core::test_support::{
        FakeClock, FakePrompt, FakeSession, MemoryStorage, RecordingStatus,
    };
    use crate::domain::model::FormSubmission;
    use crate::utils::error::ExportError;
    use chrono::{Local, TimeZone};
    use serde_json::json;

    struct MockConfig;

    impl ConfigProvider for MockConfig {
        fn dashboard_url(&self) -> &str {
            "https://www.khanacademy.org/teacher/dashboard"
        }

        fn output_path(&self) -> &str {
            "out"
        }
    }

    struct Harness {
        session: Arc<FakeSession>,
        status: Arc<RecordingStatus>,
        clock: Arc<FakeClock>,
        config_storage: MemoryStorage,
        output_storage: MemoryStorage,
        engine: ExportEngine<MemoryStorage, MockConfig>,
    }

    fn harness(submission: FormSubmission) -> Harness {
        let session = Arc::new(FakeSession::new());
        session.push_response(
            ROSTER_PATH,
            200,
            json!({"data": {"coach": {"studentLists": [
                {"signupCode": "AAA", "name": "Period 1", "countStudents": 1, "topics": [{"title": "AP Calculus AB"}]},
                {"signupCode": "ZZZ", "name": "Period 9", "countStudents": 0, "topics": [{"title": "AP Calculus AB"}]}
            ]}}}),
        );
        session.push_response(
            MASTERY_PATH,
            200,
            json!({"data": {"classroom": {"students": [
                {"coachNickname": "Ada", "kaid": "kaid_1", "subjectProgress": {
                    "currentMastery": {"pointsEarned": 50, "pointsAvailable": 100},
                    "unitProgresses": [{"topic": {"id": "xb0caa40e7a222a7c"}, "currentMastery": {"pointsEarned": 50, "pointsAvailable": 100}}]
                }}
            ]}}}),
        );

        let status = Arc::new(RecordingStatus::new());
        let clock = Arc::new(FakeClock::new(
            Local.with_ymd_and_hms(2024, 5, 14, 8, 15, 0).earliest().unwrap(),
        ));
        let prompt = Arc::new(FakePrompt::new(submission));
        let config_storage = MemoryStorage::new();
        let output_storage = MemoryStorage::new();

        let engine = ExportEngine::new(
            Collaborators {
                session: session.clone(),
                status: status.clone(),
                prompt,
                clock: clock.clone(),
            },
            ConfigStore::new(config_storage.clone()),
            output_storage.clone(),
            MockConfig,
        );

        Harness {
            session,
            status,
            clock,
            config_storage,
            output_storage,
            engine,
        }
    }

    fn submit(ids: &[&str]) -> FormSubmission {
        FormSubmission {
            selected_class_ids: ids.iter().map(|id| id.to_string()).collect(),
            schedule: false,
            schedule_time: None,
        }
    }

    #[tokio::test]
    async fn test_full_run_writes_timestamped_workbook() {
        let h = harness(submit(&["AAA", "ZZZ"]));

        let outcome = h.engine.run().await.unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Saved {
                path: Path::new("out").join("20240514_081500.xlsx").display().to_string(),
                classes: 2,
                students: 1,
            }
        );
        assert_eq!(h.output_storage.paths().await, vec!["20240514_081500.xlsx".to_string()]);
        assert!(h.config_storage.get(COOKIES_FILE).await.is_some());
        assert_eq!(
            h.config_storage.get(SELECTION_FILE).await.unwrap(),
            br#"["AAA","ZZZ"]"#
        );

        let messages = h.status.messages();
        assert!(messages.contains(&"Saving file...".to_string()));
        assert!(messages.contains(&"Closing in 0 second(s)...".to_string()));
        assert_eq!(
            h.clock.sleeps().iter().sum::<Duration>(),
            SAVED_PAUSE + COUNTDOWN_TICK * 6
        );
    }

    #[tokio::test]
    async fn test_empty_selection_closes_without_report() {
        let h = harness(submit(&[]));

        let outcome = h.engine.run().await.unwrap();

        assert_eq!(outcome, RunOutcome::NothingSelected);
        assert!(h.output_storage.paths().await.is_empty());
        assert_eq!(
            h.status.messages(),
            (1..=5)
                .rev()
                .map(|n| format!("No classes selected. Closing in {}...", n))
                .collect::<Vec<_>>()
        );
        assert_eq!(h.config_storage.get(SELECTION_FILE).await.unwrap(), b"[]");
    }

    #[tokio::test]
    async fn test_stale_selection_aborts_before_scraping() {
        let h = harness(submit(&["GONE"]));

        let err = h.engine.run().await.unwrap_err();

        assert!(matches!(err, ExportError::ClassNotFound { .. }));
        assert!(!h.session.actions().iter().any(|a| a.starts_with("click")));
        assert!(h.output_storage.paths().await.is_empty());
    }

    #[tokio::test]
    async fn test_stored_cookies_are_restored_first() {
        let h = harness(submit(&[]));
        h.config_storage
            .insert(COOKIES_FILE, br#"[{"name":"KAAS","value":"old","domain":".khanacademy.org"}]"#)
            .await;

        h.engine.run().await.unwrap();

        let actions = h.session.actions();
        assert_eq!(actions[0], "set_cookies 1");
        assert!(actions[1].starts_with("clear_responses"));
    }
}
