use crate::core::events::await_response;
use crate::core::{BrowserSession, ClassReportRow, ClassSummary, Selection, StatusSink, StudentMastery};
use crate::domain::model::{MasteryPoints, UnitMastery};
use crate::domain::payload::{GraphqlResponse, MasteryProgressData};
use crate::utils::error::{ExportError, Result};

pub const MASTERY_PATH: &str = "/api/internal/graphql/ClassSubjectMasteryProgress";
pub const MASTERY_NAV_SELECTOR: &str = "a[data-test-id='nav-course-mastery-progress']";
pub const BREADCRUMB_SELECTOR: &str = "[data-test-id='classroom-breadcrumb-link'] a";

pub fn class_link_selector(class_id: &str) -> String {
    format!("a[href='/teacher/class/{}']", class_id)
}

/// Per-class extraction states, in the order they are visited.
enum ExtractState {
    NavigatingToClass,
    CountingZeroStudents,
    NavigatingToMasteryView,
    AwaitingMasteryResponse,
    Parsed(Vec<StudentMastery>),
    ReturningToRoster(Vec<StudentMastery>),
    Done(Vec<StudentMastery>),
}

pub struct MasteryExtractor<'a> {
    session: &'a dyn BrowserSession,
    status: &'a dyn StatusSink,
}

impl<'a> MasteryExtractor<'a> {
    pub fn new(session: &'a dyn BrowserSession, status: &'a dyn StatusSink) -> Self {
        Self { session, status }
    }

    /// 依選取順序逐一擷取；所有 id 先對照名冊，任何一個找不到就在導覽前失敗
    pub async fn extract_selection(
        &self,
        roster: &[ClassSummary],
        selection: &Selection,
    ) -> Result<Vec<ClassReportRow>> {
        let classes = resolve_selection(roster, selection)?;

        let mut rows = Vec::with_capacity(classes.len());
        for class in classes {
            rows.push(self.extract_class(class).await?);
        }
        Ok(rows)
    }

    pub async fn extract_class(&self, class: &ClassSummary) -> Result<ClassReportRow> {
        let mut state = ExtractState::NavigatingToClass;

        let students = loop {
            tracing::debug!(class_id = %class.id, "extract state: {}", state_name(&state));

            state = match state {
                ExtractState::NavigatingToClass => {
                    self.status
                        .set_status(&format!(
                            "Scraping \"{}\" ({})",
                            class.display_name, class.topic_label
                        ))
                        .await;
                    let selector = class_link_selector(&class.id);
                    self.session.wait_for_selector(&selector).await?;
                    self.session.click(&selector).await?;

                    if class.student_count == 0 {
                        ExtractState::CountingZeroStudents
                    } else {
                        ExtractState::NavigatingToMasteryView
                    }
                }
                ExtractState::CountingZeroStudents => {
                    tracing::info!("👻 {} has no students, skipping mastery view", class.display_name);
                    ExtractState::ReturningToRoster(Vec::new())
                }
                ExtractState::NavigatingToMasteryView => {
                    self.session.clear_responses().await;
                    self.session.wait_for_selector(MASTERY_NAV_SELECTOR).await?;
                    self.session.click(MASTERY_NAV_SELECTOR).await?;
                    ExtractState::AwaitingMasteryResponse
                }
                ExtractState::AwaitingMasteryResponse => {
                    let response = await_response(self.session, |response| {
                        response.path().as_deref() == Some(MASTERY_PATH) && response.is_success()
                    })
                    .await?;
                    ExtractState::Parsed(parse_mastery(&response.body)?)
                }
                ExtractState::Parsed(students) => {
                    self.status
                        .set_status(&format!("OK: Got data for {} student(s).", students.len()))
                        .await;
                    ExtractState::ReturningToRoster(students)
                }
                ExtractState::ReturningToRoster(students) => {
                    self.session.wait_for_selector(BREADCRUMB_SELECTOR).await?;
                    self.session.click(BREADCRUMB_SELECTOR).await?;
                    ExtractState::Done(students)
                }
                ExtractState::Done(students) => break students,
            };
        };

        tracing::info!(
            "✅ {} ({}): {} student(s)",
            class.display_name,
            class.id,
            students.len()
        );

        Ok(ClassReportRow {
            class: class.clone(),
            students,
        })
    }
}

fn state_name(state: &ExtractState) -> &'static str {
    match state {
        ExtractState::NavigatingToClass => "NavigatingToClass",
        ExtractState::CountingZeroStudents => "CountingZeroStudents",
        ExtractState::NavigatingToMasteryView => "NavigatingToMasteryView",
        ExtractState::AwaitingMasteryResponse => "AwaitingMasteryResponse",
        ExtractState::Parsed(_) => "Parsed",
        ExtractState::ReturningToRoster(_) => "ReturningToRoster",
        ExtractState::Done(_) => "Done",
    }
}

pub fn resolve_selection<'r>(
    roster: &'r [ClassSummary],
    selection: &Selection,
) -> Result<Vec<&'r ClassSummary>> {
    selection
        .selected_class_ids
        .iter()
        .map(|class_id| {
            roster
                .iter()
                .find(|class| &class.id == class_id)
                .ok_or_else(|| ExportError::ClassNotFound {
                    class_id: class_id.clone(),
                })
        })
        .collect()
}

pub fn parse_mastery(body: &str) -> Result<Vec<StudentMastery>> {
    let payload: GraphqlResponse<MasteryProgressData> = serde_json::from_str(body)?;

    Ok(payload
        .data
        .classroom
        .students
        .into_iter()
        .map(|student| {
            let progress = student.subject_progress;
            StudentMastery {
                student_id: student.kaid,
                student_name: student.coach_nickname,
                overall: MasteryPoints::new(
                    progress.current_mastery.points_earned,
                    progress.current_mastery.points_available,
                ),
                units: progress
                    .unit_progresses
                    .into_iter()
                    .map(|unit| UnitMastery {
                        topic_id: unit.topic.id,
                        mastery: MasteryPoints::new(
                            unit.current_mastery.points_earned,
                            unit.current_mastery.points_available,
                        ),
                    })
                    .collect(),
            }
        })
        .collect())
}
