use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 一個班級的名冊資訊，由 Roster Discovery 產生後不再變動
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSummary {
    pub id: String,
    pub display_name: String,
    pub topic_label: String,
    pub student_count: u32,
}

impl ClassSummary {
    pub fn formatted_label(&self) -> String {
        format!(
            "{} ({}) - {} students",
            self.display_name, self.topic_label, self.student_count
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Ordered as the roster lists them.
    pub selected_class_ids: Vec<String>,
    pub scheduled_instant: Option<DateTime<Local>>,
}

/// pointsEarned / pointsAvailable，不處理除以零（結果可能是 NaN 或 Infinity）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteryPoints {
    pub points_earned: f64,
    pub points_available: f64,
    pub percentage: f64,
}

impl MasteryPoints {
    pub fn new(points_earned: f64, points_available: f64) -> Self {
        Self {
            points_earned,
            points_available,
            percentage: points_earned / points_available,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitMastery {
    pub topic_id: String,
    pub mastery: MasteryPoints,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentMastery {
    pub student_id: String,
    pub student_name: String,
    pub overall: MasteryPoints,
    /// Source-reported order.
    pub units: Vec<UnitMastery>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassReportRow {
    pub class: ClassSummary,
    pub students: Vec<StudentMastery>,
}

/// An intercepted network response, as delivered by the browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl NetworkResponse {
    pub fn path(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .map(|url| url.path().to_string())
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Cookie record persisted in cookies.json. Unknown fields are dropped on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormEntry {
    pub id: String,
    pub label: String,
    pub checked: bool,
}

/// What the selection view shows. `min_time` and `default_time` use the
/// `datetime-local` input format (`YYYY-MM-DDTHH:MM`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionForm {
    pub classes: Vec<FormEntry>,
    pub min_time: String,
    pub default_time: String,
}

/// Raw values read back from the submitted selection view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
    pub selected_class_ids: Vec<String>,
    #[serde(default)]
    pub schedule: bool,
    #[serde(default)]
    pub schedule_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NothingSelected,
    Saved {
        path: String,
        classes: usize,
        students: usize,
    },
}
