//! Shapes of the two GraphQL responses the dashboard fetches. Only the fields
//! the export uses are modelled; everything else is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassListData {
    pub coach: Coach,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coach {
    pub student_lists: Vec<StudentList>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentList {
    pub signup_code: String,
    pub name: String,
    pub count_students: u32,
    #[serde(default)]
    pub topics: Vec<TopicTitle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicTitle {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MasteryProgressData {
    pub classroom: Classroom,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Classroom {
    pub students: Vec<StudentProgress>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub coach_nickname: String,
    pub kaid: String,
    pub subject_progress: SubjectProgress,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub current_mastery: CurrentMastery,
    #[serde(default)]
    pub unit_progresses: Vec<UnitProgress>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProgress {
    pub topic: TopicRef,
    pub current_mastery: CurrentMastery,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicRef {
    pub id: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentMastery {
    pub points_earned: f64,
    pub points_available: f64,
}
