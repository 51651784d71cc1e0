pub mod etl;
pub mod events;
pub mod extractor;
pub mod report;
pub mod roster;
pub mod schedule;
pub mod selection;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::domain::model::{ClassReportRow, ClassSummary, RunOutcome, Selection, StudentMastery};
pub use crate::domain::ports::{
    BrowserSession, Clock, ConfigProvider, SelectionPrompt, StatusSink, Storage,
};
pub use crate::utils::error::Result;
