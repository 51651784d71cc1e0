pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, store::ConfigStore};

pub use adapters::{ChromeOptions, ChromeSession, SystemClock};
pub use core::etl::{Collaborators, ExportEngine};
pub use domain::model::RunOutcome;
pub use utils::error::{ExportError, Result};
