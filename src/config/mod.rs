pub mod cli;
pub mod store;

#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{validate_path, validate_url, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "mastery-export")]
#[command(about = "Scrape class mastery progress from the coach dashboard into an xlsx report")]
pub struct CliConfig {
    #[arg(long, default_value = "https://www.khanacademy.org/teacher/dashboard")]
    pub dashboard_url: String,

    #[arg(long, default_value = "config", help = "Directory for cookies and last selection")]
    pub config_dir: String,

    #[arg(long, default_value = "out", help = "Directory the workbook is written to")]
    pub output_dir: String,

    #[arg(long, help = "Chrome/Chromium binary; auto-detected when omitted")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn dashboard_url(&self) -> &str {
        &self.dashboard_url
    }

    fn output_path(&self) -> &str {
        &self.output_dir
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("dashboard_url", &self.dashboard_url)?;
        validate_path("config_dir", &self.config_dir)?;
        validate_path("output_dir", &self.output_dir)?;
        if let Some(chrome_path) = &self.chrome_path {
            validate_path("chrome_path", chrome_path)?;
        }
        Ok(())
    }
}
