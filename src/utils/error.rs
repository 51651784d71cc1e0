use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    WorkbookError(#[from] rust_xlsxwriter::XlsxError),

    #[error("Browser error: {message}")]
    BrowserError { message: String },

    #[error("Class with id {class_id} not found")]
    ClassNotFound { class_id: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExportError {
    /// 將 headless_chrome 等外部瀏覽器錯誤轉為 BrowserError
    pub fn browser(err: impl std::fmt::Display) -> Self {
        ExportError::BrowserError {
            message: err.to_string(),
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ExportError::InvalidConfigValueError { .. } => ErrorSeverity::Medium,
            ExportError::ClassNotFound { .. } | ExportError::SerializationError(_) => {
                ErrorSeverity::High
            }
            ExportError::IoError(_)
            | ExportError::WorkbookError(_)
            | ExportError::BrowserError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ExportError::IoError(_) => "Check that the output and config directories are writable",
            ExportError::SerializationError(_) => {
                "The dashboard returned an unexpected payload; reload the page and run again"
            }
            ExportError::WorkbookError(_) => {
                "Check for duplicate class names, which map to the same sheet name"
            }
            ExportError::BrowserError { .. } => {
                "Make sure Chrome is installed and the browser window was not closed"
            }
            ExportError::ClassNotFound { .. } => {
                "Delete config/selectedClasses.json and select the classes again"
            }
            ExportError::InvalidConfigValueError { .. } => "Check the command line arguments",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_class_is_fatal() {
        let err = ExportError::ClassNotFound {
            class_id: "ABC123".to_string(),
        };
        assert_eq!(err.to_string(), "Class with id ABC123 not found");
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_bad_argument_points_at_command_line() {
        let err = crate::utils::validation::validate_url("dashboard_url", "ftp://example.com")
            .unwrap_err();
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.recovery_suggestion(), "Check the command line arguments");
    }

    #[test]
    fn test_write_failure_is_critical() {
        let err: ExportError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
