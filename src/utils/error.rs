use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to fetch page {page} (cursor {cursor}): {message}")]
    SourceFetch {
        page: usize,
        cursor: usize,
        status: Option<u16>,
        message: String,
    },

    #[error("Location lookup failed: {message}")]
    LocationLookup { status: Option<u16>, message: String },

    #[error("Failed to create spreadsheet: {message}")]
    SheetCreate { status: Option<u16>, message: String },

    #[error("Failed to read spreadsheet: {message}")]
    SheetRead { status: Option<u16>, message: String },

    #[error("Failed to append rows: {message}")]
    SheetAppend { status: Option<u16>, message: String },

    #[error("Authentication error: {message}")]
    Auth { message: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Source,
    Spreadsheet,
    Auth,
    Network,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExportError {
    pub fn source_fetch(
        page: usize,
        cursor: usize,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::SourceFetch {
            page,
            cursor,
            status,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// HTTP status attached to a remote failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SourceFetch { status, .. }
            | Self::LocationLookup { status, .. }
            | Self::SheetCreate { status, .. }
            | Self::SheetRead { status, .. }
            | Self::SheetAppend { status, .. } => *status,
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SourceFetch { .. } | Self::LocationLookup { .. } => ErrorCategory::Source,
            Self::SheetCreate { .. } | Self::SheetRead { .. } | Self::SheetAppend { .. } => {
                ErrorCategory::Spreadsheet
            }
            Self::Auth { .. } => ErrorCategory::Auth,
            Self::Http(_) => ErrorCategory::Network,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 429 / 5xx 通常稍後重試即可
            Self::SourceFetch { status, .. }
            | Self::LocationLookup { status, .. }
            | Self::SheetRead { status, .. }
            | Self::SheetAppend { status, .. }
                if matches!(status, Some(429) | Some(500..=599)) =>
            {
                ErrorSeverity::Medium
            }
            Self::Http(_) => ErrorSeverity::Medium,
            Self::SourceFetch { .. }
            | Self::LocationLookup { .. }
            | Self::SheetCreate { .. }
            | Self::SheetRead { .. }
            | Self::SheetAppend { .. } => ErrorSeverity::High,
            Self::Auth { .. }
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorSeverity::High,
            Self::IoError(_) | Self::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::SourceFetch { status: Some(401), .. }
            | Self::SourceFetch { status: Some(403), .. }
            | Self::LocationLookup { status: Some(401), .. }
            | Self::LocationLookup { status: Some(403), .. } => {
                "Check that CONNECTSAFELY_API_TOKEN is valid and has access to this resource"
            }
            Self::SourceFetch { status: Some(429), .. } => {
                "The source is rate limiting; raise --page-delay-ms and retry later"
            }
            Self::SourceFetch { .. } => {
                "Verify the group id, group URL or search keywords and retry the export"
            }
            Self::LocationLookup { .. } => {
                "Try a broader location name, or pass the location text to --location as-is"
            }
            Self::SheetCreate { .. } => {
                "Make sure the Google credentials include the spreadsheets scope"
            }
            Self::SheetRead { .. } => {
                "Check the spreadsheet id and that the sheet tab name exists"
            }
            Self::SheetAppend { .. } => {
                "Rows appended before the failure remain; re-running the export will skip them"
            }
            Self::Auth { .. } => {
                "Issue a fresh Google token: set GOOGLE_ACCESS_TOKEN or GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REFRESH_TOKEN"
            }
            Self::Http(_) => "Check network connectivity and retry",
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => {
                "Review the command-line flags, environment variables and config file"
            }
            Self::IoError(_) => "Check that the output directory exists and is writable",
            Self::SerializationError(_) => "The remote API returned an unexpected payload",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::SourceFetch {
                page,
                status: Some(code),
                message,
                ..
            } => format!("Fetching page {} failed with HTTP {}: {}", page, code, message),
            Self::SheetCreate { status: Some(code), message }
            | Self::SheetRead { status: Some(code), message }
            | Self::SheetAppend { status: Some(code), message } => {
                format!("{} (HTTP {}): {}", self.step_name(), code, message)
            }
            _ => self.to_string(),
        }
    }

    fn step_name(&self) -> &'static str {
        match self {
            Self::SheetCreate { .. } => "Spreadsheet creation failed",
            Self::SheetRead { .. } => "Reading existing rows failed",
            Self::SheetAppend { .. } => "Appending rows failed",
            _ => "Export failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_lookup_is_source_category() {
        let err = ExportError::LocationLookup {
            status: Some(401),
            message: "invalid token".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Source);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.status(), Some(401));
        assert!(err.recovery_suggestion().contains("CONNECTSAFELY_API_TOKEN"));
    }

    #[test]
    fn test_server_errors_are_retryable_severity() {
        let err = ExportError::source_fetch(2, 50, Some(503), "Service Unavailable");
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.category(), ErrorCategory::Source);
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn test_source_error_names_page() {
        let err = ExportError::source_fetch(3, 100, Some(400), "bad group");
        assert_eq!(err.to_string(), "Failed to fetch page 3 (cursor 100): bad group");
        assert!(err.user_friendly_message().contains("HTTP 400"));
    }

    #[test]
    fn test_sheet_errors_are_distinct_steps() {
        let create = ExportError::SheetCreate {
            status: Some(403),
            message: "forbidden".into(),
        };
        let append = ExportError::SheetAppend {
            status: Some(400),
            message: "bad range".into(),
        };
        assert!(create.user_friendly_message().starts_with("Spreadsheet creation failed"));
        assert!(append.user_friendly_message().starts_with("Appending rows failed"));
        assert_eq!(create.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_auth_error_category() {
        let err = ExportError::auth("missing refresh token");
        assert_eq!(err.category(), ErrorCategory::Auth);
        assert_eq!(err.status(), None);
    }
}
