use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Failed to load model artifact from '{path}': {message}")]
    ArtifactLoad { path: String, message: String },

    #[error("Ticket store error: {message}")]
    Persistence { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Model,
    Persistence,
    Configuration,
    System,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Input => "invalid_input",
            ErrorCategory::Model => "classifier_unavailable",
            ErrorCategory::Persistence => "persistence_error",
            ErrorCategory::Configuration => "configuration_error",
            ErrorCategory::System => "internal_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TriageError {
    pub fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        TriageError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        TriageError::Persistence {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TriageError::InvalidInput { .. } => ErrorCategory::Input,
            TriageError::ArtifactLoad { .. } => ErrorCategory::Model,
            TriageError::Persistence { .. } => ErrorCategory::Persistence,
            TriageError::ConfigError { .. }
            | TriageError::MissingConfigError { .. }
            | TriageError::InvalidConfigValueError { .. }
            | TriageError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            TriageError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Persistence => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::High,
            ErrorCategory::Model => ErrorSeverity::Critical,
        }
    }

    /// Message safe to hand back to callers: no paths, no upstream bodies.
    pub fn user_friendly_message(&self) -> String {
        match self {
            TriageError::InvalidInput { field, reason } => format!("{}: {}", field, reason),
            TriageError::ArtifactLoad { .. } => {
                "Ticket classification is currently unavailable".to_string()
            }
            TriageError::Persistence { .. } => "The ticket could not be saved".to_string(),
            TriageError::ConfigError { message } => format!("Configuration problem: {}", message),
            TriageError::MissingConfigError { field } => {
                format!("Missing required setting '{}'", field)
            }
            TriageError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            TriageError::ConfigValidationError { field, message } => {
                format!("Setting '{}' is invalid: {}", field, message)
            }
            TriageError::IoError(_) => "An internal error occurred".to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Correct the request and submit it again",
            ErrorCategory::Model => {
                "Check model.path / model.fallback_path and restart the service"
            }
            ErrorCategory::Persistence => "Check the ticket store connectivity and credentials",
            ErrorCategory::Configuration => "Review the configuration file and environment",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;
