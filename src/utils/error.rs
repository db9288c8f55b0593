use thiserror::Error;

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Download failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("No generator registered for emulator '{name}'")]
    UnknownEmulator { name: String },

    #[error("Executable for '{emulator}' not found")]
    ExecutableNotFound { emulator: String },

    #[error("Installation of '{name}' failed: {message}")]
    InstallError { name: String, message: String },

    #[error("Process error: {message}")]
    ProcessError { message: String },

    #[error("Installation of '{name}' was declined")]
    InstallCancelled { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    FileSystem,
    Process,
    Installation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LauncherError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LauncherError::HttpError(_) => ErrorCategory::Network,
            LauncherError::IoError(_) | LauncherError::SerializationError(_) => {
                ErrorCategory::FileSystem
            }
            LauncherError::ConfigError { .. }
            | LauncherError::ConfigValidationError { .. }
            | LauncherError::InvalidConfigValueError { .. }
            | LauncherError::MissingConfigError { .. }
            | LauncherError::UnknownEmulator { .. } => ErrorCategory::Configuration,
            LauncherError::ExecutableNotFound { .. } | LauncherError::ProcessError { .. } => {
                ErrorCategory::Process
            }
            LauncherError::ZipError(_)
            | LauncherError::InstallError { .. }
            | LauncherError::InstallCancelled { .. } => ErrorCategory::Installation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 使用者主動取消，不算失敗
            LauncherError::InstallCancelled { .. } => ErrorSeverity::Low,
            LauncherError::HttpError(_) => ErrorSeverity::Medium,
            LauncherError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            LauncherError::HttpError(_) => {
                "Could not download the emulator package".to_string()
            }
            LauncherError::UnknownEmulator { name } => {
                format!("Emulator '{}' is not supported by this launcher", name)
            }
            LauncherError::ExecutableNotFound { emulator } => {
                format!("Emulator '{}' is not installed", emulator)
            }
            LauncherError::InstallCancelled { name } => {
                format!("Launch aborted: '{}' is not installed", name)
            }
            LauncherError::ConfigError { .. }
            | LauncherError::ConfigValidationError { .. }
            | LauncherError::InvalidConfigValueError { .. }
            | LauncherError::MissingConfigError { .. } => {
                format!("Invalid launcher configuration: {}", self)
            }
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the launcher TOML file and the command line options"
            }
            ErrorCategory::Network => "Check your network connection and the package URL",
            ErrorCategory::FileSystem => "Check that the folders exist and are writable",
            ErrorCategory::Process => {
                "Install the emulator or fix its folder in the [paths] section"
            }
            ErrorCategory::Installation => "Retry the installation or install the package manually",
        }
    }

    /// 依嚴重程度決定程式結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_maps_to_exit_code() {
        let cancelled = LauncherError::InstallCancelled {
            name: "mesen".to_string(),
        };
        assert_eq!(cancelled.exit_code(), 0);

        let unknown = LauncherError::UnknownEmulator {
            name: "foo".to_string(),
        };
        assert_eq!(unknown.category(), ErrorCategory::Configuration);
        assert_eq!(unknown.exit_code(), 1);

        let io = LauncherError::from(std::io::Error::other("disk"));
        assert_eq!(io.exit_code(), 3);
    }

    #[test]
    fn test_user_friendly_message() {
        let err = LauncherError::ExecutableNotFound {
            emulator: "demul".to_string(),
        };
        assert_eq!(err.user_friendly_message(), "Emulator 'demul' is not installed");
        assert_eq!(err.category(), ErrorCategory::Process);
    }
}
