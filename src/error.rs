use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the ambient parts of the crate: settings, step files
/// and checkpoint storage.
///
/// Step execution itself never returns this type. Failures observed while
/// running a sequence are reported through
/// [`ExecutionResult`](crate::automation::ExecutionResult) instead.
#[derive(Error, Debug)]
pub enum AutofillError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to parse {format} from {}: {message}", path.display())]
    Parse {
        format: &'static str,
        path: PathBuf,
        message: String,
    },
}

impl AutofillError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create a validation error for a named field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Attach a path to configuration and storage errors
    pub fn with_path(mut self, new_path: impl Into<PathBuf>) -> Self {
        match &mut self {
            Self::Config { path, .. } | Self::Storage { path, .. } => {
                *path = Some(new_path.into());
            }
            _ => {}
        }
        self
    }

    /// Attach an underlying cause to configuration and storage errors
    pub fn with_source(
        mut self,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        match &mut self {
            Self::Config { source, .. } | Self::Storage { source, .. } => {
                *source = Some(Box::new(cause));
            }
            _ => {}
        }
        self
    }

    /// Whether the error was caused by invalid user-supplied values
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, AutofillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = AutofillError::validation("retry.max_retries", "must be -1 or greater");
        assert_eq!(err.to_string(), "Validation error: must be -1 or greater");
        assert!(err.is_validation());
    }

    #[test]
    fn test_storage_error_keeps_path_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AutofillError::storage("Failed to write checkpoint")
            .with_path("/tmp/ckpt.json")
            .with_source(io);

        match &err {
            AutofillError::Storage { path, source, .. } => {
                assert_eq!(path.as_deref(), Some(std::path::Path::new("/tmp/ckpt.json")));
                assert!(source.is_some());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_parse_error_names_format_and_path() {
        let err = AutofillError::Parse {
            format: "YAML",
            path: PathBuf::from("steps.yaml"),
            message: "bad indent".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse YAML from steps.yaml: bad indent"
        );
    }
}
