/// Failure categories surfaced to callers.
///
/// `SourceUnavailable` is the only transient kind; everything else is permanent
/// for a given input and retrying cannot help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad arguments or configuration values.
    InvalidInput,
    /// An expected column is absent, or a cell cannot be interpreted.
    Schema,
    /// A source could not be fetched or parsed.
    SourceUnavailable,
    /// The forecasting model could not be estimated.
    ModelFit,
}

impl ErrorKind {
    fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidInput => 2,
            ErrorKind::Schema => 3,
            ErrorKind::SourceUnavailable => 4,
            ErrorKind::ModelFit => 5,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema, message)
    }

    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SourceUnavailable, message)
    }

    pub fn model_fit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModelFit, message)
    }

    /// Schema error listing every missing column of a required set.
    pub fn missing_columns(context: &str, missing: &[&str]) -> Self {
        Self::schema(format!(
            "{context}: missing required column(s): {}",
            missing
                .iter()
                .map(|c| format!("`{c}`"))
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::SourceUnavailable
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_source_errors_are_retryable() {
        assert!(AppError::source_unavailable("down").is_retryable());
        assert!(!AppError::schema("gone").is_retryable());
        assert!(!AppError::model_fit("flat").is_retryable());
        assert!(!AppError::invalid_input("bad").is_retryable());
    }

    #[test]
    fn missing_columns_names_the_whole_set() {
        let err = AppError::missing_columns("cases", &["Province", "Deceased"]);
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "cases: missing required column(s): `Province`, `Deceased`");
    }
}
