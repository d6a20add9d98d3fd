use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Config,
    UnsupportedDialect,
    Template,
    Connection,
    Query,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Input => "Input",
            ErrorKind::Config => "Config",
            ErrorKind::UnsupportedDialect => "UnsupportedDialect",
            ErrorKind::Template => "Template",
            ErrorKind::Connection => "Connection",
            ErrorKind::Query => "Query",
            ErrorKind::Internal => "Internal",
        }
    }

    /// Process exit status for a fatal error of this kind.
    ///
    /// `1` is reserved for a completed comparison that found a mismatch.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Input | ErrorKind::Config => 2,
            ErrorKind::UnsupportedDialect => 3,
            ErrorKind::Connection => 4,
            ErrorKind::Query => 5,
            ErrorKind::Template | ErrorKind::Internal => 6,
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Input, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

pub fn classify_error(err: &anyhow::Error) -> ErrorKind {
    if let Some(app) = err.downcast_ref::<AppError>() {
        return app.kind;
    }
    if err.downcast_ref::<clap::Error>().is_some() {
        return ErrorKind::Input;
    }
    ErrorKind::Internal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_app_errors_by_kind() {
        let err: anyhow::Error = AppError::new(ErrorKind::Query, "boom").into();
        assert_eq!(classify_error(&err), ErrorKind::Query);
    }

    #[test]
    fn unknown_errors_are_internal() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(classify_error(&err), ErrorKind::Internal);
    }

    #[test]
    fn mismatch_exit_code_is_not_reused_by_errors() {
        for kind in [
            ErrorKind::Input,
            ErrorKind::Config,
            ErrorKind::UnsupportedDialect,
            ErrorKind::Template,
            ErrorKind::Connection,
            ErrorKind::Query,
            ErrorKind::Internal,
        ] {
            assert!(kind.exit_code() > 1, "{} maps to {}", kind.as_str(), kind.exit_code());
        }
    }
}
