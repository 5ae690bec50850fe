use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] netflow_core::ValidationError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Source(#[from] netflow_core::SourceError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Report(#[from] netflow_report::ReportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 2,
            Self::Source(_) => 3,
            Self::Serialization(_) => 4,
            Self::Report(_) => 5,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_failures_exit_non_zero() {
        let err = CliError::Report(netflow_report::ReportError::Auth(String::from("bad key")));
        assert_eq!(err.exit_code(), 5);
        assert_eq!(CliError::Config(String::from("missing")).exit_code(), 2);
    }
}
