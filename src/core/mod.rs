//! Command execution and output for the `ado-mobile` CLI.
//!
//! - [`runner`] executes one parsed command against the context and client
//! - [`output`] renders results as text or JSON
//! - [`ExitCode`] maps outcomes to process exit codes
//! - [`error_message`] renders an error chain for stderr

pub mod output;
pub mod runner;

use crate::error::{AdoMobileError, ApiError, ConfigError};

/// Process exit codes.
///
/// Scripts can tell a missing token or a rejected input apart from a service
/// failure without parsing the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// The command completed.
    Success = 0,

    /// Anything not covered below (configuration, local storage, decoding).
    GeneralError = 1,

    /// No Personal Access Token is configured.
    MissingCredential = 2,

    /// Azure DevOps answered with an error or could not be reached.
    RequestFailed = 3,

    /// An argument was rejected before any request was made.
    InvalidInput = 4,
}

impl ExitCode {
    /// Returns the numeric exit code value.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Command completed successfully",
            ExitCode::GeneralError => "General error occurred",
            ExitCode::MissingCredential => "Personal Access Token is missing",
            ExitCode::RequestFailed => "Azure DevOps request failed",
            ExitCode::InvalidInput => "Invalid input",
        }
    }

    /// Classifies an error for the process exit status.
    pub fn from_error(error: &AdoMobileError) -> Self {
        match error {
            AdoMobileError::Api(ApiError::MissingCredential { .. }) => ExitCode::MissingCredential,
            AdoMobileError::Api(ApiError::RequestFailed { .. } | ApiError::Network(_)) => {
                ExitCode::RequestFailed
            }
            AdoMobileError::Api(ApiError::InvalidRequest { .. })
            | AdoMobileError::Route(_)
            | AdoMobileError::InvalidInput { .. }
            | AdoMobileError::Config(ConfigError::InvalidValue { .. }) => ExitCode::InvalidInput,
            _ => ExitCode::GeneralError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// One-line message for an error and its causes, as printed by the binary.
///
/// Context layers are joined with `": "`. A cause whose text already appears
/// in the message above it is skipped, since wrapper variants embed their
/// inner error's text.
pub fn error_message(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let mut previous = message.clone();
    for cause in error.chain().skip(1) {
        let text = cause.to_string();
        if !previous.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        previous = text;
    }
    message
}
