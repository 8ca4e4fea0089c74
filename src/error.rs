//! Unified error handling for the ado-mobile library.
//!
//! Every concern gets its own `thiserror` enum; [`AdoMobileError`] wraps them
//! all so the command runner and the binary can propagate with `?`.
//!
//! ## Error Categories
//!
//! - [`ApiError`]: Errors from Azure DevOps REST calls
//! - [`PreferenceError`]: Errors reading or writing persisted preferences
//! - [`ConfigError`]: Errors from configuration loading and validation
//! - [`RouteError`]: Paths that do not resolve to a view
//!
//! ## Example
//!
//! ```rust,no_run
//! use ado_mobile::error::{AdoMobileError, ApiError};
//!
//! fn example() -> Result<(), AdoMobileError> {
//!     Err(ApiError::MissingCredential {
//!         action: "query work items",
//!     })?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the ado-mobile library.
#[derive(Error, Debug)]
pub enum AdoMobileError {
    /// An error occurred while talking to Azure DevOps.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// An error occurred while loading or validating configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persisted preferences could not be read or written.
    #[error("Preference error: {0}")]
    Preferences(#[from] PreferenceError),

    /// A navigable path could not be resolved.
    #[error("{0}")]
    Route(#[from] RouteError),

    /// User input was rejected before any request was made.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Why the input was rejected.
        message: String,
    },

    /// Output could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A generic error for cases not covered by specific error types.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AdoMobileError {
    /// Convenience constructor for [`AdoMobileError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Errors that can occur when interacting with the Azure DevOps API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No Personal Access Token was configured. Raised before any network call.
    #[error("Personal Access Token is required to {action}")]
    MissingCredential {
        /// What the caller was trying to do, e.g. "query work items".
        action: &'static str,
    },

    /// The service answered with a non-success status.
    #[error("Azure DevOps request failed ({status}): {body}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Raw response body text.
        body: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A success response did not carry the expected JSON shape.
    #[error("Failed to decode {what} response: {message}")]
    Decode {
        /// Which response was being decoded.
        what: &'static str,
        /// Decoder message.
        message: String,
    },

    /// The request could not be assembled.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },
}

impl ApiError {
    /// HTTP status of a failed request, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            ApiError::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_missing_credential(&self) -> bool {
        matches!(self, ApiError::MissingCredential { .. })
    }
}

/// Errors raised by the preference store and the typed preference loaders.
#[derive(Error, Debug)]
pub enum PreferenceError {
    /// A stored value exists but is not valid for its key.
    #[error("Stored preference '{key}' is malformed: {message}")]
    Decode {
        /// Preference key.
        key: String,
        /// Decoder message.
        message: String,
    },

    /// A value could not be encoded for storage.
    #[error("Failed to encode preference '{key}': {message}")]
    Encode {
        /// Preference key.
        key: String,
        /// Encoder message.
        message: String,
    },

    /// The backing file could not be read or written.
    #[error("Preference store I/O error at {path}: {source}")]
    Io {
        /// Path of the backing file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No directory is available for persisted state.
    #[error("Could not determine a state directory (set ADO_MOBILE_STATE_DIR)")]
    StateDir,
}

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration field is missing.
    #[error(
        "{field} is required (use --{field}, {env_var} env var, config file, or `ado-mobile login`)"
    )]
    MissingRequired {
        /// Name of the missing field.
        field: String,
        /// Environment variable name for this field.
        env_var: String,
    },

    /// Failed to read the configuration file.
    #[error("Failed to read config file at {path}: {message}")]
    FileReadError {
        /// Path to the config file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file at {path}: {message}")]
    ParseError {
        /// Path to the config file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// An invalid value was provided for a configuration field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Name of the field with invalid value.
        field: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// Failed to create config directory.
    #[error("Failed to create config directory at {path}: {message}")]
    DirectoryCreationError {
        /// Path where directory creation failed.
        path: PathBuf,
        /// Error message.
        message: String,
    },
}

/// A work item id that is not a positive integer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid work item id '{input}': expected a positive integer")]
pub struct InvalidWorkItemId {
    /// The rejected input.
    pub input: String,
}

/// Paths that do not resolve to a view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The path has the work item shape but the id segment is not usable.
    #[error(transparent)]
    InvalidWorkItemId(#[from] InvalidWorkItemId),

    /// Nothing is mounted at this path.
    #[error("No view at '{path}'")]
    NotFound {
        /// The unmatched path.
        path: String,
    },
}

/// Type alias for Results using AdoMobileError.
pub type AdoMobileResult<T> = std::result::Result<T, AdoMobileError>;

/// Type alias for Results using ApiError.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// # API Error Display
    ///
    /// Tests that API errors render the messages users see.
    ///
    /// ## Test Scenario
    /// - Creates missing-credential and request-failed errors
    ///
    /// ## Expected Outcome
    /// - Missing credential names the action
    /// - Request failures carry status and body verbatim
    #[test]
    fn test_api_error_display() {
        let missing = ApiError::MissingCredential {
            action: "update work items",
        };
        assert_eq!(
            missing.to_string(),
            "Personal Access Token is required to update work items"
        );

        let failed = ApiError::RequestFailed {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(
            failed.to_string(),
            "Azure DevOps request failed (401): unauthorized"
        );
        assert_eq!(failed.status(), Some(401));
        assert!(!failed.is_missing_credential());
        assert!(missing.is_missing_credential());
    }

    /// # Umbrella Error Keeps Inner Message
    ///
    /// Tests that wrapping an API error does not lose its status text.
    ///
    /// ## Test Scenario
    /// - Converts a request failure into AdoMobileError
    ///
    /// ## Expected Outcome
    /// - The rendered message still contains the status and the body
    #[test]
    fn test_umbrella_preserves_message() {
        let err: AdoMobileError = ApiError::RequestFailed {
            status: 503,
            body: "try later".to_string(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("try later"));
    }

    /// # Config Error Display
    ///
    /// Tests that missing-field errors hint at every source.
    ///
    /// ## Test Scenario
    /// - Creates a MissingRequired error for organization
    ///
    /// ## Expected Outcome
    /// - Message names the flag, the env var and the login command
    #[test]
    fn test_config_error_display() {
        let missing = ConfigError::MissingRequired {
            field: "organization".to_string(),
            env_var: "ADO_MOBILE_ORGANIZATION".to_string(),
        };
        let msg = missing.to_string();
        assert!(msg.contains("--organization"));
        assert!(msg.contains("ADO_MOBILE_ORGANIZATION"));
        assert!(msg.contains("ado-mobile login"));
    }

    /// # Error Conversion
    ///
    /// Tests that errors convert correctly through the From trait.
    ///
    /// ## Test Scenario
    /// - Converts each specific error into AdoMobileError
    ///
    /// ## Expected Outcome
    /// - Each lands in its own variant
    #[test]
    fn test_error_conversion() {
        let err: AdoMobileError = ApiError::MissingCredential {
            action: "add comments",
        }
        .into();
        assert!(matches!(err, AdoMobileError::Api(_)));

        let err: AdoMobileError = PreferenceError::StateDir.into();
        assert!(matches!(err, AdoMobileError::Preferences(_)));

        let err: AdoMobileError = RouteError::NotFound {
            path: "/nope".to_string(),
        }
        .into();
        assert!(matches!(err, AdoMobileError::Route(_)));

        let err: AdoMobileError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, AdoMobileError::Other(_)));
    }

    /// # Route Error Is Transparent For Ids
    ///
    /// Tests that an invalid id inside a route reads like the id error itself.
    ///
    /// ## Test Scenario
    /// - Wraps InvalidWorkItemId in RouteError
    ///
    /// ## Expected Outcome
    /// - Display is identical to the inner error
    #[test]
    fn test_route_error_transparent() {
        let inner = InvalidWorkItemId {
            input: "abc".to_string(),
        };
        let outer = RouteError::from(inner.clone());
        assert_eq!(outer.to_string(), inner.to_string());
        assert!(outer.to_string().contains("'abc'"));
    }
}
