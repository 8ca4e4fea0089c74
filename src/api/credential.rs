//! PAT-based credential for the Azure DevOps REST API.
//!
//! Azure DevOps accepts a Personal Access Token as the password half of HTTP
//! Basic authentication with an empty user name.

use crate::error::ApiError;
use crate::models::WorkspaceConfig;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use secrecy::{ExposeSecret, SecretString};

/// PAT-based credential for Azure DevOps authentication.
///
/// # Example
///
/// ```rust
/// use ado_mobile::api::PatCredential;
/// use secrecy::ExposeSecret;
///
/// let credential = PatCredential::from_string("token".to_string());
/// assert_eq!(credential.authorization_header().expose_secret(), "Basic OnRva2Vu");
/// ```
#[derive(Clone)]
pub struct PatCredential {
    pat: SecretString,
}

impl PatCredential {
    pub fn new(pat: SecretString) -> Self {
        Self { pat }
    }

    pub fn from_string(pat: String) -> Self {
        Self {
            pat: SecretString::from(pat),
        }
    }

    /// Takes the token out of a workspace, failing when it is absent or empty.
    ///
    /// `action` completes the sentence "Personal Access Token is required to ...".
    pub fn from_workspace(
        workspace: &WorkspaceConfig,
        action: &'static str,
    ) -> Result<Self, ApiError> {
        match &workspace.pat {
            Some(pat) if !pat.expose_secret().is_empty() => Ok(Self::new(pat.clone())),
            _ => Err(ApiError::MissingCredential { action }),
        }
    }

    /// `Basic base64(":" + token)`, still wrapped as a secret.
    pub fn authorization_header(&self) -> SecretString {
        let encoded = STANDARD.encode(format!(":{}", self.pat.expose_secret()));
        SecretString::from(format!("Basic {}", encoded))
    }
}

impl std::fmt::Debug for PatCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatCredential")
            .field("pat", &"[REDACTED]")
            .finish()
    }
}
