//! Persisted user preferences: the remembered workspace and column selection.
//!
//! Loaders never fail. Absent or malformed values fall back to defaults and
//! malformed ones are logged, so callers always get a complete record.

mod store;

pub use store::{FileStore, MemoryStore, PREFERENCES_FILE, PreferenceStore, STATE_DIR_ENV, state_dir};

use crate::error::PreferenceError;
use crate::fields::{REQUIRED_COLUMNS, default_fields, is_required_column};
use crate::models::{DEFAULT_API_BASE_URL, WorkspaceConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Key holding the remembered workspace as JSON.
pub const WORKSPACE_KEY: &str = "ado-mobile-auth";
/// Key holding the column selection as a JSON string array.
pub const COLUMNS_KEY: &str = "ado-mobile-columns";
/// Key holding the signature of the defaults the stored workspace was saved under.
pub const DEFAULTS_SIGNATURE_KEY: &str = "ado-mobile-defaults-signature";

/// Workspace values baked into the binary at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDefaults {
    pub organization: String,
    pub project: String,
    pub api_base_url: String,
}

impl WorkspaceDefaults {
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> Self {
        let api_base_url = api_base_url.into();
        Self {
            organization: organization.into(),
            project: project.into(),
            api_base_url: if api_base_url.is_empty() {
                DEFAULT_API_BASE_URL.to_string()
            } else {
                api_base_url
            },
        }
    }

    /// Values captured by the build script from `ADO_MOBILE_DEFAULT_*`.
    pub fn compiled() -> Self {
        Self::new(
            env!("ADO_MOBILE_DEFAULT_ORG"),
            env!("ADO_MOBILE_DEFAULT_PROJECT"),
            env!("ADO_MOBILE_DEFAULT_API_BASE"),
        )
    }

    /// First 16 hex characters of the SHA-256 of the three values.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [&self.organization, &self.project, &self.api_base_url] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hasher
            .finalize()
            .iter()
            .take(8)
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// The workspace used when nothing is stored. Has no token.
    pub fn to_workspace(&self) -> WorkspaceConfig {
        WorkspaceConfig::new(&self.organization, &self.project, &self.api_base_url)
    }
}

impl Default for WorkspaceDefaults {
    fn default() -> Self {
        Self::new("", "", DEFAULT_API_BASE_URL)
    }
}

/// On-disk shape of the remembered workspace. Every key is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredWorkspace {
    #[serde(default)]
    pat: Option<String>,
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    api_base_url: Option<String>,
}

/// Decodes a stored workspace, filling missing keys from `defaults`.
pub fn decode_workspace(
    raw: &str,
    defaults: &WorkspaceDefaults,
) -> Result<WorkspaceConfig, PreferenceError> {
    let stored: StoredWorkspace =
        serde_json::from_str(raw).map_err(|e| PreferenceError::Decode {
            key: WORKSPACE_KEY.to_string(),
            message: e.to_string(),
        })?;

    Ok(WorkspaceConfig {
        organization: stored
            .organization
            .unwrap_or_else(|| defaults.organization.clone()),
        project: stored.project.unwrap_or_else(|| defaults.project.clone()),
        api_base_url: stored
            .api_base_url
            .unwrap_or_else(|| defaults.api_base_url.clone()),
        pat: stored.pat.map(SecretString::from),
    })
}

pub fn encode_workspace(workspace: &WorkspaceConfig) -> Result<String, PreferenceError> {
    let stored = StoredWorkspace {
        pat: workspace
            .pat
            .as_ref()
            .map(|p| p.expose_secret().to_string()),
        organization: Some(workspace.organization.clone()),
        project: Some(workspace.project.clone()),
        api_base_url: Some(workspace.api_base_url.clone()),
    };
    serde_json::to_string(&stored).map_err(|e| PreferenceError::Encode {
        key: WORKSPACE_KEY.to_string(),
        message: e.to_string(),
    })
}

/// Loads the remembered workspace, or the defaults when there is none or it is unusable.
pub fn load_workspace(store: &dyn PreferenceStore, defaults: &WorkspaceDefaults) -> WorkspaceConfig {
    load_stored_workspace(store, defaults).unwrap_or_else(|| defaults.to_workspace())
}

/// The remembered workspace, if one is stored and decodes.
///
/// Read failures and malformed records are logged and read as `None`.
pub fn load_stored_workspace(
    store: &dyn PreferenceStore,
    defaults: &WorkspaceDefaults,
) -> Option<WorkspaceConfig> {
    let raw = match store.get(WORKSPACE_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(error = %e, "Could not read stored workspace, using defaults");
            return None;
        }
    };

    match decode_workspace(&raw, defaults) {
        Ok(workspace) => Some(workspace),
        Err(e) => {
            warn!(error = %e, "Discarding malformed stored workspace");
            None
        }
    }
}

pub fn save_workspace(
    store: &dyn PreferenceStore,
    workspace: &WorkspaceConfig,
) -> Result<(), PreferenceError> {
    store.set(WORKSPACE_KEY, &encode_workspace(workspace)?)
}

pub fn clear_workspace(store: &dyn PreferenceStore) -> Result<(), PreferenceError> {
    store.remove(WORKSPACE_KEY)
}

/// Decodes a stored column list. Must be a JSON array of strings.
pub fn decode_columns(raw: &str) -> Result<Vec<String>, PreferenceError> {
    serde_json::from_str(raw).map_err(|e| PreferenceError::Decode {
        key: COLUMNS_KEY.to_string(),
        message: e.to_string(),
    })
}

/// Loads the column selection with required columns first.
///
/// Absent or malformed selections give the default column set.
pub fn load_columns(store: &dyn PreferenceStore) -> Vec<String> {
    let raw = match store.get(COLUMNS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return default_fields(),
        Err(e) => {
            warn!(error = %e, "Could not read stored columns, using defaults");
            return default_fields();
        }
    };

    match decode_columns(&raw) {
        Ok(columns) => normalize_columns(&columns),
        Err(e) => {
            warn!(error = %e, "Discarding malformed stored columns");
            default_fields()
        }
    }
}

pub fn save_columns(store: &dyn PreferenceStore, columns: &[String]) -> Result<(), PreferenceError> {
    let raw = serde_json::to_string(columns).map_err(|e| PreferenceError::Encode {
        key: COLUMNS_KEY.to_string(),
        message: e.to_string(),
    })?;
    store.set(COLUMNS_KEY, &raw)
}

/// Required columns followed by `columns`, first occurrence wins.
pub fn normalize_columns(columns: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(columns.len() + REQUIRED_COLUMNS.len());
    for column in REQUIRED_COLUMNS
        .iter()
        .copied()
        .chain(columns.iter().map(String::as_str))
    {
        if !normalized.iter().any(|c| c == column) {
            normalized.push(column.to_string());
        }
    }
    normalized
}

/// Adds `reference` if absent, removes it if present. Required columns never leave.
pub fn toggle_column(columns: &[String], reference: &str) -> Vec<String> {
    if is_required_column(reference) {
        return normalize_columns(columns);
    }
    if columns.iter().any(|c| c == reference) {
        columns
            .iter()
            .filter(|c| c.as_str() != reference)
            .cloned()
            .collect()
    } else {
        let mut next = columns.to_vec();
        next.push(reference.to_string());
        next
    }
}

/// Drops the stored workspace if it was saved under different build defaults.
///
/// Returns `true` when the stored workspace was discarded. The column
/// selection is left alone.
pub fn reconcile_defaults_signature(
    store: &dyn PreferenceStore,
    defaults: &WorkspaceDefaults,
) -> Result<bool, PreferenceError> {
    let current = defaults.signature();
    let stored = store.get(DEFAULTS_SIGNATURE_KEY)?;
    if stored.as_deref() == Some(current.as_str()) {
        return Ok(false);
    }

    let had_workspace = store.get(WORKSPACE_KEY)?.is_some();
    if stored.is_some() && had_workspace {
        info!("Build defaults changed, discarding remembered workspace");
        store.remove(WORKSPACE_KEY)?;
    }
    store.set(DEFAULTS_SIGNATURE_KEY, &current)?;
    debug!(signature = %current, "Recorded defaults signature");
    Ok(stored.is_some() && had_workspace)
}
