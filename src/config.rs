//! Configuration management for ado-mobile.
//!
//! Values are layered, later layers winning:
//! compiled defaults < remembered workspace < TOML file < environment < CLI.
//! Every value keeps its origin so `ado-mobile config` can explain itself.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ado_mobile::Config;
//!
//! let config = Config::default()
//!     .merge(Config::load_from_file().unwrap())
//!     .merge(Config::load_from_env());
//! println!("Project: {:?}", config.project);
//! ```

use crate::error::ConfigError;
use crate::models::{Args, DEFAULT_API_BASE_URL, OutputFormat, WorkspaceConfig};
use crate::parsed_property::{ParsedProperty, PropertySource};
use crate::preferences::WorkspaceDefaults;
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ORGANIZATION_ENV: &str = "ADO_MOBILE_ORGANIZATION";
pub const PROJECT_ENV: &str = "ADO_MOBILE_PROJECT";
pub const API_BASE_URL_ENV: &str = "ADO_MOBILE_API_BASE_URL";
pub const PAT_ENV: &str = "ADO_MOBILE_PAT";
pub const OUTPUT_FORMAT_ENV: &str = "ADO_MOBILE_OUTPUT_FORMAT";

/// Temporary struct for deserializing TOML configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    pub organization: Option<String>,
    pub project: Option<String>,
    pub api_base_url: Option<String>,
    pub pat: Option<String>,
    pub output_format: Option<OutputFormat>,
}

/// Application configuration assembled from every source.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub organization: Option<ParsedProperty<String>>,
    pub project: Option<ParsedProperty<String>>,
    pub api_base_url: Option<ParsedProperty<String>>,
    pub pat: Option<ParsedProperty<String>>,
    pub output_format: Option<ParsedProperty<OutputFormat>>,
}

/// One row of `ado-mobile config` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: Option<String>,
    pub source: Option<PropertySource>,
    pub origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            organization: None,
            project: None,
            api_base_url: Some(ParsedProperty::Default(DEFAULT_API_BASE_URL.to_string())),
            pat: None,
            output_format: Some(ParsedProperty::Default(OutputFormat::Text)),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Config {
    /// A config with no values at all; used as a layer.
    pub fn empty() -> Self {
        Self {
            organization: None,
            project: None,
            api_base_url: None,
            pat: None,
            output_format: None,
        }
    }

    /// Load configuration from the XDG config directory. A missing file is an empty layer.
    #[must_use = "this returns the loaded configuration which should be used"]
    pub fn load_from_file() -> Result<Self, ConfigError> {
        match Self::get_config_path() {
            Some(path) if path.exists() => Self::load_from_path(&path),
            Some(path) => {
                debug!(path = %path.display(), "No config file");
                Ok(Self::empty())
            }
            None => Ok(Self::empty()),
        }
    }

    /// Load configuration from a specific TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let file: ConfigFile = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let from_file = |key: &str, value: Option<String>| {
            value
                .and_then(non_empty)
                .map(|v| ParsedProperty::File(v, path.to_path_buf(), key.to_string()))
        };

        Ok(Self {
            organization: from_file("organization", file.organization),
            project: from_file("project", file.project),
            api_base_url: from_file("api_base_url", file.api_base_url),
            pat: from_file("pat", file.pat),
            output_format: file.output_format.map(|f| {
                ParsedProperty::File(f, path.to_path_buf(), "output_format".to_string())
            }),
        })
    }

    /// Load configuration from `ADO_MOBILE_*` environment variables. Empty values are ignored.
    pub fn load_from_env() -> Self {
        let from_env = |var: &str| {
            std::env::var(var)
                .ok()
                .and_then(non_empty)
                .map(|v| ParsedProperty::Env(v, var.to_string()))
        };

        let output_format = from_env(OUTPUT_FORMAT_ENV).and_then(|prop| {
            match prop.value().parse::<OutputFormat>() {
                Ok(format) => Some(prop.map(|_| format)),
                Err(e) => {
                    warn!(error = %e, "Ignoring {}", OUTPUT_FORMAT_ENV);
                    None
                }
            }
        });

        Self {
            organization: from_env(ORGANIZATION_ENV),
            project: from_env(PROJECT_ENV),
            api_base_url: from_env(API_BASE_URL_ENV),
            pat: from_env(PAT_ENV),
            output_format,
        }
    }

    /// Layer built from command-line flags.
    pub fn from_args(args: &Args) -> Self {
        let from_cli = |flag: &str, value: &Option<String>| {
            value
                .clone()
                .and_then(non_empty)
                .map(|v| ParsedProperty::Cli(v, flag.to_string()))
        };

        Self {
            organization: from_cli("--organization", &args.connection.organization),
            project: from_cli("--project", &args.connection.project),
            api_base_url: from_cli("--api-base-url", &args.connection.api_base_url),
            pat: from_cli("--pat", &args.connection.pat),
            output_format: args
                .format
                .map(|f| ParsedProperty::Cli(f, "--format".to_string())),
        }
    }

    /// Layer built from the compiled-in workspace defaults.
    pub fn from_defaults(defaults: &WorkspaceDefaults) -> Self {
        let default = |value: &str| non_empty(value.to_string()).map(ParsedProperty::Default);

        Self {
            organization: default(&defaults.organization),
            project: default(&defaults.project),
            api_base_url: default(&defaults.api_base_url),
            ..Self::default()
        }
    }

    /// Layer built from the remembered workspace.
    pub fn from_stored(workspace: &WorkspaceConfig) -> Self {
        let stored = |value: &str| non_empty(value.to_string()).map(ParsedProperty::Stored);

        Self {
            organization: stored(&workspace.organization),
            project: stored(&workspace.project),
            api_base_url: stored(&workspace.api_base_url),
            pat: workspace
                .pat
                .as_ref()
                .and_then(|pat| stored(pat.expose_secret())),
            output_format: None,
        }
    }

    /// Get the XDG config file path for ado-mobile
    pub fn get_config_path() -> Option<PathBuf> {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;

        Some(config_dir.join("ado-mobile").join("config.toml"))
    }

    /// Merge this config with another, preferring values from other when they exist
    pub fn merge(self, other: Self) -> Self {
        Self {
            organization: other.organization.or(self.organization),
            project: other.project.or(self.project),
            api_base_url: other.api_base_url.or(self.api_base_url),
            pat: other.pat.or(self.pat),
            output_format: other.output_format.or(self.output_format),
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
            .as_ref()
            .map(|f| *f.value())
            .unwrap_or_default()
    }

    /// Builds the workspace requests should target.
    ///
    /// Organization and project are required; the API base URL must be an
    /// http(s) URL. The token is optional here: the client reports its absence.
    pub fn resolve_workspace(&self) -> Result<WorkspaceConfig, ConfigError> {
        let organization = required(&self.organization, "organization", ORGANIZATION_ENV)?;
        let project = required(&self.project, "project", PROJECT_ENV)?;
        let api_base_url = self
            .api_base_url
            .as_ref()
            .map(|p| p.value().clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        validate_api_base_url(&api_base_url)?;

        let mut workspace = WorkspaceConfig::new(organization, project, api_base_url);
        if let Some(pat) = &self.pat {
            workspace = workspace.with_pat(pat.value().clone());
        }
        Ok(workspace)
    }

    /// Rows for display. The token is never shown.
    pub fn entries(&self) -> Vec<ConfigEntry> {
        fn entry<T: ToString>(
            key: &'static str,
            prop: &Option<ParsedProperty<T>>,
            redact: bool,
        ) -> ConfigEntry {
            ConfigEntry {
                key,
                value: prop.as_ref().map(|p| {
                    if redact {
                        "********".to_string()
                    } else {
                        p.value().to_string()
                    }
                }),
                source: prop.as_ref().map(ParsedProperty::source),
                origin: prop.as_ref().map(ParsedProperty::describe_source),
            }
        }

        vec![
            entry("organization", &self.organization, false),
            entry("project", &self.project, false),
            entry("api_base_url", &self.api_base_url, false),
            entry("pat", &self.pat, true),
            entry("output_format", &self.output_format, false),
        ]
    }

    /// Create a sample config file for user reference. Existing files are left alone.
    #[must_use = "this operation can fail and the result should be checked"]
    pub fn create_sample_config() -> Result<PathBuf> {
        let config_path =
            Self::get_config_path().context("Could not determine config directory")?;

        if config_path.exists() {
            return Ok(config_path);
        }

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let sample_config = r#"# ado-mobile configuration file
# Location: $XDG_CONFIG_HOME/ado-mobile/config.toml (defaults to ~/.config/ado-mobile/config.toml)
#
# Precedence: command-line flags > ADO_MOBILE_* environment variables > this file
#             > values remembered with `ado-mobile login` > built-in defaults

# Azure DevOps organization (required)
# organization = "your-organization"

# Azure DevOps project (required)
# project = "your-project"

# API host; change for Azure DevOps Server collections (optional)
api_base_url = "https://dev.azure.com"

# Personal Access Token (consider ADO_MOBILE_PAT or `ado-mobile login` instead)
# pat = "your-pat-token"

# Output format: "text" or "json" (optional, defaults to "text")
output_format = "text"
"#;

        fs::write(&config_path, sample_config).with_context(|| {
            format!(
                "Failed to write sample config to: {}",
                config_path.display()
            )
        })?;

        Ok(config_path)
    }
}

fn required(
    prop: &Option<ParsedProperty<String>>,
    field: &str,
    env_var: &str,
) -> Result<String, ConfigError> {
    prop.as_ref()
        .map(|p| p.value().clone())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingRequired {
            field: field.to_string(),
            env_var: env_var.to_string(),
        })
}

fn validate_api_base_url(value: &str) -> Result<(), ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        field: "api_base_url".to_string(),
        message,
    };
    let url = url::Url::parse(value).map_err(|e| invalid(format!("'{}': {}", value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}
