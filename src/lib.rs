//! # ado-mobile
//!
//! A lightweight client for Azure DevOps work items. This library provides:
//!
//! - An async API client for querying, reading, updating and commenting on work items
//! - Layered configuration (CLI, environment, config file, remembered workspace)
//! - Persisted preferences: the remembered workspace and the column selection
//! - Text and JSON rendering for the `ado-mobile` CLI
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ado_mobile::{AzureDevOpsClient, QueryCriteria, WorkspaceConfig};
//! use ado_mobile::fields::default_fields;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AzureDevOpsClient::new()?;
//! let workspace = WorkspaceConfig::new("my-org", "my-project", "https://dev.azure.com")
//!     .with_pat("my-pat");
//!
//! let criteria = QueryCriteria::new().state("Active").assigned_to("alice");
//! let items = client
//!     .query_work_items(&workspace, &criteria, &default_fields())
//!     .await?;
//! println!("Found {} work items", items.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod fields;
pub mod logging;
pub mod models;
pub mod parsed_property;
pub mod preferences;
pub mod routes;
pub mod utils;

// Re-export commonly used types for convenience
pub use api::AzureDevOpsClient;
pub use config::Config;
pub use context::{AppContext, ContextChange};
pub use error::{AdoMobileError, AdoMobileResult, ApiError};
pub use models::{
    Args, QueryCriteria, WorkItem, WorkItemComment, WorkItemDetails, WorkItemId, WorkspaceConfig,
};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
