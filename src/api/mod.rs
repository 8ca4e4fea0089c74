//! Azure DevOps work item API client.
//!
//! Four operations over the work item tracking REST API: query, detail
//! (item plus comments), state update and comment creation. Requests go
//! through a [`Transport`] so tests can observe them without a network.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ado_mobile::api::AzureDevOpsClient;
//! use ado_mobile::fields::default_fields;
//! use ado_mobile::models::{QueryCriteria, WorkspaceConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AzureDevOpsClient::new()?;
//! let workspace = WorkspaceConfig::new("my-org", "my-project", "https://dev.azure.com")
//!     .with_pat("my-pat");
//!
//! let items = client
//!     .query_work_items(&workspace, &QueryCriteria::new().state("Active"), &default_fields())
//!     .await?;
//! println!("Found {} work items", items.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod credential;
pub mod transport;
pub mod wiql;

pub use client::{API_VERSION, AzureDevOpsClient, COMMENTS_API_VERSION, JSON_PATCH_CONTENT_TYPE};
pub use credential::PatCredential;
pub use transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, Transport};
