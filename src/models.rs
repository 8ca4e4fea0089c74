use crate::error::InvalidWorkItemId;
use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default API host used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://dev.azure.com";

// ============================================================================
// CLI Arguments
// ============================================================================

/// Connection arguments shared by every command that talks to Azure DevOps.
#[derive(ClapArgs, Clone, Default, Debug)]
pub struct ConnectionArgs {
    /// Azure DevOps organization name
    #[arg(short, long, global = true, help_heading = "Azure DevOps Connection")]
    pub organization: Option<String>,

    /// Azure DevOps project name
    #[arg(short, long, global = true, help_heading = "Azure DevOps Connection")]
    pub project: Option<String>,

    /// API host, e.g. https://dev.azure.com or an on-premises collection URL
    #[arg(long, global = true, help_heading = "Azure DevOps Connection")]
    pub api_base_url: Option<String>,

    /// Personal Access Token for Azure DevOps API authentication
    #[arg(short = 't', long, global = true, help_heading = "Azure DevOps Connection")]
    pub pat: Option<String>,
}

/// Logging flags. These are read before clap runs; declaring them here keeps
/// clap from rejecting them and lists them in `--help`.
#[derive(ClapArgs, Clone, Default, Debug)]
pub struct LogArgs {
    /// Enable logging at this level (trace, debug, info, warn, error)
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_file: Option<String>,

    /// Log format (text or json)
    #[arg(long, global = true, help_heading = "Logging")]
    pub log_format: Option<String>,
}

/// Output format for command results.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{other}' (expected text or json)")),
        }
    }
}

/// Help for `list --state`, naming the usual states. Custom states are accepted too.
fn state_filter_help() -> String {
    format!(
        "Only items in this state, repeatable (e.g. {})",
        crate::fields::DEFAULT_STATES.join(", ")
    )
}

/// Arguments for `list`.
#[derive(ClapArgs, Clone, Default, Debug)]
pub struct ListArgs {
    /// Only items whose title contains this text
    #[arg(short, long, help_heading = "Filters")]
    pub search: Option<String>,

    #[arg(
        long = "state",
        value_name = "STATE",
        help = state_filter_help(),
        help_heading = "Filters"
    )]
    pub states: Vec<String>,

    /// Only items whose assignee contains this text
    #[arg(short, long, help_heading = "Filters")]
    pub assigned_to: Option<String>,

    /// Field reference to order by (default System.ChangedDate)
    #[arg(long, value_name = "FIELD", help_heading = "Ordering")]
    pub sort: Option<String>,

    /// Sort ascending instead of descending
    #[arg(long, help_heading = "Ordering")]
    pub asc: bool,

    /// Comma-separated field references to show for this run only
    #[arg(long, value_delimiter = ',', help_heading = "Columns")]
    pub columns: Option<Vec<String>>,
}

/// Arguments for `columns`.
#[derive(ClapArgs, Clone, Default, Debug)]
pub struct ColumnsArgs {
    /// Field reference to add (repeatable)
    #[arg(long, value_name = "FIELD")]
    pub add: Vec<String>,

    /// Field reference to remove (repeatable); required columns stay
    #[arg(long, value_name = "FIELD")]
    pub remove: Vec<String>,

    /// Restore the default column set
    #[arg(long, conflicts_with_all = ["add", "remove"])]
    pub reset: bool,
}

/// Available commands
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// List work items in the project
    #[command(
        visible_alias = "ls",
        after_help = "EXAMPLES:\n    \
            # Active or resolved items assigned to alice, oldest change first\n    \
            ado-mobile list --state Active --state Resolved --assigned-to alice --asc\n\n    \
            # Search titles and show extra columns\n    \
            ado-mobile list -s \"login page\" --columns System.Tags,System.AreaPath"
    )]
    List(ListArgs),

    /// Show a work item with its description and comments
    Show {
        /// Work item id
        id: String,
    },

    /// Move a work item to another state
    SetState {
        /// Work item id
        id: String,
        /// Target state, e.g. Active or Resolved
        state: String,
    },

    /// Add a comment to a work item
    Comment {
        /// Work item id
        id: String,
        /// Comment text
        text: String,
    },

    /// Open a navigable path such as /work-items/42
    Open {
        /// Path to open
        path: String,
    },

    /// Remember the organization, project and token given via
    /// --organization/--project/--pat (or env/config) for later runs
    #[command(after_help = "EXAMPLES:\n    \
            ado-mobile login -o myorg -p myproject -t <PAT>")]
    Login,

    /// Forget the remembered workspace
    Logout,

    /// Show or edit the remembered column selection
    Columns(ColumnsArgs),

    /// Print the resolved configuration and where each value came from
    Config,
}

#[derive(Parser, Clone, Debug)]
#[command(
    author,
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"),
    about = "Browse and update Azure DevOps work items",
    long_about = "A lightweight Azure DevOps work item client.\n\n\
        ado-mobile helps you:\n  \
        • List and filter work items\n  \
        • Read descriptions and comments\n  \
        • Move items between states and leave comments\n\n\
        Configuration can be provided via CLI arguments, environment variables (ADO_MOBILE_*),\n\
        config file (~/.config/ado-mobile/config.toml), or remembered with `ado-mobile login`.",
    after_help = "EXAMPLES:\n    \
        # Remember a workspace\n    \
        ado-mobile login -o myorg -p myproject -t <PAT>\n\n    \
        # List recently changed items\n    \
        ado-mobile list\n\n    \
        # Resolve an item and explain why\n    \
        ado-mobile set-state 42 Resolved\n    \
        ado-mobile comment 42 \"Fixed in build 1.4.2\"\n\n    \
        # Create sample config file\n    \
        ado-mobile --create-config"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format
    #[arg(long, value_enum, global = true, help_heading = "Output Options")]
    pub format: Option<OutputFormat>,

    #[command(flatten)]
    pub log: LogArgs,

    /// Create a sample configuration file at ~/.config/ado-mobile/config.toml
    #[arg(long)]
    pub create_config: bool,
}

// ============================================================================
// Domain Models
// ============================================================================

/// A positive work item id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i32")]
pub struct WorkItemId(i32);

impl WorkItemId {
    /// Returns `None` for zero, negatives and values outside `i32`.
    pub fn new(value: i64) -> Option<Self> {
        i32::try_from(value).ok().filter(|v| *v > 0).map(Self)
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i64> for WorkItemId {
    type Error = InvalidWorkItemId;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| InvalidWorkItemId {
            input: value.to_string(),
        })
    }
}

impl From<WorkItemId> for i32 {
    fn from(id: WorkItemId) -> Self {
        id.0
    }
}

impl FromStr for WorkItemId {
    type Err = InvalidWorkItemId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidWorkItemId {
            input: s.to_string(),
        };
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse::<i64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A person as returned in identity-typed fields and comment authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRef {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,
}

/// A link from a work item to another resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemRelation {
    pub rel: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, Value>>,
}

/// A work item with whatever fields the request asked for.
///
/// Field values are kept as raw JSON: strings, numbers, identity objects or
/// null. The id is fixed once decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<i32>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<WorkItemRelation>>,
}

impl WorkItem {
    pub fn new(id: i32, url: impl Into<String>) -> Self {
        Self {
            id,
            rev: None,
            url: url.into(),
            fields: BTreeMap::new(),
            relations: None,
        }
    }

    /// Builder-style field setter, mostly for tests and fixtures.
    pub fn with_field(mut self, reference: impl Into<String>, value: Value) -> Self {
        self.fields.insert(reference.into(), value);
        self
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn field(&self, reference: &str) -> Option<&Value> {
        self.fields.get(reference)
    }

    /// The field as a string slice, if it is a JSON string.
    pub fn field_str(&self, reference: &str) -> Option<&str> {
        self.field(reference).and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.field_str("System.Title")
    }

    pub fn state(&self) -> Option<&str> {
        self.field_str("System.State")
    }

    pub fn description(&self) -> Option<&str> {
        self.field_str("System.Description")
            .filter(|s| !s.trim().is_empty())
    }
}

/// A discussion comment on a work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemComment {
    pub id: i32,
    pub text: String,
    pub created_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<DateTime<Utc>>,
    pub created_by: IdentityRef,
}

/// Everything the detail view shows: the item and its comments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkItemDetails {
    pub work_item: WorkItem,
    pub comments: Vec<WorkItemComment>,
}

/// Direction of the query ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn as_wiql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Ordering field and direction for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl Default for OrderBy {
    fn default() -> Self {
        Self::new("System.ChangedDate", SortDirection::Descending)
    }
}

/// Filters applied to a work item query. Empty values mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryCriteria {
    pub search_text: Option<String>,
    pub assigned_to: Option<String>,
    pub states: Vec<String>,
    pub order_by: Option<OrderBy>,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn assigned_to(mut self, who: impl Into<String>) -> Self {
        self.assigned_to = Some(who.into());
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.states.push(state.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy::new(field, direction));
        self
    }
}

/// The organization/project pair being browsed plus the credential used for it.
///
/// The token never leaves the process except in the Authorization header of
/// a request; `Debug` redacts it.
#[derive(Clone)]
pub struct WorkspaceConfig {
    pub organization: String,
    pub project: String,
    pub api_base_url: String,
    pub pat: Option<SecretString>,
}

impl WorkspaceConfig {
    pub fn new(
        organization: impl Into<String>,
        project: impl Into<String>,
        api_base_url: impl Into<String>,
    ) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
            api_base_url: api_base_url.into(),
            pat: None,
        }
    }

    pub fn with_pat(mut self, pat: impl Into<String>) -> Self {
        self.pat = Some(SecretString::from(pat.into()));
        self
    }

    /// True when a non-empty token is present.
    pub fn has_credential(&self) -> bool {
        self.pat
            .as_ref()
            .is_some_and(|pat| !pat.expose_secret().is_empty())
    }

    /// True when there is enough to issue requests.
    pub fn is_complete(&self) -> bool {
        self.has_credential() && !self.organization.is_empty() && !self.project.is_empty()
    }

    /// `<base without one trailing slash>/<organization>/<project>`.
    pub fn project_url(&self) -> String {
        let base = self
            .api_base_url
            .strip_suffix('/')
            .unwrap_or(&self.api_base_url);
        format!("{}/{}/{}", base, self.organization, self.project)
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self::new("", "", DEFAULT_API_BASE_URL)
    }
}

impl fmt::Debug for WorkspaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceConfig")
            .field("organization", &self.organization)
            .field("project", &self.project)
            .field("api_base_url", &self.api_base_url)
            .field("pat", &self.pat.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl PartialEq for WorkspaceConfig {
    fn eq(&self, other: &Self) -> bool {
        self.organization == other.organization
            && self.project == other.project
            && self.api_base_url == other.api_base_url
            && self.pat.as_ref().map(|p| p.expose_secret())
                == other.pat.as_ref().map(|p| p.expose_secret())
    }
}
