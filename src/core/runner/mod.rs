//! Command execution.
//!
//! [`CommandRunner`] turns one parsed [`Commands`] value into client calls,
//! context writes and output. It owns everything a command needs, so tests
//! can drive it with a [`MemoryStore`](crate::preferences::MemoryStore), a
//! mock transport and a byte buffer.

use std::io::Write;

use tracing::{debug, info, warn};

use crate::api::{AzureDevOpsClient, Transport};
use crate::config::Config;
use crate::context::AppContext;
use crate::core::output::OutputWriter;
use crate::error::{AdoMobileError, AdoMobileResult, ApiError, RouteError};
use crate::fields::{self, default_fields, detail_fields};
use crate::models::{
    ColumnsArgs, Commands, ListArgs, OrderBy, QueryCriteria, SortDirection, WorkItemId,
    WorkspaceConfig,
};
use crate::preferences::{PreferenceStore, normalize_columns};
use crate::routes::Route;

const LOGIN_ACTION: &str = "remember a workspace";

/// Redirects followed by `open` before giving up.
const MAX_REDIRECTS: usize = 4;

pub struct CommandRunner<S: PreferenceStore, T: Transport, W: Write> {
    context: AppContext<S>,
    client: AzureDevOpsClient<T>,
    overrides: Config,
    output: OutputWriter<W>,
}

impl<S: PreferenceStore, T: Transport, W: Write> CommandRunner<S, T, W> {
    /// `overrides` holds the file, environment and CLI layers; the stored and
    /// compiled-in layers are taken from `context` on every command.
    pub fn new(
        context: AppContext<S>,
        client: AzureDevOpsClient<T>,
        overrides: Config,
        output: OutputWriter<W>,
    ) -> Self {
        Self {
            context,
            client,
            overrides,
            output,
        }
    }

    pub fn context(&self) -> &AppContext<S> {
        &self.context
    }

    pub fn into_output(self) -> W {
        self.output.into_inner()
    }

    /// The configuration as it applies right now, every layer merged.
    pub fn effective_config(&self) -> Config {
        let mut config = Config::default().merge(Config::from_defaults(self.context.defaults()));
        if self.context.is_workspace_stored() {
            config = config.merge(Config::from_stored(self.context.workspace()));
        }
        config.merge(self.overrides.clone())
    }

    fn workspace(&self) -> AdoMobileResult<WorkspaceConfig> {
        Ok(self.effective_config().resolve_workspace()?)
    }

    /// Executes one command.
    pub async fn run(&mut self, command: Commands) -> AdoMobileResult<()> {
        debug!(?command, "Running command");
        match command {
            Commands::List(args) => self.list(args).await,
            Commands::Show { id } => self.show(parse_id(&id)?).await,
            Commands::SetState { id, state } => self.set_state(&id, &state).await,
            Commands::Comment { id, text } => self.comment(&id, &text).await,
            Commands::Open { path } => self.open(&path).await,
            Commands::Login => self.login(),
            Commands::Logout => self.logout(),
            Commands::Columns(args) => self.columns(args),
            Commands::Config => {
                let entries = self.effective_config().entries();
                Ok(self.output.write_config(&entries)?)
            }
        }
    }

    async fn list(&mut self, args: ListArgs) -> AdoMobileResult<()> {
        let columns = match &args.columns {
            Some(columns) => {
                let columns: Vec<String> = columns
                    .iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect();
                validate_field_references(&columns)?;
                normalize_columns(&columns)
            }
            None => self.context.columns(),
        };
        let criteria = build_criteria(&args)?;

        let workspace = self.workspace()?;
        let items = self
            .client
            .query_work_items(&workspace, &criteria, &columns)
            .await?;
        Ok(self.output.write_work_items(&items, &columns)?)
    }

    async fn show(&mut self, id: WorkItemId) -> AdoMobileResult<()> {
        let workspace = self.workspace()?;
        let details = self
            .client
            .get_work_item_details(&workspace, id, &detail_fields())
            .await?;
        Ok(self.output.write_details(&details)?)
    }

    async fn set_state(&mut self, id: &str, state: &str) -> AdoMobileResult<()> {
        let id = parse_id(id)?;
        let state = state.trim();
        if state.is_empty() {
            return Err(AdoMobileError::invalid_input("State must not be empty"));
        }

        let workspace = self.workspace()?;
        self.client
            .update_work_item_state(&workspace, id, state)
            .await?;
        Ok(self.output.write_state_changed(id, state)?)
    }

    async fn comment(&mut self, id: &str, text: &str) -> AdoMobileResult<()> {
        let id = parse_id(id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(AdoMobileError::invalid_input("Comment text must not be empty"));
        }

        let workspace = self.workspace()?;
        self.client
            .add_work_item_comment(&workspace, id, text)
            .await?;
        Ok(self.output.write_comment_added(id, text)?)
    }

    async fn open(&mut self, path: &str) -> AdoMobileResult<()> {
        let mut route = Route::parse(path)?;
        for _ in 0..=MAX_REDIRECTS {
            match route {
                Route::Redirect(target) => {
                    debug!(from = %path, to = %target, "Following redirect");
                    route = Route::parse(&target)?;
                }
                Route::WorkItems => return self.list(ListArgs::default()).await,
                Route::WorkItem(id) => return self.show(id).await,
            }
        }
        Err(RouteError::NotFound {
            path: path.to_string(),
        }
        .into())
    }

    fn login(&mut self) -> AdoMobileResult<()> {
        let workspace = self.workspace()?;
        if !workspace.has_credential() {
            return Err(ApiError::MissingCredential {
                action: LOGIN_ACTION,
            }
            .into());
        }

        let label = format!("{}/{}", workspace.organization, workspace.project);
        self.context.set_workspace(workspace)?;
        info!(workspace = %label, "Workspace remembered");
        Ok(self
            .output
            .write_message(&format!("Remembered workspace {}", label))?)
    }

    fn logout(&mut self) -> AdoMobileResult<()> {
        self.context.clear_workspace()?;
        info!("Workspace forgotten");
        Ok(self.output.write_message("Forgot the remembered workspace")?)
    }

    fn columns(&mut self, args: ColumnsArgs) -> AdoMobileResult<()> {
        validate_field_references(&args.add)?;

        if args.reset {
            self.context.set_columns(default_fields())?;
        }
        for reference in &args.add {
            if !self.context.columns().contains(reference) {
                self.context.toggle_column(reference)?;
            }
        }
        for reference in &args.remove {
            if fields::is_required_column(reference) {
                warn!(column = %reference, "Required column cannot be removed");
                continue;
            }
            if self.context.columns().contains(reference) {
                self.context.toggle_column(reference)?;
            }
        }

        let columns = self.context.columns();
        Ok(self.output.write_columns(&columns)?)
    }
}

fn parse_id(input: &str) -> AdoMobileResult<WorkItemId> {
    input
        .trim()
        .parse::<WorkItemId>()
        .map_err(|e| RouteError::from(e).into())
}

fn validate_field_references(references: &[String]) -> AdoMobileResult<()> {
    match references.iter().find(|r| !fields::is_field_reference(r)) {
        Some(bad) => Err(AdoMobileError::invalid_input(format!(
            "'{}' is not a field reference (expected something like System.Title)",
            bad
        ))),
        None => Ok(()),
    }
}

fn build_criteria(args: &ListArgs) -> AdoMobileResult<QueryCriteria> {
    let direction = if args.asc {
        SortDirection::Ascending
    } else {
        SortDirection::Descending
    };
    let sort_field = args
        .sort
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| OrderBy::default().field);
    validate_field_references(std::slice::from_ref(&sort_field))?;

    Ok(QueryCriteria {
        search_text: non_blank(args.search.as_deref()),
        assigned_to: non_blank(args.assigned_to.as_deref()),
        states: args
            .states
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        order_by: Some(OrderBy::new(sort_field, direction)),
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
