//! Process-wide application context.
//!
//! [`AppContext`] owns the current workspace and column selection, mirrors
//! every change into a [`PreferenceStore`], and tells subscribers what changed
//! through a `tokio::sync::watch` channel.

use crate::error::PreferenceError;
use crate::models::WorkspaceConfig;
use crate::preferences::{self, PreferenceStore, WorkspaceDefaults};
use tokio::sync::watch;
use tracing::{debug, warn};

/// What the last write changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextChange {
    /// Nothing yet; the value a fresh subscriber sees.
    Loaded,
    Workspace,
    WorkspaceCleared,
    Columns,
}

pub struct AppContext<S: PreferenceStore> {
    store: S,
    defaults: WorkspaceDefaults,
    workspace: WorkspaceConfig,
    workspace_stored: bool,
    columns: Vec<String>,
    changes: watch::Sender<ContextChange>,
}

impl<S: PreferenceStore> AppContext<S> {
    /// Loads the context from `store`.
    ///
    /// A stored workspace saved under different build defaults is discarded
    /// first. Store failures are logged and the defaults are used.
    pub fn load(store: S, defaults: WorkspaceDefaults) -> Self {
        match preferences::reconcile_defaults_signature(&store, &defaults) {
            Ok(true) => debug!("Stored workspace invalidated by new defaults"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Could not check defaults signature"),
        }

        let stored = preferences::load_stored_workspace(&store, &defaults);
        let workspace_stored = stored.is_some();
        let workspace = stored.unwrap_or_else(|| defaults.to_workspace());
        let columns = preferences::load_columns(&store);
        let (changes, _) = watch::channel(ContextChange::Loaded);

        Self {
            store,
            defaults,
            workspace,
            workspace_stored,
            columns,
            changes,
        }
    }

    pub fn workspace(&self) -> &WorkspaceConfig {
        &self.workspace
    }

    /// True when the workspace came from the store rather than the build defaults.
    pub fn is_workspace_stored(&self) -> bool {
        self.workspace_stored
    }

    /// The column selection, always led by the required columns.
    pub fn columns(&self) -> Vec<String> {
        preferences::normalize_columns(&self.columns)
    }

    pub fn defaults(&self) -> &WorkspaceDefaults {
        &self.defaults
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Receiver that is notified on every successful write.
    pub fn subscribe(&self) -> watch::Receiver<ContextChange> {
        self.changes.subscribe()
    }

    /// Persists and adopts a new workspace.
    pub fn set_workspace(&mut self, workspace: WorkspaceConfig) -> Result<(), PreferenceError> {
        preferences::save_workspace(&self.store, &workspace)?;
        self.workspace = workspace;
        self.workspace_stored = true;
        self.publish(ContextChange::Workspace);
        Ok(())
    }

    /// Forgets the stored workspace and falls back to the build defaults.
    pub fn clear_workspace(&mut self) -> Result<(), PreferenceError> {
        preferences::clear_workspace(&self.store)?;
        self.workspace = self.defaults.to_workspace();
        self.workspace_stored = false;
        self.publish(ContextChange::WorkspaceCleared);
        Ok(())
    }

    /// Persists and adopts a new column selection.
    pub fn set_columns(&mut self, columns: Vec<String>) -> Result<(), PreferenceError> {
        preferences::save_columns(&self.store, &columns)?;
        self.columns = columns;
        self.publish(ContextChange::Columns);
        Ok(())
    }

    /// Toggles one column. Returns `false` when nothing changed (locked column).
    pub fn toggle_column(&mut self, reference: &str) -> Result<bool, PreferenceError> {
        let current = self.columns();
        let next = preferences::toggle_column(&current, reference);
        if next == current {
            return Ok(false);
        }
        self.set_columns(next)?;
        Ok(true)
    }

    fn publish(&self, change: ContextChange) {
        debug!(?change, "Context changed");
        self.changes.send_replace(change);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::default_fields;
    use crate::preferences::{COLUMNS_KEY, MemoryStore, WORKSPACE_KEY};
    use secrecy::ExposeSecret;

    fn defaults() -> WorkspaceDefaults {
        WorkspaceDefaults::new("contoso", "mobile", "")
    }

    /// # Fresh Context Uses Defaults
    ///
    /// Tests loading from an empty store.
    ///
    /// ## Test Scenario
    /// - Load a context over an empty MemoryStore
    ///
    /// ## Expected Outcome
    /// - Default workspace and default columns
    #[test]
    fn test_fresh_context_uses_defaults() {
        let ctx = AppContext::load(MemoryStore::new(), defaults());
        assert_eq!(ctx.workspace(), &defaults().to_workspace());
        assert_eq!(ctx.columns(), default_fields());
        assert!(!ctx.is_workspace_stored());
    }

    /// # Writes Persist And Notify
    ///
    /// Tests that every write reaches the store and the subscribers.
    ///
    /// ## Test Scenario
    /// - Subscribe, then set the workspace and the columns
    ///
    /// ## Expected Outcome
    /// - Store contains both records
    /// - Receiver observes each change
    #[test]
    fn test_writes_persist_and_notify() {
        let mut ctx = AppContext::load(MemoryStore::new(), defaults());
        let mut rx = ctx.subscribe();
        assert_eq!(*rx.borrow(), ContextChange::Loaded);

        ctx.set_workspace(WorkspaceConfig::new("o", "p", "https://dev.azure.com").with_pat("t"))
            .unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ContextChange::Workspace);
        let stored = ctx.store().get(WORKSPACE_KEY).unwrap().unwrap();
        assert!(stored.contains(r#""organization":"o""#));

        ctx.set_columns(vec!["System.Tags".to_string()]).unwrap();
        assert_eq!(*rx.borrow_and_update(), ContextChange::Columns);
        assert_eq!(
            ctx.store().get(COLUMNS_KEY).unwrap().as_deref(),
            Some(r#"["System.Tags"]"#)
        );
        assert_eq!(ctx.columns()[..3], ["System.Id", "System.Title", "System.State"]);
    }

    /// # Reload Sees Previous Writes
    ///
    /// Tests that a new context over the same store picks up saved values.
    ///
    /// ## Test Scenario
    /// - Save a workspace, take the store out, load a new context over it
    ///
    /// ## Expected Outcome
    /// - The token and organization survive
    #[test]
    fn test_reload_sees_previous_writes() {
        let mut ctx = AppContext::load(MemoryStore::new(), defaults());
        ctx.set_workspace(WorkspaceConfig::new("o", "p", "https://dev.azure.com").with_pat("t"))
            .unwrap();
        let AppContext { store, .. } = ctx;

        let ctx = AppContext::load(store, defaults());
        assert!(ctx.is_workspace_stored());
        assert_eq!(ctx.workspace().organization, "o");
        assert_eq!(
            ctx.workspace().pat.as_ref().map(|p| p.expose_secret()),
            Some("t")
        );
    }

    /// # Clear Workspace
    ///
    /// Tests forgetting the workspace.
    ///
    /// ## Test Scenario
    /// - Set then clear the workspace
    ///
    /// ## Expected Outcome
    /// - Store no longer has the key; context shows the defaults
    #[test]
    fn test_clear_workspace() {
        let mut ctx = AppContext::load(MemoryStore::new(), defaults());
        let rx = ctx.subscribe();
        ctx.set_workspace(WorkspaceConfig::new("o", "p", "u").with_pat("t"))
            .unwrap();
        ctx.clear_workspace().unwrap();

        assert_eq!(ctx.store().get(WORKSPACE_KEY).unwrap(), None);
        assert_eq!(ctx.workspace(), &defaults().to_workspace());
        assert!(!ctx.is_workspace_stored());
        assert_eq!(*rx.borrow(), ContextChange::WorkspaceCleared);
    }

    /// # Toggle Locked Column
    ///
    /// Tests that locked columns cannot be toggled and no write happens.
    ///
    /// ## Test Scenario
    /// - Toggle System.Id, then System.Tags twice
    ///
    /// ## Expected Outcome
    /// - Id toggle reports no change and leaves the store untouched
    /// - Tags is removed then added back
    #[test]
    fn test_toggle_locked_column() {
        let mut ctx = AppContext::load(MemoryStore::new(), defaults());
        assert!(!ctx.toggle_column("System.Id").unwrap());
        assert_eq!(ctx.store().get(COLUMNS_KEY).unwrap(), None);

        assert!(ctx.toggle_column("System.Tags").unwrap());
        assert!(!ctx.columns().contains(&"System.Tags".to_string()));
        assert!(ctx.toggle_column("System.Tags").unwrap());
        assert!(ctx.columns().contains(&"System.Tags".to_string()));
    }

    /// # Stale Defaults Discard Stored Workspace
    ///
    /// Tests that loading under new build defaults drops the old workspace.
    ///
    /// ## Test Scenario
    /// - Load once under defaults A and save a workspace
    /// - Load again under defaults B
    ///
    /// ## Expected Outcome
    /// - Second context shows defaults B; columns are kept
    #[test]
    fn test_stale_defaults_discard_workspace() {
        let mut ctx = AppContext::load(MemoryStore::new(), defaults());
        ctx.set_workspace(WorkspaceConfig::new("o", "p", "u").with_pat("t"))
            .unwrap();
        ctx.set_columns(vec!["System.AreaPath".to_string()]).unwrap();
        let AppContext { store, .. } = ctx;

        let other = WorkspaceDefaults::new("fabrikam", "web", "");
        let ctx = AppContext::load(store, other.clone());
        assert_eq!(ctx.workspace(), &other.to_workspace());
        assert!(ctx.columns().contains(&"System.AreaPath".to_string()));
    }

    /// # Malformed Store Recovers
    ///
    /// Tests loading over records that do not decode.
    ///
    /// ## Test Scenario
    /// - Store holds a broken workspace record and a non-array column list
    ///
    /// ## Expected Outcome
    /// - Defaults are used for both
    /// - The workspace does not count as stored
    #[test]
    fn test_malformed_store_recovers() {
        let store = MemoryStore::with_entries([(WORKSPACE_KEY, "{broken"), (COLUMNS_KEY, "7")]);
        let ctx = AppContext::load(store, defaults());
        assert_eq!(ctx.workspace(), &defaults().to_workspace());
        assert_eq!(ctx.columns(), default_fields());
        assert!(!ctx.is_workspace_stored());
    }
}
