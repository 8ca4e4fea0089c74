//! Compiled-in catalogue of work item fields, states and sort options.

/// A field reference name with its display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    pub label: &'static str,
    pub reference: &'static str,
}

const fn field(label: &'static str, reference: &'static str) -> FieldInfo {
    FieldInfo { label, reference }
}

/// Columns shown when nothing has been chosen.
pub const DEFAULT_FIELDS: [&str; 8] = [
    "System.Id",
    "System.Title",
    "System.State",
    "System.AssignedTo",
    "System.WorkItemType",
    "System.Tags",
    "System.ChangedDate",
    "Microsoft.VSTS.Common.Priority",
];

/// Columns the user may pick from.
pub const AVAILABLE_FIELDS: [FieldInfo; 10] = [
    field("ID", "System.Id"),
    field("Title", "System.Title"),
    field("State", "System.State"),
    field("Assigned To", "System.AssignedTo"),
    field("Type", "System.WorkItemType"),
    field("Tags", "System.Tags"),
    field("Priority", "Microsoft.VSTS.Common.Priority"),
    field("Changed", "System.ChangedDate"),
    field("Area Path", "System.AreaPath"),
    field("Iteration", "System.IterationPath"),
];

/// Columns that are always present and can never be toggled off.
pub const REQUIRED_COLUMNS: [&str; 3] = ["System.Id", "System.Title", "System.State"];

/// States offered as list filters.
pub const DEFAULT_STATES: [&str; 4] = ["New", "Active", "Resolved", "Closed"];

/// States offered when changing an item's state.
pub const STATE_OPTIONS: [&str; 5] = ["New", "Active", "Resolved", "Closed", "Removed"];

/// Fields fetched for the detail view on top of [`DEFAULT_FIELDS`].
pub const DETAIL_EXTRA_FIELDS: [&str; 5] = [
    "System.Description",
    "System.AreaPath",
    "System.IterationPath",
    "System.CreatedDate",
    "System.CreatedBy",
];

/// Fields a list may be ordered by.
pub const SORT_OPTIONS: [FieldInfo; 4] = [
    field("Changed Date", "System.ChangedDate"),
    field("Created Date", "System.CreatedDate"),
    field("State", "System.State"),
    field("Title", "System.Title"),
];

pub fn default_fields() -> Vec<String> {
    DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect()
}

pub fn detail_fields() -> Vec<String> {
    DEFAULT_FIELDS
        .iter()
        .chain(DETAIL_EXTRA_FIELDS.iter())
        .map(|f| f.to_string())
        .collect()
}

pub fn is_required_column(reference: &str) -> bool {
    REQUIRED_COLUMNS.contains(&reference)
}

/// Display label for a field reference, falling back to the reference itself.
pub fn label_for(reference: &str) -> &str {
    AVAILABLE_FIELDS
        .iter()
        .chain(SORT_OPTIONS.iter())
        .find(|f| f.reference == reference)
        .map(|f| f.label)
        .unwrap_or(reference)
}

/// State choices for an item, with its current state appended if it is not a standard one.
pub fn state_options(current: Option<&str>) -> Vec<String> {
    let mut options: Vec<String> = STATE_OPTIONS.iter().map(|s| s.to_string()).collect();
    if let Some(current) = current.filter(|c| !c.is_empty())
        && !options.iter().any(|o| o == current)
    {
        options.push(current.to_string());
    }
    options
}

/// Field references look like `Namespace.Name` with letters, digits, dots and underscores.
pub fn is_field_reference(reference: &str) -> bool {
    !reference.is_empty()
        && !reference.starts_with('.')
        && !reference.ends_with('.')
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}
