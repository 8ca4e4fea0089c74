//! WIQL query construction.

use crate::models::{OrderBy, QueryCriteria};

/// Escapes a user-supplied value for a single-quoted WIQL literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Builds the id query for a set of criteria, scoped to the current project.
///
/// Clauses are appended in a fixed order: title search, states, assignee,
/// ordering. Missing ordering means most recently changed first.
pub fn build_query(criteria: &QueryCriteria) -> String {
    let mut parts = vec![
        "SELECT [System.Id] FROM WorkItems WHERE [System.TeamProject] = @project".to_string(),
    ];

    if let Some(search) = non_empty(criteria.search_text.as_ref()) {
        parts.push(format!(
            "AND [System.Title] CONTAINS '{}'",
            escape_literal(search)
        ));
    }

    if !criteria.states.is_empty() {
        let states = criteria
            .states
            .iter()
            .map(|s| format!("'{}'", escape_literal(s)))
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("AND [System.State] IN ({})", states));
    }

    if let Some(assignee) = non_empty(criteria.assigned_to.as_ref()) {
        parts.push(format!(
            "AND [System.AssignedTo] CONTAINS '{}'",
            escape_literal(assignee)
        ));
    }

    let order = criteria.order_by.clone().unwrap_or_default();
    parts.push(order_clause(&order));

    parts.join(" ")
}

fn order_clause(order: &OrderBy) -> String {
    format!("ORDER BY [{}] {}", order.field, order.direction.as_wiql())
}
