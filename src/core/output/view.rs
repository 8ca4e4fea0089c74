//! Turning raw field values into display strings.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Placeholder for null or absent values.
pub const EMPTY_VALUE: &str = "—";

/// Placeholder for an item with no assignee.
pub const UNASSIGNED: &str = "Unassigned";

/// Placeholder for an item with no title.
pub const UNTITLED: &str = "Untitled";

/// The display name of an identity object, if `value` is one.
pub fn identity_name(value: &Value) -> Option<&str> {
    value
        .as_object()
        .and_then(|obj| obj.get("displayName"))
        .and_then(Value::as_str)
}

/// Renders one field value.
///
/// Identities show their display name, date fields are shortened, other
/// strings print as-is, and null or absent values print as `—`
/// (`Unassigned` for the assignee).
pub fn display_value(reference: &str, value: Option<&Value>) -> String {
    let placeholder = if reference == "System.AssignedTo" {
        UNASSIGNED
    } else {
        EMPTY_VALUE
    };

    match value {
        None | Some(Value::Null) => placeholder.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => placeholder.to_string(),
        Some(Value::String(s)) if reference.ends_with("Date") => display_date(s),
        Some(Value::String(s)) => s.clone(),
        Some(other) => match identity_name(other) {
            Some(name) => name.to_string(),
            None => other.to_string(),
        },
    }
}

/// `2024-03-01T10:00:00Z` becomes `2024-03-01 10:00`; anything unparsable is returned unchanged.
pub fn display_date(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(date) => format_timestamp(&date.with_timezone(&Utc)),
        Err(_) => raw.to_string(),
    }
}

pub fn format_timestamp(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// # Display Value
    ///
    /// Tests rendering of each value shape.
    ///
    /// ## Test Scenario
    /// - Identity, plain string, number, null, absent and date values
    ///
    /// ## Expected Outcome
    /// - Names for identities, placeholders for nothing, short dates
    #[test]
    fn test_display_value() {
        let alice = json!({"displayName": "Alice", "uniqueName": "alice@x.com"});
        assert_eq!(display_value("System.AssignedTo", Some(&alice)), "Alice");
        assert_eq!(display_value("System.AssignedTo", None), "Unassigned");
        assert_eq!(display_value("System.AssignedTo", Some(&Value::Null)), "Unassigned");
        assert_eq!(
            display_value("System.AssignedTo", Some(&json!("bob@x.com"))),
            "bob@x.com"
        );
        assert_eq!(display_value("System.Tags", Some(&Value::Null)), "—");
        assert_eq!(display_value("System.Tags", Some(&json!(""))), "—");
        assert_eq!(
            display_value("Microsoft.VSTS.Common.Priority", Some(&json!(2))),
            "2"
        );
        assert_eq!(
            display_value("System.ChangedDate", Some(&json!("2024-03-01T10:00:00.123Z"))),
            "2024-03-01 10:00"
        );
        assert_eq!(
            display_value("System.ChangedDate", Some(&json!("yesterday"))),
            "yesterday"
        );
    }
}
