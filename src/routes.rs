//! Navigable paths.
//!
//! `open <path>` accepts the same paths the mobile app links to:
//!
//! | Path | Route |
//! |---|---|
//! | `/` or empty | redirect to `/work-items` |
//! | `/work-items` | the list |
//! | `/work-items/<id>` | one item |

use crate::error::RouteError;
use crate::models::WorkItemId;
use std::fmt;

pub const WORK_ITEMS_PATH: &str = "/work-items";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Navigate to the contained path instead.
    Redirect(String),
    WorkItems,
    WorkItem(WorkItemId),
}

impl Route {
    /// Parses a path. Query strings, fragments and one trailing slash are ignored.
    ///
    /// ```
    /// use ado_mobile::routes::Route;
    ///
    /// let route = Route::parse("/work-items/42/").unwrap();
    /// assert_eq!(route.path(), "/work-items/42");
    /// assert!(Route::parse("/work-items/0").is_err());
    /// ```
    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let trimmed = path.trim();
        let without_suffix = trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let normalized = match without_suffix {
            "" | "/" => return Ok(Route::Redirect(WORK_ITEMS_PATH.to_string())),
            p => p.strip_suffix('/').unwrap_or(p),
        };

        if normalized == WORK_ITEMS_PATH {
            return Ok(Route::WorkItems);
        }

        match normalized
            .strip_prefix(WORK_ITEMS_PATH)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            Some(id) if !id.is_empty() && !id.contains('/') => {
                Ok(Route::WorkItem(id.parse::<WorkItemId>()?))
            }
            _ => Err(RouteError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Canonical path for this route.
    pub fn path(&self) -> String {
        match self {
            Route::Redirect(target) => target.clone(),
            Route::WorkItems => WORK_ITEMS_PATH.to_string(),
            Route::WorkItem(id) => format!("{}/{}", WORK_ITEMS_PATH, id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
